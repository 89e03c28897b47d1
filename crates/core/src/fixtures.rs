//! ORU^R01 messages shared by the unit tests.

pub const NORMAL_CBC: &str = "MSH|^~\\&|LAB|HOSPITAL|EPIC|HOSPITAL|20240715120000||ORU^R01|MSG001|P|2.5\r\
PID|1||12345678^^^HOSPITAL^MR||DOE^JOHN^A||19800515|M|||123 MAIN ST^^BALTIMORE^MD^21201\r\
OBR|1|ORD123456|LAB123456|CBC^COMPLETE BLOOD COUNT|||20240715113000\r\
OBX|1|NM|WBC^WHITE BLOOD COUNT||8.5|10*3/uL|4.5-11.0|N|||F|||20240715115500\r\
OBX|2|NM|HGB^HEMOGLOBIN||14.2|g/dL|12.0-16.0|N|||F|||20240715115500\r\
OBX|3|NM|PLT^PLATELETS||250|10*3/uL|150-400|N|||F|||20240715115500";

pub const CRITICAL_CHEM: &str = "MSH|^~\\&|LAB|HOSPITAL|EPIC|HOSPITAL|20240715130000||ORU^R01|MSG002|P|2.5\r\
PID|1||98765432^^^HOSPITAL^MR||SMITH^JANE^B||19750320|F|||456 OAK ST^^BALTIMORE^MD^21201\r\
OBR|1|ORD789012|LAB789012|CHEM^CHEMISTRY PANEL|||20240715123000\r\
OBX|1|NM|GLU^GLUCOSE||32|mg/dL|70-100|LL|||F|||20240715125500\r\
OBX|2|NM|K^POTASSIUM||7.2|mmol/L|3.5-5.0|HH|||F|||20240715125500\r\
OBX|3|NM|NA^SODIUM||135|mmol/L|136-145|L|||F|||20240715125500";

pub const MULTI_ORDER: &str = "MSH|^~\\&|LAB|HOSPITAL|CERNER|HOSPITAL|20240715140000||ORU^R01|MSG003|P|2.5\r\
PID|1||55555555^^^HOSPITAL^MR||JOHNSON^ROBERT^C||19901210|M|||789 ELM ST^^BALTIMORE^MD^21201\r\
OBR|1|ORD111111|LAB111111|CBC^COMPLETE BLOOD COUNT|||20240715133000\r\
OBX|1|NM|WBC^WHITE BLOOD COUNT||15.2|10*3/uL|4.5-11.0|H|||F|||20240715135500\r\
OBX|2|NM|HGB^HEMOGLOBIN||6.5|g/dL|12.0-16.0|LL|||F|||20240715135500\r\
OBR|2|ORD222222|LAB222222|LYTES^ELECTROLYTES|||20240715133000\r\
OBX|1|NM|NA^SODIUM||118|mmol/L|136-145|LL|||F|||20240715135500\r\
NTE|1|L|Verified by repeat analysis\r\
OBX|2|NM|K^POTASSIUM||2.2|mmol/L|3.5-5.0|LL|||F|||20240715135500";

/// Arterial blood gas with a free-text comment and a non-numeric NM value.
pub const BLOOD_GAS: &str = "MSH|^~\\&|LAB|HOSPITAL|EPIC|HOSPITAL|20240716080000+0100||ORU^R01|MSG004|P|2.5\n\
PID|1||24681357^^^HOSPITAL^MR||BROWN^ALICE||19621102|F\n\
OBR|1|ORD333333|LAB333333|ABG^ARTERIAL BLOOD GAS|||20240716074500+0100\n\
OBX|1|NM|PH^PH||7.10||7.35-7.45|LL|||F\n\
OBX|2|NM|PCO2^PCO2||65|mmHg|35-45|HH|||F\n\
OBX|3|NM|PO2^PO2||>500|mmHg|80-100|H|||F\n\
OBX|4|ST|COMMENT^SAMPLE COMMENT||Sample on ice|||||F";

/// Observation before any order.
pub const ORPHAN_OBSERVATION: &str = "MSH|^~\\&|LAB|HOSPITAL|EPIC|HOSPITAL|20240715120000||ORU^R01|MSG005|P|2.5\r\
PID|1||12345678^^^HOSPITAL^MR||DOE^JOHN^A\r\
OBX|1|NM|GLU^GLUCOSE||32|mg/dL|70-100|LL|||F\r\
OBR|1|ORD123456|LAB123456|CHEM^CHEMISTRY PANEL";
