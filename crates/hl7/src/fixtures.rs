//! Parser-level messages for this crate's tests.
//!
//! Clinical scenarios (critical values, blood gases, EMR targets) live in `labflow-core`.

/// One order, three numeric observations, full PID address.
pub const CBC_RESULT: &str = "MSH|^~\\&|LAB|HOSPITAL|EPIC|HOSPITAL|20240715120000||ORU^R01|HL7CBC1|P|2.5\r\
PID|1||12345678^^^HOSPITAL^MR||DOE^JOHN^A||19800515|M|||123 MAIN ST^^BALTIMORE^MD^21201\r\
OBR|1|ORD123456|LAB123456|CBC^COMPLETE BLOOD COUNT|||20240715113000\r\
OBX|1|NM|WBC^WHITE BLOOD COUNT||8.5|10*3/uL|4.5-11.0|N|||F|||20240715115500\r\
OBX|2|NM|HGB^HEMOGLOBIN||14.2|g/dL|12.0-16.0|N|||F|||20240715115500\r\
OBX|3|NM|PLT^PLATELETS||250|10*3/uL|150-400|N|||F|||20240715115500";

/// Two orders with a note on the first electrolyte and a visit segment the builder skips.
pub const TWO_ORDERS_WITH_NOTE: &str = "MSH|^~\\&|LAB|HOSPITAL|LIS|HOSPITAL|20240715140000||ORU^R01|HL7TWO1|P|2.5\r\
PID|1||55555555^^^HOSPITAL^MR||JOHNSON^ROBERT^C||19901210|M\r\
PV1|1|I|WARD^12^A\r\
OBR|1|ORD111111|LAB111111|CBC^COMPLETE BLOOD COUNT|||20240715133000\r\
OBX|1|NM|WBC^WHITE BLOOD COUNT||15.2|10*3/uL|4.5-11.0|H|||F|||20240715135500\r\
OBX|2|NM|HGB^HEMOGLOBIN||6.5|g/dL|12.0-16.0|LL|||F|||20240715135500\r\
OBR|2|ORD222222|LAB222222|LYTES^ELECTROLYTES|||20240715133000\r\
OBX|1|NM|NA^SODIUM||118|mmol/L|136-145|LL|||F|||20240715135500\r\
NTE|1|L|Verified by repeat analysis\r\
OBX|2|NM|K^POTASSIUM||2.2|mmol/L|3.5-5.0|LL|||F|||20240715135500";
