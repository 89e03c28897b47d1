//! Encoding characters declared by the MSH header and escape-sequence decoding.
//!
//! An HL7 v2 message declares its own delimiters: the character immediately after the `MSH`
//! identifier is the field separator, and MSH-2 lists the component, repetition, escape and
//! subcomponent characters in that order.

use std::borrow::Cow;

use crate::{Hl7Error, Hl7Result};

/// The five delimiter characters used to tokenize a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodingCharacters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for EncodingCharacters {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl EncodingCharacters {
    /// `|`, `^`, `~`, `\`, `&`.
    pub const STANDARD: Self = Self {
        field: '|',
        component: '^',
        repetition: '~',
        escape: '\\',
        subcomponent: '&',
    };

    /// Build and validate a set of encoding characters.
    ///
    /// # Errors
    ///
    /// Returns [`Hl7Error::EncodingMismatch`] if any two characters coincide, or if any of them
    /// is alphanumeric or whitespace (those characters are structurally needed for segment
    /// identifiers and line framing).
    pub fn new(
        field: char,
        component: char,
        repetition: char,
        escape: char,
        subcomponent: char,
    ) -> Hl7Result<Self> {
        let chars = Self {
            field,
            component,
            repetition,
            escape,
            subcomponent,
        };
        chars.validate(0)?;
        Ok(chars)
    }

    /// Read the encoding characters declared inline by an MSH segment line.
    ///
    /// `line` must start with `MSH`. The field separator is the fourth character and MSH-2
    /// must hold exactly four characters, followed by the field separator or the end of line.
    ///
    /// # Errors
    ///
    /// - [`Hl7Error::MalformedMessage`] if the line is not an MSH line or MSH-2 is not four
    ///   characters long.
    /// - [`Hl7Error::EncodingMismatch`] if the declared characters are not usable delimiters.
    pub fn from_header_line(line: &str) -> Hl7Result<Self> {
        let malformed = |reason: String| Hl7Error::MalformedMessage {
            segment_index: 0,
            reason,
        };

        if !line.starts_with("MSH") {
            return Err(malformed(
                "message must begin with an MSH header segment".into(),
            ));
        }

        let mut chars = line[3..].chars();
        let field = chars
            .next()
            .ok_or_else(|| malformed("MSH segment is missing its field separator".into()))?;

        let declared: Vec<char> = chars.by_ref().take_while(|c| *c != field).collect();
        if declared.len() != 4 {
            return Err(malformed(format!(
                "MSH-2 must declare exactly four encoding characters, found {}",
                declared.len()
            )));
        }

        let encoding = Self {
            field,
            component: declared[0],
            repetition: declared[1],
            escape: declared[2],
            subcomponent: declared[3],
        };
        encoding.validate(3)?;
        Ok(encoding)
    }

    /// The MSH-2 representation of these characters (e.g. `^~\&`).
    pub fn msh2(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .iter()
            .collect()
    }

    fn all(&self) -> [char; 5] {
        [
            self.field,
            self.component,
            self.repetition,
            self.escape,
            self.subcomponent,
        ]
    }

    pub(crate) fn validate(&self, offset: usize) -> Hl7Result<()> {
        let all = self.all();
        for (i, c) in all.iter().enumerate() {
            if c.is_alphanumeric() || c.is_whitespace() {
                return Err(Hl7Error::EncodingMismatch {
                    offset,
                    reason: format!("delimiter {c:?} cannot be alphanumeric or whitespace"),
                });
            }
            if all[..i].contains(c) {
                return Err(Hl7Error::EncodingMismatch {
                    offset,
                    reason: format!("delimiter {c:?} is declared more than once"),
                });
            }
        }
        Ok(())
    }

    /// Decode escape sequences that stand for delimiter characters.
    ///
    /// `\F\`, `\S\`, `\R\`, `\E\` and `\T\` become the field, component, repetition, escape and
    /// subcomponent characters. Any other sequence, and an unterminated one, is left as is.
    pub fn unescape<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if !value.contains(self.escape) {
            return Cow::Borrowed(value);
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(self.escape) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.escape.len_utf8()..];
            let Some(end) = after.find(self.escape) else {
                out.push_str(&rest[start..]);
                return Cow::Owned(out);
            };

            let code = &after[..end];
            let decoded = match code {
                "F" => Some(self.field),
                "S" => Some(self.component),
                "R" => Some(self.repetition),
                "E" => Some(self.escape),
                "T" => Some(self.subcomponent),
                _ => None,
            };
            match decoded {
                Some(c) => out.push(c),
                None => {
                    out.push(self.escape);
                    out.push_str(code);
                    out.push(self.escape);
                }
            }
            rest = &after[end + self.escape.len_utf8()..];
        }
        out.push_str(rest);
        Cow::Owned(out)
    }
}
