//! Segment / field / component / subcomponent tokenizer.
//!
//! The tokenizer knows nothing about segment meaning. It frames the raw text into segments
//! (any of `\r`, `\n` or `\r\n` ends a segment), checks the header, and splits each segment into
//! a positional tree using the declared encoding characters. Empty fields are kept so that
//! HL7 field numbers stay stable.

use crate::encoding::EncodingCharacters;
use crate::{Hl7Error, Hl7Result};

/// Output of [`tokenize`]: the delimiters in force and the segments in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenizedMessage {
    pub encoding: EncodingCharacters,
    pub segments: Vec<Segment>,
}

/// A tokenized segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    id: String,
    index: usize,
    offset: usize,
    fields: Vec<Field>,
}

/// One field, split into repetitions.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Field {
    text: String,
    repetitions: Vec<Repetition>,
}

/// One repetition of a field, split into components.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Repetition {
    components: Vec<Component>,
}

/// One component, split into subcomponents.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Component {
    subcomponents: Vec<String>,
}

impl Segment {
    /// Three-character segment identifier (e.g. `OBX`).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position of this segment in the message (0-based, blank lines excluded).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of the segment's first character in the raw message text.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of fields after the identifier, trailing empty fields included.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Field by HL7 position (1-based). For MSH, field 1 is the field separator itself.
    pub fn field(&self, position: usize) -> Option<&Field> {
        position.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// Decoded text of a whole field, or `""` if the field is absent.
    pub fn text(&self, position: usize) -> &str {
        self.field(position).map(Field::text).unwrap_or("")
    }

    /// First subcomponent of a component in the first repetition, or `""`.
    pub fn component(&self, position: usize, component: usize) -> &str {
        self.field(position)
            .map(|f| f.component(component))
            .unwrap_or("")
    }
}

impl Field {
    fn literal(value: &str) -> Self {
        Self {
            text: value.to_string(),
            repetitions: vec![Repetition {
                components: vec![Component {
                    subcomponents: vec![value.to_string()],
                }],
            }],
        }
    }

    fn parse(raw: &str, enc: &EncodingCharacters) -> Self {
        let repetitions = raw
            .split(enc.repetition)
            .map(|rep| Repetition {
                components: rep
                    .split(enc.component)
                    .map(|comp| Component {
                        subcomponents: comp
                            .split(enc.subcomponent)
                            .map(|sub| enc.unescape(sub).into_owned())
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            text: enc.unescape(raw).into_owned(),
            repetitions,
        }
    }

    /// The full field with escape sequences decoded and delimiters left in place.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn repetitions(&self) -> &[Repetition] {
        &self.repetitions
    }

    /// Component of the first repetition (1-based), or `""`.
    pub fn component(&self, position: usize) -> &str {
        self.repetitions
            .first()
            .map(|r| r.component(position))
            .unwrap_or("")
    }
}

impl Repetition {
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// First subcomponent of a component (1-based), or `""`.
    pub fn component(&self, position: usize) -> &str {
        position
            .checked_sub(1)
            .and_then(|i| self.components.get(i))
            .map(Component::value)
            .unwrap_or("")
    }
}

impl Component {
    pub fn subcomponents(&self) -> &[String] {
        &self.subcomponents
    }

    /// The first subcomponent, which is the whole component when no subcomponent separator
    /// is present.
    pub fn value(&self) -> &str {
        self.subcomponents.first().map(String::as_str).unwrap_or("")
    }

    /// Subcomponent by position (1-based), or `""`.
    pub fn subcomponent(&self, position: usize) -> &str {
        position
            .checked_sub(1)
            .and_then(|i| self.subcomponents.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Split raw message text into segments.
///
/// Delimiters come from the MSH header. When `explicit` is supplied it must agree with what the
/// header declares.
///
/// # Errors
///
/// - [`Hl7Error::MalformedMessage`] if the text is empty, does not start with an MSH segment,
///   the header is malformed, or a segment identifier is not three uppercase letters/digits.
/// - [`Hl7Error::EncodingMismatch`] if the declared delimiters are unusable, conflict with
///   `explicit`, or a segment does not use the declared field separator.
pub fn tokenize(raw: &str, explicit: Option<EncodingCharacters>) -> Hl7Result<TokenizedMessage> {
    let mut lines = segment_lines(raw).peekable();

    let Some(&(header_offset, header_line)) = lines.peek() else {
        return Err(Hl7Error::MalformedMessage {
            segment_index: 0,
            reason: "message is empty".into(),
        });
    };

    if !header_line.starts_with("MSH") {
        return Err(Hl7Error::MalformedMessage {
            segment_index: 0,
            reason: format!(
                "message must begin with an MSH header segment, found `{}`",
                header_line.chars().take(3).collect::<String>()
            ),
        });
    }

    let declared = EncodingCharacters::from_header_line(header_line).map_err(|e| match e {
        Hl7Error::EncodingMismatch { offset, reason } => Hl7Error::EncodingMismatch {
            offset: header_offset + offset,
            reason,
        },
        other => other,
    })?;

    if let Some(expected) = explicit {
        expected.validate(header_offset)?;
        if expected != declared {
            return Err(Hl7Error::EncodingMismatch {
                offset: header_offset + 3,
                reason: format!(
                    "header declares `{}{}` but `{}{}` was required",
                    declared.field,
                    declared.msh2(),
                    expected.field,
                    expected.msh2()
                ),
            });
        }
    }

    let segments = lines
        .enumerate()
        .map(|(index, (offset, line))| split_segment(line, index, offset, &declared))
        .collect::<Hl7Result<Vec<_>>>()?;

    Ok(TokenizedMessage {
        encoding: declared,
        segments,
    })
}

/// Non-blank lines of the message with their byte offsets into `raw`.
///
/// A leading byte order mark is skipped.
fn segment_lines(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    let body = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut offset = raw.len() - body.len();
    body.split(|c: char| c == '\r' || c == '\n')
        .map(move |line| {
            let start = offset;
            offset += line.len() + 1;
            let trimmed = line.trim_start();
            (start + line.len() - trimmed.len(), trimmed)
        })
        .filter(|(_, line)| !line.trim().is_empty())
}

fn split_segment(
    line: &str,
    index: usize,
    offset: usize,
    enc: &EncodingCharacters,
) -> Hl7Result<Segment> {
    let id: String = line.chars().take(3).collect();
    let valid_id = id.len() == 3
        && id
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if !valid_id {
        return Err(Hl7Error::MalformedMessage {
            segment_index: index,
            reason: format!("invalid segment identifier `{id}`"),
        });
    }

    let rest = &line[3..];
    let mut rest_chars = rest.chars();
    match rest_chars.next() {
        None => {
            return Ok(Segment {
                id,
                index,
                offset,
                fields: Vec::new(),
            })
        }
        Some(c) if c != enc.field => {
            return Err(Hl7Error::EncodingMismatch {
                offset: offset + 3,
                reason: format!(
                    "segment {id} uses {c:?} after its identifier but the header declares {:?} as field separator",
                    enc.field
                ),
            });
        }
        Some(_) => {}
    }

    let body = rest_chars.as_str();
    let fields = if id == "MSH" {
        let mut parts = body.split(enc.field);
        let msh2 = parts.next().unwrap_or("");
        let mut fields = vec![Field::literal(&enc.field.to_string()), Field::literal(msh2)];
        fields.extend(parts.map(|p| Field::parse(p, enc)));
        fields
    } else {
        body.split(enc.field).map(|p| Field::parse(p, enc)).collect()
    };

    Ok(Segment {
        id,
        index,
        offset,
        fields,
    })
}
