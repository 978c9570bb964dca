//! Decoded CBOR value tree.

use std::fmt;

/// A half-open byte range `[start, end)` into the original input.
///
/// Spans are recorded for every composite and string node so callers can map
/// any decoded subtree back to the exact bytes that produced it. Indefinite
/// encodings include their terminating break byte in the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    /// Offset of the node's head byte.
    pub start: usize,
    /// Offset one past the node's last byte.
    pub end: usize,
}

impl ByteSpan {
    /// Create a span from start and end offsets.
    pub fn new(start: usize, end: usize) -> Self {
        ByteSpan { start, end }
    }

    /// Number of bytes covered by this span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers zero bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A fully decoded CBOR value.
///
/// Map entries preserve insertion order and keys are not deduplicated at the
/// decode layer; interpreting duplicate keys is the caller's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Major type 0: unsigned integer.
    Uint(u64),
    /// Major type 1: negative integer, always `-1 - n`. `i128` covers the
    /// full encodable range down to `-2^64`.
    Int(i128),
    /// Major type 2: byte string.
    Bytes { bytes: Vec<u8>, span: ByteSpan },
    /// Major type 3: UTF-8 text string.
    Text { text: String, span: ByteSpan },
    /// Major type 4: array.
    Array { items: Vec<Value>, span: ByteSpan },
    /// Major type 5: map as ordered key/value pairs.
    Map {
        entries: Vec<(Value, Value)>,
        span: ByteSpan,
    },
    /// Major type 6: tagged value.
    Tag {
        tag: u64,
        content: Box<Value>,
        span: ByteSpan,
    },
    /// Major type 7: half, single, or double precision float.
    Float(f64),
    /// Major type 7: true / false.
    Bool(bool),
    /// Major type 7: null.
    Null,
    /// Major type 7: undefined.
    Undefined,
    /// Major type 7: a reserved simple value code.
    Simple(u8),
}

impl Value {
    /// The unsigned integer value, if this is one.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(n) => Some(*n),
            _ => None,
        }
    }

    /// The integer value widened to `i128`, if this is an integer.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Uint(n) => Some(*n as i128),
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The byte string contents, if this is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    /// The text string contents, if this is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The array items, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    /// The map entries, if this is a map.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// The tag number and content, if this is a tagged value.
    pub fn as_tag(&self) -> Option<(u64, &Value)> {
        match self {
            Value::Tag { tag, content, .. } => Some((*tag, content)),
            _ => None,
        }
    }

    /// The byte span of this node, for nodes that record one.
    pub fn span(&self) -> Option<ByteSpan> {
        match self {
            Value::Bytes { span, .. }
            | Value::Text { span, .. }
            | Value::Array { span, .. }
            | Value::Map { span, .. }
            | Value::Tag { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Structural equality ignoring byte spans.
    ///
    /// Definite and indefinite encodings of the same logical content decode
    /// to values that are equal under this comparison but not under `==`.
    pub fn eq_ignoring_spans(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bytes { bytes: a, .. }, Value::Bytes { bytes: b, .. }) => a == b,
            (Value::Text { text: a, .. }, Value::Text { text: b, .. }) => a == b,
            (Value::Array { items: a, .. }, Value::Array { items: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignoring_spans(y))
            }
            (Value::Map { entries: a, .. }, Value::Map { entries: b, .. }) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((ka, va), (kb, vb))| {
                        ka.eq_ignoring_spans(kb) && va.eq_ignoring_spans(vb)
                    })
            }
            (
                Value::Tag {
                    tag: a, content: ca, ..
                },
                Value::Tag {
                    tag: b, content: cb, ..
                },
            ) => a == b && ca.eq_ignoring_spans(cb),
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    /// Diagnostic notation, loosely following RFC 8949 §8.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(n) => write!(f, "{}", n),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bytes { bytes, .. } => write!(f, "h'{}'", hex::encode(bytes)),
            Value::Text { text, .. } => write!(f, "{:?}", text),
            Value::Array { items, .. } => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map { entries, .. } => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Tag { tag, content, .. } => write!(f, "{}({})", tag, content),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
            Value::Simple(code) => write!(f, "simple({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_len() {
        let span = ByteSpan::new(3, 10);
        assert_eq!(span.len(), 7);
        assert!(!span.is_empty());
        assert!(ByteSpan::new(5, 5).is_empty());
    }

    #[test]
    fn test_accessors() {
        let v = Value::Uint(42);
        assert_eq!(v.as_uint(), Some(42));
        assert_eq!(v.as_int(), Some(42));
        assert!(v.as_bytes().is_none());
        assert!(v.span().is_none());

        let v = Value::Bytes {
            bytes: vec![1, 2, 3],
            span: ByteSpan::new(0, 4),
        };
        assert_eq!(v.as_bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(v.span(), Some(ByteSpan::new(0, 4)));
    }

    #[test]
    fn test_eq_ignoring_spans() {
        let a = Value::Array {
            items: vec![Value::Uint(1)],
            span: ByteSpan::new(0, 2),
        };
        let b = Value::Array {
            items: vec![Value::Uint(1)],
            span: ByteSpan::new(0, 4),
        };
        assert_ne!(a, b);
        assert!(a.eq_ignoring_spans(&b));
    }

    #[test]
    fn test_display_diagnostic() {
        let v = Value::Array {
            items: vec![
                Value::Uint(1),
                Value::Text {
                    text: "a".into(),
                    span: ByteSpan::new(1, 3),
                },
            ],
            span: ByteSpan::new(0, 3),
        };
        assert_eq!(v.to_string(), "[1, \"a\"]");
    }
}
