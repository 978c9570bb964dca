//! Incremental CBOR decoder.
//!
//! The decoder is a pull-based machine: at every point it declares how many
//! bytes it needs next (`needed`) and is resumed with exactly that many
//! (`resume`). This allows feeding it from a live socket without buffering
//! the entire input, while `decode` drives it over a complete buffer in one
//! call. Recursive structures are handled with an explicit frame stack
//! instead of recursion, so nesting depth is bounded only by memory.

use crate::cbor::error::{DecodeError, Result};
use crate::cbor::value::{ByteSpan, Value};

/// Break marker terminating indefinite-length items.
const BREAK: u8 = 0xff;

/// The decoder's next read obligation.
#[derive(Debug)]
enum Pending {
    /// Head byte of a new value.
    Header,
    /// Big-endian length bytes following a head byte.
    Length { major: u8, count: u8, start: usize },
    /// Payload of a definite-length byte/text string or string chunk.
    Payload { major: u8, len: usize, start: usize },
    /// Head byte of the next chunk inside an indefinite string, or break.
    ChunkHeader,
    /// Big-endian length bytes of a chunk header.
    ChunkLength { count: u8 },
    /// IEEE float payload bytes (2, 4, or 8).
    Float { width: u8 },
    /// Head byte of the next element of an indefinite container, or break.
    ContainerNext,
    /// Top-level value fully produced.
    Done,
}

/// An in-progress composite value.
#[derive(Debug)]
enum Frame {
    Array {
        items: Vec<Value>,
        /// Declared element count, `None` for indefinite length.
        remaining: Option<u64>,
        start: usize,
    },
    Map {
        entries: Vec<(Value, Value)>,
        /// A decoded key awaiting its value.
        pending_key: Option<Value>,
        /// Declared entry count, `None` for indefinite length.
        remaining: Option<u64>,
        start: usize,
    },
    Tag {
        tag: u64,
        start: usize,
    },
    /// Accumulated chunks of an indefinite-length string.
    Chunks {
        major: u8,
        data: Vec<u8>,
        start: usize,
    },
}

/// Incremental CBOR decoder for a single top-level value.
///
/// Create one decoder per value; it is consumed chunk by chunk and discarded
/// once the value is produced.
///
/// # Examples
///
/// ```
/// use hydra_client::cbor::Decoder;
///
/// let input = [0x83, 0x01, 0x02, 0x03]; // [1, 2, 3]
/// let mut decoder = Decoder::new();
/// let mut pos = 0;
/// let value = loop {
///     let n = decoder.needed();
///     let chunk = &input[pos..pos + n];
///     pos += n;
///     if let Some(value) = decoder.resume(chunk).unwrap() {
///         break value;
///     }
/// };
/// assert_eq!(value.as_array().unwrap().len(), 3);
/// ```
#[derive(Debug)]
pub struct Decoder {
    pending: Pending,
    stack: Vec<Frame>,
    offset: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a decoder positioned at the start of a value.
    pub fn new() -> Self {
        Decoder {
            pending: Pending::Header,
            stack: Vec::new(),
            offset: 0,
        }
    }

    /// Number of bytes required by the next `resume` call.
    ///
    /// Returns 0 once the top-level value has been produced.
    pub fn needed(&self) -> usize {
        match &self.pending {
            Pending::Header | Pending::ChunkHeader | Pending::ContainerNext => 1,
            Pending::Length { count, .. } | Pending::ChunkLength { count } => *count as usize,
            Pending::Payload { len, .. } => *len,
            Pending::Float { width } => *width as usize,
            Pending::Done => 0,
        }
    }

    /// True while no byte of the value has been consumed yet.
    pub fn is_fresh(&self) -> bool {
        self.offset == 0
    }

    /// Signal end of input. Fails if a value is partially decoded.
    pub fn finish(&self) -> Result<()> {
        match self.pending {
            Pending::Done => Ok(()),
            _ if self.is_fresh() => Ok(()),
            _ => Err(DecodeError::UnexpectedEndOfInput),
        }
    }

    /// Feed exactly `needed()` bytes and advance the machine.
    ///
    /// Returns `Some(value)` once the top-level value is complete.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len()` differs from `needed()`.
    pub fn resume(&mut self, bytes: &[u8]) -> Result<Option<Value>> {
        assert_eq!(
            bytes.len(),
            self.needed(),
            "resume() must be called with exactly needed() bytes"
        );

        self.offset += bytes.len();

        match std::mem::replace(&mut self.pending, Pending::Header) {
            Pending::Header => self.on_header(bytes[0]),
            Pending::ContainerNext => {
                if bytes[0] == BREAK {
                    self.on_container_break()
                } else {
                    self.on_header(bytes[0])
                }
            }
            Pending::Length {
                major,
                count: _,
                start,
            } => {
                let length = read_be_uint(bytes);
                self.dispatch(major, length, start)
            }
            Pending::Payload { major, len: _, start } => self.on_payload(major, bytes, start),
            Pending::ChunkHeader => self.on_chunk_header(bytes[0]),
            Pending::ChunkLength { count: _ } => {
                let len = read_be_uint(bytes);
                self.on_chunk_length(len)
            }
            Pending::Float { width } => {
                // Lengths are guaranteed by the needed()/resume() contract.
                let x = match width {
                    2 => decode_half(u16::from_be_bytes([bytes[0], bytes[1]])),
                    4 => f64::from(f32::from_be_bytes(bytes.try_into().unwrap())),
                    _ => f64::from_be_bytes(bytes.try_into().unwrap()),
                };
                self.complete(Value::Float(x))
            }
            Pending::Done => unreachable!("resume() called after completion"),
        }
    }

    /// Process the head byte of a value.
    fn on_header(&mut self, byte: u8) -> Result<Option<Value>> {
        let major = byte >> 5;
        let info = byte & 0x1f;
        let start = self.offset - 1;

        if major == 7 {
            return match info {
                0..=19 => self.complete(Value::Simple(info)),
                20 => self.complete(Value::Bool(false)),
                21 => self.complete(Value::Bool(true)),
                22 => self.complete(Value::Null),
                23 => self.complete(Value::Undefined),
                // One-byte simple value code follows; routed through the
                // length reader like any other head.
                24 => {
                    self.pending = Pending::Length {
                        major,
                        count: 1,
                        start,
                    };
                    Ok(None)
                }
                25 | 26 | 27 => {
                    self.pending = Pending::Float {
                        width: 1 << (info - 24),
                    };
                    Ok(None)
                }
                31 => Err(DecodeError::InvalidIndefiniteLength { major }),
                _ => Err(DecodeError::InvalidLengthEncoding { info }),
            };
        }

        match info {
            0..=23 => self.dispatch(major, info as u64, start),
            24 | 25 | 26 | 27 => {
                self.pending = Pending::Length {
                    major,
                    count: 1 << (info - 24),
                    start,
                };
                Ok(None)
            }
            31 => match major {
                2 | 3 => {
                    self.stack.push(Frame::Chunks {
                        major,
                        data: Vec::new(),
                        start,
                    });
                    self.pending = Pending::ChunkHeader;
                    Ok(None)
                }
                4 => {
                    self.stack.push(Frame::Array {
                        items: Vec::new(),
                        remaining: None,
                        start,
                    });
                    self.pending = Pending::ContainerNext;
                    Ok(None)
                }
                5 => {
                    self.stack.push(Frame::Map {
                        entries: Vec::new(),
                        pending_key: None,
                        remaining: None,
                        start,
                    });
                    self.pending = Pending::ContainerNext;
                    Ok(None)
                }
                _ => Err(DecodeError::InvalidIndefiniteLength { major }),
            },
            _ => Err(DecodeError::InvalidLengthEncoding { info }),
        }
    }

    /// Act on a fully resolved head (major type plus length/argument).
    fn dispatch(&mut self, major: u8, length: u64, start: usize) -> Result<Option<Value>> {
        match major {
            0 => self.complete(Value::Uint(length)),
            1 => self.complete(Value::Int(-1 - length as i128)),
            2 | 3 => {
                if length == 0 {
                    let span = ByteSpan::new(start, self.offset);
                    let value = if major == 2 {
                        Value::Bytes {
                            bytes: Vec::new(),
                            span,
                        }
                    } else {
                        Value::Text {
                            text: String::new(),
                            span,
                        }
                    };
                    self.complete(value)
                } else {
                    self.pending = Pending::Payload {
                        major,
                        len: length as usize,
                        start,
                    };
                    Ok(None)
                }
            }
            4 => {
                if length == 0 {
                    self.complete(Value::Array {
                        items: Vec::new(),
                        span: ByteSpan::new(start, self.offset),
                    })
                } else {
                    self.stack.push(Frame::Array {
                        items: Vec::new(),
                        remaining: Some(length),
                        start,
                    });
                    self.pending = Pending::Header;
                    Ok(None)
                }
            }
            5 => {
                if length == 0 {
                    self.complete(Value::Map {
                        entries: Vec::new(),
                        span: ByteSpan::new(start, self.offset),
                    })
                } else {
                    self.stack.push(Frame::Map {
                        entries: Vec::new(),
                        pending_key: None,
                        remaining: Some(length),
                        start,
                    });
                    self.pending = Pending::Header;
                    Ok(None)
                }
            }
            6 => {
                self.stack.push(Frame::Tag { tag: length, start });
                self.pending = Pending::Header;
                Ok(None)
            }
            // Major 7 with info 24: the byte read is a simple value code.
            _ => self.complete(Value::Simple(length as u8)),
        }
    }

    /// Receive a string payload: either a whole definite string or one chunk
    /// of an indefinite one.
    fn on_payload(&mut self, major: u8, bytes: &[u8], start: usize) -> Result<Option<Value>> {
        if let Some(Frame::Chunks { data, .. }) = self.stack.last_mut() {
            data.extend_from_slice(bytes);
            self.pending = Pending::ChunkHeader;
            return Ok(None);
        }

        let span = ByteSpan::new(start, self.offset);
        let value = if major == 2 {
            Value::Bytes {
                bytes: bytes.to_vec(),
                span,
            }
        } else {
            Value::Text {
                text: String::from_utf8(bytes.to_vec())?,
                span,
            }
        };
        self.complete(value)
    }

    /// Process the head byte of an indefinite-string chunk.
    fn on_chunk_header(&mut self, byte: u8) -> Result<Option<Value>> {
        let Some(Frame::Chunks { major, .. }) = self.stack.last() else {
            unreachable!("chunk header outside indefinite string");
        };
        let major = *major;

        if byte == BREAK {
            let Some(Frame::Chunks { major, data, start }) = self.stack.pop() else {
                unreachable!();
            };
            let span = ByteSpan::new(start, self.offset);
            let value = if major == 2 {
                Value::Bytes { bytes: data, span }
            } else {
                Value::Text {
                    text: String::from_utf8(data)?,
                    span,
                }
            };
            return self.complete(value);
        }

        let chunk_major = byte >> 5;
        let info = byte & 0x1f;
        if chunk_major != major || info == 31 {
            return Err(DecodeError::InvalidChunk { major });
        }
        match info {
            0..=23 => self.on_chunk_length(info as u64),
            24 | 25 | 26 | 27 => {
                self.pending = Pending::ChunkLength {
                    count: 1 << (info - 24),
                };
                Ok(None)
            }
            _ => Err(DecodeError::InvalidLengthEncoding { info }),
        }
    }

    /// Resolve the declared length of an indefinite-string chunk.
    fn on_chunk_length(&mut self, len: u64) -> Result<Option<Value>> {
        if len == 0 {
            self.pending = Pending::ChunkHeader;
        } else {
            let Some(Frame::Chunks { major, start, .. }) = self.stack.last() else {
                unreachable!();
            };
            self.pending = Pending::Payload {
                major: *major,
                len: len as usize,
                start: *start,
            };
        }
        Ok(None)
    }

    /// A break byte ended the indefinite container on top of the stack.
    fn on_container_break(&mut self) -> Result<Option<Value>> {
        match self.stack.pop() {
            Some(Frame::Array { items, start, .. }) => self.complete(Value::Array {
                items,
                span: ByteSpan::new(start, self.offset),
            }),
            Some(Frame::Map { entries, start, .. }) => self.complete(Value::Map {
                entries,
                span: ByteSpan::new(start, self.offset),
            }),
            _ => unreachable!("container break without container frame"),
        }
    }

    /// Deliver a completed value to its parent frame, unwinding tags and
    /// finished containers, or yield it as the top-level result.
    fn complete(&mut self, mut value: Value) -> Result<Option<Value>> {
        loop {
            match self.stack.last_mut() {
                None => {
                    self.pending = Pending::Done;
                    return Ok(Some(value));
                }
                Some(Frame::Tag { .. }) => {
                    let Some(Frame::Tag { tag, start }) = self.stack.pop() else {
                        unreachable!();
                    };
                    value = Value::Tag {
                        tag,
                        content: Box::new(value),
                        span: ByteSpan::new(start, self.offset),
                    };
                }
                Some(Frame::Array {
                    items, remaining, ..
                }) => {
                    items.push(value);
                    match remaining {
                        Some(n) if items.len() as u64 == *n => {
                            let Some(Frame::Array { items, start, .. }) = self.stack.pop() else {
                                unreachable!();
                            };
                            value = Value::Array {
                                items,
                                span: ByteSpan::new(start, self.offset),
                            };
                        }
                        Some(_) => {
                            self.pending = Pending::Header;
                            return Ok(None);
                        }
                        None => {
                            self.pending = Pending::ContainerNext;
                            return Ok(None);
                        }
                    }
                }
                Some(Frame::Map {
                    entries,
                    pending_key,
                    remaining,
                    ..
                }) => {
                    match pending_key.take() {
                        None => {
                            // Key decoded; its value follows unconditionally.
                            *pending_key = Some(value);
                            self.pending = Pending::Header;
                            return Ok(None);
                        }
                        Some(key) => {
                            entries.push((key, value));
                            match remaining {
                                Some(n) if entries.len() as u64 == *n => {
                                    let Some(Frame::Map { entries, start, .. }) = self.stack.pop()
                                    else {
                                        unreachable!();
                                    };
                                    value = Value::Map {
                                        entries,
                                        span: ByteSpan::new(start, self.offset),
                                    };
                                }
                                Some(_) => {
                                    self.pending = Pending::Header;
                                    return Ok(None);
                                }
                                None => {
                                    self.pending = Pending::ContainerNext;
                                    return Ok(None);
                                }
                            }
                        }
                    }
                }
                Some(Frame::Chunks { .. }) => {
                    unreachable!("completed value inside indefinite string")
                }
            }
        }
    }
}

/// Decode exactly one CBOR value from a complete buffer.
///
/// Fails with [`DecodeError::TruncatedInput`] if the buffer holds fewer bytes
/// than the encoding declares, and with [`DecodeError::TrailingData`] if
/// bytes remain after the value.
pub fn decode(buffer: &[u8]) -> Result<Value> {
    let mut decoder = Decoder::new();
    let mut pos = 0;

    loop {
        let needed = decoder.needed();
        let available = buffer.len() - pos;
        if needed > available {
            return Err(DecodeError::TruncatedInput { needed, available });
        }

        let chunk = &buffer[pos..pos + needed];
        pos += needed;

        if let Some(value) = decoder.resume(chunk)? {
            if pos < buffer.len() {
                return Err(DecodeError::TrailingData {
                    remaining: buffer.len() - pos,
                });
            }
            return Ok(value);
        }
    }
}

/// Interpret big-endian bytes as an unsigned integer (1, 2, 4, or 8 bytes).
fn read_be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Unpack an IEEE 754 half-precision float: 1 sign bit, 5 exponent bits
/// (bias 15), 10 mantissa bits, with subnormal and infinity/NaN handling.
fn decode_half(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = (bits >> 10) & 0x1f;
    let fraction = f64::from(bits & 0x03ff);

    match exponent {
        // Subnormal (or signed zero): fraction scaled by 2^-24.
        0 => sign * fraction * (-24f64).exp2(),
        0x1f => {
            if fraction == 0.0 {
                sign * f64::INFINITY
            } else {
                f64::NAN
            }
        }
        _ => sign * (1.0 + fraction / 1024.0) * f64::from(i32::from(exponent) - 15).exp2(),
    }
}
