//! Stage one of the URL payload codec: text to a byte-oriented multi-byte form.
//!
//! The form works on UTF-16 code units and uses at most three bytes per unit (one byte below
//! `0x80`, two below `0x800`, three otherwise). Characters outside the Basic Multilingual Plane
//! are therefore written as two three-byte surrogate sequences, which is what the collection API
//! has always received from browser clients.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeUtf8Error {
    position: usize,
}

impl DecodeUtf8Error {
    /// Byte offset at which decoding stopped.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for DecodeUtf8Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed multi-byte sequence at byte {}", self.position)
    }
}

impl std::error::Error for DecodeUtf8Error {}

pub fn encode(input: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for unit in input.encode_utf16() {
        let c = u32::from(unit);
        if c < 0x80 {
            out.push(c as u8);
        } else if c < 0x800 {
            out.push(((c >> 6) | 0xC0) as u8);
            out.push(((c & 0x3F) | 0x80) as u8);
        } else {
            out.push(((c >> 12) | 0xE0) as u8);
            out.push((((c >> 6) & 0x3F) | 0x80) as u8);
            out.push(((c & 0x3F) | 0x80) as u8);
        }
    }
    out
}

pub fn decode(bytes: &[u8]) -> Result<String, DecodeUtf8Error> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let lead = bytes[i];
        let (unit, width) = match lead {
            0x00..=0x7F => (u16::from(lead), 1),
            0xC0..=0xDF => {
                let c2 = continuation(bytes, i + 1)?;
                ((u16::from(lead & 0x1F) << 6) | c2, 2)
            }
            0xE0..=0xEF => {
                let c2 = continuation(bytes, i + 1)?;
                let c3 = continuation(bytes, i + 2)?;
                ((u16::from(lead & 0x0F) << 12) | (c2 << 6) | c3, 3)
            }
            _ => return Err(DecodeUtf8Error { position: i }),
        };
        units.push(unit);
        i += width;
    }
    String::from_utf16(&units).map_err(|_| DecodeUtf8Error { position: bytes.len() })
}

fn continuation(bytes: &[u8], index: usize) -> Result<u16, DecodeUtf8Error> {
    match bytes.get(index) {
        Some(byte) if byte & 0xC0 == 0x80 => Ok(u16::from(byte & 0x3F)),
        _ => Err(DecodeUtf8Error { position: index }),
    }
}
