//! Primitive decoders for game memory
//!
//! None of these fail: unknown text bytes become `[XX]` placeholders and
//! address arithmetic wraps inside the 16-bit space.

use serde::Serialize;

use goldrl_core::MemorySource;

use crate::address::{Encoding, FieldDescriptor};

/// Text terminator byte
pub const STRING_TERMINATOR: u8 = 0x50;

/// Big-endian 16-bit word at `address`
pub fn read_word_be<M: MemorySource + ?Sized>(mem: &M, address: u16) -> u16 {
    u16::from_be_bytes([mem.read_byte(address), mem.read_byte(address.wrapping_add(1))])
}

/// Little-endian 16-bit word at `address`
pub fn read_word_le<M: MemorySource + ?Sized>(mem: &M, address: u16) -> u16 {
    u16::from_le_bytes([mem.read_byte(address), mem.read_byte(address.wrapping_add(1))])
}

/// Big-endian 24-bit integer (experience points)
pub fn read_u24_be<M: MemorySource + ?Sized>(mem: &M, address: u16) -> u32 {
    (0..3u16).fold(0u32, |acc, i| (acc << 8) | u32::from(mem.read_byte(address.wrapping_add(i))))
}

/// `len` consecutive bytes starting at `address`
pub fn read_bytes<M: MemorySource + ?Sized>(mem: &M, address: u16, len: u16) -> Vec<u8> {
    (0..len).map(|i| mem.read_byte(address.wrapping_add(i))).collect()
}

/// Decode packed BCD, most significant byte first.
///
/// Each byte contributes two digits: `value * 100 + hi * 10 + lo`.
/// Nibbles above 9 are not rejected.
#[must_use]
pub fn bcd_value(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| {
        let digits = u32::from(b >> 4) * 10 + u32::from(b & 0x0F);
        acc.saturating_mul(100).saturating_add(digits)
    })
}

/// BCD number of `width` bytes at `address`
pub fn read_bcd<M: MemorySource + ?Sized>(mem: &M, address: u16, width: u16) -> u32 {
    bcd_value(&read_bytes(mem, address, width))
}

/// Map one game text byte to a character, if it is a letter or a space
#[must_use]
pub fn decode_char(code: u8) -> Option<char> {
    match code {
        0x80..=0x99 => Some(char::from(b'A' + (code - 0x80))),
        0x9A..=0xB3 => Some(char::from(b'a' + (code - 0x9A))),
        0x7F => Some(' '),
        _ => None,
    }
}

/// Decode game text up to the terminator
#[must_use]
pub fn decode_text(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &code in bytes {
        if code == STRING_TERMINATOR {
            break;
        }
        match decode_char(code) {
            Some(c) => out.push(c),
            None => out.push_str(&format!("[{code:02X}]")),
        }
    }
    out
}

/// Game text of at most `max_len` bytes at `address`
pub fn read_string<M: MemorySource + ?Sized>(mem: &M, address: u16, max_len: u16) -> String {
    let mut bytes = Vec::with_capacity(usize::from(max_len));
    for i in 0..max_len {
        let code = mem.read_byte(address.wrapping_add(i));
        if code == STRING_TERMINATOR {
            break;
        }
        bytes.push(code);
    }
    decode_text(&bytes)
}

/// Split a byte into (high, low) nibbles
#[must_use]
pub fn split_nibbles(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

/// Number of set bits over `width` bytes starting at `address`
pub fn count_set_bits<M: MemorySource + ?Sized>(mem: &M, address: u16, width: u16) -> u32 {
    (0..width).map(|i| mem.read_byte(address.wrapping_add(i)).count_ones()).sum()
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Single raw byte
    Byte(u8),
    /// 16-bit word
    Word(u16),
    /// BCD-decoded number
    Number(u32),
    /// Decoded text
    Text(String),
    /// Raw bytes (multi-byte raw fields and packed records)
    Bytes(Vec<u8>),
}

/// Decode any descriptor according to its encoding
pub fn decode_field<M: MemorySource + ?Sized>(mem: &M, field: &FieldDescriptor) -> FieldValue {
    match field.encoding {
        Encoding::RawByte if field.width == 1 => FieldValue::Byte(mem.read_byte(field.address)),
        Encoding::RawByte | Encoding::PackedStruct => {
            FieldValue::Bytes(read_bytes(mem, field.address, field.width))
        }
        Encoding::BigEndianWord => FieldValue::Word(read_word_be(mem, field.address)),
        Encoding::LittleEndianWord => FieldValue::Word(read_word_le(mem, field.address)),
        Encoding::Bcd => FieldValue::Number(read_bcd(mem, field.address, field.width)),
        Encoding::FixedLengthString => FieldValue::Text(read_string(mem, field.address, field.width)),
    }
}
