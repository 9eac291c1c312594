//! Conversions between token text and the bytes of the program stream.
//!
//! Integers are stored as four bytes of little-endian two's complement. The
//! interpreter decodes operands with [`decode_int`], so both halves of the
//! toolchain go through this module.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use thiserror_no_std::Error;

use crate::opcode::Opcode;

pub const INT_LEN: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("`{0}` is not a byte literal between 0 and 255")]
    InvalidByteLiteral(String),
    #[error("`{0}` is not an integer between -2147483648 and 2147483647")]
    InvalidIntLiteral(String),
    #[error("hex sequence `{0}` has an odd number of digits")]
    OddLengthHex(String),
    #[error("`{0}` contains a character that is not a hex digit")]
    InvalidHexDigit(String),
    #[error("`{0}` is not a known mnemonic")]
    UnknownMnemonic(String),
}

/// Encodes a run of decimal digits as a single byte.
pub fn encode_byte(text: &str) -> Result<u8, EncodingError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EncodingError::InvalidByteLiteral(text.to_string()));
    }
    text.parse::<u8>()
        .map_err(|_| EncodingError::InvalidByteLiteral(text.to_string()))
}

/// Encodes an optionally negative decimal integer as four bytes.
pub fn encode_int(text: &str) -> Result<[u8; INT_LEN], EncodingError> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EncodingError::InvalidIntLiteral(text.to_string()));
    }
    // Parsing straight into i32 also rejects anything outside the signed
    // 32-bit range.
    let value = text
        .parse::<i32>()
        .map_err(|_| EncodingError::InvalidIntLiteral(text.to_string()))?;
    Ok(int_to_bytes(value))
}

/// Little-endian two's complement bytes of `value`.
///
/// Negative values come out as `255 - b` for each byte `b` of the ones'
/// complement magnitude `|value| - 1`, which is the same bit pattern.
pub fn int_to_bytes(value: i32) -> [u8; INT_LEN] {
    value.to_le_bytes()
}

pub fn decode_int(bytes: [u8; INT_LEN]) -> i32 {
    i32::from_le_bytes(bytes)
}

/// Decodes consecutive pairs of hex digits.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, EncodingError> {
    if text.len() & 1 != 0 {
        return Err(EncodingError::OddLengthHex(text.to_string()));
    }
    if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EncodingError::InvalidHexDigit(text.to_string()));
    }
    text.as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            core::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| EncodingError::InvalidHexDigit(text.to_string()))
        })
        .collect()
}

pub fn encode_mnemonic(text: &str) -> Result<u8, EncodingError> {
    Opcode::from_mnemonic(text)
        .map(u8::from)
        .ok_or_else(|| EncodingError::UnknownMnemonic(text.to_string()))
}

#[cfg(test)]
mod test;
