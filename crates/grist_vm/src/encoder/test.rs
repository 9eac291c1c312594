use super::*;
extern crate std;
use std::vec;

#[test]
fn byte_literals_cover_full_range() -> Result<(), EncodingError> {
    assert_eq!(encode_byte("0")?, 0);
    assert_eq!(encode_byte("255")?, 255);
    assert_eq!(encode_byte("007")?, 7);
    Ok(())
}

#[test]
fn byte_literals_out_of_range_report_text() {
    assert_eq!(
        encode_byte("256"),
        Err(EncodingError::InvalidByteLiteral("256".into()))
    );
    assert_eq!(
        encode_byte("-1"),
        Err(EncodingError::InvalidByteLiteral("-1".into()))
    );
    assert!(encode_byte("+1").is_err());
    assert!(encode_byte("").is_err());
}

#[test]
fn ints_are_little_endian() -> Result<(), EncodingError> {
    assert_eq!(encode_int("5")?, [5, 0, 0, 0]);
    assert_eq!(encode_int("258")?, [2, 1, 0, 0]);
    assert_eq!(encode_int("2147483647")?, [0xff, 0xff, 0xff, 0x7f]);
    Ok(())
}

#[test]
fn negative_ints_are_twos_complement() -> Result<(), EncodingError> {
    assert_eq!(encode_int("-1")?, [255, 255, 255, 255]);
    assert_eq!(encode_int("-2")?, [254, 255, 255, 255]);
    assert_eq!(encode_int("-256")?, [0, 255, 255, 255]);
    assert_eq!(encode_int("-2147483648")?, [0, 0, 0, 0x80]);
    Ok(())
}

#[test]
fn negative_encoding_matches_ones_complement_derivation() {
    for value in [-1i32, -2, -255, -256, -257, -65536, -123_456_789, i32::MIN] {
        let magnitude = value.unsigned_abs() - 1;
        let expected = magnitude.to_le_bytes().map(|b| 255 - b);
        assert_eq!(int_to_bytes(value), expected, "value {value}");
    }
}

#[test]
fn ints_outside_i32_are_rejected() {
    assert_eq!(
        encode_int("2147483648"),
        Err(EncodingError::InvalidIntLiteral("2147483648".into()))
    );
    assert!(encode_int("-2147483649").is_err());
    assert!(encode_int("99999999999999999999").is_err());
    assert!(encode_int("-").is_err());
    assert!(encode_int("+3").is_err());
    assert!(encode_int("1-2").is_err());
}

#[test]
fn decode_int_inverts_encoding() {
    for value in [0, 1, -1, 7, i32::MAX, i32::MIN, 0x0102_0304] {
        assert_eq!(decode_int(int_to_bytes(value)), value);
    }
}

#[test]
fn hex_pairs_become_bytes() -> Result<(), EncodingError> {
    assert!(decode_hex("")?.is_empty());
    assert_eq!(decode_hex("00ff")?, vec![0, 255]);
    assert_eq!(decode_hex("DeadBEEF")?, vec![0xde, 0xad, 0xbe, 0xef]);
    Ok(())
}

#[test]
fn odd_length_hex_is_rejected() {
    assert_eq!(
        decode_hex("abc"),
        Err(EncodingError::OddLengthHex("abc".into()))
    );
}

#[test]
fn non_hex_digits_are_rejected() {
    assert_eq!(
        decode_hex("zz"),
        Err(EncodingError::InvalidHexDigit("zz".into()))
    );
    assert!(decode_hex("+f").is_err());
}

#[test]
fn mnemonics_map_to_opcode_bytes() -> Result<(), EncodingError> {
    assert_eq!(encode_mnemonic("noop")?, 0);
    assert_eq!(encode_mnemonic("SETREG")?, 1);
    assert_eq!(encode_mnemonic("CopyReg")?, 2);
    assert_eq!(encode_mnemonic("xor")?, 3);
    assert_eq!(encode_mnemonic("push")?, 8);
    assert_eq!(
        encode_mnemonic("jump"),
        Err(EncodingError::UnknownMnemonic("jump".into()))
    );
    Ok(())
}
