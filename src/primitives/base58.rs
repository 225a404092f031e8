//! Base58 and Base58Check encoding.
//!
//! Uses the Bitcoin alphabet. Leading zero bytes map one-to-one onto leading
//! `'1'` characters, so the encoding is lossless for arbitrary byte strings.

use crate::primitives::hash;
use crate::utils::crypto::ConstantTime;
use crate::{HdError, Result};
use num_bigint::BigUint;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of the Base58Check checksum suffix.
pub const CHECKSUM_LEN: usize = 4;

fn digit_value(ch: char) -> Option<u8> {
    if !ch.is_ascii() {
        return None;
    }
    ALPHABET.iter().position(|&c| c == ch as u8).map(|p| p as u8)
}

/// Encode bytes as base58 text.
pub fn encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();
    let mut encoded = String::with_capacity(data.len() * 138 / 100 + 1);

    for _ in 0..zeros {
        encoded.push('1');
    }

    if zeros < data.len() {
        let num = BigUint::from_bytes_be(&data[zeros..]);
        for digit in num.to_radix_be(58) {
            encoded.push(ALPHABET[digit as usize] as char);
        }
    }

    encoded
}

/// Decode base58 text into bytes.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    let mut digits = Vec::with_capacity(s.len());
    for ch in s.chars() {
        digits.push(digit_value(ch).ok_or(HdError::InvalidBase58Character(ch))?);
    }

    let zeros = digits.iter().take_while(|&&d| d == 0).count();
    let mut bytes = vec![0u8; zeros];

    if zeros < digits.len() {
        let num = digits[zeros..]
            .iter()
            .fold(BigUint::from(0u32), |acc, &d| acc * 58u32 + BigUint::from(d));
        bytes.extend_from_slice(&num.to_bytes_be());
    }

    Ok(bytes)
}

/// Append the 4-byte SHA256d checksum and encode.
pub fn encode_check(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&hash::checksum(payload));
    encode(&data)
}

/// Decode and verify the trailing checksum, returning the payload.
pub fn decode_check(s: &str) -> Result<Vec<u8>> {
    let mut data = decode(s)?;
    if data.len() < CHECKSUM_LEN {
        return Err(HdError::InvalidLength(format!(
            "base58check data is {} bytes, shorter than its checksum",
            data.len()
        )));
    }

    let payload_len = data.len() - CHECKSUM_LEN;
    let expected = hash::checksum(&data[..payload_len]);
    if !ConstantTime::eq(&data[payload_len..], &expected) {
        return Err(HdError::ChecksumMismatch);
    }

    data.truncate(payload_len);
    Ok(data)
}
