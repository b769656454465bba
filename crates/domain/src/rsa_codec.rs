//! RFC 3110 RSA public key decode/encode.
//!
//! DNSSEC stores an RSA public key as `exponent_length_header || exponent ||
//! modulus`; the header is one byte if the exponent fits in 255 bytes, else
//! a zero byte followed by a two-byte big-endian length.

use crate::errors::CodecError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub bits: u16,
    pub exponent: Vec<u8>,
    pub modulus: Vec<u8>,
}

/// Decode a raw (already base64-decoded) RFC 3110 RSA key blob.
pub fn decode_rsa_public_key(key_data: &[u8]) -> Result<RsaPublicKey, CodecError> {
    if key_data.is_empty() {
        return Err(CodecError::RsaEncoding("empty RSA public key".into()));
    }

    let first_byte = key_data[0];
    let (exp_len, exp_start) = if first_byte == 0 {
        if key_data.len() < 3 {
            return Err(CodecError::RsaEncoding(
                "RSA key too short for long-form exponent length".into(),
            ));
        }
        let exp_len = u16::from_be_bytes([key_data[1], key_data[2]]) as usize;
        (exp_len, 3)
    } else {
        (first_byte as usize, 1)
    };

    let exp_end = exp_start + exp_len;
    if exp_end > key_data.len() {
        return Err(CodecError::RsaEncoding(
            "RSA exponent extends beyond key data".into(),
        ));
    }

    let exponent = key_data[exp_start..exp_end].to_vec();
    let modulus = key_data[exp_end..].to_vec();
    if modulus.is_empty() {
        return Err(CodecError::RsaEncoding("RSA modulus is empty".into()));
    }

    Ok(RsaPublicKey {
        bits: (modulus.len() * 8) as u16,
        exponent,
        modulus,
    })
}

/// Encode an RSA public key into RFC 3110 wire form (pre-base64).
///
/// Leading zero bytes are trimmed from the exponent before measuring its
/// length, matching the big-endian minimal encoding `encode_rsa_public_key`
/// produces in the reference tool.
pub fn encode_rsa_public_key(exponent: &[u8], modulus: &[u8]) -> Vec<u8> {
    let exponent = trim_leading_zeros(exponent);
    let exp_len = exponent.len();

    let mut out = Vec::with_capacity(3 + exp_len + modulus.len());
    if exp_len > 255 {
        out.push(0);
        out.extend_from_slice(&(exp_len as u16).to_be_bytes());
    } else {
        out.push(exp_len as u8);
    }
    out.extend_from_slice(exponent);
    out.extend_from_slice(modulus);
    out
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len().saturating_sub(1));
    &bytes[first_nonzero..]
}
