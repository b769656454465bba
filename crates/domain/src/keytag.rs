//! RFC 4034 Appendix B key-tag computation.

use crate::model::Key;

/// Compute the key tag for a DNSKEY record's wire-format RDATA.
///
/// `flags(16) || protocol(8) || algorithm(8) || public_key` is summed as a
/// sequence of big-endian 16-bit words, with the final odd byte (if any)
/// treated as the high byte of a trailing word; the accumulator's overflow
/// beyond 16 bits is folded back in once.
pub fn calculate_key_tag(key: &Key) -> u16 {
    let mut wire = Vec::with_capacity(4 + key.public_key.len());
    wire.extend_from_slice(&key.flags.to_be_bytes());
    wire.push(key.protocol);
    wire.push(key.algorithm.to_u8());
    wire.extend_from_slice(&key.public_key);

    let mut accumulator: u32 = 0;
    for chunk in wire.chunks(2) {
        if chunk.len() == 2 {
            accumulator += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
        } else {
            accumulator += u32::from(chunk[0]) << 8;
        }
    }
    accumulator += accumulator >> 16;
    (accumulator & 0xFFFF) as u16
}
