//! RFC 7958 trust anchor export (SPEC_FULL.md §6).
//!
//! Generalized from the teacher's `dns/dnssec/trust_anchor.rs::TrustAnchorStore`
//! (one hardcoded `KeyDigest` for the current root KSK) into "compute and
//! emit a `KeyDigest` for every published KSK in the final signed output".

use chrono::{DateTime, Utc};
use ksrsigner_domain::model::{Bundle, Key};
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize)]
#[serde(rename = "KeyDigest")]
struct KeyDigestXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@validFrom")]
    valid_from: String,
    #[serde(rename = "KeyTag")]
    key_tag: u16,
    #[serde(rename = "Algorithm")]
    algorithm: u8,
    #[serde(rename = "DigestType")]
    digest_type: u8,
    #[serde(rename = "Digest")]
    digest: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename = "TrustAnchor")]
struct TrustAnchorXml {
    #[serde(rename = "Zone")]
    zone: String,
    #[serde(rename = "KeyDigest")]
    digests: Vec<KeyDigestXml>,
}

/// SHA-256 DS digest of a DNSKEY (RFC 4034 §5.1.4), for the published `zone`.
fn ds_sha256_digest(zone: &str, key: &Key) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&name_to_wire(zone));
    data.extend_from_slice(&key.flags.to_be_bytes());
    data.push(key.protocol);
    data.push(key.algorithm.to_u8());
    data.extend_from_slice(&key.public_key);

    let mut hasher = Sha256::new();
    hasher.update(&data);
    hasher.finalize().to_vec()
}

fn to_hex_upper(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02X}").expect("writing to a String never fails");
    }
    out
}

fn name_to_wire(name: &str) -> Vec<u8> {
    let mut wire = Vec::new();
    let name = name.trim_end_matches('.');
    if name.is_empty() {
        wire.push(0);
        return wire;
    }
    for label in name.split('.') {
        wire.push(label.len() as u8);
        wire.extend_from_slice(label.to_lowercase().as_bytes());
    }
    wire.push(0);
    wire
}

/// Render an RFC 7958 `<TrustAnchor>` document over `bundle`'s published
/// SEP-flagged (KSK) keys.
pub fn export_trust_anchor(zone: &str, bundle: &Bundle, valid_from: DateTime<Utc>) -> Result<String, String> {
    let digests = bundle
        .keys
        .iter()
        .filter(|key| key.is_sep())
        .map(|key| {
            let digest = ds_sha256_digest(zone, key);
            KeyDigestXml {
                id: key.key_tag.to_string(),
                valid_from: valid_from.to_rfc3339(),
                key_tag: key.key_tag,
                algorithm: key.algorithm.to_u8(),
                digest_type: 2,
                digest: to_hex_upper(&digest),
            }
        })
        .collect();

    let document = TrustAnchorXml {
        zone: zone.to_string(),
        digests,
    };
    quick_xml::se::to_string(&document).map_err(|e| e.to_string())
}
