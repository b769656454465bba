//! Shared fixtures for in-crate unit tests (teacher's `tests/helpers`
//! convention, inlined here since these fixtures are only used by
//! `#[cfg(test)] mod tests` blocks within this crate).
#![cfg(test)]

use crate::ports::signature_verifier::SignatureVerifier;
use chrono::{Duration, TimeZone, Utc};
use ksrsigner_domain::model::{
    AlgorithmDnssec, AlgorithmPolicy, Bundle, Key, Request, Signature, SignaturePolicy,
};

pub struct AlwaysValid;

impl SignatureVerifier for AlwaysValid {
    fn verify(&self, _bundle: &Bundle, _key: &Key, _signature: &Signature) -> Result<bool, String> {
        Ok(true)
    }
}

pub fn sample_key(identifier: &str, tag: u16) -> Key {
    // A minimal 3-byte RSA key (exp_len=1, exponent=1, modulus=1 byte) so
    // decode_rsa_public_key succeeds; the key tag is computed to match.
    let public_key = vec![1, 1, 1];
    let mut key = Key {
        key_identifier: identifier.to_string(),
        key_tag: 0,
        algorithm: AlgorithmDnssec::RsaSha256,
        flags: ksrsigner_domain::flags::ZONE,
        protocol: 3,
        ttl: 3600,
        public_key,
    };
    key.key_tag = ksrsigner_domain::calculate_key_tag(&key);
    let _ = tag; // caller-supplied tag is ignored; kept for readability at call sites
    key
}

pub fn sample_request() -> Request {
    let inception = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let expiration = inception + Duration::days(20);
    let key = sample_key("zsk-1", 0);

    let signature = Signature {
        key_identifier: key.key_identifier.clone(),
        key_tag: key.key_tag,
        algorithm: key.algorithm,
        labels: 0,
        original_ttl: key.ttl,
        signature_inception: inception,
        signature_expiration: inception + Duration::days(15),
        signer_name: ".".to_string(),
        signature_data: vec![0u8; 256],
    };

    let bundle = Bundle {
        id: "bundle-1".to_string(),
        inception,
        expiration,
        keys: vec![key],
        signatures: vec![signature],
    };

    Request {
        id: "ksr-1".to_string(),
        serial: 1,
        domain: ".".to_string(),
        timestamp: inception,
        zsk_policy: SignaturePolicy {
            publish_safety: Duration::days(5),
            retire_safety: Duration::days(5),
            max_signature_validity: Duration::days(21),
            min_signature_validity: Duration::days(14),
            max_validity_overlap: Duration::days(11),
            min_validity_overlap: Duration::days(9),
            algorithms: vec![AlgorithmPolicy::Rsa {
                algorithm: AlgorithmDnssec::RsaSha256,
                bits: 8,
                exponent: 1,
            }],
        },
        bundles: vec![bundle],
    }
}
