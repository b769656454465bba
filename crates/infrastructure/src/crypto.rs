//! Concrete [`SignatureVerifier`] implementation, used to verify
//! proof-of-possession signatures over bundle DNSKEY RRsets.
//!
//! Grounded on the teacher's `dns/dnssec/crypto.rs::SignatureVerifier`
//! (`verify_rsa_sha256`/`verify_ecdsa_p256`/`verify_ed25519`, `build_rrsig_data`,
//! `name_to_wire`), generalized to work over this project's `Bundle`/`Key`/
//! `Signature` model and to reuse [`ksrsigner_domain::rsa_codec`] instead of
//! re-deriving RSA key parsing.

use ksrsigner_application::SignatureVerifier;
use ksrsigner_domain::model::{AlgorithmDnssec, Bundle, Key, Signature, TYPE_COVERED_DNSKEY};
use ring::signature;

/// `ring`-backed [`SignatureVerifier`]. Stateless; safe to share across threads.
pub struct RingSignatureVerifier;

impl SignatureVerifier for RingSignatureVerifier {
    fn verify(&self, bundle: &Bundle, key: &Key, signature: &Signature) -> Result<bool, String> {
        if signature.algorithm != key.algorithm {
            return Ok(false);
        }

        let data = build_rrsig_data(bundle, signature)?;

        match key.algorithm {
            AlgorithmDnssec::RsaSha1
            | AlgorithmDnssec::RsaSha256
            | AlgorithmDnssec::RsaSha512 => verify_rsa(key.algorithm, &key.public_key, &data, &signature.signature_data),
            AlgorithmDnssec::EcdsaP256Sha256 | AlgorithmDnssec::EcdsaP384Sha384 => {
                verify_ecdsa(key.algorithm, &key.public_key, &data, &signature.signature_data)
            }
        }
    }
}

fn verify_rsa(
    algorithm: AlgorithmDnssec,
    public_key: &[u8],
    data: &[u8],
    signature_bytes: &[u8],
) -> Result<bool, String> {
    let decoded = ksrsigner_domain::rsa_codec::decode_rsa_public_key(public_key)
        .map_err(|e| e.to_string())?;

    let public_key = signature::RsaPublicKeyComponents {
        n: &decoded.modulus,
        e: &decoded.exponent,
    };

    let parameters = match algorithm {
        AlgorithmDnssec::RsaSha1 => &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY,
        AlgorithmDnssec::RsaSha256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        AlgorithmDnssec::RsaSha512 => &signature::RSA_PKCS1_2048_8192_SHA512,
        _ => unreachable!("non-RSA algorithm routed to verify_rsa"),
    };

    match public_key.verify(parameters, data, signature_bytes) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

fn verify_ecdsa(
    algorithm: AlgorithmDnssec,
    public_key: &[u8],
    data: &[u8],
    signature_bytes: &[u8],
) -> Result<bool, String> {
    let parameters = match algorithm {
        AlgorithmDnssec::EcdsaP256Sha256 => &signature::ECDSA_P256_SHA256_FIXED,
        AlgorithmDnssec::EcdsaP384Sha384 => &signature::ECDSA_P384_SHA384_FIXED,
        _ => unreachable!("non-ECDSA algorithm routed to verify_ecdsa"),
    };

    // DNSSEC carries the raw, uncompressed point without the 0x04 prefix that
    // `ring` expects for `UnparsedPublicKey`.
    let mut prefixed = Vec::with_capacity(public_key.len() + 1);
    prefixed.push(0x04);
    prefixed.extend_from_slice(public_key);

    let key = signature::UnparsedPublicKey::new(parameters, &prefixed);
    match key.verify(data, signature_bytes) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// RRSIG_RDATA (sans signature) followed by the canonical DNSKEY RRset
/// (RFC 4034 §3.1.8.1), built from the bundle's own keys since a bundle's
/// RRSIG always covers its own DNSKEY RRset in this ceremony model.
fn build_rrsig_data(bundle: &Bundle, signature: &Signature) -> Result<Vec<u8>, String> {
    let mut data = Vec::new();

    data.extend_from_slice(&TYPE_COVERED_DNSKEY.to_be_bytes());
    data.push(signature.algorithm.to_u8());
    data.push(signature.labels);
    data.extend_from_slice(&signature.original_ttl.to_be_bytes());
    data.extend_from_slice(&(signature.signature_expiration.timestamp() as u32).to_be_bytes());
    data.extend_from_slice(&(signature.signature_inception.timestamp() as u32).to_be_bytes());
    data.extend_from_slice(&signature.key_tag.to_be_bytes());
    data.extend_from_slice(&name_to_wire(&signature.signer_name)?);

    let mut keys: Vec<&Key> = bundle.keys.iter().collect();
    keys.sort_by(|a, b| a.public_key.cmp(&b.public_key).then(a.key_tag.cmp(&b.key_tag)));
    for key in keys {
        data.extend_from_slice(&key.flags.to_be_bytes());
        data.push(key.protocol);
        data.push(key.algorithm.to_u8());
        data.extend_from_slice(&key.public_key);
    }

    Ok(data)
}

fn name_to_wire(name: &str) -> Result<Vec<u8>, String> {
    let mut wire = Vec::new();
    let name = name.trim_end_matches('.');

    if name.is_empty() {
        wire.push(0);
        return Ok(wire);
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err("empty DNS label".to_string());
        }
        if label.len() > 63 {
            return Err("DNS label too long".to_string());
        }
        wire.push(label.len() as u8);
        wire.extend_from_slice(label.to_lowercase().as_bytes());
    }
    wire.push(0);
    Ok(wire)
}
