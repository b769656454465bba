//! Cross-crate ceremony pipeline: a KSR is validated, chained against an
//! (absent) previous SKR, signed against a schema through a real
//! `SoftwareOracle`, validated again as a response, and round-tripped
//! through the XML codec (SPEC_FULL.md §4, §8).
//!
//! ECDSA P-256 is used throughout because `ring` can generate fresh keypairs
//! for it directly; RSA keypair generation is out of `ring`'s scope, so the
//! inline unit tests elsewhere in this workspace cover the RSA codec paths
//! with fixed fixtures instead.

use chrono::{Duration, TimeZone, Utc};
use ksrsigner_application::{sign_bundles, validate_chain, validate_request, validate_response};
use ksrsigner_domain::model::{
    AlgorithmDnssec, AlgorithmPolicy, Bundle, Key, KskKey, KskPolicy, RequestPolicy, Response,
    ResponsePolicy, Schema, SchemaAction, Signature, SignaturePolicy, TYPE_COVERED_DNSKEY,
};
use ksrsigner_domain::{calculate_key_tag, flags};
use ksrsigner_infrastructure::{decode_response, encode_response, RingSignatureVerifier, SoftwareOracle};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use std::collections::{BTreeMap, HashMap};

/// Mirrors `infrastructure::crypto::build_rrsig_data`'s wire format, since
/// that helper is private to its crate: RRSIG_RDATA (sans signature) followed
/// by the canonical DNSKEY RRset.
fn rrsig_signing_input(keys: &[Key], signature: &Signature) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&TYPE_COVERED_DNSKEY.to_be_bytes());
    data.push(signature.algorithm.to_u8());
    data.push(signature.labels);
    data.extend_from_slice(&signature.original_ttl.to_be_bytes());
    data.extend_from_slice(&(signature.signature_expiration.timestamp() as u32).to_be_bytes());
    data.extend_from_slice(&(signature.signature_inception.timestamp() as u32).to_be_bytes());
    data.extend_from_slice(&signature.key_tag.to_be_bytes());
    data.push(0); // root name, wire-encoded

    let mut sorted: Vec<&Key> = keys.iter().collect();
    sorted.sort_by(|a, b| a.public_key.cmp(&b.public_key).then(a.key_tag.cmp(&b.key_tag)));
    for key in sorted {
        data.extend_from_slice(&key.flags.to_be_bytes());
        data.push(key.protocol);
        data.push(key.algorithm.to_u8());
        data.extend_from_slice(&key.public_key);
    }
    data
}

struct GeneratedEcdsaKey {
    der: Vec<u8>,
    public_point: Vec<u8>,
}

fn generate_ecdsa_p256(rng: &SystemRandom) -> GeneratedEcdsaKey {
    let doc = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, rng).unwrap();
    let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, doc.as_ref(), rng).unwrap();
    // ring's public key is the uncompressed SEC1 point (0x04 || x || y); DNSSEC
    // publishes the raw x || y without that prefix (RFC 6605 §4).
    let public_point = pair.public_key().as_ref()[1..].to_vec();
    GeneratedEcdsaKey { der: doc.as_ref().to_vec(), public_point }
}

fn sign_ecdsa(der: &[u8], rng: &SystemRandom, data: &[u8]) -> Vec<u8> {
    let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, der, rng).unwrap();
    pair.sign(rng, data).unwrap().as_ref().to_vec()
}

fn ecdsa_signature_policy() -> SignaturePolicy {
    SignaturePolicy {
        publish_safety: Duration::days(5),
        retire_safety: Duration::days(5),
        max_signature_validity: Duration::days(21),
        min_signature_validity: Duration::days(14),
        max_validity_overlap: Duration::days(11),
        min_validity_overlap: Duration::days(9),
        algorithms: vec![AlgorithmPolicy::Ecdsa {
            algorithm: AlgorithmDnssec::EcdsaP256Sha256,
            bits: 256,
        }],
    }
}

fn permissive_request_policy() -> RequestPolicy {
    RequestPolicy {
        num_bundles: Some(1),
        enable_unsupported_ecdsa: true,
        approved_algorithms: vec!["ECDSAP256SHA256".to_string()],
        check_cycle_length: false,
        check_bundle_intervals: false,
        check_bundle_overlap: false,
        num_keys_per_bundle: vec![1],
        num_different_keys_in_all_bundles: 1,
        ..RequestPolicy::default()
    }
}

/// Builds a single-bundle KSR with one self-signed ECDSA ZSK, and returns it
/// alongside the raw signature bytes so a test can tamper with them.
fn build_request(rng: &SystemRandom) -> (ksrsigner_domain::Request, GeneratedEcdsaKey) {
    let zsk = generate_ecdsa_p256(rng);
    let inception = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let expiration = inception + Duration::days(20);

    let mut zsk_key = Key {
        key_identifier: "zsk-1".to_string(),
        key_tag: 0,
        algorithm: AlgorithmDnssec::EcdsaP256Sha256,
        flags: flags::ZONE,
        protocol: 3,
        ttl: 3600,
        public_key: zsk.public_point.clone(),
    };
    zsk_key.key_tag = calculate_key_tag(&zsk_key);

    let mut signature = Signature {
        key_identifier: "zsk-1".to_string(),
        key_tag: zsk_key.key_tag,
        algorithm: AlgorithmDnssec::EcdsaP256Sha256,
        labels: 0,
        original_ttl: 3600,
        signature_inception: inception,
        signature_expiration: inception + Duration::days(15),
        signer_name: ".".to_string(),
        signature_data: Vec::new(),
    };
    let preimage = rrsig_signing_input(std::slice::from_ref(&zsk_key), &signature);
    signature.signature_data = sign_ecdsa(&zsk.der, rng, &preimage);

    let bundle = Bundle {
        id: "bundle-1".to_string(),
        inception,
        expiration,
        keys: vec![zsk_key],
        signatures: vec![signature],
    };

    let request = ksrsigner_domain::Request {
        id: "ksr-1".to_string(),
        serial: 1,
        domain: ".".to_string(),
        timestamp: inception,
        zsk_policy: ecdsa_signature_policy(),
        bundles: vec![bundle],
    };

    (request, zsk)
}

#[test]
fn valid_bundle_passes_request_validation_with_real_ecdsa_pop() {
    let rng = SystemRandom::new();
    let (request, _zsk) = build_request(&rng);
    let policy = permissive_request_policy();

    validate_request(&request, &policy, &RingSignatureVerifier).unwrap();
}

#[test]
fn tampered_signature_byte_fails_proof_of_possession() {
    let rng = SystemRandom::new();
    let (mut request, _zsk) = build_request(&rng);
    let policy = permissive_request_policy();

    let byte = &mut request.bundles[0].signatures[0].signature_data[0];
    *byte ^= 0xFF;

    let err = validate_request(&request, &policy, &RingSignatureVerifier).unwrap_err();
    assert_eq!(err.code(), "KSR-BUNDLE-POP");
}

#[test]
fn disabling_validate_signatures_accepts_a_tampered_signature() {
    let rng = SystemRandom::new();
    let (mut request, _zsk) = build_request(&rng);
    let mut policy = permissive_request_policy();
    policy.validate_signatures = false;

    request.bundles[0].signatures[0].signature_data[0] ^= 0xFF;

    validate_request(&request, &policy, &RingSignatureVerifier).unwrap();
}

#[test]
fn validating_a_request_twice_yields_identical_outcomes() {
    let rng = SystemRandom::new();
    let (request, _zsk) = build_request(&rng);
    let policy = permissive_request_policy();

    let first = validate_request(&request, &policy, &RingSignatureVerifier);
    let second = validate_request(&request, &policy, &RingSignatureVerifier);
    assert_eq!(first.is_ok(), second.is_ok());
    assert!(first.is_ok());
}

/// End to end: validate, chain against no history, sign through a real
/// software oracle, validate the produced response, and round-trip it
/// through the XML codec.
#[test]
fn full_pipeline_signs_and_validates_a_response() {
    let rng = SystemRandom::new();
    let (request, _zsk) = build_request(&rng);
    let request_policy = permissive_request_policy();

    validate_request(&request, &request_policy, &RingSignatureVerifier).unwrap();
    validate_chain(&request, None, &[], &request_policy, &oracle_with_no_keys()).unwrap();

    let ksk = generate_ecdsa_p256(&rng);
    let mut ksk_dnskey = Key {
        key_identifier: "ksk-2024".to_string(),
        key_tag: 0,
        algorithm: AlgorithmDnssec::EcdsaP256Sha256,
        flags: flags::SEP,
        protocol: 3,
        ttl: 3600,
        public_key: ksk.public_point.clone(),
    };
    ksk_dnskey.key_tag = calculate_key_tag(&ksk_dnskey);

    let oracle = SoftwareOracle::new();
    oracle
        .insert_ecdsa_pkcs8(
            "ksk-2024",
            AlgorithmDnssec::EcdsaP256Sha256,
            &ksk.der,
            ksk.public_point.clone(),
            ksk_dnskey.key_tag,
        )
        .unwrap();

    let mut actions = BTreeMap::new();
    actions.insert(
        1,
        SchemaAction {
            publish: vec!["ksk-2024".to_string()],
            sign: vec!["ksk-2024".to_string()],
            revoke: vec![],
        },
    );
    let schema = Schema { name: "default".to_string(), actions };

    let mut keys: HashMap<String, KskKey> = HashMap::new();
    keys.insert(
        "ksk-2024".to_string(),
        KskKey {
            description: "2024 KSK".to_string(),
            label: "ksk-2024".to_string(),
            key_tag: ksk_dnskey.key_tag,
            algorithm: AlgorithmDnssec::EcdsaP256Sha256,
            valid_from: request.timestamp,
            valid_until: None,
            rsa_size: None,
            rsa_exponent: None,
            ds_sha256: None,
        },
    );

    let ksk_policy = KskPolicy {
        signature_policy: ecdsa_signature_policy(),
        ttl: 3600,
        signers_name: ".".to_string(),
    };

    let signed_bundles =
        sign_bundles(&request, &request_policy, &schema, &keys, &ksk_policy, &oracle).unwrap();

    // Every sign[] name produced exactly one RRSIG, and both bundle keys (ZSK
    // and newly published KSK) carry the right flag bits (property 6).
    assert_eq!(signed_bundles.len(), 1);
    let bundle = &signed_bundles[0];
    assert_eq!(bundle.signatures_by("ksk-2024").len(), 1);
    assert_eq!(bundle.keys.len(), 2);
    assert!(bundle.key("ksk-2024").unwrap().is_sep());
    assert!(!bundle.key("zsk-1").unwrap().is_sep());

    let response = Response {
        id: request.id.clone(),
        serial: request.serial,
        domain: request.domain.clone(),
        timestamp: Utc::now(),
        ksk_policy: ksk_policy.signature_policy.clone(),
        bundles: signed_bundles,
    };

    let response_policy = ResponsePolicy {
        num_bundles: Some(1),
        validate_signatures: true,
    };
    validate_response(&response, &response_policy, &RingSignatureVerifier).unwrap();

    let xml = encode_response(&response).unwrap();
    let roundtripped = decode_response(&xml).unwrap();
    assert_eq!(roundtripped.id, response.id);
    assert_eq!(roundtripped.bundles[0].keys.len(), 2);
    assert_eq!(roundtripped.bundles[0].signatures.len(), 2);
}

fn oracle_with_no_keys() -> SoftwareOracle {
    SoftwareOracle::new()
}
