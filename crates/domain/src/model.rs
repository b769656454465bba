//! Canonical in-memory data model for KSR/SKR ceremony processing.
//!
//! Types here mirror the wire shape of DNSKEY/RRSIG records (see
//! [`crate::keytag`] and [`crate::rsa_codec`] for the byte-level codecs) and
//! the request/response policy objects used throughout validation.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// DNSSEC signing algorithm numbers (RFC 8624 / IANA registry), restricted to
/// the algorithms this ceremony tool is expected to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlgorithmDnssec {
    RsaSha1 = 5,
    RsaSha256 = 8,
    RsaSha512 = 10,
    EcdsaP256Sha256 = 13,
    EcdsaP384Sha384 = 14,
}

impl AlgorithmDnssec {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            5 => Some(Self::RsaSha1),
            8 => Some(Self::RsaSha256),
            10 => Some(Self::RsaSha512),
            13 => Some(Self::EcdsaP256Sha256),
            14 => Some(Self::EcdsaP384Sha384),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RsaSha1 => "RSASHA1",
            Self::RsaSha256 => "RSASHA256",
            Self::RsaSha512 => "RSASHA512",
            Self::EcdsaP256Sha256 => "ECDSAP256SHA256",
            Self::EcdsaP384Sha384 => "ECDSAP384SHA384",
        }
    }

    pub fn is_rsa(self) -> bool {
        matches!(self, Self::RsaSha1 | Self::RsaSha256 | Self::RsaSha512)
    }

    pub fn is_ecdsa(self) -> bool {
        matches!(self, Self::EcdsaP256Sha256 | Self::EcdsaP384Sha384)
    }
}

/// One entry in a `SignaturePolicy.algorithms` set: the ZSK (or KSK) operator's
/// declared algorithm/key-size/exponent combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmPolicy {
    Rsa {
        algorithm: AlgorithmDnssec,
        bits: u16,
        exponent: u32,
    },
    Ecdsa {
        algorithm: AlgorithmDnssec,
        bits: u16,
    },
}

impl AlgorithmPolicy {
    pub fn algorithm(&self) -> AlgorithmDnssec {
        match self {
            Self::Rsa { algorithm, .. } | Self::Ecdsa { algorithm, .. } => *algorithm,
        }
    }
}

/// ZSK/KSK operator signature policy, as stated in the KSR header or
/// computed for the KSK side from `ksk_policy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePolicy {
    pub publish_safety: chrono::Duration,
    pub retire_safety: chrono::Duration,
    pub max_signature_validity: chrono::Duration,
    pub min_signature_validity: chrono::Duration,
    pub max_validity_overlap: chrono::Duration,
    pub min_validity_overlap: chrono::Duration,
    pub algorithms: Vec<AlgorithmPolicy>,
}

/// DNSKEY flag bits (RFC 4034 / RFC 5011).
pub mod flags {
    pub const ZONE: u16 = 256;
    pub const SEP: u16 = 1;
    pub const REVOKE: u16 = 128;
}

/// A DNSKEY record as carried in a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Stable label used to correlate a key across bundles and ceremonies.
    pub key_identifier: String,
    pub key_tag: u16,
    pub algorithm: AlgorithmDnssec,
    pub flags: u16,
    pub protocol: u8,
    pub ttl: u32,
    pub public_key: Vec<u8>,
}

impl Key {
    pub fn is_sep(&self) -> bool {
        self.flags & flags::SEP != 0
    }

    pub fn is_revoked(&self) -> bool {
        self.flags & flags::REVOKE != 0
    }
}

/// An RRSIG record over a bundle's DNSKEY RRset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub key_identifier: String,
    pub key_tag: u16,
    pub algorithm: AlgorithmDnssec,
    pub labels: u8,
    pub original_ttl: u32,
    pub signature_inception: DateTime<Utc>,
    pub signature_expiration: DateTime<Utc>,
    pub signer_name: String,
    pub signature_data: Vec<u8>,
}

pub const TYPE_COVERED_DNSKEY: u16 = 48;

/// One ceremony time-slot: a set of keys and the signatures vouching for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub id: String,
    pub inception: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
    pub keys: Vec<Key>,
    pub signatures: Vec<Signature>,
}

impl Bundle {
    pub fn key(&self, key_identifier: &str) -> Option<&Key> {
        self.keys.iter().find(|k| k.key_identifier == key_identifier)
    }

    pub fn signatures_by(&self, key_identifier: &str) -> Vec<&Signature> {
        self.signatures
            .iter()
            .filter(|s| s.key_identifier == key_identifier)
            .collect()
    }
}

/// A parsed Key Signing Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: String,
    pub serial: u32,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub zsk_policy: SignaturePolicy,
    pub bundles: Vec<Bundle>,
}

/// A produced (or previously received) Signed Key Response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: String,
    pub serial: u32,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub ksk_policy: SignaturePolicy,
    pub bundles: Vec<Bundle>,
}

/// Actions for one schema slot: which configured KSKs to publish, sign with,
/// and revoke.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaAction {
    pub publish: Vec<String>,
    pub sign: Vec<String>,
    pub revoke: Vec<String>,
}

/// A named schema: per-slot publish/sign/revoke actions, keyed by 1-based
/// bundle index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    pub actions: BTreeMap<u32, SchemaAction>,
}

/// A configured KSK, as listed under the `keys` section of the
/// configuration (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KskKey {
    pub description: String,
    pub label: String,
    pub key_tag: u16,
    pub algorithm: AlgorithmDnssec,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub rsa_size: Option<u16>,
    pub rsa_exponent: Option<u32>,
    pub ds_sha256: Option<String>,
}

/// The KSK operator's own signing policy (`ksk_policy` section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KskPolicy {
    pub signature_policy: SignaturePolicy,
    pub ttl: u32,
    pub signers_name: String,
}

/// Configuration knobs for validating KSRs (mirrors `RequestPolicy` in
/// `original_source/src/kskm/common/config_misc.py`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPolicy {
    pub acceptable_domains: Vec<String>,

    pub num_bundles: Option<u32>,
    pub validate_signatures: bool,
    pub keys_match_zsk_policy: bool,
    pub rsa_exponent_match_zsk_policy: bool,
    pub enable_unsupported_ecdsa: bool,
    pub check_cycle_length: bool,
    pub min_cycle_inception_length: chrono::Duration,
    pub max_cycle_inception_length: chrono::Duration,
    pub min_bundle_interval: chrono::Duration,
    pub max_bundle_interval: chrono::Duration,

    pub check_bundle_overlap: bool,
    pub signature_algorithms_match_zsk_policy: bool,
    pub approved_algorithms: Vec<String>,
    pub rsa_approved_exponents: Vec<u32>,
    pub rsa_approved_key_sizes: Vec<u16>,
    pub signature_validity_match_zsk_policy: bool,
    pub check_keys_match_ksk_operator_policy: bool,
    pub num_keys_per_bundle: Vec<u32>,
    pub num_different_keys_in_all_bundles: u32,
    pub dns_ttl: u32,
    pub signature_check_expire_horizon: bool,
    pub signature_horizon_days: u32,
    pub check_bundle_intervals: bool,

    pub check_chain_keys: bool,
    pub check_chain_keys_in_hsm: bool,
    pub check_chain_overlap: bool,
    pub check_keys_publish_safety: bool,
    pub check_keys_retire_safety: bool,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        use crate::duration::period;
        Self {
            acceptable_domains: vec![".".to_string()],
            num_bundles: Some(9),
            validate_signatures: true,
            keys_match_zsk_policy: true,
            rsa_exponent_match_zsk_policy: true,
            enable_unsupported_ecdsa: false,
            check_cycle_length: true,
            min_cycle_inception_length: period("P79D").expect("static period literal"),
            max_cycle_inception_length: period("P81D").expect("static period literal"),
            min_bundle_interval: period("P9D").expect("static period literal"),
            max_bundle_interval: period("P11D").expect("static period literal"),
            check_bundle_overlap: true,
            signature_algorithms_match_zsk_policy: true,
            approved_algorithms: vec![AlgorithmDnssec::RsaSha256.name().to_string()],
            rsa_approved_exponents: vec![65537],
            rsa_approved_key_sizes: vec![2048],
            signature_validity_match_zsk_policy: true,
            check_keys_match_ksk_operator_policy: true,
            num_keys_per_bundle: vec![2, 1, 1, 1, 1, 1, 1, 1, 2],
            num_different_keys_in_all_bundles: 3,
            dns_ttl: 0,
            signature_check_expire_horizon: true,
            signature_horizon_days: 180,
            check_bundle_intervals: true,
            check_chain_keys: true,
            check_chain_keys_in_hsm: true,
            check_chain_overlap: true,
            check_keys_publish_safety: true,
            check_keys_retire_safety: true,
        }
    }
}

/// Validation parameters for SKRs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePolicy {
    pub num_bundles: Option<u32>,
    pub validate_signatures: bool,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            num_bundles: Some(9),
            validate_signatures: true,
        }
    }
}
