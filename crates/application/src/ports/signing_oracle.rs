//! The abstract contract over HSM-resident (or software-backed) private keys.
//!
//! Modeled after the teacher's `DnsResolver` port, but synchronous: the
//! ceremony runs single-threaded (no suspension points), so there is no
//! value in an `async_trait` here.

use ksrsigner_domain::{AlgorithmDnssec, OracleError};

/// A public key as reported by the oracle for one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleKey {
    pub label: String,
    pub algorithm: AlgorithmDnssec,
    pub public_key: Vec<u8>,
    pub key_tag: u16,
}

/// Abstract capability set over HSM-resident (or software) private keys.
///
/// Implementations may be PKCS#11-backed (out of scope here — only this
/// trait and a software reference implementation are specified) or pure
/// software, as used by tests and by operators without an HSM.
pub trait SigningOracle {
    /// Enumerate every key the oracle currently has access to.
    fn list_keys(&self) -> Result<Vec<OracleKey>, OracleError>;

    /// Locate a single key by its HSM label (`CKA_LABEL` in PKCS#11 terms).
    fn locate(&self, label: &str) -> Result<OracleKey, OracleError>;

    /// Sign `data` with the private key behind `label`.
    ///
    /// For RSA algorithms this produces a PKCS#1 v1.5 signature over the
    /// algorithm's hash; for ECDSA algorithms this produces the raw `r || s`
    /// encoding DNSSEC uses on the wire (not ASN.1 DER).
    fn sign(&self, label: &str, algorithm: AlgorithmDnssec, data: &[u8]) -> Result<Vec<u8>, OracleError>;
}
