//! [`SoftwareOracle`]: an in-process [`SigningOracle`] backed by `ring`
//! keypairs, for operators without HSM access and for tests (SPEC_FULL.md
//! §4.6).
//!
//! Grounded on the teacher's `dns/dnssec/crypto.rs` use of `ring::signature`
//! for verification; generalized here to the signing direction via
//! `ring::signature::{RsaKeyPair, EcdsaKeyPair}`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ksrsigner_application::{OracleKey, SigningOracle};
use ksrsigner_domain::model::KskKey;
use ksrsigner_domain::{AlgorithmDnssec, ConfigurationError, OracleError};
use ring::rand::SystemRandom;
use ring::signature::{self, EcdsaKeyPair, RsaKeyPair};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;

enum SoftwareKey {
    Rsa(RsaKeyPair),
    Ecdsa(EcdsaKeyPair),
}

struct Entry {
    key: SoftwareKey,
    algorithm: AlgorithmDnssec,
    key_tag: u16,
    // The RFC 3110 / RFC 4034 wire-format public key, supplied at insertion
    // time: `ring`'s RsaKeyPair does not expose its n/e components directly,
    // only a DER blob, so re-deriving the DNSSEC encoding from it would mean
    // hand-rolling a DER parser. Operators already know this value (it is
    // what gets published in the DNSKEY RRset), so it is provided alongside
    // the private key rather than recomputed.
    public_key_dnskey: Vec<u8>,
}

/// A software-backed signing oracle. Keys are loaded from PKCS#8 documents
/// at construction time; nothing is persisted by this type itself.
pub struct SoftwareOracle {
    rng: SystemRandom,
    keys: Mutex<HashMap<String, Entry>>,
}

impl SoftwareOracle {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Register an RSA key from a PKCS#1 DER document under `label`.
    /// `public_key_dnskey` is the RFC 3110 encoding that will be published.
    pub fn insert_rsa_pkcs1(
        &self,
        label: &str,
        algorithm: AlgorithmDnssec,
        der: &[u8],
        public_key_dnskey: Vec<u8>,
        key_tag: u16,
    ) -> Result<(), OracleError> {
        let pair = RsaKeyPair::from_der(der)
            .map_err(|e| OracleError::Io(format!("invalid RSA PKCS#1 key for {label}: {e}")))?;
        self.keys.lock().unwrap().insert(
            label.to_string(),
            Entry {
                key: SoftwareKey::Rsa(pair),
                algorithm,
                key_tag,
                public_key_dnskey,
            },
        );
        Ok(())
    }

    /// Register an ECDSA key from a PKCS#8 DER document under `label`.
    /// `public_key_dnskey` is the raw `x || y` point that will be published.
    pub fn insert_ecdsa_pkcs8(
        &self,
        label: &str,
        algorithm: AlgorithmDnssec,
        der: &[u8],
        public_key_dnskey: Vec<u8>,
        key_tag: u16,
    ) -> Result<(), OracleError> {
        let alg = match algorithm {
            AlgorithmDnssec::EcdsaP256Sha256 => &signature::ECDSA_P256_SHA256_FIXED_SIGNING,
            AlgorithmDnssec::EcdsaP384Sha384 => &signature::ECDSA_P384_SHA384_FIXED_SIGNING,
            other => return Err(OracleError::UnsupportedAlgorithm(other.name().to_string())),
        };
        let pair = EcdsaKeyPair::from_pkcs8(alg, der, &self.rng)
            .map_err(|e| OracleError::Io(format!("invalid ECDSA PKCS#8 key for {label}: {e}")))?;
        self.keys.lock().unwrap().insert(
            label.to_string(),
            Entry {
                key: SoftwareKey::Ecdsa(pair),
                algorithm,
                key_tag,
                public_key_dnskey,
            },
        );
        Ok(())
    }
}

impl Default for SoftwareOracle {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of the opaque `hsm:` configuration section (SPEC_FULL.md §6),
/// as consumed by [`from_hsm_config`]. The top-level `hsm.keys` map key must
/// match a name under the config's `keys` section, which supplies the
/// oracle label, algorithm and key tag.
#[derive(Debug, Deserialize)]
struct SoftwareHsmKeyEntry {
    pkcs8_path: String,
    public_key_base64: String,
}

#[derive(Debug, Deserialize, Default)]
struct SoftwareHsmSpec {
    #[serde(default)]
    keys: HashMap<String, SoftwareHsmKeyEntry>,
}

/// Build a [`SoftwareOracle`] from the config's opaque `hsm:` section, for
/// operators without HSM access. `keys` is the config's parsed `keys:`
/// section, cross-referenced by name to learn each key's label, algorithm
/// and key tag.
pub fn from_hsm_config(
    hsm: &serde_yaml::Value,
    keys: &HashMap<String, KskKey>,
) -> Result<SoftwareOracle, ConfigurationError> {
    let spec: SoftwareHsmSpec = serde_yaml::from_value(hsm.clone())
        .map_err(|e| ConfigurationError::Yaml(e.to_string()))?;
    let oracle = SoftwareOracle::new();

    for (name, entry) in spec.keys {
        let ksk = keys.get(&name).ok_or_else(|| {
            ConfigurationError::MissingField(format!("hsm.keys.{name} has no matching entry under keys"))
        })?;
        let der = std::fs::read(&entry.pkcs8_path).map_err(|source| ConfigurationError::Io {
            path: entry.pkcs8_path.clone(),
            source,
        })?;
        let public_key_dnskey = BASE64.decode(entry.public_key_base64.as_bytes()).map_err(|e| {
            ConfigurationError::InvalidValue {
                field: format!("hsm.keys.{name}.public_key_base64"),
                reason: e.to_string(),
            }
        })?;

        let insert_result = if ksk.algorithm.is_rsa() {
            oracle.insert_rsa_pkcs1(&ksk.label, ksk.algorithm, &der, public_key_dnskey, ksk.key_tag)
        } else {
            oracle.insert_ecdsa_pkcs8(&ksk.label, ksk.algorithm, &der, public_key_dnskey, ksk.key_tag)
        };
        insert_result.map_err(|e| ConfigurationError::InvalidValue {
            field: format!("hsm.keys.{name}"),
            reason: e.to_string(),
        })?;
    }

    Ok(oracle)
}

impl SigningOracle for SoftwareOracle {
    fn list_keys(&self) -> Result<Vec<OracleKey>, OracleError> {
        let keys = self.keys.lock().unwrap();
        Ok(keys
            .iter()
            .map(|(label, entry)| OracleKey {
                label: label.clone(),
                algorithm: entry.algorithm,
                public_key: entry.public_key_dnskey.clone(),
                key_tag: entry.key_tag,
            })
            .collect())
    }

    fn locate(&self, label: &str) -> Result<OracleKey, OracleError> {
        let keys = self.keys.lock().unwrap();
        let entry = keys
            .get(label)
            .ok_or_else(|| OracleError::KeyNotFound(label.to_string()))?;
        Ok(OracleKey {
            label: label.to_string(),
            algorithm: entry.algorithm,
            public_key: entry.public_key_dnskey.clone(),
            key_tag: entry.key_tag,
        })
    }

    fn sign(&self, label: &str, algorithm: AlgorithmDnssec, data: &[u8]) -> Result<Vec<u8>, OracleError> {
        let keys = self.keys.lock().unwrap();
        let entry = keys
            .get(label)
            .ok_or_else(|| OracleError::KeyNotFound(label.to_string()))?;
        if entry.algorithm != algorithm {
            return Err(OracleError::UnsupportedAlgorithm(algorithm.name().to_string()));
        }

        match &entry.key {
            SoftwareKey::Rsa(pair) => {
                let padding_alg: &dyn signature::RsaEncoding = match algorithm {
                    AlgorithmDnssec::RsaSha1 => &signature::RSA_PKCS1_SHA1_FOR_LEGACY_USE_ONLY,
                    AlgorithmDnssec::RsaSha256 => &signature::RSA_PKCS1_SHA256,
                    AlgorithmDnssec::RsaSha512 => &signature::RSA_PKCS1_SHA512,
                    other => return Err(OracleError::UnsupportedAlgorithm(other.name().to_string())),
                };
                let mut signature = vec![0u8; pair.public_modulus_len()];
                pair.sign(padding_alg, &self.rng, data, &mut signature)
                    .map_err(|_| OracleError::SigningFailed {
                        label: label.to_string(),
                        reason: "RSA signing operation failed".to_string(),
                    })?;
                Ok(signature)
            }
            SoftwareKey::Ecdsa(pair) => {
                let signature = pair
                    .sign(&self.rng, data)
                    .map_err(|_| OracleError::SigningFailed {
                        label: label.to_string(),
                        reason: "ECDSA signing operation failed".to_string(),
                    })?;
                Ok(signature.as_ref().to_vec())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_unknown_label_is_key_not_found() {
        let oracle = SoftwareOracle::new();
        let err = oracle.locate("no-such-key").unwrap_err();
        assert!(matches!(err, OracleError::KeyNotFound(_)));
    }

    #[test]
    fn list_keys_starts_empty() {
        let oracle = SoftwareOracle::new();
        assert!(oracle.list_keys().unwrap().is_empty());
    }

    #[test]
    fn sign_with_mismatched_algorithm_is_rejected() {
        let oracle = SoftwareOracle::new();
        // No key registered at all, but the mismatch check (when present) and
        // not-found check (when absent) both must surface as an OracleError,
        // never a panic, before any cryptography runs.
        let err = oracle
            .sign("absent", AlgorithmDnssec::RsaSha256, b"placeholder")
            .unwrap_err();
        assert!(matches!(err, OracleError::KeyNotFound(_)));
    }

    #[test]
    fn from_hsm_config_rejects_dangling_key_reference() {
        let hsm: serde_yaml::Value = serde_yaml::from_str(
            "keys:\n  ksk-2024:\n    pkcs8_path: /nonexistent\n    public_key_base64: AQ==\n",
        )
        .unwrap();
        let err = from_hsm_config(&hsm, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingField(_)));
    }
}
