//! Schema Engine & Signer (SPEC_FULL.md §4.4).
//!
//! Grounded on `config_misc.py`'s `Schema`/`SchemaAction` shape for slot
//! resolution, and on the teacher's canonical-ordering discipline in
//! `dns/dnssec/validator.rs` for wire-encoding RRsets before signing.

use ksrsigner_domain::model::{
    Bundle, Key, KskKey, KskPolicy, Request, RequestPolicy, Schema, Signature, TYPE_COVERED_DNSKEY,
};
use ksrsigner_domain::{calculate_key_tag, flags, OracleError};
use std::collections::HashMap;

use crate::ports::signing_oracle::SigningOracle;

pub fn sign_bundles(
    request: &Request,
    request_policy: &RequestPolicy,
    schema: &Schema,
    keys: &HashMap<String, KskKey>,
    ksk_policy: &KskPolicy,
    oracle: &dyn SigningOracle,
) -> Result<Vec<Bundle>, OracleError> {
    // dns_ttl=0 is a sentinel meaning "use ksk_policy.ttl" (§6).
    let ttl = if request_policy.dns_ttl != 0 {
        request_policy.dns_ttl
    } else {
        ksk_policy.ttl
    };

    let mut output = Vec::with_capacity(request.bundles.len());

    for (index, bundle) in request.bundles.iter().enumerate() {
        let slot = (index + 1) as u32;
        let action = schema.actions.get(&slot).cloned().unwrap_or_default();

        let mut rrset = bundle.keys.clone();
        let mut names: Vec<&String> = Vec::new();
        for name in action.publish.iter().chain(action.sign.iter()).chain(action.revoke.iter()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        for name in &names {
            let ksk = keys.get(*name).ok_or_else(|| OracleError::KeyNotFound((*name).clone()))?;
            let oracle_key = oracle.locate(&ksk.label)?;

            let is_published = action.publish.contains(*name);
            if !is_published {
                continue;
            }

            let mut key_flags = flags::ZONE | flags::SEP;
            if action.revoke.contains(*name) {
                key_flags |= flags::REVOKE;
            }

            let mut dnskey = Key {
                key_identifier: ksk.label.clone(),
                key_tag: 0,
                algorithm: ksk.algorithm,
                flags: key_flags,
                protocol: 3,
                ttl,
                public_key: oracle_key.public_key.clone(),
            };
            dnskey.key_tag = calculate_key_tag(&dnskey);
            rrset.push(dnskey);
        }

        rrset.sort_by(|a, b| a.public_key.cmp(&b.public_key).then(a.key_tag.cmp(&b.key_tag)));

        let mut signatures = bundle.signatures.clone();
        for name in &action.sign {
            let ksk = keys.get(*name).ok_or_else(|| OracleError::KeyNotFound((*name).clone()))?;
            let oracle_key = oracle.locate(&ksk.label)?;

            let labels = label_count(&ksk_policy.signers_name);
            let preimage = rrsig_signing_input(
                &rrset,
                ttl,
                ksk.algorithm,
                labels,
                oracle_key.key_tag,
                bundle.inception,
                bundle.expiration,
                &ksk_policy.signers_name,
            )
            .map_err(OracleError::Io)?;
            let signature_bytes = oracle.sign(&ksk.label, ksk.algorithm, &preimage)?;

            signatures.push(Signature {
                key_identifier: ksk.label.clone(),
                key_tag: oracle_key.key_tag,
                algorithm: ksk.algorithm,
                labels,
                original_ttl: ttl,
                signature_inception: bundle.inception,
                signature_expiration: bundle.expiration,
                signer_name: ksk_policy.signers_name.clone(),
                signature_data: signature_bytes,
            });
        }

        output.push(Bundle {
            id: bundle.id.clone(),
            inception: bundle.inception,
            expiration: bundle.expiration,
            keys: rrset,
            signatures,
        });
    }

    Ok(output)
}

/// RRSIG_RDATA (sans the signature itself) followed by the canonical DNSKEY
/// RRset (RFC 4034 §3.1.8.1). Must match
/// `infrastructure::crypto::build_rrsig_data` byte for byte, since that is
/// what verifies the signature this preimage is used to produce.
#[allow(clippy::too_many_arguments)]
fn rrsig_signing_input(
    keys: &[Key],
    ttl: u32,
    algorithm: ksrsigner_domain::AlgorithmDnssec,
    labels: u8,
    key_tag: u16,
    inception: chrono::DateTime<chrono::Utc>,
    expiration: chrono::DateTime<chrono::Utc>,
    signer_name: &str,
) -> Result<Vec<u8>, String> {
    let mut data = Vec::new();
    data.extend_from_slice(&TYPE_COVERED_DNSKEY.to_be_bytes());
    data.push(algorithm.to_u8());
    data.push(labels);
    data.extend_from_slice(&ttl.to_be_bytes());
    data.extend_from_slice(&(expiration.timestamp() as u32).to_be_bytes());
    data.extend_from_slice(&(inception.timestamp() as u32).to_be_bytes());
    data.extend_from_slice(&key_tag.to_be_bytes());
    data.extend_from_slice(&name_to_wire(signer_name)?);

    let mut sorted: Vec<&Key> = keys.iter().collect();
    sorted.sort_by(|a, b| a.public_key.cmp(&b.public_key).then(a.key_tag.cmp(&b.key_tag)));
    for key in sorted {
        data.extend_from_slice(&key.flags.to_be_bytes());
        data.push(key.protocol);
        data.push(key.algorithm.to_u8());
        data.extend_from_slice(&key.public_key);
    }
    Ok(data)
}

/// Wire-encodes a DNS name as a sequence of length-prefixed labels, matching
/// `infrastructure::crypto::name_to_wire`.
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

fn label_count(name: &str) -> u8 {
    if name == "." {
        0
    } else {
        name.trim_end_matches('.').split('.').count() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_request;
    use ksrsigner_domain::{model::SignaturePolicy, AlgorithmDnssec};
    use std::collections::HashMap as Map;

    struct StubOracle {
        public_key: Vec<u8>,
    }

    impl SigningOracle for StubOracle {
        fn list_keys(&self) -> Result<Vec<crate::ports::OracleKey>, OracleError> {
            Ok(vec![])
        }
        fn locate(&self, label: &str) -> Result<crate::ports::OracleKey, OracleError> {
            Ok(crate::ports::OracleKey {
                label: label.to_string(),
                algorithm: AlgorithmDnssec::RsaSha256,
                public_key: self.public_key.clone(),
                key_tag: 0,
            })
        }
        fn sign(
            &self,
            _label: &str,
            _algorithm: AlgorithmDnssec,
            _data: &[u8],
        ) -> Result<Vec<u8>, OracleError> {
            Ok(vec![9u8; 256])
        }
    }

    fn sample_ksk_policy() -> KskPolicy {
        KskPolicy {
            signature_policy: SignaturePolicy {
                publish_safety: chrono::Duration::days(5),
                retire_safety: chrono::Duration::days(5),
                max_signature_validity: chrono::Duration::days(21),
                min_signature_validity: chrono::Duration::days(14),
                max_validity_overlap: chrono::Duration::days(11),
                min_validity_overlap: chrono::Duration::days(9),
                algorithms: vec![],
            },
            ttl: 172800,
            signers_name: ".".to_string(),
        }
    }

    #[test]
    fn emits_one_bundle_per_input_bundle_with_a_ksk_signature() {
        let request = sample_request();
        let mut actions = std::collections::BTreeMap::new();
        actions.insert(
            1,
            ksrsigner_domain::model::SchemaAction {
                publish: vec!["ksk-2024".to_string()],
                sign: vec!["ksk-2024".to_string()],
                revoke: vec![],
            },
        );
        let schema = Schema {
            name: "default".to_string(),
            actions,
        };
        let mut keys: Map<String, KskKey> = Map::new();
        keys.insert(
            "ksk-2024".to_string(),
            KskKey {
                description: "test ksk".to_string(),
                label: "ksk-2024".to_string(),
                key_tag: 0,
                algorithm: AlgorithmDnssec::RsaSha256,
                valid_from: request.timestamp,
                valid_until: None,
                rsa_size: Some(8),
                rsa_exponent: Some(1),
                ds_sha256: None,
            },
        );
        let oracle = StubOracle { public_key: vec![1, 1, 1] };
        let policy = sample_ksk_policy();
        let request_policy = ksrsigner_domain::model::RequestPolicy::default();

        let out = sign_bundles(&request, &request_policy, &schema, &keys, &policy, &oracle).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].keys.iter().any(|k| k.is_sep()));
        assert!(!out[0].signatures_by("ksk-2024").is_empty());
    }

    #[test]
    fn nonzero_dns_ttl_overrides_ksk_policy_ttl() {
        let request = sample_request();
        let mut actions = std::collections::BTreeMap::new();
        actions.insert(
            1,
            ksrsigner_domain::model::SchemaAction {
                publish: vec!["ksk-2024".to_string()],
                sign: vec![],
                revoke: vec![],
            },
        );
        let schema = Schema {
            name: "default".to_string(),
            actions,
        };
        let mut keys: Map<String, KskKey> = Map::new();
        keys.insert(
            "ksk-2024".to_string(),
            KskKey {
                description: "test ksk".to_string(),
                label: "ksk-2024".to_string(),
                key_tag: 0,
                algorithm: AlgorithmDnssec::RsaSha256,
                valid_from: request.timestamp,
                valid_until: None,
                rsa_size: Some(8),
                rsa_exponent: Some(1),
                ds_sha256: None,
            },
        );
        let oracle = StubOracle { public_key: vec![1, 1, 1] };
        let policy = sample_ksk_policy();
        let request_policy = ksrsigner_domain::model::RequestPolicy {
            dns_ttl: 3600,
            ..ksrsigner_domain::model::RequestPolicy::default()
        };

        let out = sign_bundles(&request, &request_policy, &schema, &keys, &policy, &oracle).unwrap();
        let ksk = out[0].keys.iter().find(|k| k.key_identifier == "ksk-2024").unwrap();
        assert_eq!(ksk.ttl, 3600);
    }
}
