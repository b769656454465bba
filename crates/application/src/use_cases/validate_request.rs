//! KSR-DOMAIN / KSR-BUNDLE-* / KSR-POLICY-* checks (SPEC_FULL.md §4.2).
//!
//! Ordering is fixed: header, then bundles, then policy — mirroring
//! `original_source/src/kskm/ksr/validate.py::validate_request`, which calls
//! `verify_header`, `verify_bundles`, `verify_policy` in that sequence.

use crate::ports::signature_verifier::SignatureVerifier;
use ksrsigner_domain::model::{AlgorithmPolicy, Key, Request, RequestPolicy};
use ksrsigner_domain::{calculate_key_tag, flags, PolicyViolation};
use std::collections::HashMap;
use tracing::{info, warn};

pub fn validate_request(
    request: &Request,
    policy: &RequestPolicy,
    verifier: &dyn SignatureVerifier,
) -> Result<(), PolicyViolation> {
    check_domain(request, policy)?;
    check_id(request);

    check_bundle_unique(request)?;
    check_bundle_keys(request, policy)?;
    check_bundle_pop(request, policy, verifier)?;
    check_bundle_count(request, policy)?;
    check_bundle_cycle_duration(request, policy)?;
    check_bundle_intervals(request, policy)?;
    check_bundle_overlap(request, policy)?;
    check_bundle_cardinality(request, policy)?;

    check_policy_alg(request, policy)?;
    check_policy_sig_horizon(request, policy)?;
    check_policy_keys(request, policy)?;
    check_policy_sig_validity(request, policy)?;

    Ok(())
}

fn check_domain(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    if !policy.acceptable_domains.iter().any(|d| d == &request.domain) {
        return Err(PolicyViolation::Domain(format!(
            "request domain {:?} not in policy's acceptable domains {:?}",
            request.domain, policy.acceptable_domains
        )));
    }
    info!(domain = %request.domain, "KSR-DOMAIN: verified");
    Ok(())
}

fn check_id(request: &Request) {
    // Uniqueness against prior ceremonies is a Chain Validator concern
    // (it needs the previous SKR history); see validate_chain::check_id.
    info!(id = %request.id, "KSR-ID: deferred to chain validation");
}

fn check_bundle_unique(request: &Request) -> Result<(), PolicyViolation> {
    let mut seen = std::collections::HashSet::new();
    for bundle in &request.bundles {
        if !seen.insert(bundle.id.clone()) {
            return Err(PolicyViolation::BundleUnique(format!(
                "more than one bundle with id {}",
                bundle.id
            )));
        }
    }
    info!(count = request.bundles.len(), "KSR-BUNDLE-UNIQUE: all bundles have unique ids");
    Ok(())
}

fn check_bundle_keys(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    if !policy.keys_match_zsk_policy {
        warn!("KSR-BUNDLE-KEYS: disabled by policy (keys_match_zsk_policy)");
        return Ok(());
    }

    let mut seen: HashMap<String, Key> = HashMap::new();

    for bundle in &request.bundles {
        for key in &bundle.keys {
            if let Some(previous) = seen.get(&key.key_identifier) {
                if previous == key {
                    continue;
                }
                return Err(PolicyViolation::BundleKeys(format!(
                    "key identifier {} matches two different keys (second one in bundle {})",
                    key.key_identifier, bundle.id
                )));
            }

            if key.algorithm.is_rsa() {
                let pubkey = ksrsigner_domain::rsa_codec::decode_rsa_public_key(&key.public_key)
                    .map_err(|e| PolicyViolation::BundleKeys(e.to_string()))?;
                let exponent = u32_from_be(&pubkey.exponent);

                let mut matched = find_matching_rsa_policy(request, key, pubkey.bits, exponent, false);
                if matched.is_none() && !policy.rsa_exponent_match_zsk_policy {
                    matched = find_matching_rsa_policy(request, key, pubkey.bits, exponent, true);
                    if matched.is_some() {
                        warn!(
                            key = %key.key_identifier,
                            bundle = %bundle.id,
                            exponent,
                            "KSR-BUNDLE-KEYS: exponent does not match ZSK SignaturePolicy"
                        );
                    }
                }
                if matched.is_none() {
                    return Err(PolicyViolation::BundleKeys(format!(
                        "key {} in bundle {} does not match the ZSK SignaturePolicy",
                        key.key_identifier, bundle.id
                    )));
                }
            } else if key.algorithm.is_ecdsa() {
                warn!(key = %key.key_identifier, bundle = %bundle.id, "ECDSA key - untested path");
                let size = ecdsa_pubkey_size(&key.public_key);
                let matched = request.zsk_policy.algorithms.iter().any(|p| match p {
                    AlgorithmPolicy::Ecdsa { algorithm, bits } => {
                        *algorithm == key.algorithm && *bits == size
                    }
                    _ => false,
                });
                if !matched {
                    return Err(PolicyViolation::BundleKeys(format!(
                        "key {} in bundle {} does not match the ZSK SignaturePolicy",
                        key.key_identifier, bundle.id
                    )));
                }
            }

            if key.flags != flags::ZONE {
                return Err(PolicyViolation::BundleKeys(format!(
                    "key {} in bundle {} has flags {}, only {} acceptable",
                    key.key_identifier, bundle.id, key.flags, flags::ZONE
                )));
            }

            let expected_tag = calculate_key_tag(key);
            if expected_tag != key.key_tag {
                return Err(PolicyViolation::BundleKeys(format!(
                    "key {} in bundle {} has key tag {}, should be {}",
                    key.key_identifier, bundle.id, key.key_tag, expected_tag
                )));
            }

            seen.insert(key.key_identifier.clone(), key.clone());
        }
    }

    info!(count = seen.len(), "KSR-BUNDLE-KEYS: all unique keys accepted by policy");
    Ok(())
}

fn find_matching_rsa_policy<'a>(
    request: &'a Request,
    key: &Key,
    bits: u16,
    exponent: u32,
    ignore_exponent: bool,
) -> Option<&'a AlgorithmPolicy> {
    request.zsk_policy.algorithms.iter().find(|p| match p {
        AlgorithmPolicy::Rsa { algorithm, bits: policy_bits, exponent: policy_exponent } => {
            *algorithm == key.algorithm
                && *policy_bits == bits
                && (ignore_exponent || *policy_exponent == exponent)
        }
        _ => false,
    })
}

fn u32_from_be(bytes: &[u8]) -> u32 {
    let mut value: u32 = 0;
    for &b in bytes {
        value = (value << 8) | u32::from(b);
    }
    value
}

/// ECDSA raw point size in bits, stripping a leading `0x04` uncompressed-point
/// prefix if present.
fn ecdsa_pubkey_size(public_key: &[u8]) -> u16 {
    let bytes = if public_key.first() == Some(&0x04) {
        &public_key[1..]
    } else {
        public_key
    };
    (bytes.len() * 8 / 2) as u16
}

fn check_bundle_pop(
    request: &Request,
    policy: &RequestPolicy,
    verifier: &dyn SignatureVerifier,
) -> Result<(), PolicyViolation> {
    if !policy.validate_signatures {
        warn!("KSR-BUNDLE-POP: disabled by policy (validate_signatures)");
        return Ok(());
    }

    for bundle in &request.bundles {
        for signature in &bundle.signatures {
            let key = bundle.key(&signature.key_identifier).ok_or_else(|| {
                PolicyViolation::BundlePop(format!(
                    "signature in bundle {} refers to unknown key {}",
                    bundle.id, signature.key_identifier
                ))
            })?;
            let valid = verifier
                .verify(bundle, key, signature)
                .map_err(PolicyViolation::BundlePop)?;
            if !valid {
                return Err(PolicyViolation::BundlePop(format!(
                    "invalid signature encountered in bundle {}",
                    bundle.id
                )));
            }
        }

        for key in &bundle.keys {
            if bundle.signatures_by(&key.key_identifier).is_empty() {
                return Err(PolicyViolation::BundlePop(format!(
                    "key {} was not used to sign the keys in bundle {}",
                    key.key_identifier, bundle.id
                )));
            }
        }
    }

    info!(count = request.bundles.len(), "KSR-BUNDLE-POP: all bundles contain proof-of-possession");
    Ok(())
}

fn check_bundle_count(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    let count = request.bundles.len() as u32;
    if let Some(expected) = policy.num_bundles {
        if count != expected {
            return Err(PolicyViolation::BundleCount(format!(
                "wrong number of bundles in request ({count}, expected {expected})"
            )));
        }
    }
    info!(count, "KSR-BUNDLE-COUNT: accepted");
    Ok(())
}

fn check_bundle_cycle_duration(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    if !policy.check_cycle_length {
        warn!("KSR-BUNDLE-CYCLE-DURATION: disabled by policy (check_cycle_length)");
        return Ok(());
    }
    let (Some(first), Some(last)) = (request.bundles.first(), request.bundles.last()) else {
        warn!("KSR-BUNDLE-CYCLE-DURATION: no bundles - can't check anything");
        return Ok(());
    };
    let length = last.inception - first.inception;
    if length < policy.min_cycle_inception_length {
        return Err(PolicyViolation::BundleCycleDuration(format!(
            "cycle inception length ({}) less than minimum acceptable length ({})",
            ksrsigner_domain::duration::format_duration(length),
            ksrsigner_domain::duration::format_duration(policy.min_cycle_inception_length)
        )));
    }
    if length > policy.max_cycle_inception_length {
        return Err(PolicyViolation::BundleCycleDuration(format!(
            "cycle inception length ({}) greater than maximum acceptable length ({})",
            ksrsigner_domain::duration::format_duration(length),
            ksrsigner_domain::duration::format_duration(policy.max_cycle_inception_length)
        )));
    }
    info!("KSR-BUNDLE-CYCLE-DURATION: cycle length accepted");
    Ok(())
}

fn check_bundle_intervals(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    if !policy.check_bundle_intervals {
        warn!("KSR-BUNDLE-INTERVALS: disabled by policy (check_bundle_intervals)");
        return Ok(());
    }
    for window in request.bundles.windows(2) {
        let interval = window[1].inception - window[0].inception;
        if interval < policy.min_bundle_interval || interval > policy.max_bundle_interval {
            return Err(PolicyViolation::BundleIntervals(format!(
                "interval between bundles {} and {} ({}) outside [{}, {}]",
                window[0].id,
                window[1].id,
                ksrsigner_domain::duration::format_duration(interval),
                ksrsigner_domain::duration::format_duration(policy.min_bundle_interval),
                ksrsigner_domain::duration::format_duration(policy.max_bundle_interval)
            )));
        }
    }
    info!("KSR-BUNDLE-INTERVALS: all intervals accepted");
    Ok(())
}

fn check_bundle_overlap(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    if !policy.check_bundle_overlap {
        warn!("KSR-BUNDLE-OVERLAP: disabled by policy (check_bundle_overlap)");
        return Ok(());
    }
    for window in request.bundles.windows(2) {
        let overlap = window[0].expiration - window[1].inception;
        if overlap < request.zsk_policy.min_validity_overlap
            || overlap > request.zsk_policy.max_validity_overlap
        {
            return Err(PolicyViolation::BundleOverlap(format!(
                "overlap between bundles {} and {} ({}) outside policy bounds",
                window[0].id,
                window[1].id,
                ksrsigner_domain::duration::format_duration(overlap)
            )));
        }
    }
    info!("KSR-BUNDLE-OVERLAP: all overlaps accepted");
    Ok(())
}

fn check_bundle_cardinality(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    for (i, bundle) in request.bundles.iter().enumerate() {
        if let Some(expected) = policy.num_keys_per_bundle.get(i) {
            let actual = bundle.keys.len() as u32;
            if actual != *expected {
                return Err(PolicyViolation::BundleCardinality(format!(
                    "bundle {} has {} keys, expected {}",
                    bundle.id, actual, expected
                )));
            }
        }
    }

    let mut distinct = std::collections::HashSet::new();
    for bundle in &request.bundles {
        for key in &bundle.keys {
            distinct.insert(&key.key_identifier);
        }
    }
    if distinct.len() as u32 != policy.num_different_keys_in_all_bundles {
        return Err(PolicyViolation::BundleCardinality(format!(
            "request has {} distinct keys across all bundles, expected {}",
            distinct.len(),
            policy.num_different_keys_in_all_bundles
        )));
    }

    info!("KSR-BUNDLE-CARDINALITY: key counts accepted");
    Ok(())
}

fn check_policy_alg(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    if !policy.signature_algorithms_match_zsk_policy {
        warn!("KSR-POLICY-ALG: disabled by policy (signature_algorithms_match_zsk_policy)");
        return Ok(());
    }
    for alg_policy in &request.zsk_policy.algorithms {
        let algorithm = alg_policy.algorithm();
        if algorithm.is_ecdsa() && !policy.enable_unsupported_ecdsa {
            return Err(PolicyViolation::PolicyAlg(format!(
                "ECDSA algorithm {} present but enable_unsupported_ecdsa is false",
                algorithm.name()
            )));
        }
        if !policy.approved_algorithms.iter().any(|a| a == algorithm.name()) {
            return Err(PolicyViolation::PolicyAlg(format!(
                "algorithm {} not in approved_algorithms {:?}",
                algorithm.name(),
                policy.approved_algorithms
            )));
        }
    }
    info!("KSR-POLICY-ALG: all algorithms approved");
    Ok(())
}

fn check_policy_sig_horizon(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    if !policy.signature_check_expire_horizon {
        warn!("KSR-POLICY-SIG-HORIZON: disabled by policy (signature_check_expire_horizon)");
        return Ok(());
    }
    let horizon = chrono::Utc::now() + chrono::Duration::days(policy.signature_horizon_days as i64);
    for bundle in &request.bundles {
        for signature in &bundle.signatures {
            if signature.signature_expiration > horizon {
                return Err(PolicyViolation::PolicySigHorizon(format!(
                    "signature by {} in bundle {} expires at {}, beyond the {}-day horizon",
                    signature.key_identifier, bundle.id, signature.signature_expiration, policy.signature_horizon_days
                )));
            }
        }
    }
    info!("KSR-POLICY-SIG-HORIZON: all signature expirations within horizon");
    Ok(())
}

fn check_policy_keys(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    for alg_policy in &request.zsk_policy.algorithms {
        if let AlgorithmPolicy::Rsa { bits, exponent, .. } = alg_policy {
            if !policy.rsa_approved_key_sizes.contains(bits) {
                return Err(PolicyViolation::PolicyKeys(format!(
                    "RSA key size {bits} not in approved sizes {:?}",
                    policy.rsa_approved_key_sizes
                )));
            }
            if !policy.rsa_approved_exponents.contains(exponent) {
                return Err(PolicyViolation::PolicyKeys(format!(
                    "RSA exponent {exponent} not in approved exponents {:?}",
                    policy.rsa_approved_exponents
                )));
            }
        }
    }
    info!("KSR-POLICY-KEYS: all key parameters approved");
    Ok(())
}

fn check_policy_sig_validity(request: &Request, policy: &RequestPolicy) -> Result<(), PolicyViolation> {
    if !policy.signature_validity_match_zsk_policy {
        warn!("KSR-POLICY-SIG-VALIDITY: disabled by policy (signature_validity_match_zsk_policy)");
        return Ok(());
    }
    for bundle in &request.bundles {
        for signature in &bundle.signatures {
            let validity = signature.signature_expiration - signature.signature_inception;
            if validity < request.zsk_policy.min_signature_validity
                || validity > request.zsk_policy.max_signature_validity
            {
                return Err(PolicyViolation::PolicySigValidity(format!(
                    "signature by {} in bundle {} has validity {}, outside policy bounds",
                    signature.key_identifier,
                    bundle.id,
                    ksrsigner_domain::duration::format_duration(validity)
                )));
            }
        }
    }
    info!("KSR-POLICY-SIG-VALIDITY: all signature validities accepted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn rejects_unknown_domain() {
        let mut request = sample_request();
        request.domain = "example.".to_string();
        let policy = RequestPolicy::default();
        let err = validate_request(&request, &policy, &AlwaysValid).unwrap_err();
        assert_eq!(err.code(), "KSR-DOMAIN");
    }

    #[test]
    fn rejects_duplicate_bundle_ids() {
        let mut request = sample_request();
        let dup = request.bundles[0].clone();
        request.bundles.push(dup);
        let policy = RequestPolicy {
            num_bundles: None,
            check_cycle_length: false,
            check_bundle_intervals: false,
            check_bundle_overlap: false,
            ..RequestPolicy::default()
        };
        let err = validate_request(&request, &policy, &AlwaysValid).unwrap_err();
        assert_eq!(err.code(), "KSR-BUNDLE-UNIQUE");
    }

    #[test]
    fn rejects_wrong_key_tag() {
        let mut request = sample_request();
        request.bundles[0].keys[0].key_tag += 1;
        let policy = RequestPolicy {
            num_bundles: None,
            check_cycle_length: false,
            check_bundle_intervals: false,
            check_bundle_overlap: false,
            ..RequestPolicy::default()
        };
        let err = validate_request(&request, &policy, &AlwaysValid).unwrap_err();
        assert_eq!(err.code(), "KSR-BUNDLE-KEYS");
    }
}
