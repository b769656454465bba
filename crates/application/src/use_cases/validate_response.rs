//! Response Validator (SPEC_FULL.md §4.5): a reduced re-check run over the
//! just-produced SKR before it is persisted.
//!
//! Grounded on the same orchestration style as
//! [`crate::use_cases::validate_request`], with the check-set cut down to
//! what `verify_bundles.py` actually reuses for SKR verification
//! (`num_bundles`, per-bundle signature verification, id uniqueness).

use crate::ports::signature_verifier::SignatureVerifier;
use ksrsigner_domain::model::{Response, ResponsePolicy};
use ksrsigner_domain::PolicyViolation;
use std::collections::HashSet;
use tracing::info;

pub fn validate_response(
    response: &Response,
    policy: &ResponsePolicy,
    verifier: &dyn SignatureVerifier,
) -> Result<(), PolicyViolation> {
    check_bundle_count(response, policy)?;
    check_bundle_unique(response)?;
    check_bundle_pop(response, policy, verifier)?;
    Ok(())
}

fn check_bundle_count(response: &Response, policy: &ResponsePolicy) -> Result<(), PolicyViolation> {
    let count = response.bundles.len() as u32;
    if let Some(expected) = policy.num_bundles {
        if count != expected {
            return Err(PolicyViolation::BundleCount(format!(
                "response has {count} bundles, expected {expected}"
            )));
        }
    }
    info!(count, "KSR-BUNDLE-COUNT: response bundle count accepted");
    Ok(())
}

fn check_bundle_unique(response: &Response) -> Result<(), PolicyViolation> {
    let mut seen = HashSet::new();
    for bundle in &response.bundles {
        if !seen.insert(bundle.id.clone()) {
            return Err(PolicyViolation::BundleUnique(format!(
                "more than one response bundle with id {}",
                bundle.id
            )));
        }
    }
    info!("KSR-BUNDLE-UNIQUE: response bundle ids unique");
    Ok(())
}

fn check_bundle_pop(
    response: &Response,
    policy: &ResponsePolicy,
    verifier: &dyn SignatureVerifier,
) -> Result<(), PolicyViolation> {
    if !policy.validate_signatures {
        tracing::warn!("KSR-BUNDLE-POP: disabled by policy (validate_signatures)");
        return Ok(());
    }
    for bundle in &response.bundles {
        for signature in &bundle.signatures {
            let key = bundle.key(&signature.key_identifier).ok_or_else(|| {
                PolicyViolation::BundlePop(format!(
                    "response signature in bundle {} refers to unknown key {}",
                    bundle.id, signature.key_identifier
                ))
            })?;
            let valid = verifier
                .verify(bundle, key, signature)
                .map_err(PolicyViolation::BundlePop)?;
            if !valid {
                return Err(PolicyViolation::BundlePop(format!(
                    "invalid signature in produced response bundle {}",
                    bundle.id
                )));
            }
        }
    }
    info!("KSR-BUNDLE-POP: all produced signatures verify");
    Ok(())
}
