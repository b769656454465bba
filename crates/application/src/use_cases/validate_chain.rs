//! KSR-CHAIN-* and KSR-PREVIOUS / cross-ceremony KSR-ID checks (SPEC_FULL.md §4.3).
//!
//! Grounded on the structure of the teacher's `dns/dnssec/chain.rs` walk
//! (a top-level `verify_chain`-equivalent dispatching to per-step checks),
//! generalized from "walk delegations down from the root" to "compare the
//! last bundle of SKR(n-1) against the first bundle of KSR(n)".

use crate::ports::signing_oracle::SigningOracle;
use ksrsigner_domain::model::{Bundle, Request, RequestPolicy, Response};
use ksrsigner_domain::PolicyViolation;
use tracing::{info, warn};

pub fn validate_chain(
    request: &Request,
    previous_response: Option<&Response>,
    previous_request_ids: &[String],
    policy: &RequestPolicy,
    oracle: &dyn SigningOracle,
) -> Result<(), PolicyViolation> {
    check_id(request, previous_request_ids)?;

    let Some(previous) = previous_response else {
        warn!("KSR-CHAIN-PRE/KSR-CHAIN-POST: no previous SKR supplied, not validated");
        warn!("KSR-PREVIOUS: no previous SKR supplied, not validated");
        return Ok(());
    };

    let (Some(prev_last), Some(curr_first)) = (previous.bundles.last(), request.bundles.first())
    else {
        return Ok(());
    };

    if policy.check_chain_keys {
        check_chain_keys(prev_last, curr_first)?;
    } else {
        warn!("KSR-CHAIN-KEYS: disabled by policy (check_chain_keys)");
    }

    if policy.check_chain_overlap {
        check_chain_overlap(prev_last, curr_first, request)?;
    } else {
        warn!("KSR-CHAIN-OVERLAP: disabled by policy (check_chain_overlap)");
    }

    if policy.check_keys_publish_safety {
        check_keys_publish_safety(prev_last, curr_first, request)?;
    } else {
        warn!("KSR-CHAIN-PUBLISH-SAFETY: disabled by policy (check_keys_publish_safety)");
    }

    if policy.check_keys_retire_safety {
        check_keys_retire_safety(prev_last, curr_first, request)?;
    } else {
        warn!("KSR-CHAIN-RETIRE-SAFETY: disabled by policy (check_keys_retire_safety)");
    }

    if policy.check_chain_keys_in_hsm {
        check_chain_keys_in_hsm(previous, oracle)?;
    } else {
        warn!("KSR-PREVIOUS: disabled by policy (check_chain_keys_in_hsm)");
    }

    Ok(())
}

fn check_id(request: &Request, previous_request_ids: &[String]) -> Result<(), PolicyViolation> {
    if previous_request_ids.iter().any(|id| id == &request.id) {
        return Err(PolicyViolation::Id(format!(
            "request id {} was already used by a previous ceremony",
            request.id
        )));
    }
    info!(id = %request.id, "KSR-ID: unique against prior ceremony history");
    Ok(())
}

fn check_chain_keys(prev_last: &Bundle, curr_first: &Bundle) -> Result<(), PolicyViolation> {
    let mut prev_keys: Vec<_> = prev_last.keys.iter().collect();
    let mut curr_keys: Vec<_> = curr_first.keys.iter().collect();
    prev_keys.sort_by(|a, b| a.key_identifier.cmp(&b.key_identifier));
    curr_keys.sort_by(|a, b| a.key_identifier.cmp(&b.key_identifier));

    if prev_keys != curr_keys {
        return Err(PolicyViolation::ChainKeys(format!(
            "keys in previous SKR's last bundle ({}) do not match keys in this KSR's first bundle ({})",
            prev_last.id, curr_first.id
        )));
    }
    info!("KSR-CHAIN-KEYS: previous SKR tail matches this KSR's head");
    Ok(())
}

fn check_chain_overlap(
    prev_last: &Bundle,
    curr_first: &Bundle,
    request: &Request,
) -> Result<(), PolicyViolation> {
    let overlap = prev_last.expiration - curr_first.inception;
    let zsk_policy = &request.zsk_policy;
    if overlap < zsk_policy.min_validity_overlap || overlap > zsk_policy.max_validity_overlap {
        return Err(PolicyViolation::ChainOverlap(format!(
            "overlap between previous SKR's last bundle and this KSR's first bundle ({}) outside policy bounds",
            ksrsigner_domain::duration::format_duration(overlap)
        )));
    }
    info!("KSR-CHAIN-OVERLAP: previous/current boundary overlap accepted");
    Ok(())
}

fn check_keys_publish_safety(
    prev_last: &Bundle,
    curr_first: &Bundle,
    request: &Request,
) -> Result<(), PolicyViolation> {
    for key in &curr_first.keys {
        if prev_last.key(&key.key_identifier).is_some() {
            continue;
        }
        let lead = curr_first.inception - prev_last.inception;
        if lead < request.zsk_policy.publish_safety {
            return Err(PolicyViolation::ChainPublishSafety(format!(
                "key {} newly introduced with only {} lead time, less than publish_safety {}",
                key.key_identifier,
                ksrsigner_domain::duration::format_duration(lead),
                ksrsigner_domain::duration::format_duration(request.zsk_policy.publish_safety)
            )));
        }
    }
    info!("KSR-CHAIN-PUBLISH-SAFETY: newly introduced keys respect publish safety");
    Ok(())
}

fn check_keys_retire_safety(
    prev_last: &Bundle,
    curr_first: &Bundle,
    request: &Request,
) -> Result<(), PolicyViolation> {
    for key in &prev_last.keys {
        if curr_first.key(&key.key_identifier).is_some() {
            continue;
        }
        let lag = curr_first.inception - prev_last.expiration;
        if lag < request.zsk_policy.retire_safety {
            return Err(PolicyViolation::ChainRetireSafety(format!(
                "key {} retired with only {} lag time, less than retire_safety {}",
                key.key_identifier,
                ksrsigner_domain::duration::format_duration(lag),
                ksrsigner_domain::duration::format_duration(request.zsk_policy.retire_safety)
            )));
        }
    }
    info!("KSR-CHAIN-RETIRE-SAFETY: retired keys respect retire safety");
    Ok(())
}

fn check_chain_keys_in_hsm(
    previous: &Response,
    oracle: &dyn SigningOracle,
) -> Result<(), PolicyViolation> {
    for bundle in &previous.bundles {
        for signature in &bundle.signatures {
            if oracle.locate(&signature.key_identifier).is_err() {
                return Err(PolicyViolation::Previous(format!(
                    "key {} signed a bundle in the previous SKR but is not locatable in the signing oracle",
                    signature.key_identifier
                )));
            }
        }
    }
    info!("KSR-PREVIOUS: all previous SKR signing keys locatable in oracle");
    Ok(())
}
