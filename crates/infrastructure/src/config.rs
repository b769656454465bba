//! YAML configuration loader (SPEC_FULL.md §4.7, §6).
//!
//! Follows the `Spec`/`parse()` split used by the policy-file style in the
//! wider zone-signing ecosystem (`other_examples/…NLnetLabs-cascade…
//! policy-file-v1.rs`): a `#[serde(deny_unknown_fields, default)]` wire
//! struct per section, with a `parse()` method converting it into the
//! immutable domain type. Unknown fields are a hard `ConfigurationError`
//! (required by scenario S2).

use ksrsigner_domain::model::{
    AlgorithmDnssec, KskKey, KskPolicy, RequestPolicy, ResponsePolicy, Schema, SchemaAction,
    SignaturePolicy,
};
use ksrsigner_domain::{duration, ConfigurationError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn default_empty() -> Vec<String> {
    Vec::new()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct SchemaActionSpec {
    #[serde(default = "default_empty", deserialize_with = "one_or_many_or_empty")]
    publish: Vec<String>,
    #[serde(default = "default_empty", deserialize_with = "one_or_many_or_empty")]
    sign: Vec<String>,
    #[serde(default = "default_empty", deserialize_with = "one_or_many_or_empty")]
    revoke: Vec<String>,
}

impl Default for SchemaActionSpec {
    fn default() -> Self {
        Self {
            publish: Vec::new(),
            sign: Vec::new(),
            revoke: Vec::new(),
        }
    }
}

fn one_or_many_or_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: OneOrMany = Deserialize::deserialize(deserializer)?;
    Ok(value.into())
}

impl SchemaActionSpec {
    fn parse(self) -> SchemaAction {
        SchemaAction {
            publish: self.publish,
            sign: self.sign,
            revoke: self.revoke,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct SchemaSpec(BTreeMap<u32, SchemaActionSpec>);

impl SchemaSpec {
    fn parse(self, name: String) -> Schema {
        Schema {
            name,
            actions: self.0.into_iter().map(|(slot, action)| (slot, action.parse())).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct KskKeySpec {
    description: String,
    label: String,
    key_tag: u16,
    algorithm: String,
    valid_from: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    valid_until: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    rsa_size: Option<u16>,
    #[serde(default)]
    rsa_exponent: Option<u32>,
    #[serde(default)]
    ds_sha256: Option<String>,
}

impl KskKeySpec {
    fn parse(self) -> Result<KskKey, ConfigurationError> {
        let algorithm = parse_algorithm(&self.algorithm)?;
        Ok(KskKey {
            description: self.description,
            label: self.label,
            key_tag: self.key_tag,
            algorithm,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            rsa_size: self.rsa_size,
            rsa_exponent: self.rsa_exponent,
            ds_sha256: self.ds_sha256,
        })
    }
}

fn parse_algorithm(name: &str) -> Result<AlgorithmDnssec, ConfigurationError> {
    match name {
        "RSASHA1" => Ok(AlgorithmDnssec::RsaSha1),
        "RSASHA256" => Ok(AlgorithmDnssec::RsaSha256),
        "RSASHA512" => Ok(AlgorithmDnssec::RsaSha512),
        "ECDSAP256SHA256" => Ok(AlgorithmDnssec::EcdsaP256Sha256),
        "ECDSAP384SHA384" => Ok(AlgorithmDnssec::EcdsaP384Sha384),
        other => Err(ConfigurationError::InvalidValue {
            field: "algorithm".to_string(),
            reason: format!("unknown DNSSEC algorithm name {other:?}"),
        }),
    }
}

fn parse_duration(field: &str, value: &str) -> Result<chrono::Duration, ConfigurationError> {
    duration::period(value).map_err(|_| ConfigurationError::InvalidValue {
        field: field.to_string(),
        reason: format!("not a valid ISO-8601 period: {value:?}"),
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct KskPolicySpec {
    #[serde(default = "default_ttl")]
    ttl: u32,
    #[serde(default = "default_signers_name")]
    signers_name: String,
    publish_safety: String,
    retire_safety: String,
    min_signature_validity: String,
    max_signature_validity: String,
    min_validity_overlap: String,
    max_validity_overlap: String,
}

fn default_ttl() -> u32 {
    172_800
}

fn default_signers_name() -> String {
    ".".to_string()
}

impl KskPolicySpec {
    fn parse(self) -> Result<KskPolicy, ConfigurationError> {
        Ok(KskPolicy {
            signature_policy: SignaturePolicy {
                publish_safety: parse_duration("ksk_policy.publish_safety", &self.publish_safety)?,
                retire_safety: parse_duration("ksk_policy.retire_safety", &self.retire_safety)?,
                max_signature_validity: parse_duration(
                    "ksk_policy.max_signature_validity",
                    &self.max_signature_validity,
                )?,
                min_signature_validity: parse_duration(
                    "ksk_policy.min_signature_validity",
                    &self.min_signature_validity,
                )?,
                max_validity_overlap: parse_duration(
                    "ksk_policy.max_validity_overlap",
                    &self.max_validity_overlap,
                )?,
                min_validity_overlap: parse_duration(
                    "ksk_policy.min_validity_overlap",
                    &self.min_validity_overlap,
                )?,
                algorithms: vec![],
            },
            ttl: self.ttl,
            signers_name: self.signers_name,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RequestPolicySpec {
    acceptable_domains: Vec<String>,
    num_bundles: Option<u32>,
    validate_signatures: bool,
    keys_match_zsk_policy: bool,
    rsa_exponent_match_zsk_policy: bool,
    enable_unsupported_ecdsa: bool,
    check_cycle_length: bool,
    min_cycle_inception_length: String,
    max_cycle_inception_length: String,
    min_bundle_interval: String,
    max_bundle_interval: String,
    check_bundle_overlap: bool,
    signature_algorithms_match_zsk_policy: bool,
    approved_algorithms: Vec<String>,
    rsa_approved_exponents: Vec<u32>,
    rsa_approved_key_sizes: Vec<u16>,
    signature_validity_match_zsk_policy: bool,
    check_keys_match_ksk_operator_policy: bool,
    num_keys_per_bundle: Vec<u32>,
    num_different_keys_in_all_bundles: u32,
    dns_ttl: u32,
    signature_check_expire_horizon: bool,
    signature_horizon_days: u32,
    check_bundle_intervals: bool,
    check_chain_keys: bool,
    check_chain_keys_in_hsm: bool,
    check_chain_overlap: bool,
    check_keys_publish_safety: bool,
    check_keys_retire_safety: bool,
}

impl Default for RequestPolicySpec {
    fn default() -> Self {
        let defaults = RequestPolicy::default();
        Self {
            acceptable_domains: defaults.acceptable_domains,
            num_bundles: defaults.num_bundles,
            validate_signatures: defaults.validate_signatures,
            keys_match_zsk_policy: defaults.keys_match_zsk_policy,
            rsa_exponent_match_zsk_policy: defaults.rsa_exponent_match_zsk_policy,
            enable_unsupported_ecdsa: defaults.enable_unsupported_ecdsa,
            check_cycle_length: defaults.check_cycle_length,
            min_cycle_inception_length: duration::format_duration(defaults.min_cycle_inception_length),
            max_cycle_inception_length: duration::format_duration(defaults.max_cycle_inception_length),
            min_bundle_interval: duration::format_duration(defaults.min_bundle_interval),
            max_bundle_interval: duration::format_duration(defaults.max_bundle_interval),
            check_bundle_overlap: defaults.check_bundle_overlap,
            signature_algorithms_match_zsk_policy: defaults.signature_algorithms_match_zsk_policy,
            approved_algorithms: defaults.approved_algorithms,
            rsa_approved_exponents: defaults.rsa_approved_exponents,
            rsa_approved_key_sizes: defaults.rsa_approved_key_sizes,
            signature_validity_match_zsk_policy: defaults.signature_validity_match_zsk_policy,
            check_keys_match_ksk_operator_policy: defaults.check_keys_match_ksk_operator_policy,
            num_keys_per_bundle: defaults.num_keys_per_bundle,
            num_different_keys_in_all_bundles: defaults.num_different_keys_in_all_bundles,
            dns_ttl: defaults.dns_ttl,
            signature_check_expire_horizon: defaults.signature_check_expire_horizon,
            signature_horizon_days: defaults.signature_horizon_days,
            check_bundle_intervals: defaults.check_bundle_intervals,
            check_chain_keys: defaults.check_chain_keys,
            check_chain_keys_in_hsm: defaults.check_chain_keys_in_hsm,
            check_chain_overlap: defaults.check_chain_overlap,
            check_keys_publish_safety: defaults.check_keys_publish_safety,
            check_keys_retire_safety: defaults.check_keys_retire_safety,
        }
    }
}

impl RequestPolicySpec {
    fn parse(self) -> Result<RequestPolicy, ConfigurationError> {
        Ok(RequestPolicy {
            acceptable_domains: self.acceptable_domains,
            num_bundles: self.num_bundles,
            validate_signatures: self.validate_signatures,
            keys_match_zsk_policy: self.keys_match_zsk_policy,
            rsa_exponent_match_zsk_policy: self.rsa_exponent_match_zsk_policy,
            enable_unsupported_ecdsa: self.enable_unsupported_ecdsa,
            check_cycle_length: self.check_cycle_length,
            min_cycle_inception_length: parse_duration(
                "request_policy.min_cycle_inception_length",
                &self.min_cycle_inception_length,
            )?,
            max_cycle_inception_length: parse_duration(
                "request_policy.max_cycle_inception_length",
                &self.max_cycle_inception_length,
            )?,
            min_bundle_interval: parse_duration(
                "request_policy.min_bundle_interval",
                &self.min_bundle_interval,
            )?,
            max_bundle_interval: parse_duration(
                "request_policy.max_bundle_interval",
                &self.max_bundle_interval,
            )?,
            check_bundle_overlap: self.check_bundle_overlap,
            signature_algorithms_match_zsk_policy: self.signature_algorithms_match_zsk_policy,
            approved_algorithms: self.approved_algorithms,
            rsa_approved_exponents: self.rsa_approved_exponents,
            rsa_approved_key_sizes: self.rsa_approved_key_sizes,
            signature_validity_match_zsk_policy: self.signature_validity_match_zsk_policy,
            check_keys_match_ksk_operator_policy: self.check_keys_match_ksk_operator_policy,
            num_keys_per_bundle: self.num_keys_per_bundle,
            num_different_keys_in_all_bundles: self.num_different_keys_in_all_bundles,
            dns_ttl: self.dns_ttl,
            signature_check_expire_horizon: self.signature_check_expire_horizon,
            signature_horizon_days: self.signature_horizon_days,
            check_bundle_intervals: self.check_bundle_intervals,
            check_chain_keys: self.check_chain_keys,
            check_chain_keys_in_hsm: self.check_chain_keys_in_hsm,
            check_chain_overlap: self.check_chain_overlap,
            check_keys_publish_safety: self.check_keys_publish_safety,
            check_keys_retire_safety: self.check_keys_retire_safety,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct ResponsePolicySpec {
    num_bundles: Option<u32>,
    validate_signatures: bool,
}

impl Default for ResponsePolicySpec {
    fn default() -> Self {
        let defaults = ResponsePolicy::default();
        Self {
            num_bundles: defaults.num_bundles,
            validate_signatures: defaults.validate_signatures,
        }
    }
}

impl ResponsePolicySpec {
    fn parse(self) -> ResponsePolicy {
        ResponsePolicy {
            num_bundles: self.num_bundles,
            validate_signatures: self.validate_signatures,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct FilenamesSpec {
    input_ksr: Option<String>,
    output_skr: Option<String>,
    previous_skr: Option<String>,
    output_trustanchor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigSpec {
    #[serde(default)]
    hsm: serde_yaml::Value,
    keys: HashMap<String, KskKeySpec>,
    ksk_policy: KskPolicySpec,
    #[serde(default)]
    request_policy: RequestPolicySpec,
    #[serde(default)]
    response_policy: ResponsePolicySpec,
    #[serde(default)]
    schemas: HashMap<String, SchemaSpec>,
    #[serde(default)]
    filenames: FilenamesSpec,
}

/// Parsed, validated configuration (§6).
#[derive(Debug, Clone)]
pub struct Config {
    pub hsm: serde_yaml::Value,
    pub keys: HashMap<String, KskKey>,
    pub ksk_policy: KskPolicy,
    pub request_policy: RequestPolicy,
    pub response_policy: ResponsePolicy,
    pub schemas: HashMap<String, Schema>,
    pub filenames: Filenames,
}

#[derive(Debug, Clone, Default)]
pub struct Filenames {
    pub input_ksr: Option<String>,
    pub output_skr: Option<String>,
    pub previous_skr: Option<String>,
    pub output_trustanchor: Option<String>,
}

/// Load and validate a configuration file at `path`.
pub fn load_config(path: &Path) -> Result<Config, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&text)
}

/// Parse configuration text directly (used by the CLI driver's policy
/// override merging and by tests).
pub fn parse_config(text: &str) -> Result<Config, ConfigurationError> {
    let spec: ConfigSpec = serde_yaml::from_str(text).map_err(|e| ConfigurationError::Yaml(e.to_string()))?;

    let mut keys = HashMap::with_capacity(spec.keys.len());
    for (name, key) in spec.keys {
        keys.insert(name, key.parse()?);
    }

    let mut schemas = HashMap::with_capacity(spec.schemas.len());
    for (name, schema) in spec.schemas {
        schemas.insert(name.clone(), schema.parse(name));
    }

    Ok(Config {
        hsm: spec.hsm,
        keys,
        ksk_policy: spec.ksk_policy.parse()?,
        request_policy: spec.request_policy.parse()?,
        response_policy: spec.response_policy.parse(),
        schemas,
        filenames: Filenames {
            input_ksr: spec.filenames.input_ksr,
            output_skr: spec.filenames.output_skr,
            previous_skr: spec.filenames.previous_skr,
            output_trustanchor: spec.filenames.output_trustanchor,
        },
    })
}

/// Load a standalone `request_policy.yaml` override, applying defaults for
/// any field it omits (§4.7, scenario S1).
pub fn load_request_policy(path: &Path) -> Result<RequestPolicy, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let spec: RequestPolicySpec =
        serde_yaml::from_str(&text).map_err(|e| ConfigurationError::Yaml(e.to_string()))?;
    spec.parse()
}

/// Load a standalone `response_policy.yaml` override.
pub fn load_response_policy(path: &Path) -> Result<ResponsePolicy, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let spec: ResponsePolicySpec =
        serde_yaml::from_str(&text).map_err(|e| ConfigurationError::Yaml(e.to_string()))?;
    Ok(spec.parse())
}
