//! File-based configuration loader scenarios (SPEC_FULL.md §4.7, §8 S1/S2),
//! exercising `load_config` against real files on disk rather than the
//! in-memory `serde_yaml::from_str` calls already covered inline in
//! `config.rs`.

use ksrsigner_domain::ConfigurationError;

const MINIMAL_CONFIG: &str = r#"
keys:
  ksk-2024:
    description: "2024 KSK"
    label: ksk-2024
    key_tag: 12345
    algorithm: RSASHA256
    valid_from: 2024-01-01T00:00:00Z
ksk_policy:
  publish_safety: P5D
  retire_safety: P5D
  min_signature_validity: P14D
  max_signature_validity: P21D
  min_validity_overlap: P9D
  max_validity_overlap: P11D
"#;

#[test]
fn loads_a_minimal_config_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ksrsigner.yaml");
    std::fs::write(&path, MINIMAL_CONFIG).unwrap();

    let config = ksrsigner_infrastructure::load_config(&path).unwrap();

    assert_eq!(config.keys.len(), 1);
    assert!(config.keys.contains_key("ksk-2024"));
    assert_eq!(config.ksk_policy.ttl, 172_800);
    // S1: request_policy is entirely absent from the file, so it must fall
    // back to RequestPolicy::default(), including num_bundles == Some(9).
    assert_eq!(config.request_policy.num_bundles, Some(9));
    assert!(config.request_policy.validate_signatures);
}

#[test]
fn rejects_a_config_file_with_an_unknown_top_level_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ksrsigner.yaml");
    let mut text = MINIMAL_CONFIG.to_string();
    text.push_str("unknown_section: true\n");
    std::fs::write(&path, text).unwrap();

    let err = ksrsigner_infrastructure::load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigurationError::Yaml(_)));
}

#[test]
fn rejects_a_request_policy_override_with_an_unknown_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("request_policy.yaml");
    std::fs::write(&path, "validate_signatures: true\nunknown_field: 1\n").unwrap();

    let err = ksrsigner_infrastructure::load_request_policy(&path).unwrap_err();
    assert!(matches!(err, ConfigurationError::Yaml(_)));
}

#[test]
fn missing_config_file_surfaces_as_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.yaml");

    let err = ksrsigner_infrastructure::load_config(&missing).unwrap_err();
    assert!(matches!(err, ConfigurationError::Io { .. }));
}
