//! `ksrsigner`: validates an incoming Key Signing Request against policy and
//! chain history, signs it per its configured schema, and emits a Signed
//! Key Response (SPEC_FULL.md §4.8, §6).
//!
//! Grounded on the teacher's `main.rs` shape (clap-derive `Cli`, tracing
//! bootstrap, a thin `main` delegating into library crates) generalized from
//! a long-running async server to a one-shot synchronous ceremony driver.

use clap::Parser;
use ksrsigner_application::{validate_chain, validate_request, validate_response, sign_bundles};
use ksrsigner_domain::{CeremonyError, ConfigurationError};
use ksrsigner_infrastructure::{
    decode_request, decode_response, encode_response, export_trust_anchor, from_hsm_config,
    load_request_policy, load_response_policy, init_logging, Config, RingSignatureVerifier,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ksrsigner")]
#[command(version)]
#[command(about = "Validates a root-zone KSR and signs it into an SKR")]
struct Cli {
    /// Path to the incoming KSR XML document.
    ksrfile: Option<PathBuf>,

    /// Path to write the produced SKR XML document.
    skrfile: Option<PathBuf>,

    /// Path to the YAML configuration file.
    #[arg(long, default_value = "ksrsigner.yaml")]
    config: PathBuf,

    /// Override `request_policy` with a standalone YAML file.
    #[arg(long)]
    request_policy: Option<PathBuf>,

    /// Override `response_policy` with a standalone YAML file.
    #[arg(long)]
    response_policy: Option<PathBuf>,

    /// Path to the previous ceremony's SKR, for chain validation.
    #[arg(long)]
    previous_skr: Option<PathBuf>,

    /// Raise the log level to DEBUG.
    #[arg(long)]
    debug: bool,

    /// Accepted for interface compatibility; only takes effect when this
    /// binary is built with the `syslog` feature.
    #[arg(long)]
    syslog: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if cli.syslog {
        tracing::warn!("--syslog requested but this build has no syslog feature compiled in");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "ceremony aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CeremonyError> {
    let config = load_merged_config(cli)?;

    let ksr_path = cli
        .ksrfile
        .clone()
        .or_else(|| config.filenames.input_ksr.clone().map(PathBuf::from))
        .ok_or_else(|| ConfigurationError::MissingField("KSRFILE".to_string()))?;
    let skr_path = cli
        .skrfile
        .clone()
        .or_else(|| config.filenames.output_skr.clone().map(PathBuf::from))
        .ok_or_else(|| ConfigurationError::MissingField("SKRFILE".to_string()))?;

    let ksr_xml = std::fs::read_to_string(&ksr_path).map_err(|source| ConfigurationError::Io {
        path: ksr_path.display().to_string(),
        source,
    })?;
    let request = decode_request(&ksr_xml)?;

    let previous_skr_path = cli
        .previous_skr
        .clone()
        .or_else(|| config.filenames.previous_skr.clone().map(PathBuf::from));
    let previous_response = previous_skr_path
        .map(|path| {
            let xml = std::fs::read_to_string(&path).map_err(|source| ConfigurationError::Io {
                path: path.display().to_string(),
                source,
            })?;
            decode_response(&xml).map_err(CeremonyError::from)
        })
        .transpose()?;

    let oracle = from_hsm_config(&config.hsm, &config.keys)?;
    let verifier = RingSignatureVerifier;

    validate_request(&request, &config.request_policy, &verifier)?;
    validate_chain(&request, previous_response.as_ref(), &[], &config.request_policy, &oracle)?;

    let schema = resolve_schema(&config, &request)?;
    let signed_bundles = sign_bundles(
        &request,
        &config.request_policy,
        schema,
        &config.keys,
        &config.ksk_policy,
        &oracle,
    )?;

    let response = ksrsigner_domain::model::Response {
        id: request.id.clone(),
        serial: request.serial,
        domain: request.domain.clone(),
        timestamp: chrono::Utc::now(),
        ksk_policy: config.ksk_policy.signature_policy.clone(),
        bundles: signed_bundles,
    };

    validate_response(&response, &config.response_policy, &verifier)?;

    let skr_xml = encode_response(&response)?;
    std::fs::write(&skr_path, skr_xml).map_err(|source| ConfigurationError::Io {
        path: skr_path.display().to_string(),
        source,
    })?;
    info!(path = %skr_path.display(), "SKR written");

    if let Some(trust_anchor_path) = &config.filenames.output_trustanchor {
        if let Some(last_bundle) = response.bundles.last() {
            let xml = export_trust_anchor(&request.domain, last_bundle, response.timestamp).map_err(|reason| {
                ConfigurationError::InvalidValue {
                    field: "filenames.output_trustanchor".to_string(),
                    reason,
                }
            })?;
            std::fs::write(trust_anchor_path, xml).map_err(|source| ConfigurationError::Io {
                path: trust_anchor_path.clone(),
                source,
            })?;
            info!(path = %trust_anchor_path, "trust anchor written");
        }
    }

    Ok(())
}

/// Load `--config`, then apply `--request_policy`/`--response_policy`
/// overrides on top of the config-embedded policies (§4.8 step 1).
fn load_merged_config(cli: &Cli) -> Result<Config, ConfigurationError> {
    let mut config = ksrsigner_infrastructure::load_config(&cli.config)?;

    if let Some(path) = &cli.request_policy {
        config.request_policy = load_request_policy(path)?;
    }
    if let Some(path) = &cli.response_policy {
        config.response_policy = load_response_policy(path)?;
    }

    Ok(config)
}

/// Resolve which configured schema governs this request: by exact name
/// match against the request's domain, falling back to the configuration's
/// sole schema when there is exactly one.
fn resolve_schema<'a>(
    config: &'a Config,
    request: &ksrsigner_domain::model::Request,
) -> Result<&'a ksrsigner_domain::model::Schema, ConfigurationError> {
    if let Some(schema) = config.schemas.get(&request.domain) {
        return Ok(schema);
    }
    if config.schemas.len() == 1 {
        return Ok(config.schemas.values().next().expect("len checked above"));
    }
    Err(ConfigurationError::MissingField(format!(
        "no schema named {:?} and more than one schema configured",
        request.domain
    )))
}
