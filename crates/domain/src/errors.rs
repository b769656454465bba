use thiserror::Error;

/// A named policy check (e.g. `KSR-BUNDLE-POP`) that failed.
#[derive(Error, Debug)]
pub enum PolicyViolation {
    #[error("KSR-DOMAIN: {0}")]
    Domain(String),

    #[error("KSR-ID: {0}")]
    Id(String),

    #[error("KSR-BUNDLE-UNIQUE: {0}")]
    BundleUnique(String),

    #[error("KSR-BUNDLE-KEYS: {0}")]
    BundleKeys(String),

    #[error("KSR-BUNDLE-POP: {0}")]
    BundlePop(String),

    #[error("KSR-BUNDLE-COUNT: {0}")]
    BundleCount(String),

    #[error("KSR-BUNDLE-CYCLE-DURATION: {0}")]
    BundleCycleDuration(String),

    #[error("KSR-BUNDLE-INTERVALS: {0}")]
    BundleIntervals(String),

    #[error("KSR-BUNDLE-OVERLAP: {0}")]
    BundleOverlap(String),

    #[error("KSR-BUNDLE-CARDINALITY: {0}")]
    BundleCardinality(String),

    #[error("KSR-POLICY-ALG: {0}")]
    PolicyAlg(String),

    #[error("KSR-POLICY-SIG-HORIZON: {0}")]
    PolicySigHorizon(String),

    #[error("KSR-POLICY-KEYS: {0}")]
    PolicyKeys(String),

    #[error("KSR-POLICY-SIG-VALIDITY: {0}")]
    PolicySigValidity(String),

    #[error("KSR-CHAIN-KEYS: {0}")]
    ChainKeys(String),

    #[error("KSR-CHAIN-OVERLAP: {0}")]
    ChainOverlap(String),

    #[error("KSR-CHAIN-PUBLISH-SAFETY: {0}")]
    ChainPublishSafety(String),

    #[error("KSR-CHAIN-RETIRE-SAFETY: {0}")]
    ChainRetireSafety(String),

    #[error("KSR-PREVIOUS: {0}")]
    Previous(String),
}

impl PolicyViolation {
    /// The bare check code, e.g. `"KSR-BUNDLE-POP"`, for structured logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(_) => "KSR-DOMAIN",
            Self::Id(_) => "KSR-ID",
            Self::BundleUnique(_) => "KSR-BUNDLE-UNIQUE",
            Self::BundleKeys(_) => "KSR-BUNDLE-KEYS",
            Self::BundlePop(_) => "KSR-BUNDLE-POP",
            Self::BundleCount(_) => "KSR-BUNDLE-COUNT",
            Self::BundleCycleDuration(_) => "KSR-BUNDLE-CYCLE-DURATION",
            Self::BundleIntervals(_) => "KSR-BUNDLE-INTERVALS",
            Self::BundleOverlap(_) => "KSR-BUNDLE-OVERLAP",
            Self::BundleCardinality(_) => "KSR-BUNDLE-CARDINALITY",
            Self::PolicyAlg(_) => "KSR-POLICY-ALG",
            Self::PolicySigHorizon(_) => "KSR-POLICY-SIG-HORIZON",
            Self::PolicyKeys(_) => "KSR-POLICY-KEYS",
            Self::PolicySigValidity(_) => "KSR-POLICY-SIG-VALIDITY",
            Self::ChainKeys(_) => "KSR-CHAIN-KEYS",
            Self::ChainOverlap(_) => "KSR-CHAIN-OVERLAP",
            Self::ChainPublishSafety(_) => "KSR-CHAIN-PUBLISH-SAFETY",
            Self::ChainRetireSafety(_) => "KSR-CHAIN-RETIRE-SAFETY",
            Self::Previous(_) => "KSR-PREVIOUS",
        }
    }
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("signing key not found: {0}")]
    KeyNotFound(String),

    #[error("HSM I/O error: {0}")]
    Io(String),

    #[error("signing operation failed for key {label}: {reason}")]
    SigningFailed { label: String, reason: String },

    #[error("unsupported algorithm for key {0}")]
    UnsupportedAlgorithm(String),
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("malformed RFC 3110 RSA key encoding: {0}")]
    RsaEncoding(String),

    #[error("malformed base64 data: {0}")]
    Base64(String),

    #[error("malformed ISO-8601 duration {0:?}")]
    Duration(String),
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("unknown configuration field: {0}")]
    UnknownField(String),

    #[error("missing required configuration field: {0}")]
    MissingField(String),

    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(String),
}

/// Top-level error for the ceremony pipeline; the CLI driver maps this to an exit code.
#[derive(Error, Debug)]
pub enum CeremonyError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
