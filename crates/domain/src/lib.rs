//! Core data model, error taxonomy, and pure codecs for the KSR/SKR
//! key-signing ceremony.
pub mod duration;
pub mod errors;
pub mod keytag;
pub mod model;
pub mod rsa_codec;

pub use errors::{CeremonyError, CodecError, ConfigurationError, OracleError, PolicyViolation};
pub use keytag::calculate_key_tag;
pub use model::{
    flags, AlgorithmDnssec, AlgorithmPolicy, Bundle, Key, KskKey, KskPolicy, Request,
    RequestPolicy, Response, ResponsePolicy, Schema, SchemaAction, Signature, SignaturePolicy,
    TYPE_COVERED_DNSKEY,
};
