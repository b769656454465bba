pub mod signature_verifier;
pub mod signing_oracle;

pub use signature_verifier::SignatureVerifier;
pub use signing_oracle::{OracleKey, SigningOracle};
