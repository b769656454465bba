pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

pub use ports::{OracleKey, SignatureVerifier, SigningOracle};
pub use use_cases::{sign_bundles, validate_chain, validate_request, validate_response};
