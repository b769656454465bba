pub mod codec;
pub mod config;
pub mod crypto;
pub mod logging;
pub mod oracle;
pub mod trust_anchor;

pub use codec::{decode_request, decode_response, encode_request, encode_response};
pub use config::{load_config, load_request_policy, load_response_policy, Config, Filenames};
pub use crypto::RingSignatureVerifier;
pub use oracle::{from_hsm_config, SoftwareOracle};
pub use trust_anchor::export_trust_anchor;
