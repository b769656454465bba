pub mod sign_bundles;
pub mod validate_chain;
pub mod validate_request;
pub mod validate_response;

pub use sign_bundles::sign_bundles;
pub use validate_chain::validate_chain;
pub use validate_request::validate_request;
pub use validate_response::validate_response;
