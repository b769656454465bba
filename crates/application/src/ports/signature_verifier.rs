//! Port for verifying an RRSIG over a bundle's DNSKEY RRset.
//!
//! Kept separate from [`crate::ports::signing_oracle::SigningOracle`]: POP
//! verification only needs public-key cryptography and never touches HSM
//! state, so it is implemented directly against `ring` in the
//! infrastructure crate without going through the oracle abstraction.

use ksrsigner_domain::model::{Bundle, Key, Signature};

pub trait SignatureVerifier {
    /// Verify that `signature` is a valid RRSIG by `key` over `bundle`'s
    /// canonical DNSKEY RRset. Returns `false` (not an error) for a
    /// cryptographically invalid signature; errors are reserved for
    /// malformed input that prevents verification from running at all.
    fn verify(&self, bundle: &Bundle, key: &Key, signature: &Signature) -> Result<bool, String>;
}
