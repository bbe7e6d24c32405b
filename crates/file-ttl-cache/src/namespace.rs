//! Namespace derivation
//!
//! A namespace isolates one remote address's cache rows from another's,
//! so two clients pointed at different instances never share entries.
//! Derivation is a pure function of the address: every client pointed at
//! the same service resolves to the same directory.

use sha2::{Digest, Sha256};
use std::fmt;

const NAMESPACE_HEX_LEN: usize = 16;

/// Opaque cache-isolation identifier derived from a remote address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache namespace for a remote base address
///
/// Trivially-equivalent spellings (case, trailing slashes, surrounding
/// whitespace) normalize to the same namespace.
pub fn derive_namespace(address: &str) -> Namespace {
    let normalized = address.trim().trim_end_matches('/').to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hex::encode(hasher.finalize());
    Namespace(digest[..NAMESPACE_HEX_LEN].to_string())
}
