//! Dispatch tokens.
//!
//! Tokens are minted sequentially by the registry, starting from 1, and are
//! never reused after unregistration. They are the only handle callers hold
//! to a registered callback: they key unregistration and express `wait_for`
//! dependencies.

use std::fmt;

/// Opaque handle identifying one registered callback.
///
/// Equality is identity-based: two tokens compare equal only when they came
/// from the same registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchToken(u64);

impl DispatchToken {
    /// Mint a token from a registry-assigned id.
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for DispatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
