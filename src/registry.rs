//! Callback registry keyed by dispatch token.
//!
//! The registry owns the permanent half of a subscription: the mapping from
//! token to callback and the order in which callbacks were registered. Tokens
//! are assigned sequentially starting from 1 and are never reissued, not even
//! after the callback they named is unregistered.
//!
//! Per-dispatch bookkeeping (pending/handled state) lives in the engine, not
//! here; the registry is purely in-memory storage with no notion of a
//! dispatch being in progress. The [`Dispatcher`](crate::Dispatcher) enforces
//! the phase rules before mutating it.

use std::collections::HashMap;
use std::rc::Rc;

use crate::dispatcher::Callback;
use crate::error::{DispatchError, Result};
use crate::token::DispatchToken;

/// Registry mapping dispatch tokens to callbacks.
pub struct Registry<A: 'static> {
    /// Callbacks by token.
    callbacks: HashMap<DispatchToken, Rc<Callback<A>>>,
    /// Tokens in registration order; drives dispatch iteration.
    order: Vec<DispatchToken>,
    /// Next token id to assign. Monotonic, so tokens are never reused.
    next_token: u64,
}

impl<A: 'static> Registry<A> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            callbacks: HashMap::new(),
            order: Vec::new(),
            next_token: 1, // Start from 1, 0 is reserved
        }
    }

    /// Store a callback under a freshly minted token and return the token.
    pub fn receive(&mut self, callback: Rc<Callback<A>>) -> DispatchToken {
        let token = DispatchToken::new(self.next_token);
        self.next_token += 1;

        self.callbacks.insert(token, callback);
        self.order.push(token);
        token
    }

    /// Remove the callback registered under `token`.
    ///
    /// Unregistering a token twice is an error, not a no-op; the second call
    /// reports [`DispatchError::UnknownToken`] to surface the mistake.
    pub fn unregister(&mut self, token: DispatchToken) -> Result<()> {
        if self.callbacks.remove(&token).is_none() {
            return Err(DispatchError::UnknownToken(token));
        }
        self.order.retain(|&t| t != token);
        Ok(())
    }

    /// Get the callback registered under `token`.
    pub fn lookup(&self, token: DispatchToken) -> Result<Rc<Callback<A>>> {
        self.callbacks
            .get(&token)
            .map(Rc::clone)
            .ok_or(DispatchError::UnknownToken(token))
    }

    /// Whether `token` is currently registered.
    pub fn contains(&self, token: DispatchToken) -> bool {
        self.callbacks.contains_key(&token)
    }

    /// Tokens in registration order. Snapshot once per dispatch.
    pub fn ordered_tokens(&self) -> &[DispatchToken] {
        &self.order
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<A: 'static> Default for Registry<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{CallbackResult, Dispatcher};

    fn noop() -> Rc<Callback<i32>> {
        Rc::new(|_: &Dispatcher<i32>, _: &i32| -> CallbackResult { Ok(()) })
    }

    #[test]
    fn test_receive_assigns_distinct_tokens_in_order() {
        let mut registry: Registry<i32> = Registry::new();

        let a = registry.receive(noop());
        let b = registry.receive(noop());
        let c = registry.receive(noop());

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(registry.ordered_tokens(), &[a, b, c]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_lookup_unknown_token() {
        let mut registry: Registry<i32> = Registry::new();
        let token = registry.receive(noop());
        registry.unregister(token).unwrap();

        assert!(matches!(
            registry.lookup(token),
            Err(DispatchError::UnknownToken(t)) if t == token
        ));
    }

    #[test]
    fn test_unregister_removes_from_order() {
        let mut registry: Registry<i32> = Registry::new();
        let a = registry.receive(noop());
        let b = registry.receive(noop());
        let c = registry.receive(noop());

        registry.unregister(b).unwrap();

        assert_eq!(registry.ordered_tokens(), &[a, c]);
        assert!(!registry.contains(b));
        assert!(registry.contains(a));
    }

    #[test]
    fn test_double_unregister_is_an_error() {
        let mut registry: Registry<i32> = Registry::new();
        let token = registry.receive(noop());

        registry.unregister(token).unwrap();

        assert!(matches!(
            registry.unregister(token),
            Err(DispatchError::UnknownToken(t)) if t == token
        ));
    }

    #[test]
    fn test_tokens_not_reused_after_unregister() {
        let mut registry: Registry<i32> = Registry::new();
        let old = registry.receive(noop());
        registry.unregister(old).unwrap();

        let fresh = registry.receive(noop());

        assert_ne!(old, fresh);
        assert!(!registry.contains(old));
    }

    #[test]
    fn test_empty_registry() {
        let registry: Registry<i32> = Registry::new();

        assert!(registry.is_empty());
        assert!(registry.ordered_tokens().is_empty());
    }
}
