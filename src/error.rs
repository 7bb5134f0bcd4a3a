//! Error types for flux-dispatcher.

use thiserror::Error;

use crate::token::DispatchToken;

/// Main error type for all dispatcher operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The token does not refer to a currently registered callback.
    #[error("no callback registered for token {0}")]
    UnknownToken(DispatchToken),

    /// `dispatch` was called while another dispatch is already in progress.
    ///
    /// Only `wait_for`, called from inside an executing callback, may re-enter
    /// the engine during a dispatch.
    #[error("cannot dispatch while a dispatch is already in progress")]
    AlreadyDispatching,

    /// `wait_for` was called outside of a dispatch.
    #[error("cannot wait for callbacks while not dispatching")]
    NotDispatching,

    /// `receive` was called while a dispatch is in progress.
    #[error("cannot register a callback while a dispatch is in progress")]
    RegisterDuringDispatch,

    /// `unregister` was called while a dispatch is in progress.
    #[error("cannot unregister a callback while a dispatch is in progress")]
    UnregisterDuringDispatch,

    /// A `wait_for` chain loops back onto a callback that is still running.
    ///
    /// Carries the chain of tokens being resolved, from the first token on the
    /// cycle down to the repeated one (e.g. `#1 -> #2 -> #1`).
    #[error("circular dependency detected: {}", format_cycle(.0))]
    CircularDependency(Vec<DispatchToken>),

    /// `wait_for` named a token whose callback already failed earlier in the
    /// same dispatch. A failed callback is never re-invoked and never
    /// satisfies a wait.
    #[error("cannot wait for token {0}: its callback failed earlier in this dispatch")]
    FailedDependency(DispatchToken),

    /// A registered callback returned an error.
    #[error("callback for token {token} failed: {source}")]
    Callback {
        /// Token of the failing callback.
        token: DispatchToken,
        /// The error the callback returned.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;

fn format_cycle(chain: &[DispatchToken]) -> String {
    chain
        .iter()
        .map(DispatchToken::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
