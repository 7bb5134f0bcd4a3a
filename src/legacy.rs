//! Deprecated view/server action surface.
//!
//! Historically, actions were dispatched through separate entry points
//! depending on where they originated - `handle_view_action` for UI-initiated
//! actions and `handle_server_action` for ones arriving from a backend - and
//! callbacks registered via `register` received a [`DispatcherMessage`]
//! pairing the action with its [`ActionSource`]. That split carried no engine
//! semantics, so the distinction lives on only here, as thin forwarding shims
//! over [`Dispatcher::dispatch`] and [`Dispatcher::receive`]. New code should
//! dispatch bare actions and register with `receive`.

use crate::dispatcher::{CallbackResult, Dispatcher};
use crate::error::Result;
use crate::token::DispatchToken;

/// Where a legacy action originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionSource {
    /// Action raised by the view layer (user interaction).
    View,
    /// Action raised in response to a server event.
    Server,
}

/// A legacy action wrapper: the action plus its origin tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherMessage<A> {
    /// Where the action came from.
    pub source: ActionSource,
    /// The wrapped action.
    pub action: A,
}

impl<A> DispatcherMessage<A> {
    /// Wrap an action with its origin.
    pub fn new(source: ActionSource, action: A) -> Self {
        Self { source, action }
    }
}

impl<A: 'static> Dispatcher<DispatcherMessage<A>> {
    /// Dispatch an action tagged as view-originated.
    #[deprecated(note = "use `dispatch` instead of source-tagged entry points")]
    pub fn handle_view_action(&self, action: A) -> Result<()> {
        self.dispatch(DispatcherMessage::new(ActionSource::View, action))
    }

    /// Dispatch an action tagged as server-originated.
    #[deprecated(note = "use `dispatch` instead of source-tagged entry points")]
    pub fn handle_server_action(&self, action: A) -> Result<()> {
        self.dispatch(DispatcherMessage::new(ActionSource::Server, action))
    }

    /// Register a callback receiving wrapped [`DispatcherMessage`]s.
    ///
    /// Identical to [`receive`](Dispatcher::receive); the historical name is
    /// kept for callers migrating off the tagged-message API.
    #[deprecated(note = "use `receive` instead")]
    pub fn register<F>(&self, callback: F) -> Result<DispatchToken>
    where
        F: Fn(&Dispatcher<DispatcherMessage<A>>, &DispatcherMessage<A>) -> CallbackResult
            + 'static,
    {
        self.receive(callback)
    }
}
