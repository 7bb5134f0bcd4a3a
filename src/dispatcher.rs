//! Dispatch engine - session lifecycle and WaitFor dependency resolution.
//!
//! The [`Dispatcher`] fans one action out to every registered callback in
//! registration order. While a callback runs it may call
//! [`Dispatcher::wait_for`] to force other callbacks to complete first; the
//! engine resolves those dependencies by synchronous recursion on the current
//! call stack, detects cycles via a per-session resolving stack, and
//! guarantees each callback runs at most once per dispatch.
//!
//! The engine is strictly single-threaded: it holds `Rc` and `RefCell`
//! internals and is therefore neither `Send` nor `Sync`. Nested dispatch from
//! outside a callback is rejected at runtime; cross-thread use is rejected at
//! compile time.
//!
//! # Example
//!
//! ```
//! use flux_dispatcher::Dispatcher;
//!
//! # fn main() -> flux_dispatcher::Result<()> {
//! let dispatcher: Dispatcher<u32> = Dispatcher::new();
//!
//! let counter = dispatcher.receive(|_, n| {
//!     println!("counting {n}");
//!     Ok(())
//! })?;
//!
//! // Runs only after the counter callback has handled the action,
//! // regardless of registration order.
//! dispatcher.receive(move |d, n| {
//!     d.wait_for(&[counter])?;
//!     println!("after counting {n}");
//!     Ok(())
//! })?;
//!
//! dispatcher.dispatch(42)?;
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{DispatchError, Result};
use crate::registry::Registry;
use crate::token::DispatchToken;

/// Result type for callbacks. Any error aborts the current dispatch.
pub type CallbackResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Callback signature: the dispatcher is passed back in so the callback can
/// call [`Dispatcher::wait_for`] without capturing a handle to it.
pub type Callback<A> = dyn Fn(&Dispatcher<A>, &A) -> CallbackResult;

/// Per-session status of one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Not yet invoked in this dispatch.
    Pending,
    /// Currently executing somewhere on the dispatch call stack.
    Running,
    /// Completed successfully. Terminal.
    Handled,
    /// Returned an error. Terminal; never satisfies a wait.
    Failed,
}

/// Transient state of one in-progress dispatch.
///
/// Exists only while a `dispatch` call is on the stack; cleared by
/// [`SessionGuard`] on every exit path, including unwinds.
struct Session<A> {
    /// The action under dispatch. Shared so nested invocations can borrow it
    /// without holding the session open across user code.
    action: Rc<A>,
    /// Status per token, seeded `Pending` for every registered token.
    statuses: HashMap<DispatchToken, Status>,
    /// Tokens whose callbacks are on the current call stack, outermost first.
    /// Membership here means a wait on that token is a cycle.
    resolving: Vec<DispatchToken>,
}

impl<A> Session<A> {
    fn new(action: A, tokens: &[DispatchToken]) -> Self {
        Self {
            action: Rc::new(action),
            statuses: tokens.iter().map(|&t| (t, Status::Pending)).collect(),
            resolving: Vec::new(),
        }
    }

    /// The offending token chain for a cycle closing at `token`, from the
    /// first resolution of `token` down to the repeated occurrence.
    fn cycle_through(&self, token: DispatchToken) -> Vec<DispatchToken> {
        let start = self
            .resolving
            .iter()
            .position(|&t| t == token)
            .unwrap_or(0);
        let mut chain = self.resolving[start..].to_vec();
        chain.push(token);
        chain
    }
}

/// Clears the session when dropped, so dispatch state never outlives the
/// `dispatch` call even when a callback error unwinds out of it.
struct SessionGuard<'a, A>(&'a RefCell<Option<Session<A>>>);

impl<A> Drop for SessionGuard<'_, A> {
    fn drop(&mut self) {
        self.0.borrow_mut().take();
    }
}

/// Single-threaded action dispatcher.
///
/// Construct one per logical application (or per test) and pass it by
/// reference to producers and consumers; there is no process-wide singleton.
/// Callbacks registered via [`receive`](Self::receive) are invoked in
/// registration order on every [`dispatch`](Self::dispatch), except where
/// [`wait_for`](Self::wait_for) pulls a dependency forward.
pub struct Dispatcher<A: 'static> {
    registry: RefCell<Registry<A>>,
    session: RefCell<Option<Session<A>>>,
}

impl<A: 'static> Dispatcher<A> {
    /// Create a new dispatcher with no registered callbacks.
    pub fn new() -> Self {
        Self {
            registry: RefCell::new(Registry::new()),
            session: RefCell::new(None),
        }
    }

    /// Register a callback to receive every dispatched action.
    ///
    /// Returns the token that identifies the callback for
    /// [`wait_for`](Self::wait_for) and [`unregister`](Self::unregister).
    ///
    /// # Errors
    ///
    /// [`DispatchError::RegisterDuringDispatch`] while a dispatch is in
    /// progress: the in-flight session snapshot must stay authoritative for
    /// the registry's whole token set.
    pub fn receive<F>(&self, callback: F) -> Result<DispatchToken>
    where
        F: Fn(&Dispatcher<A>, &A) -> CallbackResult + 'static,
    {
        if self.is_dispatching() {
            return Err(DispatchError::RegisterDuringDispatch);
        }

        let token = self.registry.borrow_mut().receive(Rc::new(callback));
        trace!(%token, "registered callback");
        Ok(token)
    }

    /// Unregister the callback associated with `token`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnregisterDuringDispatch`] while a dispatch is in
    /// progress; [`DispatchError::UnknownToken`] if the token is not
    /// registered (including a second unregister of the same token).
    pub fn unregister(&self, token: DispatchToken) -> Result<()> {
        if self.is_dispatching() {
            return Err(DispatchError::UnregisterDuringDispatch);
        }

        self.registry.borrow_mut().unregister(token)?;
        trace!(%token, "unregistered callback");
        Ok(())
    }

    /// Whether a dispatch is currently in progress.
    pub fn is_dispatching(&self) -> bool {
        self.session.borrow().is_some()
    }

    /// Number of currently registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Dispatch `action` to every registered callback, in registration order.
    ///
    /// Each callback runs exactly once. A callback already completed through
    /// another callback's `wait_for` is skipped by the main loop. The first
    /// callback error aborts the dispatch: callbacks still pending are not
    /// invoked, the session is torn down, and the error is returned.
    ///
    /// The dispatcher remains usable after a failed dispatch; subsequent
    /// dispatches start from a clean session.
    ///
    /// # Errors
    ///
    /// [`DispatchError::AlreadyDispatching`] when called while a dispatch is
    /// in progress (including from inside a callback - `wait_for` is the only
    /// sanctioned reentry). Otherwise, whatever error the first failing
    /// callback produced: [`DispatchError::Callback`] for a plain callback
    /// error, or the underlying [`DispatchError`] itself when the callback
    /// propagated one (e.g. a cycle detected by a nested `wait_for`).
    pub fn dispatch(&self, action: A) -> Result<()> {
        if self.is_dispatching() {
            return Err(DispatchError::AlreadyDispatching);
        }

        // Snapshot the registration order; the registry cannot change while
        // the session is active.
        let order = self.registry.borrow().ordered_tokens().to_vec();
        debug!(callbacks = order.len(), "dispatch started");

        *self.session.borrow_mut() = Some(Session::new(action, &order));
        let _session = SessionGuard(&self.session);

        for token in order {
            if self.status_of(token) == Some(Status::Pending) {
                self.invoke(token)?;
            }
        }

        debug!("dispatch finished");
        Ok(())
    }

    /// Wait for the callbacks behind `tokens` to complete before returning.
    ///
    /// Legal only from inside a callback executing under a dispatch. Tokens
    /// are resolved in the order given: one already handled is a no-op, one
    /// still pending has its callback run right here, recursively, before
    /// this call returns.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotDispatching`] outside a dispatch;
    /// [`DispatchError::UnknownToken`] for an unregistered token;
    /// [`DispatchError::CircularDependency`] when the wait loops back onto a
    /// callback currently on the dispatch call stack, with the full token
    /// chain; [`DispatchError::FailedDependency`] when the named callback
    /// already failed during this dispatch; any error a recursively invoked
    /// dependency produces.
    pub fn wait_for(&self, tokens: &[DispatchToken]) -> Result<()> {
        for &token in tokens {
            let run_now = {
                let borrow = self.session.borrow();
                let session = borrow.as_ref().ok_or(DispatchError::NotDispatching)?;
                match session.statuses.get(&token) {
                    None => return Err(DispatchError::UnknownToken(token)),
                    Some(Status::Handled) => false,
                    Some(Status::Pending) => true,
                    Some(Status::Failed) => {
                        return Err(DispatchError::FailedDependency(token));
                    }
                    Some(Status::Running) => {
                        let chain = session.cycle_through(token);
                        debug!(%token, "circular dependency detected");
                        return Err(DispatchError::CircularDependency(chain));
                    }
                }
            };

            if run_now {
                trace!(%token, "wait_for pulling dependency forward");
                self.invoke(token)?;
            }
        }
        Ok(())
    }

    fn status_of(&self, token: DispatchToken) -> Option<Status> {
        self.session
            .borrow()
            .as_ref()
            .and_then(|s| s.statuses.get(&token).copied())
    }

    /// Run one callback and record its terminal status.
    ///
    /// No `RefCell` borrow is held while user code runs, so the callback is
    /// free to re-enter via `wait_for` (or to hit the `AlreadyDispatching`
    /// guard on `dispatch`).
    fn invoke(&self, token: DispatchToken) -> Result<()> {
        let callback = self.registry.borrow().lookup(token)?;

        let action = {
            let mut borrow = self.session.borrow_mut();
            let session = borrow.as_mut().ok_or(DispatchError::NotDispatching)?;
            session.statuses.insert(token, Status::Running);
            session.resolving.push(token);
            Rc::clone(&session.action)
        };

        trace!(%token, "invoking callback");
        let outcome = callback(self, &action);

        {
            let mut borrow = self.session.borrow_mut();
            if let Some(session) = borrow.as_mut() {
                session.resolving.pop();
                let status = if outcome.is_ok() {
                    Status::Handled
                } else {
                    Status::Failed
                };
                session.statuses.insert(token, status);
            }
        }

        match outcome {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!(%token, error = %err, "callback failed");
                // Dispatcher errors a callback propagated (cycle, failed
                // dependency, ...) surface as themselves; anything else is
                // wrapped with the failing token.
                Err(match err.downcast::<DispatchError>() {
                    Ok(inner) => *inner,
                    Err(source) => DispatchError::Callback { token, source },
                })
            }
        }
    }
}

impl<A: 'static> Default for Dispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}
