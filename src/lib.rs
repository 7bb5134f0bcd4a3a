//! # flux-dispatcher
//!
//! Single-threaded action dispatcher in the Flux style: a central hub every
//! application action flows through, fanning out to registered callbacks in
//! registration order with `wait_for` dependency resolution between them.
//!
//! ## Architecture
//!
//! - **Registry**: token -> callback storage, insertion-ordered, sequential
//!   token minting
//! - **Dispatch engine**: per-dispatch session state, registration-order
//!   fan-out, recursive `wait_for` resolution with cycle detection
//!
//! During one dispatch each callback runs exactly once. A callback may call
//! [`Dispatcher::wait_for`] to have other callbacks complete before it
//! proceeds; the engine runs those dependencies inline, recursively, and
//! reports a [`DispatchError::CircularDependency`] with the offending token
//! chain if the waits loop.
//!
//! ## Example
//!
//! ```
//! use flux_dispatcher::Dispatcher;
//!
//! # fn main() -> flux_dispatcher::Result<()> {
//! let dispatcher: Dispatcher<String> = Dispatcher::new();
//!
//! let store = dispatcher.receive(|_, action| {
//!     println!("store handling {action}");
//!     Ok(())
//! })?;
//!
//! dispatcher.receive(move |d, action| {
//!     d.wait_for(&[store])?; // store updates first
//!     println!("view reacting to {action}");
//!     Ok(())
//! })?;
//!
//! dispatcher.dispatch("add-todo".to_string())?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod legacy;
pub mod registry;

mod dispatcher;
mod token;

pub use dispatcher::{Callback, CallbackResult, Dispatcher};
pub use error::{DispatchError, Result};
pub use token::DispatchToken;
