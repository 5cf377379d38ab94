//! Per-invocation guards around the collaborators' streams and callbacks.
//!
//! Each guard wraps exactly one underlying object for the lifetime of one
//! invocation, asserts its capability subset, and forwards every permitted
//! operation unchanged. The guards of one invocation share a per-call
//! latch record, discarded when the call returns.

mod errors;
mod input;
mod output;
mod responder;
pub(crate) mod state;

pub use errors::ErrorGuard;
pub use input::InputGuard;
pub use output::BodyGuard;
pub use responder::{Responder, WriteGuard};
