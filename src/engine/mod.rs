//! Transfer engine.
//!
//! The scheduler hands each queued task to one worker, which runs it
//! through the copy/verify pipeline and, under move mode, the source
//! release step.

mod mover;
mod pipeline;
pub(crate) mod scheduler;
mod stream;
