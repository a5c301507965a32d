//! Periodic driver of synchronization passes.
//!
//! Passes never overlap: the next one is only scheduled after the previous
//! one returned, and ticks that elapsed in the meantime are dropped.

mod scheduler;

pub use scheduler::{Scheduler, next_deadline};
