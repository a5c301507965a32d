//! Destinations for change events emitted during a synchronization pass.

mod log_sink;

use std::io;

pub use log_sink::{LogSink, LogSinkCreationError};

use crate::sync::ChangeEvent;

/// Receives every change event, in the order the actions were applied.
///
/// A failing sink aborts the pass it was called from.
pub trait ChangeSink {
    fn record(&mut self, event: &ChangeEvent) -> io::Result<()>;
}

impl ChangeSink for Vec<ChangeEvent> {
    fn record(&mut self, event: &ChangeEvent) -> io::Result<()> {
        self.push(event.clone());
        Ok(())
    }
}
