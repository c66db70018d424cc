//! Notification events emitted by the dispatch engine.
//!
//! The engine reports everything the host needs through a single observer
//! interface: status text, percentage progress, and a terminal finished
//! event carrying the run summary. `Finished` is always the last event of
//! a run; status and progress events interleave freely before it.

use crate::engine::RunSummary;

/// A single outbound notification from a run.
#[derive(Debug, Clone)]
pub enum Event {
    /// Human-readable status text (per-move messages, errors, banners).
    Status(String),
    /// Percentage of the snapshot processed so far, 0..=100.
    Progress(u8),
    /// Terminal event; carries the outcome of the run.
    Finished(RunSummary),
}

/// Observer interface for run notifications.
///
/// The CLI implements this with colored output and a progress bar; tests
/// implement it with a collecting vector. Sinks receive events on the
/// thread that executes the run.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: Event);
}

/// No-op sink for silent operation.
pub struct SilentSink;

impl NotificationSink for SilentSink {
    fn notify(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_sink_accepts_events() {
        let sink = SilentSink;
        sink.notify(Event::Status("hello".to_string()));
        sink.notify(Event::Progress(50));
    }
}
