//! Outbound cleanup events.
//!
//! The engine reports what it freed and never reads it back. Sinks must not
//! block or fail the operation that emitted the event.

use std::fmt;
use std::sync::Arc;

use reclaim_schema::CleanupEvent;

/// Receives one event per removing operation.
pub trait EventSink: Send + Sync + fmt::Debug {
    fn emit(&self, event: &CleanupEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &CleanupEvent) {
        (**self).emit(event);
    }
}

/// Discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &CleanupEvent) {}
}

/// Forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &CleanupEvent) {
        tracing::info!(
            target: "reclaim::events",
            kind = %event.kind,
            bytes = event.bytes_freed,
            source = event.source.as_deref().unwrap_or(""),
            at = %event.timestamp.to_rfc3339(),
            "Space reclaimed"
        );
    }
}
