/// Instrumentation handle shared by all scorers of one resolution pass.
///
/// Scorers record what they were built with and, when asked, what they scored.
/// What happens to those records (HTML traces, experiment logs) is up to the
/// caller; this crate only defines the seam.

use std::sync::{Arc, Mutex};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    /// Which scorer produced the event.
    pub source: String,
    pub message: String,
}

impl TraceEvent {
    pub fn new(source: &str, message: impl Into<String>) -> Self {
        TraceEvent {
            source: source.to_string(),
            message: message.into(),
        }
    }
}

pub trait Tracer: Send + Sync {
    fn record(&self, event: TraceEvent);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullTracer;

impl Tracer for NullTracer {
    fn record(&self, _event: TraceEvent) {}
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Tracer for RecordingTracer {
    fn record(&self, event: TraceEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

pub fn null_tracer() -> Arc<dyn Tracer> {
    Arc::new(NullTracer)
}
