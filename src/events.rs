//! Structured extraction events and the sinks that receive them.
//!
//! The pipeline never writes to a global logger. It records events into the
//! `EventSink` it was built with; `TracingSink` forwards them to `tracing`.

use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// One observable step of an extraction or a streaming session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExtractionEvent {
    Decoded {
        format: String,
        width: u32,
        height: u32,
    },
    Downscaled {
        from: (u32, u32),
        to: (u32, u32),
    },
    Clustered {
        requested: usize,
        effective: usize,
        distinct_colors: usize,
        score: f32,
    },
    Extracted {
        colors: Vec<String>,
    },
    Rejected {
        reason: String,
    },
    FrameCompleted {
        frame: u64,
        colors: Vec<String>,
    },
    FrameFailed {
        frame: u64,
        reason: String,
    },
    SessionClosed {
        frames: u64,
        failed: u64,
    },
}

/// Receiver of extraction events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &ExtractionEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &ExtractionEvent) {
        match event {
            ExtractionEvent::Decoded { format, width, height } => {
                debug!(%format, width, height, "decoded image");
            }
            ExtractionEvent::Downscaled { from, to } => {
                debug!(?from, ?to, "downscaled image");
            }
            ExtractionEvent::Clustered {
                requested,
                effective,
                distinct_colors,
                score,
            } => {
                debug!(requested, effective, distinct_colors, score, "clustered pixels");
            }
            ExtractionEvent::Extracted { colors } => {
                info!(?colors, "extracted dominant colors");
            }
            ExtractionEvent::Rejected { reason } => {
                warn!(%reason, "rejected image");
            }
            ExtractionEvent::FrameCompleted { frame, colors } => {
                debug!(frame, ?colors, "frame processed");
            }
            ExtractionEvent::FrameFailed { frame, reason } => {
                warn!(frame, %reason, "frame failed");
            }
            ExtractionEvent::SessionClosed { frames, failed } => {
                info!(frames, failed, "streaming session closed");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &ExtractionEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ExtractionEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<ExtractionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &ExtractionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.record(&ExtractionEvent::Rejected { reason: "a".into() });
        sink.record(&ExtractionEvent::Extracted { colors: vec!["#000000".into()] });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ExtractionEvent::Rejected { .. }));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = ExtractionEvent::SessionClosed { frames: 4, failed: 1 };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["event"], "session_closed");
        assert_eq!(json["frames"], 4);
    }
}
