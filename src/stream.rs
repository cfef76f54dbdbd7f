//! Per-connection streaming sessions.
//!
//! A transport adapter forwards each received binary frame into the frame
//! channel and writes every [`FrameResponse`] back to its peer. Frames of one
//! session are processed strictly in order; extraction runs on tokio's
//! blocking pool so the async runtime is never stalled.

use crate::error::{ExtractError, Result};
use crate::events::ExtractionEvent;
use crate::extractor::ColorExtractor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Reply to a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameResponse {
    Colors { dominant_colors: Vec<String> },
    Error { error: String },
}

impl FrameResponse {
    pub fn colors(dominant_colors: Vec<String>) -> Self {
        Self::Colors { dominant_colors }
    }

    pub fn error(err: &ExtractError) -> Self {
        Self::Error {
            error: err.client_message(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// JSON text sent to the peer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Counters for a finished session.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// The response channel closed while a frame was in flight; that
    /// frame's result was dropped.
    pub disconnected_mid_frame: bool,
}

/// Run extraction on the blocking pool.
///
/// A panic inside the worker is reported as an internal error.
pub async fn extract_offloaded(
    extractor: Arc<ColorExtractor>,
    bytes: Vec<u8>,
    num_colors: usize,
) -> Result<Vec<String>> {
    tokio::task::spawn_blocking(move || extractor.extract(&bytes, num_colors))
        .await
        .map_err(|e| ExtractError::Internal(format!("extraction worker failed: {e}")))?
}

/// Serve one connection until its frame channel closes or its peer goes
/// away. A failing frame is answered with an error and the session
/// continues.
pub async fn run_session(
    extractor: Arc<ColorExtractor>,
    mut frames: mpsc::Receiver<Vec<u8>>,
    responses: mpsc::Sender<FrameResponse>,
    num_colors: usize,
) -> SessionSummary {
    let mut summary = SessionSummary::default();

    while let Some(frame) = frames.recv().await {
        let index = summary.frames;
        summary.frames += 1;

        let response = match extract_offloaded(Arc::clone(&extractor), frame, num_colors).await {
            Ok(colors) => {
                summary.succeeded += 1;
                extractor.sink().record(&ExtractionEvent::FrameCompleted {
                    frame: index,
                    colors: colors.clone(),
                });
                FrameResponse::colors(colors)
            }
            Err(err) => {
                summary.failed += 1;
                extractor.sink().record(&ExtractionEvent::FrameFailed {
                    frame: index,
                    reason: err.to_string(),
                });
                FrameResponse::error(&err)
            }
        };

        if responses.send(response).await.is_err() {
            summary.disconnected_mid_frame = true;
            break;
        }
    }

    extractor.sink().record(&ExtractionEvent::SessionClosed {
        frames: summary.frames,
        failed: summary.failed,
    });
    summary
}
