//! Progress reporting for research runs.
//!
//! The pipeline reports keyed status updates through a [`ProgressSink`] it is
//! handed explicitly. Sinks must not block: an update is fire-and-forget.

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

/// Pipeline stage an update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchStage {
    Routing,
    Planning,
    Searching,
    Writing,
    Refining,
    Finalizing,
}

impl ResearchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchStage::Routing => "routing",
            ResearchStage::Planning => "planning",
            ResearchStage::Searching => "searching",
            ResearchStage::Writing => "writing",
            ResearchStage::Refining => "refining",
            ResearchStage::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for ResearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub stage: ResearchStage,
    pub message: String,
    pub done: bool,
}

pub trait ProgressSink: Send + Sync {
    fn update(&self, update: ProgressUpdate);

    fn working(&self, stage: ResearchStage, message: &str) {
        self.update(ProgressUpdate {
            stage,
            message: message.to_string(),
            done: false,
        });
    }

    fn finished(&self, stage: ResearchStage, message: &str) {
        self.update(ProgressUpdate {
            stage,
            message: message.to_string(),
            done: true,
        });
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn update(&self, _update: ProgressUpdate) {}
}

/// Forwards updates to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn update(&self, update: ProgressUpdate) {
        tracing::info!(stage = %update.stage, done = update.done, "{}", update.message);
    }
}

/// Sends updates over an unbounded channel to a renderer task.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn update(&self, update: ProgressUpdate) {
        // A dropped receiver only means nobody is rendering.
        let _ = self.tx.send(update);
    }
}
