//! Run registry
//!
//! Executes pipelines on background tasks and answers status polls. A
//! semaphore bounds how many runs execute concurrently; queued runs hold
//! their slot entry immediately so a poll never sees an unknown id for a
//! run that was accepted.

use crate::pipeline::{PipelineRequest, ResearchPipeline};
use crate::relay::CancelToken;
use dashmap::DashMap;
use inquest_core::{PipelineError, ProgressSink, RunRef};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

/// Identifier handed to callers when a run is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(pub Uuid);

impl RunId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Point-in-time snapshot of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub state: RunState,
    pub step: String,
    pub message: String,
    /// Streamed preview of the report while the generate step runs
    pub partial_preview: Option<String>,
    pub result: Option<RunRef>,
}

impl RunStatus {
    fn queued() -> Self {
        Self {
            state: RunState::Queued,
            step: "queued".to_string(),
            message: "waiting for a run slot".to_string(),
            partial_preview: None,
            result: None,
        }
    }
}

struct RunSlot {
    status: Mutex<RunStatus>,
    cancel: CancelToken,
}

/// Progress sink that mirrors step transitions into the run's snapshot
struct SlotSink {
    slot: Arc<RunSlot>,
}

impl ProgressSink for SlotSink {
    fn on_progress(&self, step: &str, message: &str, partial: Option<&str>) {
        let mut status = self.slot.status.lock();
        status.step = step.to_string();
        status.message = message.to_string();
        if let Some(partial) = partial {
            status.partial_preview = Some(partial.to_string());
        }
    }
}

pub struct RunRegistry {
    pipeline: Arc<ResearchPipeline>,
    runs: DashMap<RunId, Arc<RunSlot>>,
    permits: Arc<Semaphore>,
}

impl RunRegistry {
    pub fn new(pipeline: Arc<ResearchPipeline>, max_concurrent_runs: usize) -> Self {
        Self {
            pipeline,
            runs: DashMap::new(),
            permits: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
        }
    }

    /// Accept a run and execute it in the background. Returns immediately
    /// with the id used for polling and cancellation.
    pub fn run_pipeline(self: &Arc<Self>, request: PipelineRequest) -> RunId {
        let id = RunId::generate();
        let slot = Arc::new(RunSlot {
            status: Mutex::new(RunStatus::queued()),
            cancel: CancelToken::new(),
        });
        self.runs.insert(id, Arc::clone(&slot));
        info!(run_id = %id, topic = %request.topic, "run accepted");

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            registry.execute(id, slot, request).await;
        });
        id
    }

    async fn execute(&self, id: RunId, slot: Arc<RunSlot>, request: PipelineRequest) {
        let permit = tokio::select! {
            permit = self.permits.acquire() => permit,
            _ = slot.cancel.cancelled() => {
                Self::finish(&slot, RunState::Cancelled, "cancelled while queued", None);
                return;
            }
        };
        // The semaphore is never closed
        let Ok(_permit) = permit else { return };

        if slot.cancel.is_cancelled() {
            Self::finish(&slot, RunState::Cancelled, "cancelled while queued", None);
            return;
        }

        {
            let mut status = slot.status.lock();
            status.state = RunState::Running;
            status.step = "start".to_string();
            status.message = "run started".to_string();
        }

        let sink = SlotSink {
            slot: Arc::clone(&slot),
        };
        match self.pipeline.run(&request, &sink, &slot.cancel).await {
            Ok(run_ref) => {
                info!(run_id = %id, %run_ref, "run completed");
                Self::finish(&slot, RunState::Completed, "completed", Some(run_ref));
            }
            Err(PipelineError::Cancelled) => {
                info!(run_id = %id, "run cancelled");
                Self::finish(&slot, RunState::Cancelled, "cancelled", None);
            }
            Err(e) => {
                warn!(run_id = %id, error = %e, "run failed");
                Self::finish(&slot, RunState::Failed, &e.to_string(), None);
            }
        }
    }

    fn finish(slot: &RunSlot, state: RunState, message: &str, result: Option<RunRef>) {
        let mut status = slot.status.lock();
        status.state = state;
        status.message = message.to_string();
        status.result = result;
    }

    pub fn get_status(&self, id: RunId) -> Option<RunStatus> {
        self.runs.get(&id).map(|slot| slot.status.lock().clone())
    }

    /// Request cancellation. Between-step cancellation is honored
    /// promptly; an in-flight provider call is bounded by its own
    /// timeout. Returns false for unknown ids.
    pub fn cancel(&self, id: RunId) -> bool {
        match self.runs.get(&id) {
            Some(slot) => {
                slot.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop finished runs from the registry, keeping polls for live runs
    /// working. Returns how many entries were removed.
    pub fn prune_finished(&self) -> usize {
        let before = self.runs.len();
        self.runs.retain(|_, slot| {
            matches!(
                slot.status.lock().state,
                RunState::Queued | RunState::Running
            )
        });
        before - self.runs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_status_has_no_result() {
        let status = RunStatus::queued();
        assert_eq!(status.state, RunState::Queued);
        assert!(status.result.is_none());
        assert!(status.partial_preview.is_none());
    }

    #[test]
    fn slot_sink_updates_snapshot() {
        let slot = Arc::new(RunSlot {
            status: Mutex::new(RunStatus::queued()),
            cancel: CancelToken::new(),
        });
        let sink = SlotSink {
            slot: Arc::clone(&slot),
        };

        sink.on_progress("search", "gathering sources", None);
        sink.on_progress("generate", "streaming", Some("partial text"));

        let status = slot.status.lock();
        assert_eq!(status.step, "generate");
        assert_eq!(status.partial_preview.as_deref(), Some("partial text"));
    }

    #[test]
    fn run_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RunState::Running).unwrap(),
            "\"running\""
        );
    }
}
