//! Pipeline orchestration for Inquest
//!
//! Ties the provider, cache, and resilience layers together: the
//! `ResearchPipeline` runs one research request through its sequential
//! steps, the `StreamingRelay` fans generation chunks out to observers,
//! and the `RunRegistry` executes pipelines on background tasks with
//! bounded concurrency and status polling.

pub mod assemble;
pub mod pipeline;
pub mod registry;
pub mod relay;

pub use assemble::{build_pipeline, build_registry};
pub use pipeline::{PipelineRequest, ResearchPipeline};
pub use registry::{RunId, RunRegistry, RunState, RunStatus};
pub use relay::{CancelToken, RelayOutput, StreamingRelay, DEFAULT_RELAY_CAPACITY};
