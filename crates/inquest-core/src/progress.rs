//! Progress-reporting collaborator interface

/// Receives step-level progress from a pipeline run
///
/// Implementations must be cheap and infallible: the pipeline never blocks
/// on or fails because of a progress sink.
pub trait ProgressSink: Send + Sync {
    /// Called at each step transition. `partial` carries streamed preview
    /// text when the current step produces incremental output.
    fn on_progress(&self, step: &str, message: &str, partial: Option<&str>);
}

/// Sink that discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _step: &str, _message: &str, _partial: Option<&str>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Sink that records every call, for assertions in tests
    pub struct RecordingSink {
        pub events: Mutex<Vec<(String, String)>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_progress(&self, step: &str, message: &str, _partial: Option<&str>) {
            self.events.lock().push((step.to_string(), message.to_string()));
        }
    }

    #[test]
    fn null_sink_accepts_anything() {
        let sink = NullSink;
        sink.on_progress("search", "searching...", None);
        sink.on_progress("generate", "writing report", Some("partial text"));
    }

    #[test]
    fn recording_sink_captures_order() {
        let sink = RecordingSink {
            events: Mutex::new(Vec::new()),
        };
        sink.on_progress("search", "first", None);
        sink.on_progress("analyze", "second", None);

        let events = sink.events.lock();
        assert_eq!(events[0].0, "search");
        assert_eq!(events[1].0, "analyze");
    }
}
