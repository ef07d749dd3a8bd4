//! Research pipeline orchestrator
//!
//! Runs the strictly sequential steps of one research request: topic-cache
//! probe, cached search fan-out, analysis, streamed report generation, and
//! persistence. Every provider call goes through the fallback dispatcher;
//! every cache error is logged and swallowed, because the caches are an
//! optimization and must never fail a run.

use crate::relay::{CancelToken, StreamingRelay};
use futures::FutureExt;
use inquest_cache::{CacheOutcome, SearchCache, TopicCache, TopicOutcome};
use inquest_core::{
    dispatch, GenerationRequest, PipelineError, ProgressSink, ProviderRegistry, RunRecord, RunRef,
    RunStore, SearchParams, SearchProvider, SearchResponse, TextGenerationProvider,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One research request
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub topic: String,
    pub language: String,
    /// Skip the topic-cache probe and always produce a fresh run
    pub force_fresh: bool,
    pub search_params: SearchParams,
}

impl PipelineRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            language: "en".to_string(),
            force_fresh: false,
            search_params: SearchParams::default(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn force_fresh(mut self) -> Self {
        self.force_fresh = true;
        self
    }
}

pub struct ResearchPipeline {
    registry: ProviderRegistry,
    search_providers: Vec<Arc<dyn SearchProvider>>,
    generation_providers: Vec<Arc<dyn TextGenerationProvider>>,
    search_cache: Arc<SearchCache>,
    topic_cache: Arc<TopicCache>,
    run_store: Arc<dyn RunStore>,
}

impl ResearchPipeline {
    pub fn new(
        registry: ProviderRegistry,
        search_providers: Vec<Arc<dyn SearchProvider>>,
        generation_providers: Vec<Arc<dyn TextGenerationProvider>>,
        search_cache: Arc<SearchCache>,
        topic_cache: Arc<TopicCache>,
        run_store: Arc<dyn RunStore>,
    ) -> Self {
        Self {
            registry,
            search_providers,
            generation_providers,
            search_cache,
            topic_cache,
            run_store,
        }
    }

    /// Execute one research run end to end, returning a reference to the
    /// persisted record.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<RunRef, PipelineError> {
        if self.search_providers.is_empty() {
            return Err(PipelineError::NoProviderAvailable("search"));
        }
        if self.generation_providers.is_empty() {
            return Err(PipelineError::NoProviderAvailable("generation"));
        }

        if !request.force_fresh {
            if let Some(run_ref) = self.probe_topic_cache(request, sink, cancel).await? {
                return Ok(run_ref);
            }
        }

        // Advisory only; a concurrent writer does not block this run.
        let marker = self
            .topic_cache
            .begin(&request.topic, &request.language)
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to claim topic marker");
                None
            });

        match self.run_fresh(request, sink, cancel).await {
            Ok(run_ref) => {
                if let Some(id) = marker {
                    if let Err(e) = self.topic_cache.complete(id, &run_ref) {
                        warn!(error = %e, "failed to finalize topic marker");
                    }
                }
                sink.on_progress("complete", "research complete", None);
                Ok(run_ref)
            }
            Err(e) => {
                if let Some(id) = marker {
                    if let Err(mark_err) = self.topic_cache.fail(id) {
                        warn!(error = %mark_err, "failed to mark topic marker as failed");
                    }
                }
                Err(e)
            }
        }
    }

    /// Topic-cache probe. A full hit short-circuits the run; a partial hit
    /// (completed English record) only needs a translation pass.
    async fn probe_topic_cache(
        &self,
        request: &PipelineRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Option<RunRef>, PipelineError> {
        let outcome = self
            .topic_cache
            .find(&request.topic, &request.language)
            .unwrap_or_else(|e| {
                warn!(error = %e, "topic cache probe failed");
                TopicOutcome::Miss
            });

        match outcome {
            TopicOutcome::Hit(run_ref) => {
                info!(topic = %request.topic, %run_ref, "serving completed run from topic cache");
                sink.on_progress("topic_cache", "served from cache", None);
                Ok(Some(run_ref))
            }
            TopicOutcome::PartialHit(english_ref) => {
                info!(topic = %request.topic, language = %request.language,
                      "translating cached English run");
                sink.on_progress("translate", "translating cached result", None);
                let run_ref = self.translate_run(request, &english_ref, cancel).await?;
                Ok(Some(run_ref))
            }
            TopicOutcome::Miss => Ok(None),
        }
    }

    /// Translation-only path for a `PartialHit`.
    async fn translate_run(
        &self,
        request: &PipelineRequest,
        english_ref: &RunRef,
        cancel: &CancelToken,
    ) -> Result<RunRef, PipelineError> {
        let english = self
            .run_store
            .load_run(english_ref)
            .await
            .map_err(|e| PipelineError::step("translate", e))?;

        self.check_cancelled(cancel)?;

        let prompt = GenerationRequest::new(
            format!(
                "You are a translator. Translate the research report into '{}' \
                 preserving structure and citations.",
                request.language
            ),
            format!("Summary:\n{}\n\nReport:\n{}", english.summary, english.report),
        );
        let translated = self
            .generate(&prompt)
            .await
            .map_err(|e| PipelineError::step("translate", e))?;

        let marker = self
            .topic_cache
            .begin(&request.topic, &request.language)
            .unwrap_or(None);

        let record = RunRecord {
            topic: english.topic,
            language: request.language.clone(),
            summary: english.summary,
            report: translated,
            total_queries: english.total_queries,
            total_sources: english.total_sources,
            completed_at: chrono::Utc::now(),
        };
        let run_ref = self
            .run_store
            .save_run(record)
            .await
            .map_err(|e| PipelineError::step("persist", e))?;

        if let Some(id) = marker {
            let _ = self.topic_cache.complete(id, &run_ref);
        }
        Ok(run_ref)
    }

    async fn run_fresh(
        &self,
        request: &PipelineRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<RunRef, PipelineError> {
        // Opportunistic sweep; the caches also purge lazily per key
        match self.search_cache.clear_expired() {
            Ok(removed) if removed > 0 => debug!(removed, "swept expired search cache rows"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "expired-entry sweep failed"),
        }

        // Search
        self.check_cancelled(cancel)?;
        sink.on_progress("search", "gathering sources", None);
        let queries = build_sub_queries(&request.topic);
        let mut responses = Vec::with_capacity(queries.len());
        for query in &queries {
            responses.push(self.cached_search(query, &request.search_params).await?);
        }
        let total_sources: u32 = responses.iter().map(|r| r.results.len() as u32).sum();
        debug!(queries = queries.len(), total_sources, "search step complete");

        // Analyze
        self.check_cancelled(cancel)?;
        sink.on_progress("analyze", "summarizing findings", None);
        let findings = format_findings(&responses);
        let summary = self
            .generate(&GenerationRequest::new(
                "You are a research analyst. Produce a concise summary of the \
                 key findings below, citing source URLs.",
                format!("Topic: {}\n\n{findings}", request.topic),
            ))
            .await
            .map_err(|e| PipelineError::step("analyze", e))?;

        // Generate report, streamed
        self.check_cancelled(cancel)?;
        sink.on_progress("generate", "writing report", None);
        let report_request = GenerationRequest::new(
            format!(
                "You are a research writer. Write a structured report in '{}' \
                 based on the summary and findings.",
                request.language
            ),
            format!(
                "Topic: {}\n\nSummary:\n{summary}\n\nFindings:\n{findings}",
                request.topic
            ),
        );
        let report = self.generate_streamed(&report_request, sink, cancel).await?;

        // Persist
        self.check_cancelled(cancel)?;
        sink.on_progress("persist", "saving results", None);
        let record = RunRecord {
            topic: request.topic.clone(),
            language: request.language.clone(),
            summary,
            report,
            total_queries: queries.len() as u32,
            total_sources,
            completed_at: chrono::Utc::now(),
        };
        self.run_store
            .save_run(record)
            .await
            .map_err(|e| PipelineError::step("persist", e))
    }

    /// One search, through the tiered cache and then the fallback chain.
    async fn cached_search(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse, PipelineError> {
        match self.search_cache.lookup(query, params).await {
            Ok(CacheOutcome::Hit { payload, matched_by, similarity }) => {
                debug!(%query, ?matched_by, ?similarity, "search served from cache");
                return Ok(payload);
            }
            Ok(CacheOutcome::Miss) => {}
            Err(e) => warn!(error = %e, "search cache lookup failed"),
        }

        let response = dispatch(
            &self.registry,
            &self.search_providers,
            |p| p.name().to_string(),
            |p| p.search(query, params).boxed(),
        )
        .await
        .map_err(|e| PipelineError::step("search", e))?;

        if let Err(e) = self.search_cache.store(query, params, &response).await {
            warn!(error = %e, "failed to store search response");
        }
        Ok(response)
    }

    /// Non-streaming generation through the fallback chain.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, inquest_core::DispatchError> {
        dispatch(
            &self.registry,
            &self.generation_providers,
            |p| p.name().to_string(),
            |p| p.generate(request).boxed(),
        )
        .await
    }

    /// Streaming generation through the relay; cancellation mid-stream
    /// aborts the run, keeping the partial preview visible via the sink.
    async fn generate_streamed(
        &self,
        request: &GenerationRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<String, PipelineError> {
        let relay = StreamingRelay::new();
        let output = dispatch(
            &self.registry,
            &self.generation_providers,
            |p| p.name().to_string(),
            |p| {
                relay
                    .run(p.generate_stream(request), "generate", sink, cancel)
                    .boxed()
            },
        )
        .await
        .map_err(|e| PipelineError::step("generate", e))?;

        if output.cancelled {
            return Err(PipelineError::Cancelled);
        }
        Ok(output.text)
    }

    fn check_cancelled(&self, cancel: &CancelToken) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Expand a topic into the sub-queries searched for it
fn build_sub_queries(topic: &str) -> Vec<String> {
    vec![
        topic.to_string(),
        format!("{topic} overview"),
        format!("{topic} recent developments"),
    ]
}

fn format_findings(responses: &[SearchResponse]) -> String {
    let mut findings = String::new();
    for response in responses {
        for result in &response.results {
            findings.push_str(&format!(
                "- {} ({})\n  {}\n",
                result.title, result.url, result.content
            ));
        }
        if let Some(answer) = &response.answer {
            findings.push_str(&format!("Synthesized answer: {answer}\n"));
        }
    }
    if findings.is_empty() {
        findings.push_str("(no sources found)\n");
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_queries_include_the_topic_verbatim() {
        let queries = build_sub_queries("rust async runtimes");
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "rust async runtimes");
        assert!(queries.iter().all(|q| q.contains("rust async runtimes")));
    }

    #[test]
    fn findings_format_lists_sources_and_answer() {
        let responses = vec![SearchResponse {
            query: "q".to_string(),
            results: vec![inquest_core::SearchResult {
                title: "Title".to_string(),
                url: "https://example.com".to_string(),
                content: "Snippet".to_string(),
                score: 0.9,
                published_date: None,
            }],
            answer: Some("The answer".to_string()),
            follow_up_questions: vec![],
        }];

        let findings = format_findings(&responses);
        assert!(findings.contains("Title"));
        assert!(findings.contains("https://example.com"));
        assert!(findings.contains("The answer"));

        assert!(format_findings(&[]).contains("no sources"));
    }
}
