//! Persistence collaborator interface
//!
//! Finished research records live outside this system; the pipeline only
//! holds opaque references to them. An in-memory implementation ships for
//! tests and demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque reference to a persisted run record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunRef(pub Uuid);

impl RunRef {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for RunRef {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A completed pipeline run, as handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub topic: String,
    pub language: String,
    pub summary: String,
    pub report: String,
    pub total_queries: u32,
    pub total_sources: u32,
    pub completed_at: DateTime<Utc>,
}

/// Persistence collaborator for finished research records
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save_run(&self, record: RunRecord) -> anyhow::Result<RunRef>;

    async fn load_run(&self, reference: &RunRef) -> anyhow::Result<RunRecord>;
}

/// In-memory run store for tests and demos
#[derive(Default)]
pub struct InMemoryRunStore {
    records: Arc<RwLock<HashMap<RunRef, RunRecord>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn save_run(&self, record: RunRecord) -> anyhow::Result<RunRef> {
        let reference = RunRef::generate();
        self.records.write().insert(reference, record);
        Ok(reference)
    }

    async fn load_run(&self, reference: &RunRef) -> anyhow::Result<RunRecord> {
        self.records
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("run record not found: {reference}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(topic: &str) -> RunRecord {
        RunRecord {
            topic: topic.to_string(),
            language: "en".to_string(),
            summary: "summary".to_string(),
            report: "report".to_string(),
            total_queries: 3,
            total_sources: 12,
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = InMemoryRunStore::new();
        let saved = record("quantum computing");

        let reference = store.save_run(saved.clone()).await.unwrap();
        let loaded = store.load_run(&reference).await.unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn load_unknown_reference_fails() {
        let store = InMemoryRunStore::new();
        let missing = RunRef::generate();
        assert!(store.load_run(&missing).await.is_err());
    }

    #[test]
    fn run_ref_parses_from_display() {
        let reference = RunRef::generate();
        let parsed: RunRef = reference.to_string().parse().unwrap();
        assert_eq!(parsed, reference);
    }
}
