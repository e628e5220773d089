//! Detail record store and shape-aware summaries
//!
//! Keeps the raw record behind every displayed result so a detail consumer
//! can inspect it without a second round trip. Entries are scoped by run:
//! only the current run accepts writes, and starting a run drops the
//! entries of superseded runs.

use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::normalize::{classify, DetailKey, RawResult};

/// Raw, un-normalized upstream record; immutable once stored
pub type DetailRecord = Value;

#[derive(Default)]
struct StoreInner {
    current_run: Option<Uuid>,
    records: HashMap<(Uuid, DetailKey), Arc<DetailRecord>>,
}

/// In-memory keyed store of raw result records
#[derive(Clone, Default)]
pub struct DetailStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl DetailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `run_id` current and drop entries of every other run
    pub async fn begin_run(&self, run_id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.current_run = Some(run_id);
        let before = inner.records.len();
        inner.records.retain(|(run, _), _| *run == run_id);
        debug!(
            run_id = %run_id,
            dropped = before - inner.records.len(),
            "Detail store switched run"
        );
    }

    /// Store a record for the current run
    ///
    /// Returns `false` without storing if `run_id` is not current (a late
    /// completion from a superseded run) or the key was already written.
    pub async fn put(&self, run_id: Uuid, key: DetailKey, record: DetailRecord) -> bool {
        let mut inner = self.inner.write().await;
        if inner.current_run != Some(run_id) {
            debug!(run_id = %run_id, key = %key, "Ignoring detail write from stale run");
            return false;
        }
        match inner.records.entry((run_id, key)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(Arc::new(record));
                true
            }
        }
    }

    /// Look up a record of a specific run
    pub async fn get(&self, run_id: Uuid, key: DetailKey) -> Option<Arc<DetailRecord>> {
        self.inner.read().await.records.get(&(run_id, key)).cloned()
    }

    /// Look up a record of the current run
    pub async fn get_current(&self, key: DetailKey) -> Option<Arc<DetailRecord>> {
        let inner = self.inner.read().await;
        let run_id = inner.current_run?;
        inner.records.get(&(run_id, key)).cloned()
    }

    pub async fn current_run(&self) -> Option<Uuid> {
        self.inner.read().await.current_run
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Human-oriented digest of a detail record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum DetailSummary {
    Author {
        aggregation_score: Option<f64>,
        lab: Option<String>,
        /// Matched phrases, de-duplicated in first-seen order
        matches: Vec<String>,
        match_count: usize,
        /// Paper titles, de-duplicated in first-seen order
        papers: Vec<String>,
        paper_count: usize,
    },
    Document {
        citation: Option<String>,
        subtitle: Option<String>,
        abstract_text: Option<String>,
        keywords: Vec<String>,
        publication_date: Option<String>,
    },
}

impl DetailSummary {
    /// Summarize a record according to its shape; `None` if it has neither
    pub fn from_record(record: &DetailRecord) -> Option<Self> {
        match classify(record, 0).ok()? {
            RawResult::Author { .. } => {
                let phrases = string_list(record.get("results_phrases"));
                let titles: Vec<String> = record
                    .get("results_metadata")
                    .or_else(|| record.get("papers"))
                    .and_then(Value::as_array)
                    .map(|papers| {
                        papers
                            .iter()
                            .filter_map(|p| first_string(p.get("title_s")))
                            .collect()
                    })
                    .unwrap_or_default();

                Some(DetailSummary::Author {
                    aggregation_score: record.get("aggregation score").and_then(Value::as_f64),
                    lab: record
                        .get("author_labs_id")
                        .or_else(|| record.get("lab_id"))
                        .and_then(scalar_text),
                    match_count: phrases.len(),
                    matches: dedup(phrases),
                    paper_count: titles.len(),
                    papers: dedup(titles),
                })
            }
            RawResult::Document { .. } => Some(DetailSummary::Document {
                citation: first_string(record.get("citationFull_s")),
                subtitle: first_string(record.get("subtitle_s")),
                abstract_text: first_string(record.get("abstract_s")),
                keywords: string_list(record.get("keyword_s")),
                publication_date: first_string(record.get("publicationDate_s")),
            }),
        }
    }
}

fn first_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
