//! Configuration fan-out query dispatcher
//!
//! One dispatch run issues one independent request per configuration, all
//! in flight at once: no batching, throttling, retry or cancellation.
//! Each request runs as its own tokio task that, on completion:
//! 1. normalizes the response into the row's [`ResultItem`]s (rank order kept)
//! 2. stores every raw record in the [`DetailStore`]
//! 3. publishes the row state and a [`DispatchEvent::RowUpdated`]
//! 4. decrements the run's outstanding counter
//!
//! Rows complete in arbitrary order. A run is represented by a [`RunContext`]
//! handed to every task; starting a new run replaces the current context,
//! and tasks of the superseded run then complete without publishing.

use futures::future::join_all;
use halexp_common::events::{DispatchEvent, EventBus, ResultItem, RowState};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::axes::{Configuration, ConfigurationSpace};
use crate::busy::BusyIndicator;
use crate::details::DetailStore;
use crate::normalize::{self, DetailKey, ProfileLink, ShapeError};
use crate::request::{self, QueryParams, RequestError};
use crate::table::{TableLayout, TableSnapshot};
use crate::transport::{SearchTransport, TransportError};

/// Why a configuration's row failed
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// State of one dispatch run, shared by all of its tasks
pub struct RunContext {
    run_id: Uuid,
    space: ConfigurationSpace,
    params: QueryParams,
    outstanding: AtomicUsize,
    rows: RwLock<Vec<RowState>>,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl RunContext {
    fn new(space: ConfigurationSpace, params: QueryParams) -> Self {
        let len = space.len();
        Self {
            run_id: Uuid::new_v4(),
            space,
            params,
            outstanding: AtomicUsize::new(len),
            rows: RwLock::new(vec![RowState::Pending; len]),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn space(&self) -> &[Configuration] {
        &self.space
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    /// Requests of this run not yet completed
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Copy of every row state, in configuration order
    pub async fn rows(&self) -> Vec<RowState> {
        self.rows.read().await.clone()
    }

    pub async fn row(&self, index: usize) -> Option<RowState> {
        self.rows.read().await.get(index).cloned()
    }

    /// Layout and row states joined into one snapshot
    pub async fn snapshot(&self) -> TableSnapshot {
        TableSnapshot::new(
            self.run_id,
            self.outstanding(),
            TableLayout::prepare(&self.space, &self.params),
            self.rows().await,
        )
    }

    async fn set_row(&self, index: usize, state: RowState) {
        if let Some(row) = self.rows.write().await.get_mut(index) {
            *row = state;
        }
    }

    /// Decrement once per completed request; returns the remaining count
    fn complete_one(&self) -> usize {
        self.outstanding.fetch_sub(1, Ordering::AcqRel) - 1
    }
}

/// Slot holding the current run, shared with the busy indicator
pub(crate) type CurrentRun = Arc<RwLock<Option<Arc<RunContext>>>>;

/// Fans a configuration space out into concurrent search requests
#[derive(Clone)]
pub struct QueryDispatcher {
    transport: Arc<dyn SearchTransport>,
    details: DetailStore,
    event_bus: EventBus,
    profile: ProfileLink,
    current: CurrentRun,
}

/// Handle on a started run
///
/// Dropping it does not cancel anything; [`DispatchHandle::wait`] joins all
/// tasks for the aggregate completion signal.
pub struct DispatchHandle {
    run: Arc<RunContext>,
    tasks: Vec<JoinHandle<()>>,
}

impl DispatchHandle {
    pub fn run(&self) -> &Arc<RunContext> {
        &self.run
    }

    pub fn run_id(&self) -> Uuid {
        self.run.run_id
    }

    /// Wait until every request of the run has completed
    pub async fn wait(self) -> Arc<RunContext> {
        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                warn!(run_id = %self.run.run_id, "Dispatch task panicked: {}", e);
            }
        }
        self.run
    }
}

impl QueryDispatcher {
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        details: DetailStore,
        event_bus: EventBus,
        profile: ProfileLink,
    ) -> Self {
        Self {
            transport,
            details,
            event_bus,
            profile,
            current: Arc::new(RwLock::new(None)),
        }
    }

    pub fn details(&self) -> &DetailStore {
        &self.details
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Busy indicator reading the current run's outstanding counter
    pub fn busy_indicator(&self) -> BusyIndicator {
        BusyIndicator::new(Arc::clone(&self.current))
    }

    /// The run whose rows are authoritative, if any
    pub async fn current_run(&self) -> Option<Arc<RunContext>> {
        self.current.read().await.clone()
    }

    async fn is_current(&self, run_id: Uuid) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(|run| run.run_id == run_id)
    }

    /// Start a run: one task per configuration, returns without waiting
    ///
    /// Must be called within a tokio runtime. The previous run, if still in
    /// flight, is superseded rather than cancelled.
    pub async fn dispatch(&self, space: ConfigurationSpace, params: QueryParams) -> DispatchHandle {
        let run = Arc::new(RunContext::new(space, params));
        let run_id = run.run_id;

        // Detail store and current slot switch together under the slot's lock
        {
            let mut current = self.current.write().await;
            self.details.begin_run(run_id).await;
            if let Some(previous) = current.replace(Arc::clone(&run)) {
                if previous.outstanding() > 0 {
                    info!(
                        run_id = %previous.run_id,
                        outstanding = previous.outstanding(),
                        "Superseding run with requests still in flight"
                    );
                }
            }
        }

        if run.space.len() > self.event_bus.capacity() {
            warn!(
                run_id = %run_id,
                configurations = run.space.len(),
                capacity = self.event_bus.capacity(),
                "Run exceeds event bus capacity; slow subscribers will miss row updates"
            );
        }

        info!(
            run_id = %run_id,
            configurations = run.space.len(),
            mode = %run.params.query_mode,
            "Dispatching queries"
        );
        self.event_bus.emit_lossy(DispatchEvent::RunStarted {
            run_id,
            configurations: run.space.len(),
            timestamp: chrono::Utc::now(),
        });

        if run.space.is_empty() {
            self.event_bus.emit_lossy(DispatchEvent::RunCompleted {
                run_id,
                loaded: 0,
                failed: 0,
                timestamp: chrono::Utc::now(),
            });
        }

        let tasks = (0..run.space.len())
            .map(|index| {
                let dispatcher = self.clone();
                let run = Arc::clone(&run);
                tokio::spawn(async move { dispatcher.execute(run, index).await })
            })
            .collect();

        DispatchHandle { run, tasks }
    }

    /// Completion handler for one configuration
    async fn execute(&self, run: Arc<RunContext>, index: usize) {
        let config = &run.space[index];
        let state = match self.fetch_row(&run, index, config).await {
            Ok(items) => {
                debug!(run_id = %run.run_id, config_index = index, results = items.len(), "Row loaded");
                RowState::Loaded { items }
            }
            Err(e) => {
                warn!(
                    run_id = %run.run_id,
                    config_index = index,
                    config = %config.display_name,
                    error = %e,
                    "Row failed (per-configuration isolation)"
                );
                RowState::Failed {
                    error: e.to_string(),
                }
            }
        };

        if !self.is_current(run.run_id).await {
            run.complete_one();
            debug!(run_id = %run.run_id, config_index = index, "Stale run completion ignored");
            return;
        }

        run.set_row(index, state.clone()).await;
        let outstanding = run.complete_one();

        self.event_bus.emit_lossy(DispatchEvent::RowUpdated {
            run_id: run.run_id,
            config_index: index,
            row: state,
            outstanding,
            timestamp: chrono::Utc::now(),
        });

        if outstanding == 0 {
            let rows = run.rows().await;
            let failed = rows
                .iter()
                .filter(|r| matches!(r, RowState::Failed { .. }))
                .count();
            info!(
                run_id = %run.run_id,
                failed,
                elapsed_ms = (chrono::Utc::now() - run.started_at).num_milliseconds(),
                "All queries completed"
            );
            self.event_bus.emit_lossy(DispatchEvent::RunCompleted {
                run_id: run.run_id,
                loaded: rows.len() - failed,
                failed,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Request, normalize and store one configuration's results
    ///
    /// The row is all-or-nothing: one unclassifiable record fails the row.
    /// Only the first `result_count` records are kept.
    async fn fetch_row(
        &self,
        run: &RunContext,
        index: usize,
        config: &Configuration,
    ) -> Result<Vec<ResultItem>, RowError> {
        let request = request::build(config, &run.params)?;
        debug!(run_id = %run.run_id, config_index = index, url = %request.url, "Call");

        let body = self.transport.fetch(&request).await?;
        let mut records = normalize::extract_results(body)?;
        records.truncate(run.params.result_count);

        let normalized = records
            .into_iter()
            .enumerate()
            .map(|(rank, record)| {
                let raw = normalize::classify(&record, rank)?;
                let key = DetailKey::new(index, rank);
                Ok((key, normalize::normalize(&raw, key, &self.profile), record))
            })
            .collect::<Result<Vec<(DetailKey, ResultItem, Value)>, ShapeError>>()?;

        let mut items = Vec::with_capacity(normalized.len());
        for (key, item, record) in normalized {
            self.details.put(run.run_id, key, record).await;
            items.push(item);
        }
        Ok(items)
    }
}
