//! Result table layout and snapshots
//!
//! The layout is computed before dispatch (one row per configuration, one
//! column per requested rank) so a renderer can draw an empty grid that rows
//! fill in as their requests complete.

use halexp_common::events::RowState;
use serde::Serialize;
use uuid::Uuid;

use crate::axes::Configuration;
use crate::request::{self, QueryParams};

/// Header of the configuration column
pub const CONFIG_COLUMN: &str = "Config";

/// One layout row: the configuration and its request link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutRow {
    pub index: usize,
    pub display_name: String,
    /// `None` when the instance URL could not form a valid request
    pub query_url: Option<String>,
}

/// Column headers and configuration rows, without results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableLayout {
    pub headers: Vec<String>,
    pub rows: Vec<LayoutRow>,
}

impl TableLayout {
    /// `["Config", "# 1", .., "# n"]` headers and one row per configuration
    pub fn prepare(space: &[Configuration], params: &QueryParams) -> Self {
        let headers = std::iter::once(CONFIG_COLUMN.to_string())
            .chain((1..=params.result_count).map(|rank| format!("# {}", rank)))
            .collect();

        let rows = space
            .iter()
            .enumerate()
            .map(|(index, config)| LayoutRow {
                index,
                display_name: config.display_name.clone(),
                query_url: request::build(config, params).ok().map(|r| r.url.to_string()),
            })
            .collect();

        Self { headers, rows }
    }

    /// Number of result columns
    pub fn rank_columns(&self) -> usize {
        self.headers.len().saturating_sub(1)
    }
}

/// Layout row joined with its current state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    #[serde(flatten)]
    pub layout: LayoutRow,
    pub state: RowState,
}

/// Point-in-time view of a run, for renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub run_id: Uuid,
    pub busy: bool,
    pub outstanding: usize,
    pub headers: Vec<String>,
    pub rows: Vec<SnapshotRow>,
}

impl TableSnapshot {
    pub fn new(run_id: Uuid, outstanding: usize, layout: TableLayout, states: Vec<RowState>) -> Self {
        let rows = layout
            .rows
            .into_iter()
            .zip(states)
            .map(|(layout, state)| SnapshotRow { layout, state })
            .collect();
        Self {
            run_id,
            busy: outstanding > 0,
            outstanding,
            headers: layout.headers,
            rows,
        }
    }
}
