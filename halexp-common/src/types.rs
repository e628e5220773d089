//! Wire-level types shared between configuration and the harness

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Which upstream collection a query targets
///
/// The serialized form is the path segment used by the search service
/// (`/authors/query`, `/docs/query`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QueryMode {
    #[default]
    #[serde(rename = "authors")]
    Authors,
    #[serde(rename = "docs")]
    Documents,
}

impl QueryMode {
    /// Path segment inserted between the instance base URL and `/query`
    pub fn path_segment(&self) -> &'static str {
        match self {
            QueryMode::Authors => "authors",
            QueryMode::Documents => "docs",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for QueryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authors" | "author" => Ok(QueryMode::Authors),
            "docs" | "documents" | "document" => Ok(QueryMode::Documents),
            other => Err(Error::InvalidInput(format!(
                "Unknown query mode '{}' (expected 'authors' or 'docs')",
                other
            ))),
        }
    }
}

/// Whether request URLs carry the `hits` result-count parameter
///
/// Both variants have shipped; some upstream builds ignore `hits` and
/// return their configured page size instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HitsPolicy {
    #[default]
    Include,
    Omit,
}
