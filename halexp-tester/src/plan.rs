//! Run planning: merge a run request with configured defaults
//!
//! Both the HTTP API and the CLI describe a run as a [`RunRequest`]; empty
//! axes fall back to the `[defaults]` section of the harness config.

use halexp_common::config::HarnessConfig;
use halexp_common::{HitsPolicy, QueryMode, Result};
use serde::Deserialize;

use crate::axes::{self, AxisInputs, AxisText, ConfigurationSpace};
use crate::request::QueryParams;

/// Raw description of one sweep
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub instances: Vec<String>,
    #[serde(default)]
    pub min_years: Vec<String>,
    #[serde(default)]
    pub thresholds: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub query_mode: Option<QueryMode>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub result_count: Option<usize>,
    #[serde(default)]
    pub hits: Option<HitsPolicy>,
    #[serde(default)]
    pub strict: Option<bool>,
}

/// Parsed axes, expanded space and shared query parameters
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub inputs: AxisInputs,
    pub space: ConfigurationSpace,
    pub params: QueryParams,
}

impl RunRequest {
    /// Fill gaps from `config`, parse the axes and expand the space
    pub fn into_plan(self, config: &HarnessConfig) -> Result<RunPlan> {
        let defaults = &config.defaults;
        let or_default = |given: Vec<String>, fallback: &Vec<String>| {
            if given.iter().all(|v| v.trim().is_empty()) {
                fallback.clone()
            } else {
                given
            }
        };

        let text = AxisText {
            instances: or_default(self.instances, &defaults.instances),
            min_years: or_default(self.min_years, &defaults.min_years),
            thresholds: or_default(self.thresholds, &defaults.thresholds),
            metrics: or_default(self.metrics, &defaults.metrics),
            query_mode: self.query_mode.unwrap_or(defaults.query_mode),
            query_text: self.query,
            result_count: self.result_count.unwrap_or(defaults.result_count),
        };

        let inputs = text.parse(self.strict.unwrap_or(defaults.strict_axes))?;
        let space = axes::build(&inputs);
        let params = QueryParams {
            query_mode: inputs.query_mode,
            query_text: inputs.query_text.clone(),
            result_count: inputs.result_count,
            hits: self.hits.unwrap_or(config.upstream.hits),
        };

        Ok(RunPlan {
            inputs,
            space,
            params,
        })
    }
}
