//! Request URL construction
//!
//! Builds the `GET {instance}{mode}/query?...` request for one configuration.
//! Query parameter values are form-encoded; otherwise they are taken verbatim
//! from the configuration (including `NaN` sentinels).

use halexp_common::{HitsPolicy, QueryMode};
use reqwest::{Method, Url};
use thiserror::Error;

use crate::axes::Configuration;

/// Fixed endpoint name appended after the query mode segment
pub const QUERY_ENDPOINT: &str = "query";

/// Request construction errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    #[error("Invalid instance URL '{instance}': {reason}")]
    InvalidInstance { instance: String, reason: String },
}

/// Fully resolved request for one configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
}

/// Query parameters shared by every configuration of a run
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub query_mode: QueryMode,
    pub query_text: String,
    pub result_count: usize,
    pub hits: HitsPolicy,
}

/// Build the request descriptor for a configuration
pub fn build(config: &Configuration, params: &QueryParams) -> Result<RequestDescriptor, RequestError> {
    let base = format!(
        "{}{}/{}",
        config.instance,
        params.query_mode.path_segment(),
        QUERY_ENDPOINT
    );

    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(5);
    pairs.push(("query", params.query_text.clone()));
    if params.hits == HitsPolicy::Include {
        pairs.push(("hits", params.result_count.to_string()));
    }
    pairs.push(("score_threshold", config.threshold.to_string()));
    pairs.push(("min_year", config.min_year.to_string()));
    pairs.push(("rank_metric", config.metric.clone()));

    let url = Url::parse_with_params(&base, &pairs).map_err(|e| RequestError::InvalidInstance {
        instance: config.instance.clone(),
        reason: e.to_string(),
    })?;

    Ok(RequestDescriptor {
        method: Method::GET,
        url,
    })
}
