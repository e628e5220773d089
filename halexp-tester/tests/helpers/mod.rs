//! Test helper modules for halexp-tester integration tests
//!
//! - ScriptedTransport: in-process transport with per-request gates, for
//!   driving completion order deterministically
//! - FakeUpstream: a real HTTP search service on an ephemeral port

#![allow(dead_code)]

pub mod fake_upstream;
pub mod scripted_transport;

pub use fake_upstream::FakeUpstream;
pub use scripted_transport::{author_record, document_record, envelope, ScriptedTransport};

use halexp_common::{HitsPolicy, QueryMode};
use halexp_tester::axes::{Configuration, MinYear};
use halexp_tester::request::QueryParams;

pub const TEST_INSTANCE: &str = "http://search.test/halexp/";
pub const TEST_PROFILE_TEMPLATE: &str = "https://profiles.test/search?author={id}";

/// One configuration per metric on the test instance
pub fn configs_for_metrics(metrics: &[&str]) -> Vec<Configuration> {
    metrics
        .iter()
        .map(|m| Configuration::new(TEST_INSTANCE, MinYear::Year(2015), 0.5, m))
        .collect()
}

pub fn author_params(result_count: usize) -> QueryParams {
    QueryParams {
        query_mode: QueryMode::Authors,
        query_text: "climate adaptation".to_string(),
        result_count,
        hits: HitsPolicy::Include,
    }
}
