//! HTTP API handlers for halexp-tester

pub mod buildinfo;
pub mod details;
pub mod health;
pub mod runs;
pub mod sse;

pub use buildinfo::get_build_info;
pub use details::get_detail;
pub use health::health_routes;
pub use runs::{current_run, preview_layout, start_run};
pub use sse::event_stream;
