//! # halexp Common Library
//!
//! Shared code for the halexp search harness crates:
//! - Error and Result types
//! - Configuration loading (TOML with tiered path resolution)
//! - Shared wire-level types (query mode, hits policy)
//! - Dispatch event types and the EventBus
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod types;

pub use error::{Error, Result};
pub use types::{HitsPolicy, QueryMode};
