//! mangarank - view statistics aggregation and ranking service
//!
//! Counts raw view events into rolling daily/weekly/monthly windows,
//! persists daily snapshots and serves ranked "top manga" queries.
//!
//! # Architecture
//! - `storage`: SeaORM storage backend and the store traits
//! - `analytics`: window calculation, batch aggregation, scheduling
//! - `services`: rankings, cache tiers, per-entity statistics
//! - `api`: HTTP handlers and routes
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
