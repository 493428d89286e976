//! sportsfeed: sports-data aggregation and normalization engine.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod betting;
pub mod config;
pub mod engine;
pub mod sports;
pub mod storage;
pub mod types;
