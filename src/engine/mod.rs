//! Core engine: snapshot orchestration over adapters and storage.

pub mod aggregator;

pub use aggregator::Aggregator;
