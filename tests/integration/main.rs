//! Integration tests.

mod mock_adapter;
mod pipeline;
