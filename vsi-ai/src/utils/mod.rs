//! Utility modules for vsi-ai

pub mod retry;

pub use retry::{retry_transient, RetryPolicy};
