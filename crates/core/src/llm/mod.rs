//! Large language model access.
//! The pipeline only needs single-turn chat completions, so the trait is a
//! thin seam that real clients and test doubles both implement.

use anyhow::Result;
use async_trait::async_trait;

pub mod openai;

/// A model that answers one system + user message pair.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the assistant reply text, trimmed.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}
