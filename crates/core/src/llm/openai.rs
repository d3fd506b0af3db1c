//! OpenAI-backed chat model.
//! This uses the chat completions endpoint with the model from the config.

use super::ChatModel;
use crate::config::OpenAiConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::trace;

/// Chat model that delegates to the OpenAI chat completion API.
pub struct OpenAiChat {
    client: Client,
    api_key: String,
    config: OpenAiConfig,
}

impl OpenAiChat {
    /// Create a new client reading the API key from `OPENAI_API_KEY`.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        Ok(Self::with_key(key, config))
    }

    pub fn with_key(api_key: impl Into<String>, config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            config,
        }
    }

    /// Send a JSON body to the chat completions endpoint and return the JSON response.
    async fn post_chat(&self, body: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?;
        let resp = resp.error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        trace!("complete(model={}, chars={})", self.config.model, user.len());
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let value = self.post_chat(body).await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("missing content"))?;
        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config(base_url: String) -> OpenAiConfig {
        OpenAiConfig {
            base_url,
            ..OpenAiConfig::default()
        }
    }

    #[tokio::test]
    async fn returns_trimmed_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body(json!({
                        "model": "gpt-4o-mini",
                        "messages": [
                            {"role": "system", "content": "sys"},
                            {"role": "user", "content": "hi"},
                        ],
                    }));
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "  hello \n"}}]
                }));
            })
            .await;
        let chat = OpenAiChat::with_key("sk-test", config(server.base_url()));
        let reply = chat.complete("sys", "hi").await.unwrap();
        mock.assert_async().await;
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn missing_content_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;
        let chat = OpenAiChat::with_key("sk-test", config(server.base_url()));
        assert!(chat.complete("sys", "hi").await.is_err());
    }

    #[tokio::test]
    async fn http_errors_propagate() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500);
            })
            .await;
        let chat = OpenAiChat::with_key("sk-test", config(server.base_url()));
        assert!(chat.complete("sys", "hi").await.is_err());
    }
}
