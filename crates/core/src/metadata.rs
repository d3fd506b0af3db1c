//! Title, description and hashtags for a finished reel.

use crate::llm::ChatModel;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, trace, warn};

pub const SYSTEM_PROMPT: &str = "You create descriptions for a reel.";

/// Longest title the fallback path keeps, in characters.
const MAX_TITLE_CHARS: usize = 90;
const FALLBACK_DESCRIPTION: &str = "Quick video. If you liked it, follow for more.";
const FALLBACK_HASHTAGS: [&str; 5] = ["#fyp", "#reels", "#shorts", "#learn", "#tech"];

/// Publishing metadata written next to the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelMetadata {
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "hashtag_list")]
    pub hashtags: Vec<String>,
}

/// How the model reply was turned into metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataOutcome {
    /// The reply was valid JSON with the expected keys.
    Structured(ReelMetadata),
    /// The reply could not be parsed; the title comes from its first line
    /// and the rest are stock values.
    Fallback(ReelMetadata),
}

impl MetadataOutcome {
    pub fn metadata(&self) -> &ReelMetadata {
        match self {
            MetadataOutcome::Structured(m) | MetadataOutcome::Fallback(m) => m,
        }
    }

    pub fn into_metadata(self) -> ReelMetadata {
        match self {
            MetadataOutcome::Structured(m) | MetadataOutcome::Fallback(m) => m,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, MetadataOutcome::Fallback(_))
    }
}

/// Accept hashtags either as a JSON array or as one space separated string.
fn hashtag_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Text(String),
    }
    Ok(match Tags::deserialize(deserializer)? {
        Tags::List(list) => list,
        Tags::Text(text) => text.split_whitespace().map(str::to_string).collect(),
    })
}

/// Build the user prompt for `script`.
pub fn prompt(script: &str) -> String {
    format!(
        "Based on this short video narration, write:\n\
         1) A TITLE (<= 90 chars)\n\
         2) A 2-sentence DESCRIPTION with a subtle CTA\n\
         3) 15 short HASHTAGS (platform-friendly)\n\
         Return JSON with keys: title, description, hashtags\n\
         Narration:\n\
         {script}"
    )
}

/// Turn a raw model reply into metadata, degrading to stock values when the
/// reply is not the JSON object that was asked for.
pub fn interpret(raw: &str) -> MetadataOutcome {
    match serde_json::from_str::<ReelMetadata>(strip_code_fence(raw)) {
        Ok(meta) => MetadataOutcome::Structured(meta),
        Err(err) => {
            trace!("reply is not metadata JSON: {}", err);
            let first = raw.lines().next().unwrap_or("");
            let title: String = first.chars().take(MAX_TITLE_CHARS).collect();
            MetadataOutcome::Fallback(ReelMetadata {
                title: title.trim().to_string(),
                description: FALLBACK_DESCRIPTION.to_string(),
                hashtags: FALLBACK_HASHTAGS.iter().map(|s| s.to_string()).collect(),
            })
        }
    }
}

/// Models like to wrap JSON in a ```json fence even when told not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Ask `model` for metadata describing `script`.
/// Transport errors propagate; an unparsable reply yields `Fallback`.
pub async fn generate_metadata<M: ChatModel + ?Sized>(
    model: &M,
    script: &str,
) -> Result<MetadataOutcome> {
    info!("generating reel metadata");
    let raw = model
        .complete(SYSTEM_PROMPT, &prompt(script))
        .await
        .context("metadata request failed")?;
    let outcome = interpret(&raw);
    if outcome.is_fallback() {
        warn!("model reply was not valid metadata JSON, using fallback values");
    }
    Ok(outcome)
}

/// Write metadata as pretty JSON, keeping non-ASCII text as is.
pub fn write(meta: &ReelMetadata, path: &Path) -> Result<()> {
    trace!("metadata::write path={}", path.display());
    let text = serde_json::to_string_pretty(meta)?;
    fs::write(path, text).with_context(|| format!("failed to write metadata {}", path.display()))
}
