use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::feed::parser::strip_html;
use crate::core::feed::types::Comment;

pub const NO_COMMENTS_MESSAGE: &str = "There are no comments to summarize.";

/// OpenAI-compatible chat-completion endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm config is invalid: {0}")]
    InvalidConfig(String),
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm response contained no content")]
    EmptyResponse,
}

pub fn validate_config(config: &LlmConfig) -> Result<(), LlmError> {
    if config.base_url.trim().is_empty() {
        return Err(LlmError::InvalidConfig("base_url is empty".to_string()));
    }
    if config.model.trim().is_empty() {
        return Err(LlmError::InvalidConfig("model is empty".to_string()));
    }
    Ok(())
}

/// Reads the endpoint configuration from the environment (optionally seeded
/// from `.env.local`). Returns `None` when any required variable is unset;
/// AI summarization is simply unavailable then.
pub fn config_from_env() -> Option<LlmConfig> {
    let _ = dotenvy::from_filename(".env.local");
    let base_url = std::env::var("BACKCHANNEL_LLM_BASE_URL").unwrap_or_default();
    let api_key = std::env::var("BACKCHANNEL_LLM_API_KEY").unwrap_or_default();
    let model = std::env::var("BACKCHANNEL_LLM_MODEL").unwrap_or_default();
    if base_url.trim().is_empty() || api_key.trim().is_empty() || model.trim().is_empty() {
        return None;
    }
    Some(LlmConfig {
        base_url,
        api_key,
        model,
        timeout_secs: 30,
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub async fn call_chat_completion(
    config: &LlmConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String, LlmError> {
    validate_config(config)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let request = ChatRequest {
        model: &config.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system_prompt,
            },
            ChatMessage {
                role: "user",
                content: user_prompt,
            },
        ],
        temperature: 0.3,
        top_p: 0.9,
    };

    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
    let response = client
        .post(url)
        .bearer_auth(&config.api_key)
        .json(&request)
        .send()
        .await?
        .error_for_status()?
        .json::<ChatResponse>()
        .await?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

/// Depth-first flatten of a comment forest into a single list, dropping the
/// tree structure. This is the shape the summarization boundary consumes.
pub fn flatten_comments(comments: &[Comment]) -> Vec<&Comment> {
    let mut flat = Vec::new();
    fn walk<'a>(comments: &'a [Comment], flat: &mut Vec<&'a Comment>) {
        for comment in comments {
            flat.push(comment);
            walk(&comment.children, flat);
        }
    }
    walk(comments, &mut flat);
    flat
}

fn build_summary_prompt(article_title: &str, comments: &[&Comment]) -> String {
    let comments_text = comments
        .iter()
        .map(|comment| {
            format!(
                "Comment from {}:\n{}",
                comment.author,
                strip_html(&comment.body)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "The following is a collection of comments from an online discussion \
         about the article titled: \"{article_title}\".\n\n\
         Please provide a concise, neutral summary of the discussion. Your \
         summary should identify the main points of agreement, key \
         disagreements, and any interesting or unique perspectives raised by \
         the commenters. Do not invent information. Base your summary \
         strictly on the comments provided below.\n\n\
         Here are the comments:\n---\n{comments_text}\n---\n\
         End of comments. Please provide the summary."
    )
}

/// In-memory result cache keyed by a digest of model, title and flattened
/// comment text, so re-opening the same discussion does not re-bill the
/// provider.
#[derive(Debug, Default)]
pub struct SummaryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl SummaryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: String, value: String) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key, value);
    }
}

fn summary_cache_key(model: &str, article_title: &str, comments: &[&Comment]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b"::");
    hasher.update(article_title.as_bytes());
    for comment in comments {
        hasher.update(b"::");
        hasher.update(comment.id.as_bytes());
        hasher.update(comment.body.as_bytes());
    }
    let digest = hasher.finalize();
    format!("{digest:x}")
}

/// Summarizes a discussion: flattens both providers' forests, builds the
/// neutral-summary prompt and calls the completion endpoint. Zero comments
/// short-circuits without a network call.
pub async fn summarize_comments(
    config: &LlmConfig,
    cache: &SummaryCache,
    article_title: &str,
    comments: &[Comment],
) -> Result<String, LlmError> {
    let flat = flatten_comments(comments);
    if flat.is_empty() {
        return Ok(NO_COMMENTS_MESSAGE.to_string());
    }

    let cache_key = summary_cache_key(&config.model, article_title, &flat);
    if let Some(cached) = cache.get(&cache_key) {
        return Ok(cached);
    }

    let prompt = build_summary_prompt(article_title, &flat);
    let summary = call_chat_completion(
        config,
        "You summarize online discussions neutrally and concisely.",
        &prompt,
    )
    .await?;
    cache.put(cache_key, summary.clone());
    Ok(summary)
}
