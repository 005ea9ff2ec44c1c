//! Chat completion provider abstraction and implementations.
//!
//! Mirrors the structure of the embedding module: a [`CompletionProvider`]
//! trait with a null-object [`DisabledCompletion`] and an
//! [`OpenAICompletion`] that calls the chat completions API with retry and
//! backoff.
//!
//! Also hosts query intent analysis: a cheap secondary model call that
//! summarizes what a question is asking for. Intent analysis is strictly
//! best-effort and falls back to [`IntentAnalysis::default`] on any failure.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CompletionConfig;
use crate::models::IntentAnalysis;

/// System prompt for answer synthesis.
pub const STRATEGIST_SYSTEM_PROMPT: &str = "You are a strategic business advisor with expertise \
     in financial analysis, market research, and organizational strategy. Answer questions using \
     only the provided document context. Cite sources using their [Source N] labels. If the \
     context does not contain the answer, say so clearly rather than speculating.";

/// System prompt for the intent analysis call.
const INTENT_SYSTEM_PROMPT: &str = "You analyze business questions and summarize what they ask \
     for. Respond with exactly three lines:\nIntent: <the type of analysis requested>\n\
     Concepts: <key concepts, comma separated>\nRelevant Types: <document categories, comma \
     separated, from: financial, market_research, internal, general>";

/// Token budget for the intent call. It only ever produces three short lines.
const INTENT_MAX_TOKENS: u32 = 200;

/// Fixed reply used when no completion provider is configured.
const DISABLED_RESPONSE: &str = "I apologize, but the AI analysis service is currently not \
     available. Please check the service configuration and try again.";

/// Trait for chat completion providers.
///
/// `chat` takes the model explicitly so the same provider can serve both the
/// main answer model and the cheaper intent model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn chat(&self, model: &str, system: &str, user: &str, max_tokens: u32)
        -> Result<String>;
}

/// Null-object provider for the not-configured state.
///
/// Never errors: it returns a fixed apology so that answer assembly can
/// still produce a well-formed result.
pub struct DisabledCompletion;

#[async_trait]
impl CompletionProvider for DisabledCompletion {
    async fn chat(
        &self,
        _model: &str,
        _system: &str,
        _user: &str,
        _max_tokens: u32,
    ) -> Result<String> {
        Ok(DISABLED_RESPONSE.to_string())
    }
}

/// Completion provider using the OpenAI chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAICompletion {
    temperature: f32,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAICompletion {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        Ok(Self {
            temperature: config.temperature,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletion {
    async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "max_tokens": max_tokens,
            "temperature": self.temperature,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Completion failed after retries")))
    }
}

/// Extract the assistant message text from a chat completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
}

/// Create the appropriate [`CompletionProvider`] based on configuration.
pub fn create_provider(config: &CompletionConfig) -> Result<Box<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledCompletion)),
        "openai" => Ok(Box::new(OpenAICompletion::new(config)?)),
        other => bail!("Unknown completion provider: {}", other),
    }
}

/// Run the main answer completion with the configured model.
pub async fn complete_answer(
    provider: &dyn CompletionProvider,
    config: &CompletionConfig,
    system: &str,
    user: &str,
) -> Result<String> {
    provider
        .chat(&config.model, system, user, config.max_tokens)
        .await
}

/// Analyze what a query is asking for, using the cheaper intent model.
///
/// Never fails: a disabled provider, a network error, or an unparseable
/// reply all yield [`IntentAnalysis::default`].
pub async fn analyze_intent(
    provider: &dyn CompletionProvider,
    config: &CompletionConfig,
    query: &str,
) -> IntentAnalysis {
    if !config.is_enabled() {
        return IntentAnalysis::default();
    }

    let prompt = format!("Question: {}", query);

    match provider
        .chat(
            &config.intent_model,
            INTENT_SYSTEM_PROMPT,
            &prompt,
            INTENT_MAX_TOKENS,
        )
        .await
    {
        Ok(text) => parse_intent_response(&text),
        Err(e) => {
            eprintln!("Warning: intent analysis failed: {}", e);
            IntentAnalysis::default()
        }
    }
}

/// Parse the three-line intent reply, falling back per field when a line is
/// missing or empty.
fn parse_intent_response(text: &str) -> IntentAnalysis {
    let mut result = IntentAnalysis::default();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = strip_label(line, "Intent:") {
            result.intent = rest;
        } else if let Some(rest) = strip_label(line, "Concepts:") {
            result.concepts = rest;
        } else if let Some(rest) = strip_label(line, "Relevant Types:") {
            result.relevant_types = rest;
        }
    }

    result
}

fn strip_label(line: &str, label: &str) -> Option<String> {
    // Reply lines are arbitrary model output; the label length may land
    // inside a multibyte character, so check the boundary before slicing.
    if line.len() < label.len() || !line.is_char_boundary(label.len()) {
        return None;
    }
    if !line[..label.len()].eq_ignore_ascii_case(label) {
        return None;
    }
    let rest = line[label.len()..].trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionConfig;

    #[tokio::test]
    async fn disabled_provider_returns_apology() {
        let provider = DisabledCompletion;
        let reply = provider.chat("gpt-4", "sys", "user", 100).await.unwrap();
        assert!(reply.contains("not available"));
    }

    #[tokio::test]
    async fn disabled_intent_is_default() {
        let cfg = CompletionConfig::default();
        let provider = create_provider(&cfg).unwrap();
        let intent = analyze_intent(provider.as_ref(), &cfg, "What was Q3 revenue?").await;
        assert_eq!(intent.intent, "general analysis");
        assert_eq!(intent.relevant_types, "general");
    }

    #[test]
    fn parse_intent_full_reply() {
        let reply = "Intent: financial performance review\n\
                     Concepts: revenue, quarterly growth\n\
                     Relevant Types: financial";
        let intent = parse_intent_response(reply);
        assert_eq!(intent.intent, "financial performance review");
        assert_eq!(intent.concepts, "revenue, quarterly growth");
        assert_eq!(intent.relevant_types, "financial");
    }

    #[test]
    fn parse_intent_partial_reply_keeps_defaults() {
        let reply = "Intent: competitor comparison\nsome stray text";
        let intent = parse_intent_response(reply);
        assert_eq!(intent.intent, "competitor comparison");
        assert_eq!(intent.concepts, "business strategy");
        assert_eq!(intent.relevant_types, "general");
    }

    #[test]
    fn parse_intent_garbage_is_default() {
        let intent = parse_intent_response("I cannot help with that.");
        assert_eq!(intent.intent, "general analysis");
    }

    #[test]
    fn parse_intent_labels_case_insensitive() {
        let intent = parse_intent_response("intent: trend analysis");
        assert_eq!(intent.intent, "trend analysis");
    }

    #[test]
    fn parse_intent_multibyte_lines_skipped() {
        // A multibyte character straddling the label width must not panic
        // the parser; the line simply doesn't match.
        let intent = parse_intent_response("Intenté: analyse financière");
        assert_eq!(intent.intent, "general analysis");

        let intent = parse_intent_response("Intent: résumé of café trends\nConcepts: naïveté");
        assert_eq!(intent.intent, "résumé of café trends");
        assert_eq!(intent.concepts, "naïveté");
    }

    #[test]
    fn parse_chat_response_extracts_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "content": "  The answer.  " } }
            ]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "The answer.");
    }

    #[test]
    fn parse_chat_response_rejects_empty_choices() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_chat_response(&json).is_err());
    }
}
