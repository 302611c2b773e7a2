//! Remote model-endpoint candidate source.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use wordcast_types::{ApiStyle, SourceConfig};

use super::{Candidate, PredictionSource, SourceKind};
use crate::error::SourceError;

const CHAT_SYSTEM_PROMPT: &str = "You are a next-word prediction engine. Given the user's text, \
     reply with only a JSON array of exactly five objects of the form \
     {\"word\": string, \"probability\": number between 0 and 1}, ranked by probability, \
     each word a plausible single next word. No prose, no code fences.";

const ERROR_BODY_PREVIEW: usize = 320;

#[derive(Debug, Deserialize)]
struct CompletionLogprobs {
    top_logprobs: Vec<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    logprobs: Option<CompletionLogprobs>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatPrediction {
    word: String,
    probability: f64,
}

/// Candidate source backed by one HTTP completion request per fetch.
pub struct RemoteSource {
    config: SourceConfig,
    client: reqwest::Client,
}

impl RemoteSource {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response, SourceError> {
        let endpoint = self.config.endpoint.as_deref().ok_or_else(|| {
            SourceError::InvalidConfig("remote source requires an endpoint".to_string())
        })?;

        let mut request = self.client.post(endpoint).json(payload);
        if let Some(api_key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Upstream(format!(
                "status {}: {}",
                status,
                preview(&body)
            )));
        }
        Ok(response)
    }

    async fn fetch_completion(&self, text: &str) -> Result<Vec<Candidate>, SourceError> {
        let payload = json!({
            "model": self.config.model,
            "prompt": text,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "logprobs": self.config.logprobs,
            "echo": self.config.echo,
        });

        let body: CompletionResponse = self.post(&payload).await?.json().await?;
        let top = body
            .choices
            .first()
            .and_then(|choice| choice.logprobs.as_ref())
            .and_then(|lp| lp.top_logprobs.first())
            .ok_or_else(|| SourceError::Parse("response missing top_logprobs".to_string()))?;

        Ok(top
            .iter()
            .filter_map(|(token, logprob)| {
                let weight = logprob.as_f64()?.exp();
                normalize_candidate(token, weight)
            })
            .collect())
    }

    async fn fetch_chat(&self, text: &str) -> Result<Vec<Candidate>, SourceError> {
        let payload = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": CHAT_SYSTEM_PROMPT },
                { "role": "user", "content": text },
            ],
        });

        let body: ChatResponse = self.post(&payload).await?.json().await?;
        let content = body
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| SourceError::Parse("response missing choices".to_string()))?;

        let array = extract_json_array(content).ok_or_else(|| {
            SourceError::Parse("chat response contains no JSON array".to_string())
        })?;
        let predictions: Vec<ChatPrediction> = serde_json::from_str(array)
            .map_err(|e| SourceError::Parse(format!("chat response array: {e}")))?;

        Ok(predictions
            .into_iter()
            .filter_map(|p| normalize_candidate(&p.word, p.probability))
            .collect())
    }
}

#[async_trait]
impl PredictionSource for RemoteSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    async fn fetch(&self, text: &str) -> Result<Vec<Candidate>, SourceError> {
        match self.config.api_style {
            ApiStyle::Completion => self.fetch_completion(text).await,
            ApiStyle::Chat => self.fetch_chat(text).await,
        }
    }
}

/// Drop unusable weights, clamp the rest into (0, 1].
fn normalize_candidate(token: &str, weight: f64) -> Option<Candidate> {
    if !weight.is_finite() || weight <= 0.0 {
        return None;
    }
    Some(Candidate::new(token, weight.min(1.0)))
}

/// Deterministic repair pass for chat output: locate the first balanced
/// JSON array in possibly fenced or prose-wrapped text.
fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn preview(body: &str) -> String {
    let mut chars = body.chars();
    let truncated: String = chars.by_ref().take(ERROR_BODY_PREVIEW).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_array_handles_fenced_output() {
        let raw = "```json\n[{\"word\": \"a\", \"probability\": 0.5}]\n```";
        let array = extract_json_array(raw).unwrap();
        assert!(array.starts_with('['));
        assert!(array.ends_with(']'));
        let parsed: Vec<ChatPrediction> = serde_json::from_str(array).unwrap();
        assert_eq!(parsed[0].word, "a");
    }

    #[test]
    fn extract_json_array_ignores_brackets_inside_strings() {
        let raw = "here: [{\"word\": \"x]\", \"probability\": 0.2}] trailing";
        let array = extract_json_array(raw).unwrap();
        let parsed: Vec<ChatPrediction> = serde_json::from_str(array).unwrap();
        assert_eq!(parsed[0].word, "x]");
    }

    #[test]
    fn extract_json_array_rejects_proseless_garbage() {
        assert!(extract_json_array("no array here").is_none());
        assert!(extract_json_array("[unterminated").is_none());
    }

    #[test]
    fn normalize_candidate_clamps_and_filters() {
        assert_eq!(normalize_candidate("w", 1.7).unwrap().weight, 1.0);
        assert!(normalize_candidate("w", 0.0).is_none());
        assert!(normalize_candidate("w", f64::NAN).is_none());
        assert!(normalize_candidate("w", -0.3).is_none());
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let long = "x".repeat(400);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.len(), ERROR_BODY_PREVIEW + 3);
    }
}
