//! Shared data model for the wordcast prediction engine.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of ranked predictions a full set carries.
pub const DEFAULT_SET_LEN: usize = 5;

/// A single ranked next-word candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Trimmed, non-empty word.
    pub word: String,
    /// Probability in (0, 1].
    pub probability: f64,
}

impl Prediction {
    pub fn new(word: impl Into<String>, probability: f64) -> Self {
        Self {
            word: word.into(),
            probability,
        }
    }
}

/// Violations detected when assembling a [`PredictionSet`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredictionSetError {
    #[error("prediction word is empty or untrimmed")]
    InvalidWord,
    #[error("probability {0} outside (0, 1]")]
    ProbabilityOutOfRange(String),
    #[error("duplicate word: {0}")]
    DuplicateWord(String),
    #[error("entries not sorted descending by probability")]
    Unsorted,
}

/// An ordered sequence of unique ranked predictions.
///
/// Sorted descending by probability, ties keeping first-seen order.
/// A set is ordinarily full ([`DEFAULT_SET_LEN`] entries); a shorter set
/// is the legal terminal result of vocabulary exhaustion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionSet(Vec<Prediction>);

impl PredictionSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a set from already-ranked entries, verifying the set
    /// invariants: trimmed non-empty words, unique words, probabilities
    /// in (0, 1], descending order.
    pub fn from_ranked(entries: Vec<Prediction>) -> Result<Self, PredictionSetError> {
        for (idx, entry) in entries.iter().enumerate() {
            if entry.word.is_empty() || entry.word.trim() != entry.word {
                return Err(PredictionSetError::InvalidWord);
            }
            if !(entry.probability > 0.0 && entry.probability <= 1.0) {
                return Err(PredictionSetError::ProbabilityOutOfRange(
                    entry.probability.to_string(),
                ));
            }
            if entries[..idx].iter().any(|prev| prev.word == entry.word) {
                return Err(PredictionSetError::DuplicateWord(entry.word.clone()));
            }
            if idx > 0 && entries[idx - 1].probability < entry.probability {
                return Err(PredictionSetError::Unsorted);
            }
        }
        Ok(Self(entries))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the set reached the ordinary full length.
    pub fn is_full(&self) -> bool {
        self.0.len() >= DEFAULT_SET_LEN
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prediction> {
        self.0.iter()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| p.word.as_str())
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.0.iter().any(|p| p.word == word)
    }

    pub fn get(&self, index: usize) -> Option<&Prediction> {
        self.0.get(index)
    }

    pub fn as_slice(&self) -> &[Prediction] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a PredictionSet {
    type Item = &'a Prediction;
    type IntoIter = std::slice::Iter<'a, Prediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Lifecycle of a prediction session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// The single mutable record of an active session.
///
/// Mutated only by the selection controller; rendering code reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub text: String,
    pub predictions: PredictionSet,
    pub status: SessionStatus,
    pub error: Option<String>,
}

impl SessionState {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            predictions: PredictionSet::empty(),
            status: SessionStatus::Idle,
            error: None,
        }
    }
}

/// API shape the remote endpoint speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    /// Completion endpoint returning per-token log-probabilities.
    #[default]
    Completion,
    /// Chat endpoint asked to emit a JSON array of predictions.
    Chat,
}

impl std::str::FromStr for ApiStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "completion" => Ok(ApiStyle::Completion),
            "chat" => Ok(ApiStyle::Chat),
            other => Err(format!("unknown api style: {other}")),
        }
    }
}

impl std::fmt::Display for ApiStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiStyle::Completion => write!(f, "completion"),
            ApiStyle::Chat => write!(f, "chat"),
        }
    }
}

/// Configuration for the remote prediction backend.
///
/// Absence of an endpoint is not an error; it selects the local
/// fallback source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_style: ApiStyle,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_logprobs")]
    pub logprobs: u32,
    #[serde(default)]
    pub echo: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: default_model(),
            api_style: ApiStyle::default(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            logprobs: default_logprobs(),
            echo: false,
        }
    }
}

impl SourceConfig {
    pub fn is_remote(&self) -> bool {
        self.endpoint
            .as_ref()
            .map(|e| !e.trim().is_empty())
            .unwrap_or(false)
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo-instruct".to_string()
}

const fn default_max_tokens() -> u32 {
    1
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_logprobs() -> u32 {
    5
}

/// Normalization thresholds.
///
/// The boundary values come straight from product behavior and are kept
/// configurable pending confirmation rather than hard-coded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Full set length the normalizer pads and truncates toward.
    #[serde(default = "default_target_len")]
    pub target_len: usize,
    /// Below this many unique remote tokens the remote result is
    /// discarded entirely in favor of the fallback.
    #[serde(default = "default_min_usable")]
    pub min_usable: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_len: default_target_len(),
            min_usable: default_min_usable(),
        }
    }
}

const fn default_target_len() -> usize {
    DEFAULT_SET_LEN
}

const fn default_min_usable() -> usize {
    3
}

/// Tuning for the local fallback generator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Artificial delay applied per fetch so callers cannot distinguish
    /// source identity from timing alone.
    #[serde(default = "default_latency_ms")]
    pub simulated_latency_ms: u64,
    /// Fixed RNG seed for deterministic output; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: default_latency_ms(),
            seed: None,
        }
    }
}

impl FallbackConfig {
    /// Zero-latency variant for tests and padding fetches.
    pub fn instant() -> Self {
        Self {
            simulated_latency_ms: 0,
            seed: None,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            simulated_latency_ms: 0,
            seed: Some(seed),
        }
    }
}

const fn default_latency_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(entries: &[(&str, f64)]) -> Vec<Prediction> {
        entries
            .iter()
            .map(|(w, p)| Prediction::new(*w, *p))
            .collect()
    }

    #[test]
    fn from_ranked_accepts_a_valid_full_set() {
        let set = PredictionSet::from_ranked(ranked(&[
            ("the", 0.9),
            ("then", 0.7),
            ("so", 0.6),
            ("but", 0.5),
            ("or", 0.4),
        ]))
        .unwrap();
        assert!(set.is_full());
        assert_eq!(set.get(0).unwrap().word, "the");
    }

    #[test]
    fn from_ranked_rejects_duplicates_and_disorder() {
        let dup = PredictionSet::from_ranked(ranked(&[("the", 0.9), ("the", 0.7)]));
        assert_eq!(
            dup.unwrap_err(),
            PredictionSetError::DuplicateWord("the".to_string())
        );

        let unsorted = PredictionSet::from_ranked(ranked(&[("a", 0.4), ("b", 0.9)]));
        assert_eq!(unsorted.unwrap_err(), PredictionSetError::Unsorted);
    }

    #[test]
    fn from_ranked_rejects_bad_words_and_probabilities() {
        assert!(PredictionSet::from_ranked(ranked(&[(" the", 0.5)])).is_err());
        assert!(PredictionSet::from_ranked(ranked(&[("", 0.5)])).is_err());
        assert!(PredictionSet::from_ranked(ranked(&[("ok", 0.0)])).is_err());
        assert!(PredictionSet::from_ranked(ranked(&[("ok", 1.2)])).is_err());
    }

    #[test]
    fn equal_probabilities_are_legal_ties() {
        let set =
            PredictionSet::from_ranked(ranked(&[("a", 0.5), ("b", 0.5), ("c", 0.5)])).unwrap();
        assert_eq!(set.len(), 3);
        assert!(!set.is_full());
    }

    #[test]
    fn session_state_starts_idle_and_empty() {
        let state = SessionState::new("The future of work is");
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(state.predictions.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Loading).unwrap(),
            "\"loading\""
        );
    }

    #[test]
    fn source_config_defaults_match_completion_request() {
        let config = SourceConfig::default();
        assert!(!config.is_remote());
        assert_eq!(config.model, "gpt-3.5-turbo-instruct");
        assert_eq!(config.max_tokens, 1);
        assert_eq!(config.logprobs, 5);
        assert!(!config.echo);
        assert_eq!(config.api_style, ApiStyle::Completion);
    }

    #[test]
    fn blank_endpoint_is_not_remote() {
        let config = SourceConfig {
            endpoint: Some("   ".to_string()),
            ..SourceConfig::default()
        };
        assert!(!config.is_remote());
    }

    #[test]
    fn normalizer_defaults_keep_product_thresholds() {
        let config = NormalizerConfig::default();
        assert_eq!(config.target_len, 5);
        assert_eq!(config.min_usable, 3);
    }

    #[test]
    fn api_style_parses_case_insensitively() {
        assert_eq!("Chat".parse::<ApiStyle>().unwrap(), ApiStyle::Chat);
        assert!("grpc".parse::<ApiStyle>().is_err());
    }
}
