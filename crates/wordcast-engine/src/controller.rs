//! Per-session selection state machine.
//!
//! Owns the session state exclusively; rendering reads it and never
//! mutates. Transitions: `Idle -> Loading -> {Ready, Error}`, with
//! `Ready`/`Error -> Loading` on the next request and `-> Idle` on reset.

use thiserror::Error;
use tracing::{debug, error};
use wordcast_types::{PredictionSet, SessionState, SessionStatus};

use crate::normalize::Normalizer;
use crate::source::Predictor;

/// User-facing message for any internal fetch/normalize fault. The
/// underlying detail is logged, not surfaced.
const GENERIC_FAILURE: &str = "prediction failed, please try again";

const EMPTY_INPUT: &str = "empty input";

/// Characters a word may consist of entirely to be appended without a
/// separating space.
const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '(', ')', '"', '\'', '`', '-'];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// `select_word` is only legal while predictions are displayed.
    #[error("cannot select a word while session is {status:?}")]
    NotReady { status: SessionStatus },
}

/// Drives one prediction session.
pub struct SelectionController {
    state: SessionState,
    initial_text: String,
    generation: u64,
    predictor: Predictor,
    normalizer: Normalizer,
}

impl SelectionController {
    pub fn new(initial_text: impl Into<String>, predictor: Predictor, normalizer: Normalizer) -> Self {
        let initial_text = initial_text.into();
        Self {
            state: SessionState::new(initial_text.clone()),
            initial_text,
            generation: 0,
            predictor,
            normalizer,
        }
    }

    /// Read-only view for rendering.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn initial_text(&self) -> &str {
        &self.initial_text
    }

    /// Fetch and normalize predictions for `text`.
    ///
    /// Empty input transitions straight to `Error` without a fetch. Any
    /// fault inside the fetch/normalize pipeline also lands in `Error`
    /// with a generic message; nothing propagates to the caller.
    pub async fn request_predictions(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            self.state.predictions = PredictionSet::empty();
            self.state.status = SessionStatus::Error;
            self.state.error = Some(EMPTY_INPUT.to_string());
            return;
        }

        self.generation += 1;
        let generation = self.generation;

        self.state.text = text.clone();
        self.state.predictions = PredictionSet::empty();
        self.state.status = SessionStatus::Loading;
        self.state.error = None;

        let raw = self.predictor.fetch(&text).await;
        let outcome = self
            .normalizer
            .normalize(raw, &text, self.predictor.fallback())
            .await;

        // A newer request may have superseded this one while it was in
        // flight; its result must not overwrite the newer state.
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale prediction result");
            return;
        }

        match outcome {
            Ok(predictions) => {
                self.state.predictions = predictions;
                self.state.status = SessionStatus::Ready;
                self.state.error = None;
            }
            Err(err) => {
                error!(error = %err, "prediction pipeline failed");
                self.state.predictions = PredictionSet::empty();
                self.state.status = SessionStatus::Error;
                self.state.error = Some(GENERIC_FAILURE.to_string());
            }
        }
    }

    /// Append `word` to the text and immediately re-request predictions.
    ///
    /// Composite transition: observers only see `Loading` and then
    /// `Ready`/`Error` for the grown text.
    pub async fn select_word(&mut self, word: &str) -> Result<(), ControllerError> {
        if self.state.status != SessionStatus::Ready {
            return Err(ControllerError::NotReady {
                status: self.state.status,
            });
        }

        let new_text = append_word(&self.state.text, word);
        self.request_predictions(new_text).await;
        Ok(())
    }

    /// Restore the configured initial text and refresh predictions.
    pub async fn reset(&mut self) {
        self.state.text = self.initial_text.clone();
        self.state.predictions = PredictionSet::empty();
        self.state.status = SessionStatus::Idle;
        self.state.error = None;

        let initial = self.initial_text.clone();
        self.request_predictions(initial).await;
    }
}

/// Append with a single separating space, except after trailing
/// whitespace or before pure punctuation.
fn append_word(text: &str, word: &str) -> String {
    if text.is_empty() || text.ends_with(char::is_whitespace) || is_pure_punctuation(word) {
        format!("{text}{word}")
    } else {
        format!("{text} {word}")
    }
}

fn is_pure_punctuation(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| PUNCTUATION.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use wordcast_types::FallbackConfig;

    use crate::error::SourceError;
    use crate::source::{Candidate, FallbackSource, PredictionSource, SourceKind};

    fn controller() -> SelectionController {
        SelectionController::new(
            "The future of work is",
            Predictor::fallback_only(FallbackConfig::seeded(42)),
            Normalizer::default(),
        )
    }

    struct ScriptedSource(Vec<Candidate>);

    #[async_trait]
    impl PredictionSource for ScriptedSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Remote
        }

        async fn fetch(&self, _text: &str) -> Result<Vec<Candidate>, SourceError> {
            Ok(self.0.clone())
        }
    }

    struct UnreachableSource;

    #[async_trait]
    impl PredictionSource for UnreachableSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Remote
        }

        async fn fetch(&self, _text: &str) -> Result<Vec<Candidate>, SourceError> {
            Err(SourceError::Upstream("connection reset".to_string()))
        }
    }

    #[test]
    fn append_word_inserts_a_single_space() {
        assert_eq!(
            append_word("The future of work is", "great"),
            "The future of work is great"
        );
    }

    #[test]
    fn append_word_skips_the_space_for_punctuation() {
        assert_eq!(append_word("The future of work is", ","), "The future of work is,");
        assert_eq!(append_word("wait", "..."), "wait...");
        assert_eq!(append_word("he said", "\""), "he said\"");
    }

    #[test]
    fn append_word_respects_trailing_whitespace() {
        assert_eq!(append_word("already spaced ", "word"), "already spaced word");
    }

    #[test]
    fn mixed_tokens_are_not_punctuation() {
        assert!(!is_pure_punctuation("e.g"));
        assert!(!is_pure_punctuation(""));
        assert!(is_pure_punctuation("?!"));
    }

    #[tokio::test]
    async fn empty_input_transitions_to_error_without_fetch() {
        let mut controller = controller();
        controller.request_predictions("   ").await;

        let state = controller.state();
        assert_eq!(state.status, SessionStatus::Error);
        assert_eq!(state.error.as_deref(), Some("empty input"));
        assert!(state.predictions.is_empty());
        // Text is untouched by the rejected request.
        assert_eq!(state.text, "The future of work is");
    }

    #[tokio::test]
    async fn successful_request_reaches_ready_with_a_full_set() {
        let mut controller = controller();
        controller.request_predictions("The future of work is").await;

        let state = controller.state();
        assert_eq!(state.status, SessionStatus::Ready);
        assert_eq!(state.predictions.len(), 5);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn select_word_grows_text_and_refreshes_predictions() {
        let mut controller = controller();
        controller.request_predictions("The future of work is").await;

        controller.select_word("great").await.unwrap();
        let state = controller.state();
        assert_eq!(state.text, "The future of work is great");
        assert_eq!(state.status, SessionStatus::Ready);
        assert_eq!(state.predictions.len(), 5);
    }

    #[tokio::test]
    async fn select_word_is_rejected_outside_ready() {
        let mut controller = controller();
        let err = controller.select_word("great").await.unwrap_err();
        assert_eq!(
            err,
            ControllerError::NotReady {
                status: SessionStatus::Idle
            }
        );
    }

    #[tokio::test]
    async fn reset_restores_initial_text_and_settles() {
        let mut controller = controller();
        controller.request_predictions("something else entirely").await;
        controller.select_word("and").await.unwrap();
        assert_ne!(controller.state().text, "The future of work is");

        controller.reset().await;
        let state = controller.state();
        assert_eq!(state.text, "The future of work is");
        assert!(matches!(
            state.status,
            SessionStatus::Ready | SessionStatus::Error
        ));
    }

    #[tokio::test]
    async fn unreachable_remote_still_reaches_ready() {
        let mut controller = SelectionController::new(
            "The future of work is",
            Predictor::with_primary(Arc::new(UnreachableSource), FallbackSource::seeded(42)),
            Normalizer::default(),
        );
        controller.request_predictions("The future of work is").await;

        let state = controller.state();
        assert_eq!(state.status, SessionStatus::Ready);
        assert_eq!(state.predictions.len(), 5);
    }

    #[tokio::test]
    async fn sparse_remote_batch_is_replaced_not_errored() {
        let scripted = ScriptedSource(vec![
            Candidate::new("zzz", 0.9),
            Candidate::new("yyy", 0.8),
        ]);
        let mut controller = SelectionController::new(
            "The future of work is",
            Predictor::with_primary(Arc::new(scripted), FallbackSource::seeded(42)),
            Normalizer::default(),
        );
        controller.request_predictions("completely novel words").await;

        let state = controller.state();
        assert_eq!(state.status, SessionStatus::Ready);
        assert_eq!(state.predictions.len(), 5);
        assert!(!state.predictions.contains_word("zzz"));
    }

    #[tokio::test]
    async fn loading_always_settles() {
        let mut controller = controller();
        for _ in 0..3 {
            controller.reset().await;
            assert_ne!(controller.state().status, SessionStatus::Loading);
        }
    }
}
