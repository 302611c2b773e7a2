//! Prediction sources.
//!
//! A source turns input text into a small set of weighted word candidates.
//! Two implementations exist behind [`PredictionSource`]: a remote model
//! endpoint and a local fallback generator. The [`Predictor`] facade picks
//! one at construction time and degrades remote faults to the fallback.

mod fallback;
mod remote;

pub use fallback::FallbackSource;
pub use remote::RemoteSource;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use wordcast_types::{FallbackConfig, SourceConfig};

use crate::error::SourceError;

/// A raw weighted candidate emitted by a source before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub token: String,
    /// Weight in (0, 1]; sources normalize before emitting.
    pub weight: f64,
}

impl Candidate {
    pub fn new(token: impl Into<String>, weight: f64) -> Self {
        Self {
            token: token.into(),
            weight,
        }
    }
}

/// Which kind of source produced a candidate batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Remote,
    Fallback,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Remote => write!(f, "remote"),
            SourceKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// Trait implemented by all candidate sources.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch weighted candidates for `text`. One outbound call at most.
    async fn fetch(&self, text: &str) -> Result<Vec<Candidate>, SourceError>;
}

/// Session-facing source facade.
///
/// Holds an optional primary (remote) source plus the always-available
/// fallback. A primary fault is logged and degraded to the fallback, so
/// `fetch` itself never fails.
pub struct Predictor {
    primary: Option<Arc<dyn PredictionSource>>,
    fallback: Arc<FallbackSource>,
}

impl Predictor {
    /// Select the source once from configuration. A missing endpoint is
    /// not an error; it silently selects the fallback.
    pub fn from_config(source: &SourceConfig, fallback: FallbackConfig) -> Self {
        let fallback = Arc::new(FallbackSource::new(fallback));
        let primary: Option<Arc<dyn PredictionSource>> = if source.is_remote() {
            Some(Arc::new(RemoteSource::new(source.clone())))
        } else {
            warn!("no prediction endpoint configured, using fallback source");
            None
        };
        Self { primary, fallback }
    }

    pub fn fallback_only(fallback: FallbackConfig) -> Self {
        Self {
            primary: None,
            fallback: Arc::new(FallbackSource::new(fallback)),
        }
    }

    /// Inject an explicit primary over a given fallback. Test seam.
    pub fn with_primary(primary: Arc<dyn PredictionSource>, fallback: FallbackSource) -> Self {
        Self {
            primary: Some(primary),
            fallback: Arc::new(fallback),
        }
    }

    pub fn fallback(&self) -> &FallbackSource {
        &self.fallback
    }

    pub fn is_remote(&self) -> bool {
        self.primary.is_some()
    }

    /// Fetch candidates, degrading primary faults to the fallback.
    pub async fn fetch(&self, text: &str) -> Vec<Candidate> {
        if let Some(primary) = &self.primary {
            match primary.fetch(text).await {
                Ok(candidates) => return candidates,
                Err(err) => {
                    warn!(source = %primary.kind(), error = %err, "source fetch failed, degrading to fallback");
                }
            }
        }
        self.fallback.candidates(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait]
    impl PredictionSource for FailingSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Remote
        }

        async fn fetch(&self, _text: &str) -> Result<Vec<Candidate>, SourceError> {
            Err(SourceError::Upstream("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn primary_fault_degrades_to_fallback() {
        let predictor =
            Predictor::with_primary(Arc::new(FailingSource), FallbackSource::seeded(11));
        let candidates = predictor.fetch("some text").await;
        assert_eq!(candidates.len(), 5);
    }

    #[tokio::test]
    async fn missing_endpoint_selects_fallback() {
        let predictor = Predictor::from_config(
            &SourceConfig::default(),
            wordcast_types::FallbackConfig::instant(),
        );
        assert!(!predictor.is_remote());
        let candidates = predictor.fetch("hello").await;
        assert_eq!(candidates.len(), 5);
        assert!(candidates.iter().any(|c| c.token == "there"));
    }
}
