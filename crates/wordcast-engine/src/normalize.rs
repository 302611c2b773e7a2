//! Candidate normalization.
//!
//! Turns a raw candidate batch into the stable ranked set the session
//! contract promises: unique words, descending weights, ordinarily a full
//! set. Sparse remote batches are discarded or padded from the fallback
//! source; a set left short after that is the legal exhaustion result.

use std::cmp::Ordering;

use tracing::debug;
use wordcast_types::{NormalizerConfig, Prediction, PredictionSet, PredictionSetError};

use crate::source::{Candidate, FallbackSource};

/// Dedup/pad/truncate/rank pipeline.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Normalize `raw` candidates fetched for `source_text`.
    ///
    /// The fallback source covers two degradation tiers: full substitution
    /// when fewer than `min_usable` unique tokens survive cleaning, and
    /// top-up padding when the cleaned batch is usable but short.
    pub async fn normalize(
        &self,
        raw: Vec<Candidate>,
        source_text: &str,
        fallback: &FallbackSource,
    ) -> Result<PredictionSet, PredictionSetError> {
        let mut unique = clean(raw);

        if unique.len() < self.config.min_usable {
            debug!(
                unique = unique.len(),
                min_usable = self.config.min_usable,
                "batch unusable, substituting fallback output"
            );
            unique = clean(fallback.candidates(source_text).await);
        } else if unique.len() < self.config.target_len {
            debug!(
                unique = unique.len(),
                target = self.config.target_len,
                "batch sparse, padding from fallback"
            );
            let mut pad: Vec<Candidate> = clean(fallback.candidates(source_text).await)
                .into_iter()
                .filter(|c| !unique.iter().any(|u| u.token == c.token))
                .collect();
            pad.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
            for candidate in pad {
                if unique.len() >= self.config.target_len {
                    break;
                }
                unique.push(candidate);
            }
        }

        unique.truncate(self.config.target_len);
        unique.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));

        PredictionSet::from_ranked(
            unique
                .into_iter()
                .map(|c| Prediction::new(c.token, c.weight))
                .collect(),
        )
    }
}

/// Trim tokens, drop emptied ones, keep the first occurrence of each.
fn clean(raw: Vec<Candidate>) -> Vec<Candidate> {
    let mut unique: Vec<Candidate> = Vec::with_capacity(raw.len());
    for candidate in raw {
        let token = candidate.token.trim();
        if token.is_empty() {
            continue;
        }
        if !unique.iter().any(|c| c.token == token) {
            unique.push(Candidate::new(token, candidate.weight));
        }
    }
    unique
}
