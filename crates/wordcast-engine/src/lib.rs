//! wordcast prediction engine.
//!
//! Three layers, consumed in dependency order:
//! - `source`: weighted word candidates from a remote model endpoint or a
//!   local fallback generator, behind one trait.
//! - `normalize`: dedup, pad, truncate, and rank raw candidates into a
//!   stable prediction set.
//! - `controller`: the per-session state machine driving text growth and
//!   prediction refresh.

#![deny(unsafe_code)]

pub mod controller;
pub mod error;
pub mod normalize;
pub mod source;

pub use controller::{ControllerError, SelectionController};
pub use error::SourceError;
pub use normalize::Normalizer;
pub use source::{
    Candidate, FallbackSource, PredictionSource, Predictor, RemoteSource, SourceKind,
};
