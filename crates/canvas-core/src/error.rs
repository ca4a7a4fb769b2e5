//! Error types for Canvas Core
//!
//! [`EngineError`] is what callers of the engine see. Document-side failures
//! (stale selection, out-of-range merge, version errors) convert into it via
//! `#[from]`, as do producer and channel failures.

use crate::producer::ProducerError;
use crate::run::RunState;
use crate::types::{RunId, RunKind};
use canvas_artifact::{ArtifactId, MergeError, SelectionError, VersionError};
use canvas_protocol::ChannelError;
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No session for this artifact id
    #[error("artifact not found: {0}")]
    ArtifactNotFound(ArtifactId),

    /// A session for this id is already open
    #[error("artifact already open: {0}")]
    AlreadyOpen(ArtifactId),

    /// The action needs existing content
    #[error("artifact {0} has no content yet")]
    NoContent(ArtifactId),

    /// Partial update requested without a selection
    #[error("partial update requires a selection")]
    SelectionRequired,

    /// Selection given for a run kind that does not use one
    #[error("{0:?} runs take no selection")]
    SelectionNotAllowed(RunKind),

    /// Selection could not be captured or is stale
    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Range merge failed
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// Version store rejected the operation
    #[error("version error: {0}")]
    Version(#[from] VersionError),

    /// Run completed without producing any text
    #[error("run {0} produced no output")]
    EmptyGeneration(RunId),

    /// Generative engine failed
    #[error("producer error: {0}")]
    Producer(#[from] ProducerError),

    /// Run state machine violation
    #[error("illegal run transition: {from:?} -> {to:?}")]
    IllegalTransition { from: RunState, to: RunState },

    /// Event stream closed
    #[error("event channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session actor has shut down
    #[error("session for artifact {0} is closed")]
    SessionClosed(ArtifactId),

    /// Configuration problem
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Caller may fix its input (or re-capture) and retry
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Selection(_)
                | Self::Merge(_)
                | Self::Producer(_)
                | Self::EmptyGeneration(_)
                | Self::SelectionRequired
                | Self::SelectionNotAllowed(_)
                | Self::NoContent(_)
        )
    }

    /// The selection was captured on a version that is no longer live
    #[inline]
    #[must_use]
    pub fn is_stale_selection(&self) -> bool {
        matches!(self, Self::Selection(SelectionError::Stale { .. }))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of its allowed range
    #[error("invalid value: {0}")]
    Invalid(String),
}
