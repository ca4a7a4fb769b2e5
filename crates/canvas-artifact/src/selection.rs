//! Selections captured against a specific document version
//!
//! A [`Selection`] is only meaningful for the version it was captured on.
//! Any version change (a new push or a `goto`) makes it stale, and a stale
//! selection must never be merged.

use crate::artifact::Artifact;
use crate::patch::{char_len, char_slice, check_range, MergeError, RangePatch};
use crate::version::SequenceNumber;
use serde::{Deserialize, Serialize};

/// Client-reported char range of one document version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub origin_version: SequenceNumber,
}

impl Selection {
    /// Patch replacing this selection with `replacement`
    #[inline]
    #[must_use]
    pub fn to_patch(&self, replacement: impl Into<String>) -> RangePatch {
        RangePatch::new(self.start, self.end, replacement)
    }

    /// `(start, end)` pair
    #[inline]
    #[must_use]
    pub fn range(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// Errors capturing or consuming a selection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The document changed since the selection was captured
    #[error("selection captured on version {origin} but version {current:?} is live")]
    Stale {
        origin: SequenceNumber,
        current: Option<SequenceNumber>,
    },

    /// Nothing to select in yet
    #[error("artifact has no content to select from")]
    NoContent,

    /// Range does not fit the document
    #[error(transparent)]
    OutOfRange(#[from] MergeError),

    /// Reported text differs from the document text at that range
    #[error("selection text {reported:?} does not match document text {actual:?} at [{start}, {end})")]
    TextMismatch {
        start: usize,
        end: usize,
        reported: String,
        actual: String,
    },
}

/// Captures and validates selections
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionTracker;

impl SelectionTracker {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Capture `[start, end)` of the artifact's live version
    ///
    /// # Errors
    /// - `SelectionError::NoContent` before the first version
    /// - `SelectionError::OutOfRange` unless `start <= end <= len`
    /// - `SelectionError::TextMismatch` if `text` is not the text at the range
    pub fn capture(
        &self,
        artifact: &Artifact,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<Selection, SelectionError> {
        let origin_version = artifact.current_version().ok_or(SelectionError::NoContent)?;
        let content = artifact.content();
        check_range(start, end, char_len(content))?;

        let text = text.into();
        let actual = char_slice(content, start, end).unwrap_or_default();
        if actual != text {
            return Err(SelectionError::TextMismatch {
                start,
                end,
                reported: text,
                actual: actual.to_string(),
            });
        }

        Ok(Selection {
            start,
            end,
            text,
            origin_version,
        })
    }

    /// True iff the selection was captured on the live version
    #[inline]
    #[must_use]
    pub fn validate(&self, selection: &Selection, artifact: &Artifact) -> bool {
        artifact.current_version() == Some(selection.origin_version)
    }

    /// [`validate`](Self::validate) as a `Result`
    ///
    /// # Errors
    /// `SelectionError::Stale` if the live version moved
    pub fn ensure_valid(
        &self,
        selection: &Selection,
        artifact: &Artifact,
    ) -> Result<(), SelectionError> {
        if self.validate(selection, artifact) {
            Ok(())
        } else {
            Err(SelectionError::Stale {
                origin: selection.origin_version,
                current: artifact.current_version(),
            })
        }
    }
}
