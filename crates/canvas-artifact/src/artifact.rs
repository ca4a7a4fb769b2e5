//! The document under edit
//!
//! An [`Artifact`] is an id, a mutable title and a [`VersionStore`]. Its
//! content is always the content of the current version: there is no second
//! copy that could drift, and a new version replaces the live text in one
//! step.

use crate::version::{SequenceNumber, Version, VersionError, VersionOrigin, VersionStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Opaque, stable artifact identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wrap a caller-supplied id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh ULID-based id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArtifactId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Mutable document: title plus version history
#[derive(Debug, Clone)]
pub struct Artifact {
    id: ArtifactId,
    title: String,
    versions: VersionStore,
}

impl Artifact {
    /// New artifact with no content yet
    #[inline]
    #[must_use]
    pub fn new(id: ArtifactId, title: impl Into<String>) -> Self {
        Self::with_store(id, title, VersionStore::new())
    }

    /// New artifact over a preconfigured store (e.g. with a size limit)
    #[inline]
    #[must_use]
    pub fn with_store(id: ArtifactId, title: impl Into<String>, versions: VersionStore) -> Self {
        Self {
            id,
            title: title.into(),
            versions,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Change the title; recorded by the next version
    #[inline]
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Live content, empty before the first version
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        self.versions.current().map_or("", |v| v.content.as_str())
    }

    /// Sequence number of the live version
    #[inline]
    #[must_use]
    pub fn current_version(&self) -> Option<SequenceNumber> {
        self.versions.current_sequence()
    }

    /// True once any version exists
    #[inline]
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.versions.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    /// Push `content` as the new live version under the current title
    ///
    /// # Errors
    /// Propagates the store's size-limit error
    pub fn commit(
        &mut self,
        content: impl Into<String>,
        created_by: VersionOrigin,
    ) -> Result<SequenceNumber, VersionError> {
        self.versions.push(content, self.title.clone(), created_by)
    }

    /// Make an earlier (or later) version live
    ///
    /// # Errors
    /// `VersionError::NotFound` for an unknown sequence number
    pub fn goto(&mut self, sequence_number: SequenceNumber) -> Result<&Version, VersionError> {
        self.versions.goto(sequence_number)
    }
}
