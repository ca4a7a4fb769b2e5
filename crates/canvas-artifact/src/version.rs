//! Append-only version history
//!
//! [`VersionStore`] keeps every snapshot of a document in push order. The
//! "current" pointer selects the live version; moving it with
//! [`VersionStore::goto`] never deletes anything, and a later push still
//! lands after the *last* version (there is no forking).

use crate::hash::ContentHash;
use crate::patch::char_len;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sequence number of a version; the first version is 1
pub type SequenceNumber = u64;

/// What produced a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionOrigin {
    /// Whole-document generation (create or full update)
    Full,
    /// Range merge of a partial update
    Partial,
    /// Direct operator edit
    External,
}

impl std::fmt::Display for VersionOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::External => "external",
        };
        f.write_str(s)
    }
}

/// Immutable document snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub sequence_number: SequenceNumber,
    pub title: String,
    pub content: String,
    pub created_by: VersionOrigin,
    pub created_at: DateTime<Utc>,
    pub checksum: ContentHash,
}

impl Version {
    /// Content length in chars
    #[inline]
    #[must_use]
    pub fn char_len(&self) -> usize {
        char_len(&self.content)
    }

    /// Checksum still matches content
    #[inline]
    #[must_use]
    pub fn verify(&self) -> bool {
        self.checksum.matches(&self.content)
    }
}

/// Errors from the version store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// No version with this sequence number
    #[error("version {0} not found")]
    NotFound(SequenceNumber),

    /// Content exceeds the configured size limit
    #[error("content of {actual} chars exceeds limit of {limit}")]
    ContentTooLarge { actual: usize, limit: usize },
}

/// Ordered list of versions with a movable current pointer
///
/// # Invariants
/// - `versions[i].sequence_number == i + 1` (strictly increasing, no gaps)
/// - stored versions are never mutated or removed
/// - `current` is `None` only while the store is empty
#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    versions: Vec<Version>,
    current: Option<SequenceNumber>,
    max_content_chars: Option<usize>,
}

impl VersionStore {
    /// Empty store without a size limit
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store rejecting content longer than `max_chars`
    #[inline]
    #[must_use]
    pub fn with_limit(max_chars: usize) -> Self {
        Self {
            max_content_chars: Some(max_chars),
            ..Self::default()
        }
    }

    /// Append a version and make it current
    ///
    /// # Errors
    /// `VersionError::ContentTooLarge` if a size limit is set and exceeded
    pub fn push(
        &mut self,
        content: impl Into<String>,
        title: impl Into<String>,
        created_by: VersionOrigin,
    ) -> Result<SequenceNumber, VersionError> {
        let content = content.into();
        if let Some(limit) = self.max_content_chars {
            let actual = char_len(&content);
            if actual > limit {
                return Err(VersionError::ContentTooLarge { actual, limit });
            }
        }

        let sequence_number = self.last_sequence().map_or(1, |last| last + 1);
        let checksum = ContentHash::of_text(&content);
        self.versions.push(Version {
            sequence_number,
            title: title.into(),
            content,
            created_by,
            created_at: Utc::now(),
            checksum,
        });
        self.current = Some(sequence_number);
        Ok(sequence_number)
    }

    /// Move the current pointer; later versions are kept
    ///
    /// # Errors
    /// `VersionError::NotFound` if no such version exists
    pub fn goto(&mut self, sequence_number: SequenceNumber) -> Result<&Version, VersionError> {
        let index = self.index_of(sequence_number)?;
        self.current = Some(sequence_number);
        Ok(&self.versions[index])
    }

    /// Live version, if any has been pushed
    #[must_use]
    pub fn current(&self) -> Option<&Version> {
        self.current.and_then(|seq| self.get(seq))
    }

    /// Sequence number of the live version
    #[inline]
    #[must_use]
    pub fn current_sequence(&self) -> Option<SequenceNumber> {
        self.current
    }

    /// Sequence number of the newest version
    #[inline]
    #[must_use]
    pub fn last_sequence(&self) -> Option<SequenceNumber> {
        self.versions.last().map(|v| v.sequence_number)
    }

    /// Look up a version
    #[must_use]
    pub fn get(&self, sequence_number: SequenceNumber) -> Option<&Version> {
        self.index_of(sequence_number)
            .ok()
            .map(|index| &self.versions[index])
    }

    /// All versions in sequence order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    fn index_of(&self, sequence_number: SequenceNumber) -> Result<usize, VersionError> {
        let index = usize::try_from(sequence_number)
            .ok()
            .and_then(|seq| seq.checked_sub(1))
            .ok_or(VersionError::NotFound(sequence_number))?;
        if index < self.versions.len() {
            Ok(index)
        } else {
            Err(VersionError::NotFound(sequence_number))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_push_is_one() {
        let mut store = VersionStore::new();
        assert!(store.current().is_none());
        let seq = store.push("v1", "Doc", VersionOrigin::Full).unwrap();
        assert_eq!(seq, 1);
        assert_eq!(store.current().unwrap().content, "v1");
        assert!(store.current().unwrap().verify());
    }

    #[test]
    fn goto_then_push_appends_after_last() {
        let mut store = VersionStore::new();
        store.push("v1", "Doc", VersionOrigin::Full).unwrap();
        store.goto(1).unwrap();
        let seq = store.push("v2", "Doc", VersionOrigin::Full).unwrap();

        assert_eq!(seq, 2);
        assert_eq!(store.current_sequence(), Some(2));
        let seqs: Vec<_> = store.iter().map(|v| v.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn goto_keeps_later_versions() {
        let mut store = VersionStore::new();
        for text in ["a", "b", "c"] {
            store.push(text, "Doc", VersionOrigin::Full).unwrap();
        }
        let v = store.goto(1).unwrap();
        assert_eq!(v.content, "a");
        assert_eq!(store.len(), 3);
        assert_eq!(store.last_sequence(), Some(3));

        store.push("d", "Doc", VersionOrigin::Partial).unwrap();
        assert_eq!(store.current_sequence(), Some(4));
    }

    #[test]
    fn goto_unknown_version_fails() {
        let mut store = VersionStore::new();
        assert_eq!(store.goto(1), Err(VersionError::NotFound(1)));
        store.push("a", "Doc", VersionOrigin::Full).unwrap();
        assert_eq!(store.goto(0), Err(VersionError::NotFound(0)));
        assert_eq!(store.goto(2), Err(VersionError::NotFound(2)));
        assert_eq!(store.current_sequence(), Some(1));
    }

    #[test]
    fn size_limit_rejects_push() {
        let mut store = VersionStore::with_limit(3);
        store.push("abc", "Doc", VersionOrigin::Full).unwrap();
        let result = store.push("abcd", "Doc", VersionOrigin::Full);
        assert_eq!(
            result,
            Err(VersionError::ContentTooLarge {
                actual: 4,
                limit: 3
            })
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn origin_serializes_lowercase() {
        let json = serde_json::to_string(&VersionOrigin::External).unwrap();
        assert_eq!(json, "\"external\"");
    }

    proptest! {
        #[test]
        fn prop_push_is_monotonic_and_goto_is_read_only(
            contents in proptest::collection::vec("[a-z]{0,8}", 1..20),
            jumps in proptest::collection::vec(1u64..25, 0..10),
        ) {
            let mut store = VersionStore::new();
            for (i, text) in contents.iter().enumerate() {
                let before = store.last_sequence().unwrap_or(0);
                let seq = store.push(text.clone(), "Doc", VersionOrigin::Full).unwrap();
                prop_assert_eq!(seq, before + 1);
                prop_assert_eq!(seq, i as u64 + 1);
            }
            for seq in jumps {
                let _ = store.goto(seq);
            }
            for (stored, original) in store.iter().zip(contents.iter()) {
                prop_assert_eq!(&stored.content, original);
                prop_assert!(stored.verify());
            }
        }
    }
}
