//! Canvas Artifact Model
//!
//! The document side of collaborative editing: a single mutable artifact, its
//! append-only version history, selections pinned to a version, and the
//! range patch used to apply partial updates.
//!
//! # Core Concepts
//!
//! - [`Artifact`]: id + title + [`VersionStore`]; content is the live version
//! - [`Version`]: immutable snapshot with a [`ContentHash`] checksum
//! - [`Selection`] / [`SelectionTracker`]: char range valid for one version
//! - [`merge`] / [`RangePatch`]: bounds-checked range replacement
//!
//! # Example
//!
//! ```rust
//! use canvas_artifact::{Artifact, ArtifactId, SelectionTracker, VersionOrigin};
//!
//! let mut doc = Artifact::new(ArtifactId::new("doc-1"), "Greeting");
//! doc.commit("hello world", VersionOrigin::Full).unwrap();
//!
//! let tracker = SelectionTracker::new();
//! let selection = tracker.capture(&doc, 6, 11, "world").unwrap();
//! assert!(tracker.validate(&selection, &doc));
//!
//! let merged = selection.to_patch("there").apply(doc.content()).unwrap();
//! doc.commit(merged, VersionOrigin::Partial).unwrap();
//! assert_eq!(doc.content(), "hello there");
//! assert!(!tracker.validate(&selection, &doc));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod hash;
mod patch;
mod selection;
mod version;

pub use artifact::{Artifact, ArtifactId};
pub use hash::{ContentHash, HashError};
pub use patch::{byte_offset, char_len, char_slice, check_range, merge, MergeError, RangePatch};
pub use selection::{Selection, SelectionError, SelectionTracker};
pub use version::{SequenceNumber, Version, VersionError, VersionOrigin, VersionStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
