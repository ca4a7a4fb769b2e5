//! Core types for Canvas
//!
//! - Run, thread and message identifiers
//! - Inbound actions from the UI boundary and their run kinds
//! - Owned snapshots handed out by sessions

use crate::error::EngineError;
use crate::run::RunState;
use canvas_artifact::{ArtifactId, Selection, SequenceNumber, Version};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Ulid);

        impl $name {
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

ulid_id!(
    /// One request/response cycle with the generative engine
    RunId
);
ulid_id!(
    /// Conversation thread of a session
    ThreadId
);
ulid_id!(
    /// Assistant message that text deltas append to
    MessageId
);

/// Action requested at the UI boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    PartialUpdate,
    Chat,
}

/// What a run does to the document on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// First content of the artifact
    Create,
    /// Buffer replaces the whole document
    FullUpdate,
    /// Buffer replaces the selection's range
    PartialUpdate,
    /// Text only, document untouched
    ChatOnly,
}

impl RunKind {
    /// Completion pushes a version
    #[inline]
    #[must_use]
    pub fn mutates_document(&self) -> bool {
        !matches!(self, Self::ChatOnly)
    }
}

/// Selection as reported by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionInput {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Inbound user action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundAction {
    pub message: String,
    pub artifact_id: ArtifactId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
}

impl InboundAction {
    /// Action with no explicit kind
    #[inline]
    #[must_use]
    pub fn new(artifact_id: impl Into<ArtifactId>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            artifact_id: artifact_id.into(),
            selection: None,
            action: None,
        }
    }

    /// With explicit action kind
    #[inline]
    #[must_use]
    pub fn with_action(mut self, action: ActionKind) -> Self {
        self.action = Some(action);
        self
    }

    /// With a client selection
    #[inline]
    #[must_use]
    pub fn with_selection(mut self, start: usize, end: usize, text: impl Into<String>) -> Self {
        self.selection = Some(SelectionInput {
            start,
            end,
            text: text.into(),
        });
        self
    }

    /// Decide the run kind given whether the artifact has content
    ///
    /// A selection on existing content turns anything but `chat` into a
    /// partial update.
    ///
    /// # Errors
    /// - `EngineError::NoContent` for updates of an empty artifact
    /// - `EngineError::SelectionRequired` for a partial update without selection
    pub fn resolve_kind(&self, has_content: bool) -> Result<RunKind, EngineError> {
        if self.action == Some(ActionKind::Chat) {
            return Ok(RunKind::ChatOnly);
        }
        if self.selection.is_some() && has_content {
            return Ok(RunKind::PartialUpdate);
        }
        match (self.action, has_content) {
            (None | Some(ActionKind::Create), false) => Ok(RunKind::Create),
            (None | Some(ActionKind::Create | ActionKind::Update), true) => Ok(RunKind::FullUpdate),
            (Some(ActionKind::Update | ActionKind::PartialUpdate), false) => {
                Err(EngineError::NoContent(self.artifact_id.clone()))
            }
            (Some(ActionKind::PartialUpdate), true) => Err(EngineError::SelectionRequired),
            (Some(ActionKind::Chat), _) => Ok(RunKind::ChatOnly),
        }
    }
}

/// Everything a producer needs to generate for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub run_id: RunId,
    pub kind: RunKind,
    pub message: String,
    /// Live document text at start
    pub document: String,
    pub selection: Option<Selection>,
}

/// Terminal record of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub kind: RunKind,
    pub state: RunState,
}

/// Active run as seen from outside the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRun {
    pub run_id: RunId,
    pub kind: RunKind,
    pub state: RunState,
    pub chunks: usize,
}

/// Owned view of a session's artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    pub id: ArtifactId,
    pub title: String,
    pub current: Option<Version>,
    pub version_count: usize,
    pub active_run: Option<ActiveRun>,
    pub last_outcome: Option<RunOutcome>,
}

impl ArtifactSnapshot {
    /// Live content, empty before the first version
    #[must_use]
    pub fn content(&self) -> &str {
        self.current.as_ref().map_or("", |v| v.content.as_str())
    }

    /// Live version number
    #[must_use]
    pub fn current_version(&self) -> Option<SequenceNumber> {
        self.current.as_ref().map(|v| v.sequence_number)
    }
}
