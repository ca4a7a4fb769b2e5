//! Run lifecycle state machine
//!
//! `Idle -> Streaming -> {Completed | Aborted | Errored}`, plus the direct
//! `Idle -> Aborted` (superseded before any text) and `Idle -> Errored`
//! (completed with no text) edges. Terminal states have no way out.

use crate::error::EngineError;
use crate::types::{ActiveRun, MessageId, RunId, RunKind, RunOutcome};
use canvas_artifact::Selection;
use canvas_protocol::SelectionRange;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Streaming,
    Completed,
    Aborted,
    Errored,
}

impl RunState {
    /// Run may still receive chunks or be completed
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Idle | Self::Streaming)
    }

    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RunState) -> &'static [RunState] {
    use RunState::*;
    match from {
        Idle => &[Streaming, Aborted, Errored],
        Streaming => &[Completed, Aborted, Errored],
        Completed | Aborted | Errored => &[],
    }
}

/// Check a single transition
///
/// # Errors
/// `EngineError::IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: RunState, to: RunState) -> Result<(), EngineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(EngineError::IllegalTransition { from, to })
    }
}

/// A single generation run
#[derive(Debug, Clone)]
pub struct Run {
    id: RunId,
    kind: RunKind,
    state: RunState,
    message_id: MessageId,
    selection: Option<Selection>,
    buffer: String,
    chunks: usize,
}

impl Run {
    /// New run in `Idle`
    #[must_use]
    pub fn new(kind: RunKind, selection: Option<Selection>) -> Self {
        Self {
            id: RunId::new(),
            kind,
            state: RunState::Idle,
            message_id: MessageId::new(),
            selection,
            buffer: String::new(),
            chunks: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> RunKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    #[inline]
    #[must_use]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    #[inline]
    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Client-facing range of the selection, if any
    #[must_use]
    pub fn selection_range(&self) -> Option<SelectionRange> {
        self.selection
            .as_ref()
            .map(|s| SelectionRange::new(s.start, s.end))
    }

    /// Hand the selection to the merge step; it can only be consumed once
    #[inline]
    pub fn take_selection(&mut self) -> Option<Selection> {
        self.selection.take()
    }

    /// Move to `to`
    ///
    /// # Errors
    /// `EngineError::IllegalTransition` for an edge the machine lacks
    pub fn transition(&mut self, to: RunState) -> Result<(), EngineError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }

    /// Append a chunk, entering `Streaming` on the first one
    ///
    /// Returns false (and changes nothing) once the run is terminal.
    pub fn append(&mut self, chunk: &str) -> bool {
        match self.state {
            RunState::Idle => self.state = RunState::Streaming,
            RunState::Streaming => {}
            RunState::Completed | RunState::Aborted | RunState::Errored => return false,
        }
        self.buffer.push_str(chunk);
        self.chunks += 1;
        true
    }

    /// Take the accumulated text
    #[inline]
    pub fn take_buffer(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    #[must_use]
    pub fn summary(&self) -> ActiveRun {
        ActiveRun {
            run_id: self.id,
            kind: self.kind,
            state: self.state,
            chunks: self.chunks,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            run_id: self.id,
            kind: self.kind,
            state: self.state,
        }
    }
}
