//! Run lifecycle controller
//!
//! Owns one artifact and at most one active run. Every operation is
//! synchronous and queues the events it produces in an outbox; the session
//! actor drains the outbox into the event stream after each command, so
//! frames leave in the order the operations happened.
//!
//! # Guarantees
//! - at most one run is `Idle` or `Streaming`; `start` aborts the previous one
//! - `run_started` precedes every chunk of its run, and each run ends with
//!   exactly one terminal event
//! - chunks for a run that is no longer active are dropped silently
//! - the document changes only on a successful completion or an external
//!   edit, each a single version push

use crate::error::EngineError;
use crate::run::{Run, RunState};
use crate::types::{
    ActiveRun, ArtifactSnapshot, GenerationRequest, InboundAction, RunId, RunKind, RunOutcome,
    SelectionInput, ThreadId,
};
use canvas_artifact::{
    char_len, Artifact, Selection, SelectionTracker, SequenceNumber, Version, VersionOrigin,
};
use canvas_protocol::{Event, LifecycleEvent, PatchStrategy, SelectionRange, SurfaceEvent};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Message carried by `run_error` when the failure came with none
const UNSPECIFIED_FAILURE: &str = "run failed";

/// Result of a relay call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Chunk appended and emitted
    Accepted,
    /// Run no longer active; chunk discarded
    Dropped,
}

/// Result of a successful complete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// New version pushed
    Committed(SequenceNumber),
    /// Chat-only run finished without touching the document
    Finished,
    /// Run was already superseded or finished; nothing happened
    Ignored,
}

/// A run that has just been started
#[derive(Debug, Clone)]
pub struct StartedRun {
    pub run_id: RunId,
    pub kind: RunKind,
    /// Previous run aborted by this start
    pub superseded: Option<RunId>,
    pub request: GenerationRequest,
    active: watch::Receiver<Option<RunId>>,
}

impl StartedRun {
    /// True while this run is still the controller's active run
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.active.borrow() == Some(self.run_id)
    }

    /// Resolves once this run has ended for any reason
    ///
    /// Also resolves if the controller is dropped.
    pub async fn ended(&self) {
        let mut active = self.active.clone();
        let run_id = self.run_id;
        let _ = active.wait_for(|current| *current != Some(run_id)).await;
    }
}

/// Single-writer controller for one artifact
#[derive(Debug)]
pub struct RunController {
    artifact: Artifact,
    thread_id: ThreadId,
    tracker: SelectionTracker,
    active: Option<Run>,
    active_id: watch::Sender<Option<RunId>>,
    last_outcome: Option<RunOutcome>,
    outbox: Vec<Event>,
}

impl RunController {
    #[must_use]
    pub fn new(artifact: Artifact) -> Self {
        Self {
            artifact,
            thread_id: ThreadId::new(),
            tracker: SelectionTracker::new(),
            active: None,
            active_id: watch::Sender::new(None),
            last_outcome: None,
            outbox: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    #[inline]
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    #[inline]
    #[must_use]
    pub fn active_run(&self) -> Option<&Run> {
        self.active.as_ref()
    }

    /// Outcome of the most recently ended run
    #[inline]
    #[must_use]
    pub fn last_outcome(&self) -> Option<RunOutcome> {
        self.last_outcome
    }

    /// Take all queued events
    #[inline]
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    /// Capture a selection of the live version
    ///
    /// # Errors
    /// `EngineError::Selection` if the range or text does not fit
    pub fn capture(&self, input: &SelectionInput) -> Result<Selection, EngineError> {
        Ok(self
            .tracker
            .capture(&self.artifact, input.start, input.end, input.text.clone())?)
    }

    /// Resolve an inbound action against the live document and start it
    ///
    /// Kind resolution and selection capture see the same version the run
    /// starts on.
    ///
    /// # Errors
    /// As [`InboundAction::resolve_kind`], [`capture`](Self::capture) and
    /// [`start`](Self::start)
    pub fn start_action(&mut self, action: &InboundAction) -> Result<StartedRun, EngineError> {
        let kind = action.resolve_kind(self.artifact.has_content())?;
        let selection = match (kind, &action.selection) {
            (RunKind::PartialUpdate, Some(input)) => Some(self.capture(input)?),
            _ => None,
        };
        self.start(kind, selection, action.message.clone())
    }

    /// Start a run of an explicit kind, capturing its selection first
    ///
    /// # Errors
    /// `EngineError::SelectionNotAllowed` for a selection on any kind but a
    /// partial update, otherwise as [`capture`](Self::capture) and
    /// [`start`](Self::start)
    pub fn start_kind(
        &mut self,
        kind: RunKind,
        selection: Option<&SelectionInput>,
        message: impl Into<String>,
    ) -> Result<StartedRun, EngineError> {
        if selection.is_some() && kind != RunKind::PartialUpdate {
            return Err(EngineError::SelectionNotAllowed(kind));
        }
        let selection = selection.map(|input| self.capture(input)).transpose()?;
        self.start(kind, selection, message)
    }

    /// Start a run, superseding any active one
    ///
    /// # Errors
    /// - `EngineError::NoContent` for a partial or full update of an empty
    ///   artifact
    /// - `EngineError::SelectionRequired` for a partial update without selection
    /// - `EngineError::SelectionNotAllowed` for a selection on any other kind
    ///
    /// Validation happens before the previous run is touched.
    pub fn start(
        &mut self,
        kind: RunKind,
        selection: Option<Selection>,
        message: impl Into<String>,
    ) -> Result<StartedRun, EngineError> {
        if matches!(kind, RunKind::PartialUpdate | RunKind::FullUpdate)
            && !self.artifact.has_content()
        {
            return Err(EngineError::NoContent(self.artifact.id().clone()));
        }
        let selection = match (kind, selection) {
            (RunKind::PartialUpdate, selection) => {
                Some(selection.ok_or(EngineError::SelectionRequired)?)
            }
            (_, Some(_)) => return Err(EngineError::SelectionNotAllowed(kind)),
            (_, None) => None,
        };

        let superseded = self.supersede();

        let run = Run::new(kind, selection);
        let run_id = run.id();
        info!(
            artifact = %self.artifact.id(),
            run = %run_id,
            ?kind,
            superseded = ?superseded,
            "run started"
        );

        self.push(LifecycleEvent::RunStarted {
            thread_id: self.thread_id.to_string(),
            run_id: run_id.to_string(),
        });
        if let Some(range) = run.selection_range() {
            self.push(LifecycleEvent::ArtifactPartialUpdateStart {
                selection: range,
                strategy: PatchStrategy::Replace,
            });
        }

        let request = GenerationRequest {
            run_id,
            kind,
            message: message.into(),
            document: self.artifact.content().to_string(),
            selection: run.selection().cloned(),
        };
        self.active = Some(run);
        self.active_id.send_replace(Some(run_id));

        Ok(StartedRun {
            run_id,
            kind,
            superseded,
            request,
            active: self.active_id.subscribe(),
        })
    }

    /// Append a chunk to the run's buffer and emit it
    ///
    /// A chunk for a run that is not the active one is dropped without
    /// error: it raced with cancellation.
    pub fn relay(&mut self, run_id: RunId, chunk: &str) -> RelayOutcome {
        let Some(run) = self.active.as_mut().filter(|run| run.id() == run_id) else {
            debug!(run = %run_id, "dropping chunk for inactive run");
            return RelayOutcome::Dropped;
        };
        if !run.append(chunk) {
            return RelayOutcome::Dropped;
        }

        let event = match run.selection_range() {
            Some(selection) => LifecycleEvent::ArtifactPartialUpdateChunk {
                chunk: chunk.to_string(),
                selection,
            },
            None => LifecycleEvent::TextDelta {
                message_id: run.message_id().to_string(),
                delta: chunk.to_string(),
            },
        };
        self.push(event);
        RelayOutcome::Accepted
    }

    /// Finish the active run and apply its buffer
    ///
    /// The document is updated all-or-nothing. On any failure the run ends
    /// `Errored`, `run_error` is emitted and the document is unchanged.
    ///
    /// # Errors
    /// - `EngineError::EmptyGeneration` if no chunk was relayed
    /// - `EngineError::Selection` if the selection went stale
    /// - `EngineError::Merge` if the range no longer fits
    /// - `EngineError::Version` if the store rejects the content
    pub fn complete(&mut self, run_id: RunId) -> Result<Completion, EngineError> {
        let Some(mut run) = self.take_active(run_id) else {
            debug!(run = %run_id, "complete for inactive run ignored");
            return Ok(Completion::Ignored);
        };

        if run.state() == RunState::Idle {
            return Err(self.fail_run(run, EngineError::EmptyGeneration(run_id)));
        }

        match self.apply(&mut run) {
            Ok(completion) => {
                run.transition(RunState::Completed)?;
                info!(run = %run_id, ?completion, "run completed");
                self.push(LifecycleEvent::RunFinished {
                    thread_id: self.thread_id.to_string(),
                    run_id: run_id.to_string(),
                });
                self.last_outcome = Some(run.outcome());
                Ok(completion)
            }
            Err(e) => Err(self.fail_run(run, e)),
        }
    }

    /// End the active run because the producer failed
    ///
    /// Returns false if the run was already superseded (the error is
    /// swallowed). A blank message is replaced with a generic one.
    pub fn fail(&mut self, run_id: RunId, message: &str) -> bool {
        match self.take_active(run_id) {
            Some(run) => {
                warn!(run = %run_id, error = message, "producer failed");
                self.finish_errored(run, message.to_string());
                true
            }
            None => {
                debug!(run = %run_id, "failure for inactive run swallowed");
                false
            }
        }
    }

    /// Abort a run; no document change
    ///
    /// Returns false if `run_id` is not the active run.
    pub fn abort(&mut self, run_id: RunId) -> bool {
        match self.take_active(run_id) {
            Some(run) => {
                self.finish_aborted(run);
                true
            }
            None => false,
        }
    }

    /// Abort whatever run is active (explicit stop action)
    pub fn stop(&mut self) -> Option<RunId> {
        self.supersede()
    }

    /// Make another version live
    ///
    /// # Errors
    /// `EngineError::Version` for an unknown sequence number
    pub fn goto(&mut self, sequence_number: SequenceNumber) -> Result<Version, EngineError> {
        let version = self.artifact.goto(sequence_number)?.clone();
        info!(artifact = %self.artifact.id(), version = sequence_number, "moved to version");
        Ok(version)
    }

    /// Replace the content directly as the operator
    ///
    /// An operator edit is a user action, so it supersedes any active run.
    ///
    /// # Errors
    /// `EngineError::Version` if the store rejects the content
    pub fn edit(&mut self, content: impl Into<String>) -> Result<SequenceNumber, EngineError> {
        self.supersede();
        let seq = self.artifact.commit(content, VersionOrigin::External)?;
        debug!(artifact = %self.artifact.id(), version = seq, "external edit");
        Ok(seq)
    }

    /// Change the title for subsequent versions
    pub fn rename(&mut self, title: impl Into<String>) {
        self.artifact.set_title(title);
    }

    /// Queue a surface-family event behind everything already queued
    pub fn publish_surface(&mut self, event: SurfaceEvent) {
        self.push(event);
    }

    /// Owned view for callers outside the session
    #[must_use]
    pub fn snapshot(&self) -> ArtifactSnapshot {
        ArtifactSnapshot {
            id: self.artifact.id().clone(),
            title: self.artifact.title().to_string(),
            current: self.artifact.versions().current().cloned(),
            version_count: self.artifact.versions().len(),
            active_run: self.active.as_ref().map(Run::summary),
            last_outcome: self.last_outcome,
        }
    }

    /// Summary of the active run
    #[must_use]
    pub fn active_summary(&self) -> Option<ActiveRun> {
        self.active.as_ref().map(Run::summary)
    }

    fn apply(&mut self, run: &mut Run) -> Result<Completion, EngineError> {
        match run.kind() {
            RunKind::ChatOnly => Ok(Completion::Finished),
            RunKind::Create | RunKind::FullUpdate => {
                let seq = self.artifact.commit(run.take_buffer(), VersionOrigin::Full)?;
                Ok(Completion::Committed(seq))
            }
            RunKind::PartialUpdate => {
                let selection = run.take_selection().ok_or(EngineError::SelectionRequired)?;
                self.tracker.ensure_valid(&selection, &self.artifact)?;

                let replacement = run.take_buffer();
                let patch = selection.to_patch(replacement);
                let base_len = char_len(self.artifact.content());
                let merged = patch.apply(self.artifact.content())?;
                let merged_len = char_len(&merged);
                if merged_len != patch.expected_len(base_len) {
                    warn!(
                        run = %run.id(),
                        expected = patch.expected_len(base_len),
                        actual = merged_len,
                        "merged length differs from expected"
                    );
                }

                let seq = self.artifact.commit(merged.clone(), VersionOrigin::Partial)?;
                self.push(LifecycleEvent::ArtifactPartialUpdateComplete {
                    selection: SelectionRange::new(selection.start, selection.end),
                    updated_content: merged,
                    strategy: PatchStrategy::Replace,
                });
                Ok(Completion::Committed(seq))
            }
        }
    }

    fn take_active(&mut self, run_id: RunId) -> Option<Run> {
        if self.active.as_ref().is_some_and(|run| run.id() == run_id) {
            self.clear_active()
        } else {
            None
        }
    }

    fn clear_active(&mut self) -> Option<Run> {
        let run = self.active.take()?;
        self.active_id.send_replace(None);
        Some(run)
    }

    fn supersede(&mut self) -> Option<RunId> {
        let run = self.clear_active()?;
        let run_id = run.id();
        self.finish_aborted(run);
        Some(run_id)
    }

    fn finish_aborted(&mut self, mut run: Run) {
        if let Err(e) = run.transition(RunState::Aborted) {
            error!(run = %run.id(), error = %e, "active run refused abort");
        }
        warn!(run = %run.id(), chunks = run.chunks(), "run aborted");
        self.push(LifecycleEvent::RunCancelled {
            thread_id: self.thread_id.to_string(),
            run_id: run.id().to_string(),
        });
        self.last_outcome = Some(run.outcome());
    }

    fn fail_run(&mut self, run: Run, error: EngineError) -> EngineError {
        warn!(run = %run.id(), %error, "run failed, document unchanged");
        self.finish_errored(run, error.to_string());
        error
    }

    fn finish_errored(&mut self, mut run: Run, message: String) {
        if let Err(e) = run.transition(RunState::Errored) {
            error!(run = %run.id(), error = %e, "active run refused error state");
        }
        let message = if message.trim().is_empty() {
            UNSPECIFIED_FAILURE.to_string()
        } else {
            message
        };
        self.push(LifecycleEvent::RunError {
            message,
            run_id: Some(run.id().to_string()),
        });
        self.last_outcome = Some(run.outcome());
    }

    fn push(&mut self, event: impl Into<Event>) {
        self.outbox.push(event.into());
    }
}
