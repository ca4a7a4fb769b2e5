//! Per-artifact session actor
//!
//! Each open artifact is owned by one tokio task running a
//! [`RunController`]. Callers talk to it through a cloneable
//! [`ArtifactHandle`]; every mutating operation is a message, so operations
//! on one artifact are serialized without locks while different artifacts
//! run fully in parallel.
//!
//! After each command the actor writes the controller's queued events into
//! the session's [`EventSink`] before replying, so once a call returns its
//! frames are already in the stream (or the call waited for room there).

use crate::config::EngineConfig;
use crate::controller::{Completion, RelayOutcome, RunController, StartedRun};
use crate::error::EngineError;
use crate::types::{ArtifactSnapshot, InboundAction, RunId, RunKind, SelectionInput};
use canvas_artifact::{Artifact, ArtifactId, Selection, SequenceNumber, Version, VersionStore};
use canvas_protocol::{event_channel, EventSink, EventStream, SurfaceEvent};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Messages handled by a session actor
#[derive(Debug)]
enum Command {
    Start {
        action: InboundAction,
        reply: Reply<StartedRun>,
    },
    StartKind {
        kind: RunKind,
        selection: Option<SelectionInput>,
        message: String,
        reply: Reply<StartedRun>,
    },
    Relay {
        run_id: RunId,
        chunk: String,
        reply: oneshot::Sender<RelayOutcome>,
    },
    Complete {
        run_id: RunId,
        reply: Reply<Completion>,
    },
    Fail {
        run_id: RunId,
        message: String,
        reply: oneshot::Sender<bool>,
    },
    Abort {
        run_id: RunId,
        reply: oneshot::Sender<bool>,
    },
    Stop {
        reply: oneshot::Sender<Option<RunId>>,
    },
    Goto {
        sequence_number: SequenceNumber,
        reply: Reply<Version>,
    },
    Edit {
        content: String,
        reply: Reply<SequenceNumber>,
    },
    Rename {
        title: String,
        reply: oneshot::Sender<()>,
    },
    Capture {
        selection: SelectionInput,
        reply: Reply<Selection>,
    },
    Surface {
        event: SurfaceEvent,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<ArtifactSnapshot>,
    },
    Versions {
        reply: oneshot::Sender<Vec<Version>>,
    },
    Shutdown,
}

/// Handle to a running session
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    id: ArtifactId,
    sender: mpsc::Sender<Command>,
}

/// Spawn the actor for a fresh artifact
///
/// Returns the handle and the consumer end of the session's event stream.
///
/// # Errors
/// `EngineError::Config` if the configuration does not validate
pub fn spawn_session(
    id: ArtifactId,
    title: impl Into<String>,
    config: &EngineConfig,
) -> Result<(ArtifactHandle, EventStream), EngineError> {
    config.validate()?;
    let store = VersionStore::with_limit(config.max_content_chars);
    let artifact = Artifact::with_store(id.clone(), title, store);
    let (sink, stream) = event_channel(config.event_channel_capacity);
    let (tx, rx) = mpsc::channel(config.command_channel_capacity);

    tokio::spawn(session_task(RunController::new(artifact), sink, rx));
    info!(artifact = %id, "session opened");

    Ok((ArtifactHandle { id, sender: tx }, stream))
}

impl ArtifactHandle {
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    /// True once the actor has stopped
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolve and start an inbound action, superseding any active run
    ///
    /// # Errors
    /// Kind resolution, selection capture, or `SessionClosed`
    pub async fn start(&self, action: InboundAction) -> Result<StartedRun, EngineError> {
        self.call(|reply| Command::Start { action, reply }).await?
    }

    /// Start a run of an explicit kind
    ///
    /// A selection is only accepted for a partial update.
    ///
    /// # Errors
    /// Selection capture, kind preconditions, or `SessionClosed`
    pub async fn start_run(
        &self,
        kind: RunKind,
        selection: Option<SelectionInput>,
        message: impl Into<String>,
    ) -> Result<StartedRun, EngineError> {
        let message = message.into();
        self.call(|reply| Command::StartKind {
            kind,
            selection,
            message,
            reply,
        })
        .await?
    }

    /// Relay one chunk; `Dropped` if the run is no longer active
    ///
    /// # Errors
    /// `SessionClosed`
    pub async fn relay(
        &self,
        run_id: RunId,
        chunk: impl Into<String>,
    ) -> Result<RelayOutcome, EngineError> {
        let chunk = chunk.into();
        self.call(|reply| Command::Relay {
            run_id,
            chunk,
            reply,
        })
        .await
    }

    /// Complete a run
    ///
    /// # Errors
    /// Merge and version failures (the run ends `Errored`), or `SessionClosed`
    pub async fn complete(&self, run_id: RunId) -> Result<Completion, EngineError> {
        self.call(|reply| Command::Complete { run_id, reply }).await?
    }

    /// End a run with a producer error
    ///
    /// # Errors
    /// `SessionClosed`
    pub async fn fail(
        &self,
        run_id: RunId,
        message: impl Into<String>,
    ) -> Result<bool, EngineError> {
        let message = message.into();
        self.call(|reply| Command::Fail {
            run_id,
            message,
            reply,
        })
        .await
    }

    /// Abort a specific run
    ///
    /// # Errors
    /// `SessionClosed`
    pub async fn abort(&self, run_id: RunId) -> Result<bool, EngineError> {
        self.call(|reply| Command::Abort { run_id, reply }).await
    }

    /// Abort whatever run is active
    ///
    /// # Errors
    /// `SessionClosed`
    pub async fn stop(&self) -> Result<Option<RunId>, EngineError> {
        self.call(|reply| Command::Stop { reply }).await
    }

    /// Make another version live
    ///
    /// # Errors
    /// `Version(NotFound)` or `SessionClosed`
    pub async fn goto(&self, sequence_number: SequenceNumber) -> Result<Version, EngineError> {
        self.call(|reply| Command::Goto {
            sequence_number,
            reply,
        })
        .await?
    }

    /// Replace the content directly, superseding any active run
    ///
    /// # Errors
    /// `Version(ContentTooLarge)` or `SessionClosed`
    pub async fn edit_content(
        &self,
        content: impl Into<String>,
    ) -> Result<SequenceNumber, EngineError> {
        let content = content.into();
        self.call(|reply| Command::Edit { content, reply }).await?
    }

    /// Change the title used by later versions
    ///
    /// # Errors
    /// `SessionClosed`
    pub async fn rename(&self, title: impl Into<String>) -> Result<(), EngineError> {
        let title = title.into();
        self.call(|reply| Command::Rename { title, reply }).await
    }

    /// Capture a selection of the live version
    ///
    /// # Errors
    /// `Selection` errors or `SessionClosed`
    pub async fn capture_selection(
        &self,
        selection: SelectionInput,
    ) -> Result<Selection, EngineError> {
        self.call(|reply| Command::Capture { selection, reply }).await?
    }

    /// Write a surface event into the session's stream
    ///
    /// # Errors
    /// `SessionClosed`
    pub async fn publish_surface(&self, event: SurfaceEvent) -> Result<(), EngineError> {
        self.call(|reply| Command::Surface { event, reply }).await
    }

    /// # Errors
    /// `SessionClosed`
    pub async fn snapshot(&self) -> Result<ArtifactSnapshot, EngineError> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    /// All versions in sequence order
    ///
    /// # Errors
    /// `SessionClosed`
    pub async fn versions(&self) -> Result<Vec<Version>, EngineError> {
        self.call(|reply| Command::Versions { reply }).await
    }

    /// Ask the actor to stop after the commands already queued
    pub async fn shutdown(&self) {
        let _ = self.sender.send(Command::Shutdown).await;
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(command(tx))
            .await
            .map_err(|_| EngineError::SessionClosed(self.id.clone()))?;
        rx.await
            .map_err(|_| EngineError::SessionClosed(self.id.clone()))
    }
}

/// Actor state
struct Session {
    controller: RunController,
    sink: EventSink,
    consumer_gone: bool,
}

impl Session {
    /// Apply one command; false once the actor should stop
    async fn handle(&mut self, command: Command) -> bool {
        let c = &mut self.controller;
        match command {
            Command::Start { action, reply } => {
                let result = c.start_action(&action);
                self.flush().await;
                let _ = reply.send(result);
            }
            Command::StartKind {
                kind,
                selection,
                message,
                reply,
            } => {
                let result = c.start_kind(kind, selection.as_ref(), message);
                self.flush().await;
                let _ = reply.send(result);
            }
            Command::Relay {
                run_id,
                chunk,
                reply,
            } => {
                let outcome = c.relay(run_id, &chunk);
                self.flush().await;
                let _ = reply.send(outcome);
            }
            Command::Complete { run_id, reply } => {
                let result = c.complete(run_id);
                self.flush().await;
                let _ = reply.send(result);
            }
            Command::Fail {
                run_id,
                message,
                reply,
            } => {
                let failed = c.fail(run_id, &message);
                self.flush().await;
                let _ = reply.send(failed);
            }
            Command::Abort { run_id, reply } => {
                let aborted = c.abort(run_id);
                self.flush().await;
                let _ = reply.send(aborted);
            }
            Command::Stop { reply } => {
                let stopped = c.stop();
                self.flush().await;
                let _ = reply.send(stopped);
            }
            Command::Goto {
                sequence_number,
                reply,
            } => {
                let _ = reply.send(c.goto(sequence_number));
            }
            Command::Edit { content, reply } => {
                let result = c.edit(content);
                self.flush().await;
                let _ = reply.send(result);
            }
            Command::Rename { title, reply } => {
                c.rename(title);
                let _ = reply.send(());
            }
            Command::Capture { selection, reply } => {
                let _ = reply.send(c.capture(&selection));
            }
            Command::Surface { event, reply } => {
                c.publish_surface(event);
                self.flush().await;
                let _ = reply.send(());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(c.snapshot());
            }
            Command::Versions { reply } => {
                let versions = c.artifact().versions().iter().cloned().collect();
                let _ = reply.send(versions);
            }
            Command::Shutdown => {
                c.stop();
                self.flush().await;
                return false;
            }
        }
        true
    }

    /// Write queued events to the stream in order
    async fn flush(&mut self) {
        for event in self.controller.drain_events() {
            if self.consumer_gone {
                continue;
            }
            if self.sink.emit(event).await.is_err() {
                warn!(
                    artifact = %self.controller.artifact().id(),
                    "event consumer gone, discarding further frames"
                );
                self.consumer_gone = true;
            }
        }
    }
}

/// Session task (runs in separate tokio task)
async fn session_task(controller: RunController, sink: EventSink, mut rx: mpsc::Receiver<Command>) {
    let mut session = Session {
        controller,
        sink,
        consumer_gone: false,
    };

    while let Some(command) = rx.recv().await {
        if !session.handle(command).await {
            break;
        }
    }
    debug!(artifact = %session.controller.artifact().id(), "session closed");
}
