//! Engine registry
//!
//! Maps artifact ids to their session handles and starts producer-driven
//! runs. Sessions are independent: the registry holds no lock across an
//! await, and each artifact's operations are serialized by its own actor.

use crate::config::EngineConfig;
use crate::driver::{drive_run, RunEnd};
use crate::error::EngineError;
use crate::producer::TextProducer;
use crate::session::{spawn_session, ArtifactHandle};
use crate::types::{InboundAction, RunId, RunKind};
use canvas_artifact::ArtifactId;
use canvas_protocol::EventStream;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};

/// A run started by [`Engine::submit`]
#[derive(Debug)]
pub struct RunTicket {
    pub run_id: RunId,
    pub kind: RunKind,
    /// Run aborted by this submission
    pub superseded: Option<RunId>,
    task: JoinHandle<RunEnd>,
}

impl RunTicket {
    /// Wait for the driver to finish
    ///
    /// # Errors
    /// If the driver task panicked or was cancelled
    pub async fn join(self) -> Result<RunEnd, JoinError> {
        self.task.await
    }
}

/// Registry of open artifact sessions
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    sessions: DashMap<ArtifactId, ArtifactHandle>,
}

impl Engine {
    #[inline]
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a session for a new artifact
    ///
    /// Without an id a ULID is generated; without a title the configured
    /// default is used. Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// - `EngineError::AlreadyOpen` if the id is taken
    /// - `EngineError::Config` if the engine's configuration does not validate
    pub fn open(
        &self,
        id: Option<ArtifactId>,
        title: Option<String>,
    ) -> Result<(ArtifactHandle, EventStream), EngineError> {
        let id = id.unwrap_or_else(ArtifactId::generate);
        match self.sessions.entry(id) {
            Entry::Occupied(entry) => Err(EngineError::AlreadyOpen(entry.key().clone())),
            Entry::Vacant(entry) => {
                let title = title.unwrap_or_else(|| self.config.default_title.clone());
                let (handle, stream) = spawn_session(entry.key().clone(), title, &self.config)?;
                entry.insert(handle.clone());
                Ok((handle, stream))
            }
        }
    }

    /// Handle of an open session
    ///
    /// # Errors
    /// `EngineError::ArtifactNotFound` if no session has this id
    pub fn handle(&self, id: &ArtifactId) -> Result<ArtifactHandle, EngineError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::ArtifactNotFound(id.clone()))
    }

    /// Start a run for `action` and drive it from `producer` in the background
    ///
    /// The run has started (and any previous run is aborted) by the time
    /// this returns.
    ///
    /// # Errors
    /// `ArtifactNotFound`, or whatever the session rejects the action with
    pub async fn submit(
        &self,
        action: InboundAction,
        producer: Arc<dyn TextProducer>,
    ) -> Result<RunTicket, EngineError> {
        let handle = self.handle(&action.artifact_id)?;
        let started = handle.start(action).await?;
        let (run_id, kind, superseded) = (started.run_id, started.kind, started.superseded);
        let task = tokio::spawn(drive_run(handle, producer, started));
        Ok(RunTicket {
            run_id,
            kind,
            superseded,
            task,
        })
    }

    /// Explicit stop action: abort the artifact's active run
    ///
    /// # Errors
    /// `ArtifactNotFound` or `SessionClosed`
    pub async fn stop(&self, id: &ArtifactId) -> Result<Option<RunId>, EngineError> {
        self.handle(id)?.stop().await
    }

    /// Shut a session down and forget it
    ///
    /// # Errors
    /// `ArtifactNotFound` if no session has this id
    pub async fn close(&self, id: &ArtifactId) -> Result<(), EngineError> {
        let (_, handle) = self
            .sessions
            .remove(id)
            .ok_or_else(|| EngineError::ArtifactNotFound(id.clone()))?;
        handle.shutdown().await;
        tracing::info!(artifact = %id, "session closed");
        Ok(())
    }

    /// Ids of all open sessions
    #[must_use]
    pub fn artifact_ids(&self) -> Vec<ArtifactId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
