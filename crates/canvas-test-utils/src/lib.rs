//! Testing utilities for the Canvas workspace
//!
//! Shared fixtures, a hand-fed producer for driving interleavings
//! deterministically, and helpers for reading event streams.

#![allow(missing_docs)]

use async_trait::async_trait;
use canvas_artifact::{Artifact, ArtifactId, VersionOrigin};
use canvas_core::{
    ArtifactHandle, Engine, EngineConfig, GenerationRequest, ProducerError, TextProducer,
    TextStream,
};
use canvas_protocol::{Event, EventStream};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Artifact holding `content` as version 1
pub fn artifact_with(id: &str, content: &str) -> Artifact {
    let mut artifact = Artifact::new(ArtifactId::new(id), "Test");
    artifact.commit(content, VersionOrigin::Full).unwrap();
    artifact
}

/// Engine with one open session whose version 1 is `content`
pub async fn engine_with_doc(id: &str, content: &str) -> (Engine, ArtifactHandle, EventStream) {
    engine_with_doc_config(id, content, EngineConfig::default()).await
}

pub async fn engine_with_doc_config(
    id: &str,
    content: &str,
    config: EngineConfig,
) -> (Engine, ArtifactHandle, EventStream) {
    let engine = Engine::new(config);
    let (handle, mut stream) = engine
        .open(Some(ArtifactId::new(id)), Some("Test".into()))
        .unwrap();
    if !content.is_empty() {
        handle.edit_content(content).await.unwrap();
    }
    // Seeding produces no frames, but start from a clean stream regardless.
    stream.drain_events().unwrap();
    (engine, handle, stream)
}

/// `type` of each event
pub fn event_types(events: &[Event]) -> Vec<String> {
    events.iter().map(|e| e.event_type().to_string()).collect()
}

/// Decode every frame queued on the stream right now
pub fn drain_types(stream: &mut EventStream) -> Vec<String> {
    event_types(&stream.drain_events().unwrap())
}

/// Producer whose fragments are pushed by the test through a [`FragmentFeed`]
///
/// Serves a single `generate` call; a second call is rejected.
#[derive(Debug)]
pub struct FedProducer {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Result<String, ProducerError>>>>,
}

/// Sending side of a [`FedProducer`]; dropping it ends the stream
#[derive(Debug, Clone)]
pub struct FragmentFeed {
    tx: mpsc::UnboundedSender<Result<String, ProducerError>>,
}

/// Connected producer and feed
pub fn fed_producer() -> (FedProducer, FragmentFeed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        FedProducer {
            rx: Mutex::new(Some(rx)),
        },
        FragmentFeed { tx },
    )
}

impl FragmentFeed {
    /// Queue a fragment; false if the driver already stopped listening
    pub fn send(&self, fragment: impl Into<String>) -> bool {
        self.tx.send(Ok(fragment.into())).is_ok()
    }

    /// Queue a transport failure
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.tx
            .send(Err(ProducerError::Transport(message.into())))
            .is_ok()
    }

    /// True once the driver dropped the stream
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl TextProducer for FedProducer {
    async fn generate(&self, _request: &GenerationRequest) -> Result<TextStream, ProducerError> {
        let rx = self
            .rx
            .lock()
            .take()
            .ok_or_else(|| ProducerError::Rejected("producer already used".into()))?;
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }
}
