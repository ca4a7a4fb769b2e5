//! Generative text producers
//!
//! A [`TextProducer`] turns a [`GenerationRequest`] into an ordered stream of
//! text fragments. The engine relays each fragment as it arrives and applies
//! the concatenation on completion.

use crate::types::GenerationRequest;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

/// Fragments of one generation, in order
pub type TextStream = BoxStream<'static, Result<String, ProducerError>>;

/// Producer failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProducerError {
    /// Connection to the engine failed mid-stream
    #[error("transport failure: {0}")]
    Transport(String),

    /// Engine refused the request
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Source of generated text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextProducer: Send + Sync {
    /// Begin generating for `request`
    ///
    /// # Errors
    /// `ProducerError::Rejected` if the request cannot be served at all
    async fn generate(&self, request: &GenerationRequest) -> Result<TextStream, ProducerError>;
}

/// Replays fixed fragments, optionally failing after the last one
#[derive(Debug, Clone, Default)]
pub struct ReplayProducer {
    fragments: Vec<String>,
    failure: Option<String>,
}

impl ReplayProducer {
    #[must_use]
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            failure: None,
        }
    }

    /// End the stream with a transport failure instead of completing
    #[must_use]
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

#[async_trait]
impl TextProducer for ReplayProducer {
    async fn generate(&self, _request: &GenerationRequest) -> Result<TextStream, ProducerError> {
        let fragments = stream::iter(self.fragments.clone().into_iter().map(Ok));
        let tail = stream::iter(self.failure.clone().map(|m| Err(ProducerError::Transport(m))));
        Ok(fragments.chain(tail).boxed())
    }
}
