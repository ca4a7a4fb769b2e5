//! Ordered, bounded event channel
//!
//! [`EventSink`] encodes events and pushes frames into a bounded queue;
//! [`EventStream`] hands them to the consumer in exactly that order. When the
//! queue is full, `emit` waits: the transport write is the pacing point and
//! unsent frames never pile up without bound.

use crate::codec::{decode, encode, Frame};
use crate::error::{ChannelError, DecodeError};
use crate::event::Event;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Outcome of a single emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitted {
    /// Frame queued for the consumer
    Sent,
    /// Event failed to encode and was dropped; the stream stays open
    Dropped,
}

/// Producer side of the stream
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Frame>,
}

/// Consumer side of the stream
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<Frame>,
}

/// Create a stream holding at most `capacity` unsent frames
///
/// # Panics
/// If `capacity` is zero
#[must_use]
pub fn event_channel(capacity: usize) -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSink { tx }, EventStream { rx })
}

impl EventSink {
    /// Encode and enqueue one event
    ///
    /// An event that fails to encode is logged and dropped; only that frame
    /// is lost.
    ///
    /// # Errors
    /// `ChannelError::Closed` once the consumer is gone
    pub async fn emit(&self, event: impl Into<Event>) -> Result<Emitted, ChannelError> {
        let event = event.into();
        let frame = match encode(&event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(event_type = event.event_type(), error = %e, "dropping unencodable event");
                return Ok(Emitted::Dropped);
            }
        };
        self.tx
            .send(frame)
            .await
            .map_err(|_| ChannelError::Closed)?;
        Ok(Emitted::Sent)
    }

    /// Enqueue an already encoded frame
    ///
    /// # Errors
    /// `ChannelError::Closed` once the consumer is gone
    pub async fn emit_frame(&self, frame: Frame) -> Result<(), ChannelError> {
        self.tx.send(frame).await.map_err(|_| ChannelError::Closed)
    }

    /// True once the consumer dropped its end
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventStream {
    /// Next frame, `None` once every sink is dropped and the queue drained
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Next frame decoded
    pub async fn next_event(&mut self) -> Option<Result<Event, DecodeError>> {
        self.next_frame().await.map(|frame| decode(&frame))
    }

    /// Frame already queued, without waiting
    #[must_use]
    pub fn try_next_frame(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Drain every frame queued right now and decode them
    ///
    /// # Errors
    /// The first frame that fails to decode
    pub fn drain_events(&mut self) -> Result<Vec<Event>, DecodeError> {
        let mut events = Vec::new();
        while let Some(frame) = self.try_next_frame() {
            events.push(decode(&frame)?);
        }
        Ok(events)
    }

    /// Close the receiving side; pending frames can still be read
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for EventStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
