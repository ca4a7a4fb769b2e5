//! Canvas Event Protocol
//!
//! Multiplexes two independent message families over one ordered stream:
//! run lifecycle/text events and UI surface events. Each frame is a JSON
//! object whose `type` field names its kind, so a consumer can filter by
//! discriminator without knowing anything about the transport.
//!
//! # Core Concepts
//!
//! - [`Event`]: closed union of [`LifecycleEvent`], [`SurfaceEvent`] and an
//!   [`UnknownEvent`] catch-all for forward compatibility
//! - [`encode`] / [`decode`]: validated frame codec
//! - [`event_channel`]: bounded, order-preserving [`EventSink`] / [`EventStream`]
//! - [`FrameWriter`] / [`FrameReader`]: NDJSON over byte transports
//!
//! # Example
//!
//! ```rust
//! use canvas_protocol::{decode, encode, Event, EventFamily, LifecycleEvent};
//!
//! let event: Event = LifecycleEvent::TextDelta {
//!     message_id: "m1".into(),
//!     delta: "Hel".into(),
//! }
//! .into();
//! let frame = encode(&event).unwrap();
//! assert_eq!(frame.as_str(), r#"{"type":"text_delta","message_id":"m1","delta":"Hel"}"#);
//!
//! let decoded = decode(&frame).unwrap();
//! assert_eq!(decoded.family(), EventFamily::Lifecycle);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod channel;
mod codec;
mod error;
mod event;
mod framing;

pub use channel::{event_channel, Emitted, EventSink, EventStream};
pub use codec::{decode, decode_str, encode, validate, Frame};
pub use error::{ChannelError, DecodeError, ProtocolEncodingError};
pub use event::{
    Event, EventFamily, LifecycleEvent, PatchStrategy, SelectionRange, SurfaceComponent,
    SurfaceEvent, UnknownEvent, LIFECYCLE_TYPES, SURFACE_TYPES,
};
pub use framing::{FrameReader, FrameWriter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
