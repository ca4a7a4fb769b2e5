//! Error types for the event protocol
//!
//! - [`ProtocolEncodingError`]: an event cannot be put on the wire; fatal to
//!   that frame only
//! - [`DecodeError`]: a frame cannot be read back
//! - [`ChannelError`]: the consumer side of the stream is gone

/// An event is missing data its discriminator requires
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolEncodingError {
    /// Required field empty
    #[error("{event_type}: required field '{field}' is empty")]
    MissingField {
        event_type: String,
        field: &'static str,
    },

    /// Selection range with `start > end`
    #[error("{event_type}: selection [{start}, {end}) is inverted")]
    InvalidSelection {
        event_type: String,
        start: usize,
        end: usize,
    },

    /// Serializer failure
    #[error("{event_type}: serialization failed: {message}")]
    Serialization { event_type: String, message: String },
}

/// A frame could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not a JSON value
    #[error("frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// JSON but not an object
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// No string `type` field
    #[error("frame has no string 'type' discriminator")]
    MissingType,

    /// Known discriminator with fields that do not fit it
    #[error("malformed '{event_type}' frame: {source}")]
    Malformed {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Stream endpoint closed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Receiver dropped; nothing more can be delivered
    #[error("event stream closed by consumer")]
    Closed,
}
