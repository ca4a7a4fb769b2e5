//! Frame codec
//!
//! A [`Frame`] is one JSON object. Encoding validates the event against the
//! fields its discriminator requires; decoding reads `type` first and only
//! then picks the family to deserialize into.

use crate::error::{DecodeError, ProtocolEncodingError};
use crate::event::{Event, EventFamily, LifecycleEvent, SelectionRange, SurfaceEvent, UnknownEvent};
use serde_json::Value;
use std::fmt;

/// One encoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    /// Wrap raw frame text received from a transport
    #[inline]
    #[must_use]
    pub fn from_raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode an event into a self-describing frame
///
/// # Errors
/// `ProtocolEncodingError` if the event lacks data its discriminator requires
pub fn encode(event: &Event) -> Result<Frame, ProtocolEncodingError> {
    validate(event)?;
    serde_json::to_string(event)
        .map(Frame)
        .map_err(|e| ProtocolEncodingError::Serialization {
            event_type: event.event_type().to_string(),
            message: e.to_string(),
        })
}

/// Decode a frame
///
/// Unknown discriminators become [`Event::Unknown`] instead of failing.
///
/// # Errors
/// `DecodeError` if the frame is not an object with a string `type`, or if a
/// known discriminator carries fields that do not fit it
pub fn decode(frame: &Frame) -> Result<Event, DecodeError> {
    decode_str(frame.as_str())
}

/// [`decode`] over raw text
///
/// # Errors
/// See [`decode`]
pub fn decode_str(text: &str) -> Result<Event, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Json)?;
    let Value::Object(mut payload) = value else {
        return Err(DecodeError::NotAnObject);
    };
    let event_type = payload
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    let malformed = |source| DecodeError::Malformed {
        event_type: event_type.clone(),
        source,
    };
    match EventFamily::of(&event_type) {
        EventFamily::Lifecycle => serde_json::from_value::<LifecycleEvent>(Value::Object(payload))
            .map(Event::Lifecycle)
            .map_err(malformed),
        EventFamily::Surface => serde_json::from_value::<SurfaceEvent>(Value::Object(payload))
            .map(Event::Surface)
            .map_err(malformed),
        EventFamily::Unknown => {
            payload.remove("type");
            Ok(Event::Unknown(UnknownEvent {
                event_type,
                payload,
            }))
        }
    }
}

/// Check required fields for the event's discriminator
///
/// # Errors
/// The first violated requirement
pub fn validate(event: &Event) -> Result<(), ProtocolEncodingError> {
    let event_type = event.event_type();
    let require = |field: &'static str, value: &str| {
        if value.is_empty() {
            Err(ProtocolEncodingError::MissingField {
                event_type: event_type.to_string(),
                field,
            })
        } else {
            Ok(())
        }
    };
    let range = |selection: &SelectionRange| {
        if selection.start > selection.end {
            Err(ProtocolEncodingError::InvalidSelection {
                event_type: event_type.to_string(),
                start: selection.start,
                end: selection.end,
            })
        } else {
            Ok(())
        }
    };

    match event {
        Event::Lifecycle(lifecycle) => match lifecycle {
            LifecycleEvent::RunStarted { thread_id, run_id }
            | LifecycleEvent::RunFinished { thread_id, run_id }
            | LifecycleEvent::RunCancelled { thread_id, run_id } => {
                require("thread_id", thread_id)?;
                require("run_id", run_id)
            }
            LifecycleEvent::TextDelta { message_id, .. } => require("message_id", message_id),
            LifecycleEvent::RunError { message, .. } => require("message", message),
            LifecycleEvent::ArtifactPartialUpdateStart { selection, .. }
            | LifecycleEvent::ArtifactPartialUpdateChunk { selection, .. }
            | LifecycleEvent::ArtifactPartialUpdateComplete { selection, .. } => range(selection),
        },
        Event::Surface(surface) => {
            require("surfaceId", surface.surface_id())?;
            match surface {
                SurfaceEvent::SurfaceUpdate { components, .. } => components
                    .iter()
                    .try_for_each(|component| require("components[].id", &component.id)),
                SurfaceEvent::BeginRendering {
                    root_component_id, ..
                } => require("rootComponentId", root_component_id),
                SurfaceEvent::DataModelUpdate { .. } | SurfaceEvent::DeleteSurface { .. } => Ok(()),
            }
        }
        Event::Unknown(unknown) => require("type", &unknown.event_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{PatchStrategy, SurfaceComponent};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn started() -> Event {
        LifecycleEvent::RunStarted {
            thread_id: "thread-1".into(),
            run_id: "run-1".into(),
        }
        .into()
    }

    #[test]
    fn discriminator_is_first_field() {
        let frame = encode(&started()).unwrap();
        assert!(frame.as_str().starts_with(r#"{"type":"run_started""#));

        let unknown = Event::Unknown(UnknownEvent {
            event_type: "custom_ping".into(),
            payload: json!({"a": 1}).as_object().cloned().unwrap(),
        });
        let frame = encode(&unknown).unwrap();
        assert!(frame.as_str().starts_with(r#"{"type":"custom_ping""#));
    }

    #[test]
    fn lifecycle_frame_decodes_to_same_event() {
        let event: Event = LifecycleEvent::ArtifactPartialUpdateComplete {
            selection: SelectionRange::new(6, 11),
            updated_content: "hello there".into(),
            strategy: PatchStrategy::Replace,
        }
        .into();
        let decoded = decode(&encode(&event).unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn surface_frame_decodes_from_client_json() {
        let raw = r#"{"type":"surface_update","surfaceId":"main","components":[{"id":"root","component":{"Column":{"children":[]}}}]}"#;
        let decoded = decode_str(raw).unwrap();
        assert_eq!(
            decoded,
            Event::Surface(SurfaceEvent::SurfaceUpdate {
                surface_id: "main".into(),
                components: vec![SurfaceComponent {
                    id: "root".into(),
                    component: json!({"Column": {"children": []}}),
                }],
            })
        );
    }

    #[test]
    fn unknown_discriminator_is_preserved() {
        let decoded = decode_str(r#"{"type":"tool_call_start","tool":"search","n":2}"#).unwrap();
        let Event::Unknown(unknown) = &decoded else {
            panic!("expected unknown, got {decoded:?}");
        };
        assert_eq!(unknown.event_type, "tool_call_start");
        assert_eq!(unknown.payload.get("tool"), Some(&json!("search")));
        assert!(!unknown.payload.contains_key("type"));

        // Forwarding keeps the payload.
        let again = decode(&encode(&decoded).unwrap()).unwrap();
        assert_eq!(again, decoded);
    }

    #[test]
    fn decode_rejects_frames_without_type() {
        assert!(matches!(decode_str(r#"{"delta":"x"}"#), Err(DecodeError::MissingType)));
        assert!(matches!(decode_str(r#"{"type":7}"#), Err(DecodeError::MissingType)));
        assert!(matches!(decode_str("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode_str("not json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn known_type_with_wrong_fields_is_malformed() {
        let result = decode_str(r#"{"type":"text_delta","delta":"x"}"#);
        assert!(matches!(
            result,
            Err(DecodeError::Malformed { ref event_type, .. }) if event_type == "text_delta"
        ));
    }

    #[test]
    fn encode_rejects_missing_required_fields() {
        let event: Event = LifecycleEvent::RunStarted {
            thread_id: "t".into(),
            run_id: String::new(),
        }
        .into();
        assert_eq!(
            encode(&event),
            Err(ProtocolEncodingError::MissingField {
                event_type: "run_started".into(),
                field: "run_id",
            })
        );

        let event: Event = SurfaceEvent::BeginRendering {
            surface_id: "main".into(),
            root_component_id: String::new(),
        }
        .into();
        assert!(matches!(
            encode(&event),
            Err(ProtocolEncodingError::MissingField { field: "rootComponentId", .. })
        ));
    }

    #[test]
    fn encode_rejects_inverted_selection() {
        let event: Event = LifecycleEvent::ArtifactPartialUpdateStart {
            selection: SelectionRange::new(5, 3),
            strategy: PatchStrategy::Replace,
        }
        .into();
        assert!(matches!(
            encode(&event),
            Err(ProtocolEncodingError::InvalidSelection { start: 5, end: 3, .. })
        ));
    }

    #[test]
    fn data_model_update_path_is_optional() {
        let decoded =
            decode_str(r#"{"type":"data_model_update","surfaceId":"s","contents":{"k":1}}"#)
                .unwrap();
        assert_eq!(
            decoded,
            Event::Surface(SurfaceEvent::DataModelUpdate {
                surface_id: "s".into(),
                path: None,
                contents: json!({"k": 1}),
            })
        );
    }
}
