//! Typed event families
//!
//! Two disjoint families share one stream:
//!
//! - [`LifecycleEvent`]: run lifecycle, streamed text and the artifact
//!   partial-update sub-family
//! - [`SurfaceEvent`]: declarative UI surface definitions
//!
//! Both are internally tagged by a `type` field, so every frame names its
//! own kind. [`Event`] is the closed union handed to consumers; frames with a
//! `type` neither family knows decode to [`Event::Unknown`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Discriminators of the lifecycle/text family
pub const LIFECYCLE_TYPES: &[&str] = &[
    "run_started",
    "text_delta",
    "run_finished",
    "run_error",
    "run_cancelled",
    "artifact_partial_update_start",
    "artifact_partial_update_chunk",
    "artifact_partial_update_complete",
];

/// Discriminators of the surface family
pub const SURFACE_TYPES: &[&str] = &[
    "surface_update",
    "data_model_update",
    "begin_rendering",
    "delete_surface",
];

/// Char range of a partial update, as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    #[inline]
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// How a partial update combines with the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStrategy {
    #[default]
    Replace,
}

/// Run lifecycle and text events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    RunStarted {
        thread_id: String,
        run_id: String,
    },
    TextDelta {
        message_id: String,
        delta: String,
    },
    RunFinished {
        thread_id: String,
        run_id: String,
    },
    RunError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
    },
    /// Terminal notice for an aborted run
    RunCancelled {
        thread_id: String,
        run_id: String,
    },
    ArtifactPartialUpdateStart {
        selection: SelectionRange,
        #[serde(default)]
        strategy: PatchStrategy,
    },
    ArtifactPartialUpdateChunk {
        chunk: String,
        selection: SelectionRange,
    },
    ArtifactPartialUpdateComplete {
        selection: SelectionRange,
        #[serde(rename = "updatedContent")]
        updated_content: String,
        #[serde(default)]
        strategy: PatchStrategy,
    },
}

impl LifecycleEvent {
    /// Wire discriminator
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::TextDelta { .. } => "text_delta",
            Self::RunFinished { .. } => "run_finished",
            Self::RunError { .. } => "run_error",
            Self::RunCancelled { .. } => "run_cancelled",
            Self::ArtifactPartialUpdateStart { .. } => "artifact_partial_update_start",
            Self::ArtifactPartialUpdateChunk { .. } => "artifact_partial_update_chunk",
            Self::ArtifactPartialUpdateComplete { .. } => "artifact_partial_update_complete",
        }
    }

    /// True for the events that end a run
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RunFinished { .. } | Self::RunError { .. } | Self::RunCancelled { .. }
        )
    }
}

/// One declaratively described UI component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceComponent {
    pub id: String,
    pub component: Value,
}

/// UI surface definition events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    SurfaceUpdate {
        #[serde(rename = "surfaceId")]
        surface_id: String,
        components: Vec<SurfaceComponent>,
    },
    DataModelUpdate {
        #[serde(rename = "surfaceId")]
        surface_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        contents: Value,
    },
    BeginRendering {
        #[serde(rename = "surfaceId")]
        surface_id: String,
        #[serde(rename = "rootComponentId")]
        root_component_id: String,
    },
    DeleteSurface {
        #[serde(rename = "surfaceId")]
        surface_id: String,
    },
}

impl SurfaceEvent {
    /// Wire discriminator
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SurfaceUpdate { .. } => "surface_update",
            Self::DataModelUpdate { .. } => "data_model_update",
            Self::BeginRendering { .. } => "begin_rendering",
            Self::DeleteSurface { .. } => "delete_surface",
        }
    }

    /// Surface the event addresses
    #[must_use]
    pub fn surface_id(&self) -> &str {
        match self {
            Self::SurfaceUpdate { surface_id, .. }
            | Self::DataModelUpdate { surface_id, .. }
            | Self::BeginRendering { surface_id, .. }
            | Self::DeleteSurface { surface_id } => surface_id,
        }
    }
}

/// Frame with a discriminator this build does not know
///
/// `payload` keeps every field except `type`, so the frame can be forwarded
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownEvent {
    pub event_type: String,
    pub payload: Map<String, Value>,
}

impl Serialize for UnknownEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.payload.len() + 1))?;
        map.serialize_entry("type", &self.event_type)?;
        for (key, value) in self.payload.iter().filter(|(k, _)| k.as_str() != "type") {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Which family a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
    Lifecycle,
    Surface,
    Unknown,
}

impl EventFamily {
    /// Classify a discriminator
    #[must_use]
    pub fn of(event_type: &str) -> Self {
        if LIFECYCLE_TYPES.contains(&event_type) {
            Self::Lifecycle
        } else if SURFACE_TYPES.contains(&event_type) {
            Self::Surface
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::Surface => "surface",
            Self::Unknown => "unknown",
        }
    }
}

/// Any event that can travel on the stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Lifecycle(LifecycleEvent),
    Surface(SurfaceEvent),
    Unknown(UnknownEvent),
}

impl Event {
    /// Wire discriminator
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::Lifecycle(e) => e.event_type(),
            Self::Surface(e) => e.event_type(),
            Self::Unknown(e) => &e.event_type,
        }
    }

    #[must_use]
    pub fn family(&self) -> EventFamily {
        match self {
            Self::Lifecycle(_) => EventFamily::Lifecycle,
            Self::Surface(_) => EventFamily::Surface,
            Self::Unknown(_) => EventFamily::Unknown,
        }
    }

    #[must_use]
    pub fn as_lifecycle(&self) -> Option<&LifecycleEvent> {
        match self {
            Self::Lifecycle(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_surface(&self) -> Option<&SurfaceEvent> {
        match self {
            Self::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LifecycleEvent> for Event {
    fn from(value: LifecycleEvent) -> Self {
        Self::Lifecycle(value)
    }
}

impl From<SurfaceEvent> for Event {
    fn from(value: SurfaceEvent) -> Self {
        Self::Surface(value)
    }
}

impl From<UnknownEvent> for Event {
    fn from(value: UnknownEvent) -> Self {
        Self::Unknown(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn family_tables_are_disjoint() {
        for t in LIFECYCLE_TYPES {
            assert!(!SURFACE_TYPES.contains(t), "{t} in both families");
        }
    }

    #[test]
    fn event_type_agrees_with_family_table() {
        let events: Vec<Event> = vec![
            LifecycleEvent::RunStarted {
                thread_id: "t".into(),
                run_id: "r".into(),
            }
            .into(),
            LifecycleEvent::ArtifactPartialUpdateChunk {
                chunk: "x".into(),
                selection: SelectionRange::new(0, 1),
            }
            .into(),
            SurfaceEvent::DeleteSurface {
                surface_id: "s".into(),
            }
            .into(),
        ];
        for event in events {
            assert_eq!(EventFamily::of(event.event_type()), event.family());
        }
    }

    #[test]
    fn surface_fields_use_camel_case() {
        let event = SurfaceEvent::BeginRendering {
            surface_id: "main".into(),
            root_component_id: "root".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "begin_rendering", "surfaceId": "main", "rootComponentId": "root"})
        );
    }

    #[test]
    fn partial_complete_uses_updated_content_key() {
        let event = LifecycleEvent::ArtifactPartialUpdateComplete {
            selection: SelectionRange::new(6, 11),
            updated_content: "hello there".into(),
            strategy: PatchStrategy::Replace,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["updatedContent"], "hello there");
        assert_eq!(value["strategy"], "replace");
        assert_eq!(value["selection"], json!({"start": 6, "end": 11}));
    }

    #[test]
    fn run_error_omits_missing_run_id() {
        let event = LifecycleEvent::RunError {
            message: "boom".into(),
            run_id: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "run_error", "message": "boom"}));
    }

    #[test]
    fn terminal_events() {
        assert!(LifecycleEvent::RunCancelled {
            thread_id: "t".into(),
            run_id: "r".into()
        }
        .is_terminal());
        assert!(!LifecycleEvent::TextDelta {
            message_id: "m".into(),
            delta: "d".into()
        }
        .is_terminal());
    }
}
