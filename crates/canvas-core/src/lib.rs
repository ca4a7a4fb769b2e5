//! Canvas Core - streaming update engine
//!
//! Sits between a generative text producer and a client rendering an
//! artifact:
//! - Resolves inbound actions into runs (create, full update, partial update, chat)
//! - Guarantees at most one active run per artifact, newer actions winning
//! - Relays produced text as ordered event frames while it streams
//! - Applies the result as a whole-document replace or a selection merge,
//!   pushing exactly one version per successful run
//!
//! Each artifact is owned by a session actor; an [`Engine`] keeps the
//! registry of sessions and drives runs from a [`TextProducer`].
//!
//! # Example
//!
//! ```rust
//! use canvas_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), EngineError> {
//! let engine = Engine::new(EngineConfig::default());
//! let (handle, mut frames) = engine.open(Some("doc".into()), Some("Poem".into()))?;
//!
//! let producer = Arc::new(ReplayProducer::new(["Roses ", "are red"]));
//! let ticket = engine.submit(InboundAction::new("doc", "write a poem"), producer).await?;
//! let _end = ticket.join().await;
//!
//! assert_eq!(handle.snapshot().await?.content(), "Roses are red");
//! while let Some(frame) = frames.try_next_frame() {
//!     println!("{frame}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod controller;
pub mod driver;
pub mod engine;
pub mod error;
pub mod producer;
pub mod run;
pub mod session;
pub mod types;

pub use config::EngineConfig;
pub use controller::{Completion, RelayOutcome, RunController, StartedRun};
pub use driver::RunEnd;
pub use engine::{Engine, RunTicket};
pub use error::{ConfigError, EngineError};
pub use producer::{ProducerError, ReplayProducer, TextProducer, TextStream};
pub use run::{allowed_transitions, validate_transition, Run, RunState};
pub use session::{spawn_session, ArtifactHandle};
pub use types::{
    ActionKind, ActiveRun, ArtifactSnapshot, GenerationRequest, InboundAction, MessageId, RunId,
    RunKind, RunOutcome, SelectionInput, ThreadId,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Canvas Core
    pub use crate::{
        ArtifactHandle, ArtifactSnapshot, Completion, Engine, EngineConfig, EngineError,
        InboundAction, ReplayProducer, RunEnd, RunId, RunKind, RunState, TextProducer,
    };
    pub use canvas_artifact::{ArtifactId, Version, VersionOrigin};
    pub use canvas_protocol::{Event, EventFamily, EventStream, LifecycleEvent, SurfaceEvent};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
