//! Canvas CLI
//!
//! Drives the streaming update engine from the command line:
//! - `replay`: run a scripted session and print its frames as NDJSON
//! - `decode`: list the family and type of NDJSON frames

#![allow(missing_docs)]

pub mod inspect;
pub mod logging;
pub mod script;

pub use inspect::{inspect, InspectSummary};
pub use logging::LogOptions;
pub use script::{replay, ReplaySummary, Script, Step};
