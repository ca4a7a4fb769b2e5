//! Scripted sessions
//!
//! A script opens artifacts and applies steps to the most recently opened
//! one. Every frame the sessions emit is written, in order, to one NDJSON
//! output.
//!
//! ```json
//! {"steps": [
//!   {"step": "open", "id": "doc", "title": "Poem"},
//!   {"step": "action", "message": "write", "fragments": ["Roses ", "are red"]},
//!   {"step": "action", "message": "shout", "selection": {"start": 0, "end": 5, "text": "Roses"},
//!    "fragments": ["ROSES"]}
//! ]}
//! ```

use anyhow::{bail, Context, Result};
use canvas_artifact::{ArtifactId, SequenceNumber};
use canvas_core::{
    ActionKind, ArtifactHandle, Engine, EngineConfig, InboundAction, ReplayProducer, RunEnd,
    SelectionInput,
};
use canvas_protocol::{EventStream, FrameWriter, SurfaceEvent};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::{info, warn};

/// A replayable session script
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

/// One scripted operation
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Open a session; later steps apply to it
    Open {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    /// Submit an action whose output is `fragments`
    Action {
        message: String,
        #[serde(default)]
        action: Option<ActionKind>,
        #[serde(default)]
        selection: Option<SelectionInput>,
        #[serde(default)]
        fragments: Vec<String>,
        /// Transport failure after the fragments
        #[serde(default)]
        error: Option<String>,
        /// Leave the run streaming so a later step can supersede or stop it
        #[serde(default = "default_true")]
        complete: bool,
    },
    /// Abort the active run
    Stop,
    /// Make another version live
    Goto { version: SequenceNumber },
    /// Replace the content directly
    Edit { content: String },
    /// Change the title
    Rename { title: String },
    /// Publish a surface-family event
    Surface { event: SurfaceEvent },
}

fn default_true() -> bool {
    true
}

impl Script {
    /// Parse a script from JSON
    ///
    /// # Errors
    /// If the JSON does not describe a script
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid script")
    }

    /// Read and parse a script file
    ///
    /// # Errors
    /// If the file cannot be read or parsed
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read script {}", path.display()))?;
        Self::from_json(&text)
    }
}

/// What a replay did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub runs_completed: usize,
    pub runs_failed: usize,
    pub runs_superseded: usize,
}

struct Current {
    handle: ArtifactHandle,
    stream: EventStream,
}

/// Run `script` and write every frame to `out`
///
/// # Errors
/// Any step the engine rejects, or a failed write
pub async fn replay<W>(script: &Script, config: EngineConfig, out: W) -> Result<ReplaySummary>
where
    W: AsyncWrite + Unpin,
{
    let engine = Engine::new(config);
    let mut writer = FrameWriter::new(out);
    let mut summary = ReplaySummary::default();
    let mut current: Option<Current> = None;

    for (index, step) in script.steps.iter().enumerate() {
        if let Step::Open { id, title } = step {
            if let Some(previous) = current.take() {
                finish(&engine, previous, &mut writer, &mut summary).await?;
            }
            let (handle, stream) = engine
                .open(id.clone().map(ArtifactId::new), title.clone())
                .with_context(|| format!("step {index}: open"))?;
            info!(artifact = %handle.id(), "opened");
            current = Some(Current { handle, stream });
            continue;
        }

        let Some(session) = current.as_mut() else {
            bail!("step {index}: no artifact open");
        };
        run_step(&engine, session, step, &mut writer, &mut summary)
            .await
            .with_context(|| format!("step {index}"))?;
        drain(&mut session.stream, &mut writer, &mut summary).await?;
    }

    if let Some(last) = current.take() {
        finish(&engine, last, &mut writer, &mut summary).await?;
    }
    Ok(summary)
}

async fn run_step<W>(
    engine: &Engine,
    session: &mut Current,
    step: &Step,
    writer: &mut FrameWriter<W>,
    summary: &mut ReplaySummary,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Current { handle, stream } = session;
    match step {
        Step::Open { .. } => {}
        Step::Action {
            message,
            action,
            selection,
            fragments,
            error,
            complete,
        } => {
            let inbound = InboundAction {
                message: message.clone(),
                artifact_id: handle.id().clone(),
                selection: selection.clone(),
                action: *action,
            };

            if !complete {
                let started = pump(stream, writer, summary, handle.start(inbound)).await??;
                for fragment in fragments {
                    let relay = handle.relay(started.run_id, fragment.clone());
                    pump(stream, writer, summary, relay).await??;
                }
                return Ok(());
            }

            let mut producer = ReplayProducer::new(fragments.iter().cloned());
            if let Some(message) = error {
                producer = producer.failing_with(message.clone());
            }
            let run = async {
                let ticket = engine.submit(inbound, Arc::new(producer)).await?;
                anyhow::Ok(ticket.join().await?)
            };
            match pump(stream, writer, summary, run).await?? {
                RunEnd::Completed(_) => summary.runs_completed += 1,
                RunEnd::Superseded => summary.runs_superseded += 1,
                RunEnd::Failed(e) => {
                    warn!(error = %e, "run failed");
                    summary.runs_failed += 1;
                }
            }
        }
        Step::Stop => {
            if pump(stream, writer, summary, handle.stop()).await??.is_some() {
                summary.runs_superseded += 1;
            }
        }
        Step::Goto { version } => {
            handle.goto(*version).await?;
        }
        Step::Edit { content } => {
            pump(stream, writer, summary, handle.edit_content(content.clone())).await??;
        }
        Step::Rename { title } => handle.rename(title.clone()).await?,
        Step::Surface { event } => {
            pump(stream, writer, summary, handle.publish_surface(event.clone())).await??;
        }
    }
    Ok(())
}

/// Await `operation` while writing the frames it emits
///
/// Operations wait for room in the event channel, so the channel has to be
/// read concurrently or a small capacity would stall the session.
async fn pump<W, F>(
    stream: &mut EventStream,
    writer: &mut FrameWriter<W>,
    summary: &mut ReplaySummary,
    operation: F,
) -> Result<F::Output>
where
    W: AsyncWrite + Unpin,
    F: Future,
{
    tokio::pin!(operation);
    loop {
        tokio::select! {
            biased;
            Some(frame) = stream.next_frame() => {
                writer.write_frame(&frame).await?;
                summary.frames += 1;
            }
            output = &mut operation => return Ok(output),
        }
    }
}

/// Write the frames queued right now
async fn drain<W>(
    stream: &mut EventStream,
    writer: &mut FrameWriter<W>,
    summary: &mut ReplaySummary,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = stream.try_next_frame() {
        writer.write_frame(&frame).await?;
        summary.frames += 1;
    }
    Ok(())
}

/// Close a session and write its remaining frames
///
/// Shutting down aborts a run left streaming, so its cancellation notice
/// still reaches the output.
async fn finish<W>(
    engine: &Engine,
    session: Current,
    writer: &mut FrameWriter<W>,
    summary: &mut ReplaySummary,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Current { handle, mut stream } = session;
    engine.close(handle.id()).await?;
    drop(handle);
    while let Some(frame) = stream.next_frame().await {
        writer.write_frame(&frame).await?;
        summary.frames += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_protocol::{decode_str, Event};

    async fn run(json: &str) -> (ReplaySummary, Vec<Event>) {
        let script = Script::from_json(json).unwrap();
        let mut out = Vec::new();
        let summary = replay(&script, EngineConfig::default(), &mut out).await.unwrap();
        let events = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| decode_str(line).unwrap())
            .collect();
        (summary, events)
    }

    fn types(events: &[Event]) -> Vec<&str> {
        events.iter().map(Event::event_type).collect()
    }

    #[tokio::test]
    async fn create_then_partial_update() {
        let (summary, events) = run(r#"{"steps": [
            {"step": "open", "id": "doc"},
            {"step": "action", "message": "write", "fragments": ["Roses ", "are red"]},
            {"step": "action", "message": "shout",
             "selection": {"start": 0, "end": 5, "text": "Roses"}, "fragments": ["ROSES"]}
        ]}"#)
        .await;

        assert_eq!(summary.runs_completed, 2);
        assert_eq!(summary.frames, events.len());
        assert_eq!(
            types(&events),
            vec![
                "run_started",
                "text_delta",
                "text_delta",
                "run_finished",
                "run_started",
                "artifact_partial_update_start",
                "artifact_partial_update_chunk",
                "artifact_partial_update_complete",
                "run_finished",
            ]
        );
    }

    #[tokio::test]
    async fn incomplete_run_is_superseded_by_next_action() {
        let (summary, events) = run(r#"{"steps": [
            {"step": "open", "id": "doc"},
            {"step": "action", "message": "slow", "fragments": ["a"], "complete": false},
            {"step": "action", "message": "fast", "fragments": ["b"]}
        ]}"#)
        .await;

        assert_eq!(summary.runs_completed, 1);
        assert_eq!(
            types(&events),
            vec![
                "run_started",
                "text_delta",
                "run_cancelled",
                "run_started",
                "text_delta",
                "run_finished",
            ]
        );
    }

    #[tokio::test]
    async fn small_channel_does_not_stall_replay() {
        let script = Script::from_json(r#"{"steps": [
            {"step": "open"},
            {"step": "action", "message": "m", "fragments": ["1", "2", "3", "4", "5", "6"]}
        ]}"#)
        .unwrap();
        let mut out = Vec::new();
        let config = EngineConfig::default().with_event_capacity(1);
        let summary = replay(&script, config, &mut out).await.unwrap();
        assert_eq!(summary.frames, 8);
    }

    #[tokio::test]
    async fn step_without_artifact_fails() {
        let script = Script::from_json(r#"{"steps": [{"step": "stop"}]}"#).unwrap();
        let err = replay(&script, EngineConfig::default(), Vec::new()).await.unwrap_err();
        assert!(err.to_string().contains("no artifact open"));
    }

    #[tokio::test]
    async fn surface_and_failure_steps() {
        let (summary, events) = run(r#"{"steps": [
            {"step": "open", "id": "doc"},
            {"step": "surface", "event": {"type": "begin_rendering", "surfaceId": "s", "rootComponentId": "r"}},
            {"step": "action", "message": "m", "fragments": ["x"], "error": "reset"}
        ]}"#)
        .await;
        assert_eq!(summary.runs_failed, 1);
        assert_eq!(
            types(&events),
            vec!["begin_rendering", "run_started", "text_delta", "run_error"]
        );
    }
}
