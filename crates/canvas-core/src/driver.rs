//! Run driver
//!
//! Pulls fragments from a [`TextProducer`] and feeds them through the
//! session actor. The driver is the owner of its run id: it relays, then
//! completes or fails the run. It stops pulling as soon as the run is no
//! longer active, since anything further would be dropped.

use crate::controller::{Completion, RelayOutcome, StartedRun};
use crate::error::EngineError;
use crate::producer::TextProducer;
use crate::session::ArtifactHandle;
use crate::types::RunId;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a driven run ended
#[derive(Debug)]
pub enum RunEnd {
    /// Run finished; the completion says whether a version was pushed
    Completed(Completion),
    /// A newer action (or a stop) ended the run first
    Superseded,
    /// Producer or merge failure; the run ended `Errored`
    Failed(EngineError),
}

impl RunEnd {
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Version pushed by the run, if any
    #[must_use]
    pub fn committed_version(&self) -> Option<canvas_artifact::SequenceNumber> {
        match self {
            Self::Completed(Completion::Committed(seq)) => Some(*seq),
            _ => None,
        }
    }
}

/// Drive one started run to its end
///
/// Returns `Superseded` as soon as the run ends elsewhere (a stop, a newer
/// action, an edit), even while the producer is silent. Dropping the
/// fragment stream then cancels the producer.
pub(crate) async fn drive_run(
    handle: ArtifactHandle,
    producer: Arc<dyn TextProducer>,
    started: StartedRun,
) -> RunEnd {
    let run_id = started.run_id;

    let generated = tokio::select! {
        biased;
        () = started.ended() => return superseded(run_id),
        generated = producer.generate(&started.request) => generated,
    };
    let mut fragments = match generated {
        Ok(stream) => stream,
        Err(e) => return fail(&handle, run_id, e.into()).await,
    };

    loop {
        let item = tokio::select! {
            biased;
            () = started.ended() => return superseded(run_id),
            item = fragments.next() => item,
        };
        let Some(item) = item else { break };
        match item {
            Ok(chunk) => match handle.relay(run_id, chunk).await {
                Ok(RelayOutcome::Accepted) => {}
                Ok(RelayOutcome::Dropped) => return superseded(run_id),
                Err(e) => return RunEnd::Failed(e),
            },
            Err(e) => return fail(&handle, run_id, e.into()).await,
        }
    }

    match handle.complete(run_id).await {
        Ok(Completion::Ignored) => RunEnd::Superseded,
        Ok(completion) => RunEnd::Completed(completion),
        Err(e) => RunEnd::Failed(e),
    }
}

fn superseded(run_id: RunId) -> RunEnd {
    debug!(run = %run_id, "run no longer active, driver stopping");
    RunEnd::Superseded
}

async fn fail(handle: &ArtifactHandle, run_id: RunId, error: EngineError) -> RunEnd {
    match handle.fail(run_id, error.to_string()).await {
        Ok(true) => RunEnd::Failed(error),
        Ok(false) => {
            warn!(run = %run_id, %error, "producer error after run ended");
            RunEnd::Superseded
        }
        Err(e) => RunEnd::Failed(e),
    }
}
