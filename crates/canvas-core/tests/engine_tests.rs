//! Engine Tests
//!
//! End-to-end runs through the engine registry, session actors and run
//! driver, reading the frames a client would see.

use async_trait::async_trait;
use canvas_core::prelude::*;
use canvas_core::{GenerationRequest, ProducerError, SelectionInput, TextStream};
use canvas_test_utils::{drain_types, engine_with_doc, fed_producer};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

mockall::mock! {
    Producer {}

    #[async_trait]
    impl TextProducer for Producer {
        async fn generate(&self, request: &GenerationRequest) -> Result<TextStream, ProducerError>;
    }
}

async fn next_type(stream: &mut EventStream) -> String {
    stream
        .next_event()
        .await
        .expect("stream open")
        .expect("frame decodes")
        .event_type()
        .to_string()
}

fn update(message: &str) -> InboundAction {
    InboundAction::new("doc", message).with_action(canvas_core::ActionKind::Update)
}

#[tokio::test]
async fn test_full_update_replaces_document() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "old text").await;

    let producer = Arc::new(ReplayProducer::new(["new ", "text"]));
    let ticket = engine.submit(update("rewrite"), producer).await.unwrap();
    assert_eq!(ticket.kind, RunKind::FullUpdate);
    let end = ticket.join().await.unwrap();
    assert_eq!(end.committed_version(), Some(2));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.content(), "new text");
    assert_eq!(snapshot.version_count, 2);
    assert_eq!(
        drain_types(&mut stream),
        vec!["run_started", "text_delta", "text_delta", "run_finished"]
    );
}

#[tokio::test]
async fn test_partial_update_merges_into_selection() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "hello world").await;

    let action = InboundAction::new("doc", "friendlier").with_selection(6, 11, "world");
    let producer = Arc::new(ReplayProducer::new(["the", "re"]));
    let ticket = engine.submit(action, producer).await.unwrap();
    assert_eq!(ticket.kind, RunKind::PartialUpdate);
    assert!(ticket.join().await.unwrap().is_completed());

    assert_eq!(handle.snapshot().await.unwrap().content(), "hello there");
    let events = stream.drain_events().unwrap();
    let complete = events
        .iter()
        .find_map(|e| match e.as_lifecycle() {
            Some(LifecycleEvent::ArtifactPartialUpdateComplete {
                updated_content, ..
            }) => Some(updated_content.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(complete, "hello there");
    assert_eq!(events.last().unwrap().event_type(), "run_finished");
}

#[tokio::test]
async fn test_newer_action_supersedes_streaming_run() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "base").await;

    let (first, first_feed) = fed_producer();
    let first_ticket = engine.submit(update("one"), Arc::new(first)).await.unwrap();
    assert_eq!(next_type(&mut stream).await, "run_started");
    first_feed.send("a");
    assert_eq!(next_type(&mut stream).await, "text_delta");

    let (second, second_feed) = fed_producer();
    let second_ticket = engine.submit(update("two"), Arc::new(second)).await.unwrap();
    assert_eq!(second_ticket.superseded, Some(first_ticket.run_id));

    // The first driver stops and releases its producer while it is silent.
    let first_end = tokio::time::timeout(Duration::from_millis(500), first_ticket.join())
        .await
        .expect("superseded driver stops")
        .unwrap();
    assert!(matches!(first_end, RunEnd::Superseded));
    assert!(first_feed.is_closed());
    assert!(!first_feed.send("late"));

    second_feed.send("winner");
    drop(second_feed);
    assert_eq!(second_ticket.join().await.unwrap().committed_version(), Some(2));

    assert_eq!(handle.snapshot().await.unwrap().content(), "winner");
    assert_eq!(
        drain_types(&mut stream),
        vec!["run_cancelled", "run_started", "text_delta", "run_finished"]
    );
}

#[tokio::test]
async fn test_stale_selection_leaves_document_unchanged() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "hello world").await;
    handle.edit_content("hello brave world").await.unwrap();
    handle.goto(1).await.unwrap();

    let (producer, feed) = fed_producer();
    let action = InboundAction::new("doc", "x").with_selection(6, 11, "world");
    let ticket = engine.submit(action, Arc::new(producer)).await.unwrap();
    feed.send("there");
    assert_eq!(next_type(&mut stream).await, "run_started");
    assert_eq!(next_type(&mut stream).await, "artifact_partial_update_start");
    assert_eq!(next_type(&mut stream).await, "artifact_partial_update_chunk");

    handle.goto(2).await.unwrap();
    drop(feed);

    match ticket.join().await.unwrap() {
        RunEnd::Failed(err) => assert!(err.is_stale_selection()),
        other => panic!("expected stale selection, got {other:?}"),
    }
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.content(), "hello brave world");
    assert_eq!(snapshot.version_count, 2);
    assert_eq!(
        snapshot.last_outcome.map(|o| o.state),
        Some(RunState::Errored)
    );
    assert_eq!(drain_types(&mut stream), vec!["run_error"]);
}

#[tokio::test]
async fn test_producer_failure_ends_run_with_error() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "keep").await;

    let producer = Arc::new(ReplayProducer::new(["partial"]).failing_with("connection reset"));
    let end = engine.submit(update("x"), producer).await.unwrap().join().await.unwrap();
    assert!(matches!(end, RunEnd::Failed(EngineError::Producer(_))));

    assert_eq!(handle.snapshot().await.unwrap().content(), "keep");
    assert_eq!(
        drain_types(&mut stream),
        vec!["run_started", "text_delta", "run_error"]
    );
}

#[tokio::test]
async fn test_rejected_request_is_reported() {
    let (engine, _handle, mut stream) = engine_with_doc("doc", "keep").await;

    let mut producer = MockProducer::new();
    producer
        .expect_generate()
        .times(1)
        .returning(|_| Err(ProducerError::Rejected("quota exceeded".into())));

    let end = engine
        .submit(update("x"), Arc::new(producer))
        .await
        .unwrap()
        .join()
        .await
        .unwrap();
    assert!(matches!(
        end,
        RunEnd::Failed(EngineError::Producer(ProducerError::Rejected(_)))
    ));
    assert_eq!(drain_types(&mut stream), vec!["run_started", "run_error"]);
}

#[tokio::test]
async fn test_explicit_stop_aborts_run() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "keep").await;

    let (producer, feed) = fed_producer();
    let ticket = engine.submit(update("x"), Arc::new(producer)).await.unwrap();
    assert_eq!(engine.stop(handle.id()).await.unwrap(), Some(ticket.run_id));

    // The producer never yields again; the driver must still wind down.
    let end = tokio::time::timeout(Duration::from_millis(500), ticket.join())
        .await
        .expect("driver stops without a further fragment")
        .unwrap();
    assert!(matches!(end, RunEnd::Superseded));
    assert!(feed.is_closed());
    assert_eq!(handle.snapshot().await.unwrap().content(), "keep");
    assert_eq!(drain_types(&mut stream), vec!["run_started", "run_cancelled"]);
}

#[tokio::test]
async fn test_chat_only_run_keeps_versions() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "keep").await;

    let action = InboundAction::new("doc", "what is this?")
        .with_selection(0, 4, "keep")
        .with_action(canvas_core::ActionKind::Chat);
    let producer = Arc::new(ReplayProducer::new(["A word."]));
    let end = engine.submit(action, producer).await.unwrap().join().await.unwrap();
    assert!(matches!(end, RunEnd::Completed(Completion::Finished)));

    assert_eq!(handle.versions().await.unwrap().len(), 1);
    assert_eq!(
        drain_types(&mut stream),
        vec!["run_started", "text_delta", "run_finished"]
    );
}

#[tokio::test]
async fn test_surface_events_share_the_stream() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "").await;

    let (producer, feed) = fed_producer();
    let ticket = engine
        .submit(InboundAction::new("doc", "draft"), Arc::new(producer))
        .await
        .unwrap();
    assert_eq!(next_type(&mut stream).await, "run_started");

    handle
        .publish_surface(SurfaceEvent::BeginRendering {
            surface_id: "panel".into(),
            root_component_id: "root".into(),
        })
        .await
        .unwrap();
    feed.send("Draft");
    assert_eq!(next_type(&mut stream).await, "begin_rendering");
    assert_eq!(next_type(&mut stream).await, "text_delta");
    drop(feed);

    assert_eq!(ticket.join().await.unwrap().committed_version(), Some(1));
    assert_eq!(drain_types(&mut stream), vec!["run_finished"]);
}

#[tokio::test]
async fn test_selection_text_must_match_document() {
    let (engine, handle, _stream) = engine_with_doc("doc", "hello world").await;

    let action = InboundAction::new("doc", "x").with_selection(0, 5, "howdy");
    let err = engine
        .submit(action, Arc::new(ReplayProducer::new(["y"])))
        .await
        .unwrap_err();
    assert!(err.is_recoverable());

    let selection = handle
        .capture_selection(SelectionInput {
            start: 0,
            end: 5,
            text: "hello".into(),
        })
        .await
        .unwrap();
    assert_eq!(selection.origin_version, 1);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let engine = Engine::default();
    let (a, _sa) = engine.open(Some("a".into()), None).unwrap();
    let (b, _sb) = engine.open(Some("b".into()), None).unwrap();

    let run_a = engine.submit(InboundAction::new("a", "x"), Arc::new(ReplayProducer::new(["A"])));
    let run_b = engine.submit(InboundAction::new("b", "x"), Arc::new(ReplayProducer::new(["B"])));
    let (run_a, run_b) = tokio::join!(run_a, run_b);
    run_a.unwrap().join().await.unwrap();
    run_b.unwrap().join().await.unwrap();

    assert_eq!(a.snapshot().await.unwrap().content(), "A");
    assert_eq!(b.snapshot().await.unwrap().content(), "B");
}

#[tokio::test]
async fn test_edit_releases_silent_producer() {
    let (engine, handle, mut stream) = engine_with_doc("doc", "v1").await;

    let (producer, feed) = fed_producer();
    let ticket = engine.submit(update("x"), Arc::new(producer)).await.unwrap();
    handle.edit_content("typed").await.unwrap();

    let end = tokio::time::timeout(Duration::from_millis(500), ticket.join())
        .await
        .expect("driver stops after the edit")
        .unwrap();
    assert!(matches!(end, RunEnd::Superseded));
    assert!(feed.is_closed());
    assert_eq!(handle.snapshot().await.unwrap().content(), "typed");
    assert_eq!(drain_types(&mut stream), vec!["run_started", "run_cancelled"]);
}
