//! Extraction integration tests against a scripted playback source.
//!
//! All tests run on tokio's paused clock, so delays and timeouts elapse in
//! virtual time.

mod common;

use std::time::Duration;

use common::{MockSource, SeekBehavior};
use scrubber::{
    CycleState, DecodeSurface, ExtractionOptions, ExtractionRequest, FrameBatchExtractor,
    ReadyState, SEEK_END_EPSILON, SINGLE_FRAME_TARGET, ScrubberError, SeekCycle,
};
use tokio::time::Instant;

fn extractor() -> FrameBatchExtractor {
    FrameBatchExtractor::new(ExtractionOptions::new())
}

fn request(frame_count: u32) -> ExtractionRequest {
    ExtractionRequest::new(frame_count)
}

/// Unwrap an `ExtractionAborted` into `(index, frames_captured, cause)`.
fn expect_aborted(error: ScrubberError) -> (usize, usize, ScrubberError) {
    match error {
        ScrubberError::ExtractionAborted {
            index,
            frames_captured,
            source,
            ..
        } => (index, frames_captured, *source),
        other => panic!("Expected ExtractionAborted, got: {other}"),
    }
}

// ── Happy path ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn returns_requested_frames_in_order() {
    let mut source = MockSource::new(9.0);
    let store = extractor().extract(&mut source, &request(10)).await.unwrap();

    assert_eq!(store.len(), 10);
    for (position, frame) in store.iter().enumerate() {
        assert_eq!(frame.index(), position);
        assert_eq!(frame.dimensions(), (8, 6));
        assert!(!frame.encoded().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn seeks_evenly_with_end_pulled_back() {
    let mut source = MockSource::new(9.0);
    extractor().extract(&mut source, &request(10)).await.unwrap();

    let mut expected: Vec<f64> = (0..9).map(f64::from).collect();
    expected.push(9.0 - SEEK_END_EPSILON);
    assert_eq!(source.seeks, expected);
}

#[tokio::test(start_paused = true)]
async fn single_frame_targets_start() {
    let mut source = MockSource::new(9.0);
    let store = extractor().extract(&mut source, &request(1)).await.unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(source.seeks, vec![SINGLE_FRAME_TARGET]);
}

#[tokio::test(start_paused = true)]
async fn zero_frames_extracts_one() {
    let mut source = MockSource::new(4.0);
    let store = extractor().extract(&mut source, &request(0)).await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn frames_record_target_and_position() {
    let mut source = MockSource::new(2.0);
    let store = extractor().extract(&mut source, &request(3)).await.unwrap();

    let last = store.last().unwrap();
    assert_eq!(last.target_seconds(), 2.0 - SEEK_END_EPSILON);
    assert_eq!(last.position_seconds(), 2.0 - SEEK_END_EPSILON);
    assert_eq!(store.get(1).unwrap().target_seconds(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn pauses_source_before_seeking() {
    let mut source = MockSource::new(3.0);
    extractor().extract(&mut source, &request(2)).await.unwrap();
    assert!(source.paused);
}

#[tokio::test(start_paused = true)]
async fn waits_for_deferred_settle() {
    let mut source =
        MockSource::new(3.0).with_behavior(SeekBehavior::SettleAfter(Duration::from_millis(200)));
    let store = extractor()
        .extract(&mut source, &request(3).with_inter_frame_delay(Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(store.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn draws_once_per_frame() {
    let mut source = MockSource::new(5.0);
    extractor().extract(&mut source, &request(6)).await.unwrap();
    assert_eq!(source.draws, 6);
}

// ── Timing ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn no_delay_after_last_frame() {
    let options = ExtractionOptions::new().with_paint_delay(Duration::ZERO);
    let mut extractor = FrameBatchExtractor::new(options);
    let mut source = MockSource::new(3.0);

    let start = Instant::now();
    extractor
        .extract(
            &mut source,
            &request(3).with_inter_frame_delay(Duration::from_millis(50)),
        )
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(150), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn single_frame_has_no_inter_frame_delay() {
    let options = ExtractionOptions::new().with_paint_delay(Duration::ZERO);
    let mut extractor = FrameBatchExtractor::new(options);
    let mut source = MockSource::new(3.0);

    let start = Instant::now();
    extractor.extract(&mut source, &request(1)).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn draw_waits_one_render_tick_after_settle() {
    let mut source = MockSource::new(3.0);
    let options = ExtractionOptions::new();
    let paint_delay = Duration::from_millis(16);

    FrameBatchExtractor::new(options)
        .extract(&mut source, &request(3).with_inter_frame_delay(Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(source.settled_at.len(), 3);
    assert_eq!(source.drawn_at.len(), 3);
    for (settled, drawn) in source.settled_at.iter().zip(&source.drawn_at) {
        let gap = drawn.duration_since(*settled);
        assert!(gap >= paint_delay, "drew {gap:?} after settle");
    }
}

#[tokio::test(start_paused = true)]
async fn default_render_tick_paces_extraction() {
    let mut source = MockSource::new(3.0);

    let start = Instant::now();
    extractor()
        .extract(&mut source, &request(3).with_inter_frame_delay(Duration::ZERO))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(48), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn custom_paint_delay_is_honoured() {
    let options = ExtractionOptions::new().with_paint_delay(Duration::from_millis(40));
    let mut source = MockSource::new(3.0);

    FrameBatchExtractor::new(options)
        .extract(&mut source, &request(2).with_inter_frame_delay(Duration::ZERO))
        .await
        .unwrap();

    for (settled, drawn) in source.settled_at.iter().zip(&source.drawn_at) {
        assert!(drawn.duration_since(*settled) >= Duration::from_millis(40));
    }
}

// ── Invalid sources ────────────────────────────────────────────────

async fn assert_invalid(mut source: MockSource) {
    let result = extractor().extract(&mut source, &request(5)).await;
    match result {
        Err(ScrubberError::InvalidSource(_)) => {}
        Err(other) => panic!("Expected InvalidSource, got: {other}"),
        Ok(store) => panic!("Expected InvalidSource, got {} frames", store.len()),
    }
    assert!(source.seeks.is_empty(), "no seek may be issued");
}

#[tokio::test(start_paused = true)]
async fn rejects_infinite_duration() {
    assert_invalid(MockSource::new(f64::INFINITY)).await;
}

#[tokio::test(start_paused = true)]
async fn rejects_zero_and_nan_duration() {
    assert_invalid(MockSource::new(0.0)).await;
    assert_invalid(MockSource::new(f64::NAN)).await;
    assert_invalid(MockSource::new(-2.0)).await;
}

#[tokio::test(start_paused = true)]
async fn rejects_missing_metadata() {
    let mut source = MockSource::new(5.0);
    source.ready_state = ReadyState::HaveNothing;
    assert_invalid(source).await;
}

#[tokio::test(start_paused = true)]
async fn rejects_zero_size() {
    let mut source = MockSource::new(5.0);
    source.width = 0;
    assert_invalid(source).await;
}

// ── Failures ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn source_error_aborts_without_partial_store() {
    let mut source = MockSource::new(9.0).failing_from(3, SeekBehavior::Error("decode error"));
    let error = extractor()
        .extract(&mut source, &request(10))
        .await
        .unwrap_err();

    let (index, frames_captured, cause) = expect_aborted(error);
    assert_eq!(index, 3);
    assert_eq!(frames_captured, 3);
    match cause {
        ScrubberError::SeekTimeoutOrError { reason, .. } => {
            assert!(reason.contains("decode error"), "reason: {reason}");
        }
        other => panic!("Expected SeekTimeoutOrError, got: {other}"),
    }
    assert_eq!(source.seeks.len(), 4, "no seek after the failure");
}

#[tokio::test(start_paused = true)]
async fn dropped_notifier_is_a_failure() {
    let mut source = MockSource::new(4.0).with_behavior(SeekBehavior::Drop);
    let error = extractor()
        .extract(&mut source, &request(4))
        .await
        .unwrap_err();

    let (index, frames_captured, cause) = expect_aborted(error);
    assert_eq!((index, frames_captured), (0, 0));
    assert!(matches!(cause, ScrubberError::SeekTimeoutOrError { .. }));
}

#[tokio::test(start_paused = true)]
async fn stalled_seek_times_out() {
    let options = ExtractionOptions::new().with_seek_timeout(Some(Duration::from_secs(5)));
    let mut extractor = FrameBatchExtractor::new(options);
    let mut source = MockSource::new(4.0).failing_from(1, SeekBehavior::Stall);

    let start = Instant::now();
    let error = extractor
        .extract(&mut source, &request(4))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    let (index, _, cause) = expect_aborted(error);
    assert_eq!(index, 1);
    assert!(matches!(cause, ScrubberError::SeekTimeoutOrError { .. }));
    assert!(elapsed >= Duration::from_secs(5), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(6), "elapsed {elapsed:?}");

    // The waiting side has gone away, so a late notification is discarded.
    assert_eq!(source.stalled.len(), 1);
    assert!(source.stalled[0].is_abandoned());
    source.stalled.pop().unwrap().settled();
}

#[tokio::test(start_paused = true)]
async fn draw_failure_aborts() {
    let mut source = MockSource::new(4.0);
    source.draw_fails_at = Some(2);
    let error = extractor()
        .extract(&mut source, &request(4))
        .await
        .unwrap_err();

    let (index, frames_captured, cause) = expect_aborted(error);
    assert_eq!((index, frames_captured), (2, 2));
    match cause {
        ScrubberError::SeekTimeoutOrError { reason, .. } => {
            assert!(reason.contains("pixel capture"), "reason: {reason}");
        }
        other => panic!("Expected SeekTimeoutOrError, got: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn root_cause_reaches_through_abort() {
    let mut source = MockSource::new(4.0).with_behavior(SeekBehavior::Error("gone"));
    let error = extractor()
        .extract(&mut source, &request(2))
        .await
        .unwrap_err();
    assert!(matches!(
        error.root_cause(),
        ScrubberError::SeekTimeoutOrError { .. }
    ));
}

// ── Re-extraction ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn repeated_extraction_does_not_accumulate() {
    let mut extractor = extractor();

    let mut first_source = MockSource::new(6.0);
    let first = extractor.extract(&mut first_source, &request(5)).await.unwrap();

    let mut second_source = MockSource::new(2.0);
    let second = extractor.extract(&mut second_source, &request(3)).await.unwrap();

    assert_eq!(first.len(), 5);
    assert_eq!(second.len(), 3);
    assert_eq!(second.last().unwrap().index(), 2);
    assert_eq!(extractor.surface().unwrap().dimensions(), (8, 6));
}

#[tokio::test(start_paused = true)]
async fn surface_follows_source_size() {
    let mut extractor = extractor();
    let mut source = MockSource::new(2.0);
    source.width = 32;
    source.height = 18;

    let store = extractor.extract(&mut source, &request(2)).await.unwrap();
    assert_eq!(store.first().unwrap().dimensions(), (32, 18));
}

// ── SeekCycle ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn cycle_settles_once() {
    let mut source = MockSource::new(3.0);
    let mut surface = DecodeSurface::new(8, 6);
    let options = ExtractionOptions::new();

    let mut cycle = SeekCycle::new(0);
    assert_eq!(cycle.state(), CycleState::Idle);

    let frame = cycle
        .run(&mut source, &mut surface, 1.5, &options)
        .await
        .unwrap();
    assert_eq!(cycle.state(), CycleState::Settled);
    assert_eq!(frame.target_seconds(), 1.5);

    let rerun = cycle.run(&mut source, &mut surface, 2.0, &options).await;
    assert!(rerun.is_err());
    assert_eq!(source.seeks, vec![1.5]);
}

#[tokio::test(start_paused = true)]
async fn cycle_marks_failure() {
    let mut source = MockSource::new(3.0).with_behavior(SeekBehavior::Error("nope"));
    let mut surface = DecodeSurface::new(8, 6);

    let mut cycle = SeekCycle::new(4);
    let result = cycle
        .run(&mut source, &mut surface, 1.0, &ExtractionOptions::new())
        .await;
    assert!(result.is_err());
    assert_eq!(cycle.state(), CycleState::Failed);
}
