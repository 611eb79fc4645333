//! End-to-end engine tests against a paused Tokio clock, so every elapsed
//! assertion is exact to the millisecond.

use stepwatch::{StepsTimer, TimerSnapshot, TimerStatus};
use tokio::time::{advance, Duration};

const TICK: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn initial_state_before_any_command() {
    let timer = StepsTimer::with_tick_interval(TICK);

    assert_eq!(timer.status().await, TimerStatus::Idle);
    assert!(!timer.is_running().await);
    assert_eq!(timer.elapsed_ms().await, 0);
    assert_eq!(timer.snapshot().await, TimerSnapshot::default());
}

#[tokio::test(start_paused = true)]
async fn session_accumulates_while_running() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    advance(Duration::from_millis(1000)).await;

    assert_eq!(timer.elapsed_ms().await, 1000);
    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.total_ms, 1000);
    assert!(snapshot.running);
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_and_resume_continues() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    advance(Duration::from_millis(1000)).await;
    timer.pause().await;
    advance(Duration::from_millis(1000)).await;

    assert_eq!(timer.elapsed_ms().await, 1000);
    assert_eq!(timer.status().await, TimerStatus::Paused);
    assert!(!timer.snapshot().await.running);

    timer.resume().await;
    advance(Duration::from_millis(2000)).await;

    assert_eq!(timer.elapsed_ms().await, 3000);
    assert!(timer.is_running().await);
}

#[tokio::test(start_paused = true)]
async fn overlapping_steps_track_independently() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    advance(Duration::from_millis(500)).await;
    timer.start_step("b").await;
    advance(Duration::from_millis(700)).await;
    timer.end_step("a").await;

    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.step_times.len(), 1);
    assert_eq!(snapshot.step_times[0].id, "a");
    assert_eq!(snapshot.step_times[0].duration_ms, 1200);

    assert_eq!(snapshot.active_steps.len(), 1);
    assert_eq!(snapshot.active_steps.get("b"), Some(&700));
}

#[tokio::test(start_paused = true)]
async fn pause_is_excluded_from_step_durations() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    advance(Duration::from_millis(1000)).await;
    timer.pause().await;
    advance(Duration::from_millis(2000)).await;
    timer.resume().await;
    advance(Duration::from_millis(1500)).await;
    timer.end_step("a").await;

    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.step_times[0].duration_ms, 2500);
    assert_eq!(snapshot.total_ms, 2500);
}

#[tokio::test(start_paused = true)]
async fn active_steps_freeze_with_the_session() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    advance(Duration::from_millis(400)).await;
    timer.start_step("b").await;
    advance(Duration::from_millis(600)).await;
    timer.pause().await;
    advance(Duration::from_millis(5000)).await;

    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.active_steps.get("a"), Some(&1000));
    assert_eq!(snapshot.active_steps.get("b"), Some(&600));

    timer.resume().await;
    advance(Duration::from_millis(500)).await;

    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.active_steps.get("a"), Some(&1500));
    assert_eq!(snapshot.active_steps.get("b"), Some(&1100));
}

#[tokio::test(start_paused = true)]
async fn start_while_running_is_ignored() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    advance(Duration::from_millis(800)).await;
    timer.start().await;

    assert_eq!(timer.elapsed_ms().await, 800);
    assert!(timer.is_running().await);
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop_begins_a_fresh_session() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    advance(Duration::from_millis(900)).await;
    timer.stop().await;

    timer.start().await;
    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.total_ms, 0);
    assert!(snapshot.running);
    assert!(snapshot.active_steps.is_empty());
    assert!(snapshot.step_times.is_empty());

    advance(Duration::from_millis(250)).await;
    assert_eq!(timer.elapsed_ms().await, 250);
}

#[tokio::test(start_paused = true)]
async fn step_commands_out_of_state_are_ignored() {
    let timer = StepsTimer::with_tick_interval(TICK);

    // No session yet.
    timer.start_step("a").await;
    assert!(timer.snapshot().await.active_steps.is_empty());

    timer.start().await;
    timer.end_step("never-started").await;
    assert!(timer.snapshot().await.step_times.is_empty());

    // While paused a new step cannot begin.
    timer.pause().await;
    timer.start_step("a").await;
    assert!(timer.snapshot().await.active_steps.is_empty());

    // Pause and resume in the wrong state change nothing.
    timer.pause().await;
    assert_eq!(timer.status().await, TimerStatus::Paused);
    timer.reset().await;
    timer.resume().await;
    assert_eq!(timer.status().await, TimerStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn duplicate_step_id_keeps_the_original_entry() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    advance(Duration::from_millis(300)).await;
    timer.start_step("a").await;
    advance(Duration::from_millis(200)).await;

    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.active_steps.get("a"), Some(&500));
}

#[tokio::test(start_paused = true)]
async fn ending_a_step_while_paused_records_the_frozen_value() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    advance(Duration::from_millis(700)).await;
    timer.pause().await;
    advance(Duration::from_millis(300)).await;
    timer.end_step("a").await;

    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.step_times.len(), 1);
    assert_eq!(snapshot.step_times[0].duration_ms, 700);
    assert!(snapshot.active_steps.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_completes_every_active_step() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("b").await;
    advance(Duration::from_millis(200)).await;
    timer.start_step("a").await;
    advance(Duration::from_millis(500)).await;
    timer.stop().await;

    let snapshot = timer.snapshot().await;
    assert!(!snapshot.running);
    assert!(snapshot.active_steps.is_empty());

    let ids: Vec<&str> = snapshot
        .step_times
        .iter()
        .map(|step| step.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(snapshot.step_times[0].duration_ms, 500);
    assert_eq!(snapshot.step_times[1].duration_ms, 700);

    // Stopped, not reset: the session total is preserved.
    assert_eq!(snapshot.total_ms, 700);
}

#[tokio::test(start_paused = true)]
async fn stop_while_idle_is_ignored() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.stop().await;
    assert_eq!(timer.status().await, TimerStatus::Idle);
    assert_eq!(timer.snapshot().await, TimerSnapshot::default());
}

#[tokio::test(start_paused = true)]
async fn reusing_a_step_id_appends_separate_records() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    advance(Duration::from_millis(300)).await;
    timer.end_step("a").await;
    timer.start_step("a").await;
    advance(Duration::from_millis(400)).await;
    timer.end_step("a").await;

    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.step_times.len(), 2);
    assert_eq!(snapshot.step_times[0].id, "a");
    assert_eq!(snapshot.step_times[0].duration_ms, 300);
    assert_eq!(snapshot.step_times[1].id, "a");
    assert_eq!(snapshot.step_times[1].duration_ms, 400);
}

#[tokio::test(start_paused = true)]
async fn reset_returns_to_initial_state_from_anywhere() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    advance(Duration::from_millis(600)).await;
    timer.end_step("a").await;
    timer.start_step("b").await;
    timer.pause().await;

    timer.reset().await;

    assert_eq!(timer.status().await, TimerStatus::Idle);
    assert_eq!(timer.snapshot().await, TimerSnapshot::default());

    // A fresh session still works after a reset.
    timer.start().await;
    advance(Duration::from_millis(150)).await;
    assert_eq!(timer.elapsed_ms().await, 150);
}

#[tokio::test(start_paused = true)]
async fn completed_steps_keep_their_original_start_timestamp() {
    let timer = StepsTimer::with_tick_interval(TICK);

    timer.start().await;
    timer.start_step("a").await;
    let started = chrono::Utc::now();
    advance(Duration::from_millis(800)).await;
    timer.end_step("a").await;

    let snapshot = timer.snapshot().await;
    let record = &snapshot.step_times[0];
    // The start was captured at creation; pausing or time passing never
    // rewrites it.
    assert!(record.started_at <= started);
    assert!(record.ended_at >= record.started_at);
    assert_eq!(record.duration_ms, 800);
}
