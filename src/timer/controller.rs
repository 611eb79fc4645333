use std::{collections::BTreeMap, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::state::TimerState;
use super::TimerStatus;
use crate::models::CompletedStep;

/// Snapshot cadence used by [`StepsTimer::new`] unless overridden by the
/// `STEPWATCH_TICK_MS` environment variable.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

const TICK_ENV_VAR: &str = "STEPWATCH_TICK_MS";

/// Point-in-time view of the whole engine, published on the watch channel
/// after every tick and every state-changing command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// Session elapsed milliseconds.
    #[serde(rename = "totalTime")]
    pub total_ms: u64,
    /// True while the session is running (not idle, not paused).
    pub running: bool,
    /// Current elapsed milliseconds per active step.
    pub active_steps: BTreeMap<String, u64>,
    /// Completed steps in completion order.
    pub step_times: Vec<CompletedStep>,
}

struct TickerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Session/steps timer engine.
///
/// Tracks one session clock plus any number of named, possibly-overlapping
/// steps, all pausing and resuming in lock-step. While running, a background
/// ticker republishes a [`TimerSnapshot`] at a fixed cadence; commands issued
/// in a state where they make no sense are silently ignored.
///
/// Handles are cheap to clone and share one engine. The ticker stops when
/// the last handle drops or when [`StepsTimer::shutdown`] is called.
#[derive(Clone)]
pub struct StepsTimer {
    state: Arc<Mutex<TimerState>>,
    snapshot_tx: watch::Sender<TimerSnapshot>,
    ticker: Arc<Mutex<Option<TickerHandle>>>,
    tick_interval: Duration,
    shutdown_token: CancellationToken,
    _shutdown_guard: Arc<DropGuard>,
}

impl StepsTimer {
    pub fn new() -> Self {
        Self::with_tick_interval(default_tick_interval())
    }

    /// Build an engine with a custom snapshot cadence. Sub-millisecond
    /// intervals are clamped to 1 ms.
    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(TimerSnapshot::default());
        let shutdown_token = CancellationToken::new();

        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            snapshot_tx,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            _shutdown_guard: Arc::new(shutdown_token.clone().drop_guard()),
            shutdown_token,
        }
    }

    /// Begin a fresh session from zero, discarding any previous session and
    /// step data. Ignored while a session is already running.
    pub async fn start(&self) {
        let now = Instant::now();
        let started = {
            let mut state = self.state.lock().await;
            state.start(now)
        };

        if !started {
            debug!("Ignoring start: session already running");
            return;
        }

        info!("Session started");
        self.arm_ticker().await;
        self.publish().await;
    }

    /// Freeze the session clock and every active step. Ignored unless the
    /// session is running.
    pub async fn pause(&self) {
        let now = Instant::now();
        let paused = {
            let mut state = self.state.lock().await;
            state.pause(now)
        };

        if !paused {
            debug!("Ignoring pause: session not running");
            return;
        }

        info!("Session paused");
        self.disarm_ticker().await;
        self.publish().await;
    }

    /// Continue accumulating from the frozen values. Ignored unless the
    /// session is paused.
    pub async fn resume(&self) {
        let now = Instant::now();
        let resumed = {
            let mut state = self.state.lock().await;
            state.resume(now)
        };

        if !resumed {
            debug!("Ignoring resume: session not paused");
            return;
        }

        info!("Session resumed");
        self.arm_ticker().await;
        self.publish().await;
    }

    /// Pause the session and end every active step, recording each as
    /// completed. Ignored while idle.
    pub async fn stop(&self) {
        let now = Instant::now();
        let wall = Utc::now();
        let changed = {
            let mut state = self.state.lock().await;
            state.stop(now, wall)
        };

        if !changed {
            debug!("Ignoring stop: nothing running and no active steps");
            return;
        }

        info!("Session stopped");
        self.disarm_ticker().await;
        self.publish().await;
    }

    /// Discard all session and step state and return to idle.
    pub async fn reset(&self) {
        {
            let mut state = self.state.lock().await;
            state.reset();
        }

        info!("Session reset");
        self.disarm_ticker().await;
        self.publish().await;
    }

    /// Start tracking a named step. Ignored unless the session is running,
    /// or when a step with this id is already active.
    pub async fn start_step(&self, id: &str) {
        let now = Instant::now();
        let wall = Utc::now();
        let started = {
            let mut state = self.state.lock().await;
            state.start_step(id, now, wall)
        };

        if !started {
            debug!(
                "Ignoring start_step for {}: session not running or step already active",
                id
            );
            return;
        }

        info!("Step {} started", id);
        self.publish().await;
    }

    /// End an active step and append it to the completed list. Ignored when
    /// no step with this id is active. Legal while the session is paused;
    /// the frozen elapsed value is recorded.
    pub async fn end_step(&self, id: &str) {
        let now = Instant::now();
        let wall = Utc::now();
        let ended = {
            let mut state = self.state.lock().await;
            state.end_step(id, now, wall)
        };

        match ended {
            Some(duration_ms) => {
                info!("Step {} ended after {} ms", id, duration_ms);
                self.publish().await;
            }
            None => debug!("Ignoring end_step for {}: no active step", id),
        }
    }

    /// Session elapsed milliseconds right now.
    pub async fn elapsed_ms(&self) -> u64 {
        self.state.lock().await.elapsed_ms(Instant::now())
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_running()
    }

    pub async fn status(&self) -> TimerStatus {
        self.state.lock().await.status()
    }

    /// Recompute a fresh snapshot at the current instant.
    pub async fn snapshot(&self) -> TimerSnapshot {
        let state = self.state.lock().await;
        build_snapshot(&state, Instant::now())
    }

    /// Subscribe to published snapshots. The receiver starts at the most
    /// recently published value and observes every subsequent change; the
    /// channel closes once every engine handle (tickers included) is gone.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Stop the engine eagerly: cancels the ticker lineage and joins a live
    /// ticker task. Dropping the last handle releases the same resources
    /// implicitly; this exists for callers that want the release to be
    /// observable and fallible.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_token.cancel();

        let ticker = self.ticker.lock().await.take();
        if let Some(TickerHandle { handle, .. }) = ticker {
            handle
                .await
                .context("ticker task failed to join during shutdown")?;
        }
        Ok(())
    }

    async fn publish(&self) {
        let snapshot = {
            let state = self.state.lock().await;
            build_snapshot(&state, Instant::now())
        };
        publish_if_changed(&self.snapshot_tx, snapshot);
    }

    /// Spawn the periodic snapshot task, replacing (and joining) any stale
    /// one first. The task exits when its token cancels, when the engine
    /// shuts down, or when it observes the session no longer running.
    async fn arm_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(stale) = ticker_guard.take() {
            stale.token.cancel();
            if let Err(err) = stale.handle.await {
                warn!("Stale ticker task failed: {}", err);
            }
        }

        let token = self.shutdown_token.child_token();
        let loop_token = token.clone();
        let state = self.state.clone();
        let snapshot_tx = self.snapshot_tx.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    // Cancellation wins over an already-elapsed tick
                    // deadline: nothing may publish after the cancel signal.
                    biased;

                    _ = loop_token.cancelled() => {
                        debug!("Ticker shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let snapshot = {
                            let guard = state.lock().await;
                            if !guard.is_running() {
                                break;
                            }
                            build_snapshot(&guard, Instant::now())
                        };
                        if loop_token.is_cancelled() {
                            break;
                        }
                        publish_if_changed(&snapshot_tx, snapshot);
                    }
                }
            }
        });

        *ticker_guard = Some(TickerHandle { token, handle });
    }

    async fn disarm_ticker(&self) {
        let ticker = self.ticker.lock().await.take();
        if let Some(TickerHandle { token, handle }) = ticker {
            token.cancel();
            if let Err(err) = handle.await {
                warn!("Ticker task failed: {}", err);
            }
        }
    }
}

impl Default for StepsTimer {
    fn default() -> Self {
        Self::new()
    }
}

fn build_snapshot(state: &TimerState, now: Instant) -> TimerSnapshot {
    TimerSnapshot {
        total_ms: state.elapsed_ms(now),
        running: state.is_running(),
        active_steps: state.active_step_times(now),
        step_times: state.completed_steps().to_vec(),
    }
}

/// Dirty check: notify subscribers only when the snapshot actually changed.
fn publish_if_changed(tx: &watch::Sender<TimerSnapshot>, snapshot: TimerSnapshot) -> bool {
    tx.send_if_modified(|current| {
        if *current == snapshot {
            false
        } else {
            *current = snapshot;
            true
        }
    })
}

fn default_tick_interval() -> Duration {
    std::env::var(TICK_ENV_VAR)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TICK_INTERVAL)
}
