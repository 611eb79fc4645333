use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::models::CompletedStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Idle
    }
}

/// Accumulates run time across pause/resume boundaries.
///
/// While running, `running_anchor` marks the start of the current running
/// segment; `baseline_ms` holds time accumulated from earlier segments.
/// Elapsed time is `baseline_ms + (now - running_anchor)` whenever the
/// anchor is present, and just `baseline_ms` while frozen.
#[derive(Debug, Clone, Copy, Default)]
struct PausableClock {
    running_anchor: Option<Instant>,
    baseline_ms: u64,
}

impl PausableClock {
    fn started(now: Instant) -> Self {
        Self {
            running_anchor: Some(now),
            baseline_ms: 0,
        }
    }

    /// Fold the current running segment into the baseline and clear the
    /// anchor. No-op on an already frozen clock.
    fn freeze(&mut self, now: Instant) {
        if let Some(anchor) = self.running_anchor.take() {
            self.baseline_ms = self
                .baseline_ms
                .saturating_add(now.duration_since(anchor).as_millis() as u64);
        }
    }

    /// Re-anchor a frozen clock at `now`. A running clock is left untouched.
    fn unfreeze(&mut self, now: Instant) {
        if self.running_anchor.is_none() {
            self.running_anchor = Some(now);
        }
    }

    fn elapsed_ms(&self, now: Instant) -> u64 {
        match self.running_anchor {
            Some(anchor) => self
                .baseline_ms
                .saturating_add(now.duration_since(anchor).as_millis() as u64),
            None => self.baseline_ms,
        }
    }
}

/// One currently active step.
#[derive(Debug, Clone)]
struct StepEntry {
    clock: PausableClock,
    /// Captured once when the step is created, never adjusted; reported as
    /// the step's start in its completed record.
    started_at: DateTime<Utc>,
}

/// Full mutable state of one timer engine: the session clock, the active
/// step registry, and the completed step sequence. All transitions take the
/// sampled `now` explicitly so the state machine stays pure and directly
/// testable.
#[derive(Debug, Default)]
pub(crate) struct TimerState {
    status: TimerStatus,
    clock: PausableClock,
    steps: BTreeMap<String, StepEntry>,
    completed: Vec<CompletedStep>,
}

impl TimerState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn status(&self) -> TimerStatus {
        self.status
    }

    pub(crate) fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Session elapsed milliseconds at `now`.
    pub(crate) fn elapsed_ms(&self, now: Instant) -> u64 {
        self.clock.elapsed_ms(now)
    }

    /// Current elapsed milliseconds per active step, keyed by id.
    pub(crate) fn active_step_times(&self, now: Instant) -> BTreeMap<String, u64> {
        self.steps
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clock.elapsed_ms(now)))
            .collect()
    }

    pub(crate) fn completed_steps(&self) -> &[CompletedStep] {
        &self.completed
    }

    /// Begin a fresh session from zero, discarding all prior step data.
    /// Returns false when the timer is already running (double-start is
    /// ignored).
    pub(crate) fn start(&mut self, now: Instant) -> bool {
        if self.status == TimerStatus::Running {
            return false;
        }
        *self = Self {
            status: TimerStatus::Running,
            clock: PausableClock::started(now),
            steps: BTreeMap::new(),
            completed: Vec::new(),
        };
        true
    }

    /// Freeze the session clock and every active step in lock-step. Returns
    /// false unless the timer was running.
    pub(crate) fn pause(&mut self, now: Instant) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.clock.freeze(now);
        for entry in self.steps.values_mut() {
            entry.clock.freeze(now);
        }
        self.status = TimerStatus::Paused;
        true
    }

    /// Re-anchor the session clock and exactly the steps the matching pause
    /// froze. Returns false unless the timer was paused.
    pub(crate) fn resume(&mut self, now: Instant) -> bool {
        if self.status != TimerStatus::Paused {
            return false;
        }
        self.clock.unfreeze(now);
        for entry in self.steps.values_mut() {
            entry.clock.unfreeze(now);
        }
        self.status = TimerStatus::Running;
        true
    }

    /// Pause, then end every active step in registry order (sorted by id,
    /// so the completion order is deterministic). Returns false when
    /// nothing changed.
    pub(crate) fn stop(&mut self, now: Instant, wall: DateTime<Utc>) -> bool {
        let paused = self.pause(now);
        let ids: Vec<String> = self.steps.keys().cloned().collect();
        for id in &ids {
            self.end_step(id, now, wall);
        }
        paused || !ids.is_empty()
    }

    /// Drop every piece of session and step state and return to Idle.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Register a new active step running from `now`. Rejected (returns
    /// false) while the session is not running or while `id` already has an
    /// active entry.
    pub(crate) fn start_step(&mut self, id: &str, now: Instant, wall: DateTime<Utc>) -> bool {
        if self.status != TimerStatus::Running || self.steps.contains_key(id) {
            return false;
        }
        self.steps.insert(
            id.to_string(),
            StepEntry {
                clock: PausableClock::started(now),
                started_at: wall,
            },
        );
        true
    }

    /// End an active step and record it as completed, returning its final
    /// duration. Returns None when no active entry exists for `id`. Legal
    /// while the session is paused: the frozen elapsed value is recorded.
    pub(crate) fn end_step(&mut self, id: &str, now: Instant, wall: DateTime<Utc>) -> Option<u64> {
        let entry = self.steps.remove(id)?;
        let duration_ms = entry.clock.elapsed_ms(now);
        self.completed.push(CompletedStep {
            id: id.to_string(),
            started_at: entry.started_at,
            ended_at: wall,
            duration_ms,
        });
        Some(duration_ms)
    }
}
