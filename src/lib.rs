//! # stepwatch
//!
//! A session timer engine with named, overlapping steps.
//!
//! One [`StepsTimer`] tracks a single session clock plus any number of named
//! sub-intervals ("steps") nested within it. Pausing the session freezes the
//! session clock and every active step together; resuming unfreezes them
//! together. Ending a step appends an immutable record of its start, end, and
//! accumulated duration.
//!
//! While running, a background ticker recomputes a [`TimerSnapshot`] at a
//! fixed cadence (100 ms by default) and publishes it over a watch channel
//! whenever it changed, so consumers can render live values without polling.
//!
//! Commands that make no sense in the current state — pausing an idle timer,
//! ending a step that was never started — are silently ignored.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use stepwatch::StepsTimer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let timer = StepsTimer::new();
//!
//!     // Subscribe before starting to observe every published snapshot.
//!     let mut snapshots = timer.subscribe();
//!     tokio::spawn(async move {
//!         while snapshots.changed().await.is_ok() {
//!             let snapshot = snapshots.borrow_and_update().clone();
//!             println!("elapsed: {} ms", snapshot.total_ms);
//!         }
//!     });
//!
//!     timer.start().await;
//!     timer.start_step("warmup").await;
//!     tokio::time::sleep(Duration::from_millis(500)).await;
//!     timer.end_step("warmup").await;
//!     timer.stop().await;
//!
//!     timer.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod timer;

pub use models::CompletedStep;
pub use timer::{StepsTimer, TimerSnapshot, TimerStatus, DEFAULT_TICK_INTERVAL};
