//! Stepwatch demo
//!
//! Drives one scripted session against a live engine — overlapping steps, a
//! pause/resume cycle, then stop — while a subscriber prints every published
//! snapshot as one JSON line. Set RUST_LOG=debug to also see which commands
//! the engine ignored.

use std::time::Duration;

use anyhow::Result;
use stepwatch::StepsTimer;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let timer = StepsTimer::new();

    // Subscribe before the first command so no snapshot is missed.
    let mut snapshots = timer.subscribe();
    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            match serde_json::to_string(&snapshot) {
                Ok(json) => println!("{}", json),
                Err(err) => log::warn!("Failed to serialize snapshot: {}", err),
            }
        }
    });

    timer.start().await;
    timer.start_step("compile").await;
    sleep(Duration::from_millis(400)).await;

    // Overlapping step: "tests" runs while "compile" is still active.
    timer.start_step("tests").await;
    sleep(Duration::from_millis(300)).await;
    timer.end_step("compile").await;

    timer.pause().await;
    sleep(Duration::from_millis(400)).await; // frozen, nothing accumulates
    timer.resume().await;
    sleep(Duration::from_millis(200)).await;

    // Ignored on purpose: no step with this id was ever started.
    timer.end_step("deploy").await;

    timer.stop().await;

    let final_snapshot = timer.snapshot().await;
    println!("{}", serde_json::to_string_pretty(&final_snapshot)?);

    timer.shutdown().await?;
    printer.await?;
    Ok(())
}
