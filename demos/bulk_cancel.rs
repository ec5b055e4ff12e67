//! # Example: bulk_cancel
//!
//! Demonstrates the bulk operations over a registry.
//!
//! Shows how to:
//! - Register several workers, one of which is exempt from bulk cancellation
//! - Insert a handle-less record directly through [`Registry::add`](taskkeeper::Registry::add)
//! - Cancel everything except the exempt worker with [`TaskManager::cancel_all`]
//! - Check completion of the rest with [`TaskManager::check_all_completion`]
//! - Tear everything down with [`TaskManager::clear_all`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► register a, b, keeper; add "legacy" without a cancel handle
//!   ├─► start all
//!   ├─► cancel_all(except = ["keeper"])  → PartiallyAccepted { legacy: CancelHandleMissing }
//!   ├─► check_all_completion(except = ["keeper", "legacy"])
//!   │     └─► a: Completed, b: Completed
//!   └─► clear_all()                      → registry and disposal queue empty
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example bulk_cancel
//! ```

use std::time::Duration;
use taskkeeper::{
    CancelHandle, Config, CreationOptions, PollOptions, Status, TaskError, TaskFn, TaskManager,
    TaskRecord, TaskRef,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn ticker(name: &'static str) -> TaskRef {
    TaskFn::arc(move |ctx: CancellationToken| async move {
        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    println!("[{name}] stopping");
                    return Err(TaskError::Canceled);
                }
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .init();
    println!("=== bulk_cancel example ===\n");

    let manager = TaskManager::builder(Config::default()).build();

    for name in ["a", "b", "keeper"] {
        let st = manager
            .register(name, Some(ticker(name)), Some(CancelHandle::new()), CreationOptions::new())
            .await;
        anyhow::ensure!(st == Status::Added, "register {name} failed: {st}");
    }

    let legacy = TaskRecord::new(ticker("legacy"), None, CreationOptions::new(), &manager.cfg);
    anyhow::ensure!(manager.registry().add("legacy", legacy).await, "legacy already present");

    for name in manager.registry().names().await {
        println!("[controller] start {name}: {}", manager.start(&name).await);
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    let (st, skipped) = manager.cancel_all(&["keeper"]).await;
    println!("[controller] cancel_all: {st}, skipped: {skipped:?}");
    anyhow::ensure!(st == Status::PartiallyAccepted, "unexpected bulk status {st}");
    anyhow::ensure!(skipped.get("legacy") == Some(&Status::CancelHandleMissing));

    let poll = PollOptions::new(1, Duration::from_secs(1));
    let done = manager
        .check_all_completion(&["keeper", "legacy"], poll)
        .await;
    println!("[controller] check_all_completion: {done:?}");
    anyhow::ensure!(done.values().all(|s| *s == Status::Completed));

    println!("[controller] statuses before teardown: {:?}", manager.statuses().await);
    manager.clear_all().await;
    anyhow::ensure!(manager.statuses().await.is_empty(), "registry should be empty");
    manager.shutdown().await;

    println!("\n=== example completed successfully ===");
    Ok(())
}
