//! # Example: task_cancel
//!
//! Demonstrates the full lifecycle of one named task.
//!
//! Shows how to:
//! - Register a long-running task with a shared [`CancelHandle`]
//! - Start it and cancel it by name using [`TaskManager::cancel`]
//! - Wait for termination with [`TaskManager::check_completion`]
//! - Delete it and read back its [`DisposalRecord`](taskkeeper::DisposalRecord)
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► register("worker", task, handle)     → Added
//!   ├─► start("worker")                      → Started   (WorkStarted)
//!   ├─► sleep 2 seconds (let task tick)
//!   ├─► cancel("worker")                     → Canceled  (callback runs once)
//!   │     └─► task observes token, exits     (WorkFinished)
//!   ├─► check_completion("worker")           → Completed
//!   ├─► delete("worker", push = true)        → Deleted
//!   ├─► dequeue_disposal_record()            → ObjectDequeued
//!   └─► shutdown()                           → subscriber workers drained
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example task_cancel --features logging
//! ```

use std::{sync::Arc, time::Duration};
use taskkeeper::{
    CancelHandle, Config, CreationOptions, LogWriter, PollOptions, Status, Subscribe, TaskError,
    TaskFn, TaskManager, TaskRef,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_target(true)
        .init();
    println!("=== task_cancel example ===\n");

    // 1. Configure manager
    let mut cfg = Config::default();
    cfg.bus_capacity = 256;
    cfg.poll = PollOptions::new(2, Duration::from_secs(1));

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let manager = TaskManager::builder(cfg).with_subscribers(subs).build();

    // 2. Define a long-running task that ticks every 500ms
    let worker: TaskRef = TaskFn::arc(|ctx: CancellationToken| async move {
        let mut counter = 0u32;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    println!("[worker] detected cancellation, exiting");
                    return Err(TaskError::Canceled);
                }
                _ = tokio::time::sleep(Duration::from_millis(500)) => {
                    counter += 1;
                    println!("[worker] tick #{counter}");
                }
            }
        }
    });

    // 3. Register with a cancel handle the caller keeps as well
    let handle = CancelHandle::new();
    handle.on_cancel(|| {
        println!("[worker] cancel callback: flushing state");
        Ok(())
    });
    let st = manager
        .register("worker", Some(worker), Some(handle.clone()), CreationOptions::new())
        .await;
    anyhow::ensure!(st == Status::Added, "register failed: {st}");

    // 4. Start and let it run
    let st = manager.start("worker").await;
    anyhow::ensure!(st == Status::Started, "start failed: {st}");
    println!("[controller] statuses: {:?}", manager.statuses().await);
    tokio::time::sleep(Duration::from_secs(2)).await;

    // 5. Cancel by name and wait for the unit to stop
    println!("\n[controller] cancelling 'worker'...");
    let st = manager.cancel("worker").await;
    anyhow::ensure!(st == Status::Canceled, "cancel failed: {st}");
    anyhow::ensure!(handle.is_cancelled(), "caller's handle should observe the cancel");

    let st = manager.check_completion("worker", manager.poll_options()).await;
    println!("[controller] completion check: {st}");
    anyhow::ensure!(st == Status::Completed, "worker did not stop in time");

    // 6. Delete and inspect the disposal record
    let st = manager.delete("worker", true).await?;
    anyhow::ensure!(st == Status::Deleted, "delete failed: {st}");

    let (st, record) = manager.dequeue_disposal_record().await;
    println!("[controller] dequeue: {st}, record: {record:?}");
    anyhow::ensure!(
        record.is_some_and(|r| r.final_status == "Canceled"),
        "disposal record should capture the canceled state"
    );

    // 7. Flush the log subscriber and stop its worker
    manager.shutdown().await;
    println!("\n=== example completed successfully ===");
    Ok(())
}
