//! Async logging example
//!
//! Demonstrates the non-blocking mode: log calls hand lines to per-stream
//! drain tasks and never wait on the terminal or pipe.
//!
//! Run with: cargo run --example async_logging

use rust_json_logger::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust JSON Logger - Async Logging Example ===\n");

    // Non-blocking writers on stdout and stderr
    let logger = Arc::new(AsyncLogger::init()?);

    println!("1. Hand-off without waiting:");
    for i in 0..100 {
        // Dropping the future does not cancel the write
        drop(logger.info(format!("Message #{}", i)));
    }
    logger.flush().await?;
    println!("   Logged 100 messages");

    println!("\n2. Concurrent tasks:");
    let mut handles = vec![];
    for task_id in 0..5 {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move {
            for i in 0..20 {
                let options = LogOptions::new().extra("task", task_id).extra("seq", i);
                logger.log_with(LogLevel::Info, "tick", options).await?;
            }
            logger.warning(format!("Task {} finished", task_id)).await
        }));
    }

    for handle in handles {
        if let Ok(Err(e)) = handle.await {
            eprintln!("task failed: {}", e);
        }
    }
    println!("   5 tasks logged 20 messages each");

    logger.close().await?;

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
