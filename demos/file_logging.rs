//! File logging example
//!
//! Demonstrates adding a file channel next to the default stdout/stderr split.
//! The file receives every severity; the terminal keeps the usual routing.
//!
//! Run with: cargo run --example file_logging

use rust_json_logger::prelude::*;
use std::fs::OpenOptions;

fn main() -> Result<()> {
    println!("=== Rust JSON Logger - File Logging Example ===\n");

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("application.log")
        .map_err(|e| LoggerError::io_operation("opening log file", "application.log", e))?;

    let logger = Logger::builder()
        .stdout(StreamAppender::stdout())
        .stderr(StreamAppender::stderr())
        .channel(Channel::new("file", StreamAppender::new("file", file)))
        .exclude_fields([DefaultField::FilePath])
        .build();

    println!("1. Logging to both terminal and file:");

    logger.info("Application started")?;
    logger.debug("Loading configuration...")?;
    logger.warning("Using default settings for some options")?;
    logger.error("Failed to load optional plugin")?;

    println!("\n2. Performing some operations:");

    for i in 1..=5 {
        logger.log_with(
            LogLevel::Info,
            "Processing item",
            LogOptions::new().extra("item", i).extra("of", 5),
        )?;
        if i == 3 {
            logger.warning("Item 3 took longer than expected")?;
        }
    }

    logger.info("All operations completed")?;
    logger.flush()?;

    println!("\n=== Example completed successfully! ===");
    println!("Check 'application.log' for the full log output");

    Ok(())
}
