//! Basic logger usage example
//!
//! Demonstrates synchronous JSON logging with the default stdout/stderr split,
//! structured messages, extra fields and exception capture.
//!
//! Run with: cargo run --example basic_usage

use rust_json_logger::prelude::*;
use rust_json_logger::{exception, info};

fn load_playlist(logger: &Logger) {
    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "playlist.json");
    exception!(logger, err, "could not load the playlist").ok();
}

fn main() -> Result<()> {
    println!("=== Rust JSON Logger - Basic Usage Example ===\n");

    // DEBUG/INFO go to stdout, WARNING and above to stderr
    let logger = Logger::builder().extra("service", "jukebox").build();

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message")?;
    logger.info("This is an info message")?;
    logger.warning("This is a warning message")?;
    logger.error("This is an error message")?;
    logger.critical("This is a critical message")?;

    println!("\n2. Structured messages:");
    let song = Fields::new().with("artist", "X").with("song", "Y");
    logger.log_with(LogLevel::Info, song.clone(), LogOptions::new().extra("dog", "Z"))?;
    logger.log_with(LogLevel::Info, song, LogOptions::new().flatten(true))?;

    println!("\n3. Macros record the calling function:");
    info!(logger, "Now playing track {}", 3)?;
    load_playlist(&logger);

    println!("\n4. Raising the minimum level:");
    logger.set_min_level(LogLevel::Warning);
    logger.info("Info message (hidden)")?;
    logger.warning("Warning message (visible)")?;

    println!("\n5. Logger health:");
    let snapshot = logger.metrics().snapshot();
    println!(
        "   {}",
        serde_json::to_string(&snapshot).unwrap_or_else(|e| e.to_string())
    );

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
