//! Error types and result handling for line-publisher.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use line_publisher::{Error, Result};
//!
//! fn connect_to_broker() -> Result<()> {
//!     // Simulating a connection error
//!     Err(Error::Connect("broker localhost:9093 unreachable".to_string()))
//! }
//!
//! match connect_to_broker() {
//!     Ok(()) => println!("Connected"),
//!     Err(Error::Connect(msg)) => eprintln!("Connection error: {}", msg),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// The main error type for line-publisher operations.
///
/// Per-message delivery failures are not raised through this type by the
/// publisher; they are reported and collected into a
/// [`PublishSummary`](crate::publisher::PublishSummary) instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or unloadable connection configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The broker could not be reached or the client could not be created.
    #[error("Connection error: {0}")]
    Connect(String),

    /// Kafka client or producer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// A message could not be handed to the broker client.
    #[error("Delivery error: {message}")]
    Delivery {
        /// Description of the delivery failure
        message: String,
    },

    /// Operation timeout, typically a flush that did not drain in time.
    #[error("Timeout error: {message}")]
    Timeout {
        /// Description of what timed out
        message: String,
    },

    /// The input file could not be read.
    #[error("Failed to read input {}: {source}", .path.display())]
    Input {
        /// Path of the input file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// A convenient Result type alias for line-publisher operations.
///
/// This is equivalent to `std::result::Result<T, line_publisher::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
