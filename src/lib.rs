//! line-publisher - publish the lines of a text file to a Kafka topic.
//!
//! Connection options come from `BROKER_*` environment variables (optionally
//! over a TOML file), every non-blank line becomes one message with a fixed
//! partition key, and each message is accounted for as delivered or failed
//! before a run returns.

pub mod config;
pub mod error;
pub mod input;
pub mod publisher;

pub mod kafka;

pub use config::{ConnectionConfig, DeliveryMode, PublishSettings};
pub use error::{Error, Result};
pub use publisher::{LinePublisher, PublishSummary};
