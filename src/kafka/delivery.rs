//! Delivery outcomes reported back by the broker client.

use futures::channel::oneshot::Canceled;
use rdkafka::message::OwnedMessage;
use rdkafka::producer::future_producer::OwnedDeliveryResult;
use rdkafka::Message;
use tracing::{info, warn};

/// Where the broker stored a delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Terminal state of one submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(RecordPosition),
    Failed { error: String },
}

impl DeliveryOutcome {
    pub fn delivered(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        DeliveryOutcome::Delivered(RecordPosition {
            topic: topic.into(),
            partition,
            offset,
        })
    }

    pub fn failed(error: impl Into<String>) -> Self {
        DeliveryOutcome::Failed {
            error: error.into(),
        }
    }

    /// Classify a raw delivery report: an error means failure, otherwise the
    /// message metadata is required.
    pub fn from_report(error: Option<String>, position: Option<RecordPosition>) -> Self {
        match (error, position) {
            (Some(error), _) => DeliveryOutcome::failed(error),
            (None, Some(position)) => DeliveryOutcome::Delivered(position),
            (None, None) => DeliveryOutcome::failed("delivery report carried no metadata"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Failed { error } => Some(error),
            DeliveryOutcome::Delivered(_) => None,
        }
    }

    pub fn position(&self) -> Option<&RecordPosition> {
        match self {
            DeliveryOutcome::Delivered(position) => Some(position),
            DeliveryOutcome::Failed { .. } => None,
        }
    }
}

/// Convert what an rdkafka `DeliveryFuture` resolves to.
pub(crate) fn outcome_from_delivery(
    topic: &str,
    result: Result<OwnedDeliveryResult, Canceled>,
) -> DeliveryOutcome {
    match result {
        Ok(Ok((partition, offset))) => DeliveryOutcome::delivered(topic, partition, offset),
        Ok(Err((err, message))) => failed_message(err.to_string(), &message),
        Err(Canceled) => DeliveryOutcome::failed("producer shut down before delivery was reported"),
    }
}

fn failed_message(error: String, message: &OwnedMessage) -> DeliveryOutcome {
    DeliveryOutcome::from_report(
        Some(format!("{} (topic={})", error, message.topic())),
        None,
    )
}

/// Log the outcome of one message. Never fails.
pub fn report_delivery(outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Delivered(position) => {
            info!(
                topic = %position.topic,
                partition = position.partition,
                offset = position.offset,
                "Record produced"
            );
        }
        DeliveryOutcome::Failed { error } => {
            warn!(error = %error, "Delivery failed");
        }
    }
}
