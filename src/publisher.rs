//! The line publisher: turns input lines into broker messages and accounts
//! for every one of them.
//!
//! # Example
//!
//! ```rust,no_run
//! use line_publisher::config::{ConnectionConfig, PublishSettings};
//! use line_publisher::kafka::KafkaBrokerClient;
//! use line_publisher::LinePublisher;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> line_publisher::Result<()> {
//!     let config = ConnectionConfig::load(None)?;
//!     let client = KafkaBrokerClient::connect(&config, Duration::from_secs(10)).await?;
//!     let publisher = LinePublisher::new(client, PublishSettings::default());
//!
//!     let summary = publisher.run(Path::new("orders_list")).await?;
//!     println!("{} of {} delivered", summary.delivered, summary.submitted);
//!     Ok(())
//! }
//! ```

use crate::config::{DeliveryMode, PublishSettings, MAX_TIMEOUT};
use crate::input::{self, InputLine};
use crate::kafka::{report_delivery, BrokerClient, DeliveryOutcome, OutgoingMessage, PendingDelivery};
use crate::Result;
use std::path::Path;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// A line whose message was not delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedLine {
    pub line: usize,
    pub error: String,
}

/// Per-run accounting of submitted messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub submitted: usize,
    pub delivered: usize,
    /// Ordered by line number
    pub failures: Vec<FailedLine>,
}

impl PublishSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every submitted message was delivered.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, line: usize, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered(_) => self.delivered += 1,
            DeliveryOutcome::Failed { error } => self.failures.push(FailedLine {
                line,
                error: error.clone(),
            }),
        }
    }
}

/// Publishes lines to one topic with one key over a single broker client.
pub struct LinePublisher<C> {
    client: C,
    settings: PublishSettings,
}

impl<C: BrokerClient> LinePublisher<C> {
    pub fn new(client: C, settings: PublishSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Send one message, flush, and wait for its outcome.
    ///
    /// Failures are reported and returned, never raised.
    #[instrument(skip_all, fields(topic = %topic, key = %key))]
    pub async fn publish(&self, topic: &str, message: &str, key: &str) -> DeliveryOutcome {
        let deadline = self.deadline();

        let outcome = match self.client.send(OutgoingMessage::new(topic, key, message)).await {
            Ok(pending) => {
                self.flush().await;
                await_outcome(pending, deadline).await
            }
            Err(e) => DeliveryOutcome::failed(e.to_string()),
        };

        report_delivery(&outcome);
        outcome
    }

    /// Publish already-read lines using the configured topic, key and mode.
    #[instrument(skip_all, fields(count = lines.len(), mode = ?self.settings.mode))]
    pub async fn publish_lines(&self, lines: &[InputLine]) -> PublishSummary {
        let summary = match self.settings.mode {
            DeliveryMode::Batched => self.publish_batched(lines).await,
            DeliveryMode::PerMessage => self.publish_each(lines).await,
        };

        if summary.is_clean() {
            info!(
                submitted = summary.submitted,
                delivered = summary.delivered,
                "All messages delivered"
            );
        } else {
            warn!(
                submitted = summary.submitted,
                delivered = summary.delivered,
                failed = summary.failed(),
                "Some messages were not delivered"
            );
        }

        summary
    }

    /// Read `input` and publish each non-blank line in file order.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn run(&self, input: &Path) -> Result<PublishSummary> {
        let lines = input::read_lines(input).await?;
        info!(
            lines = lines.len(),
            topic = %self.settings.topic,
            "Publishing input file"
        );

        Ok(self.publish_lines(&lines).await)
    }

    async fn publish_each(&self, lines: &[InputLine]) -> PublishSummary {
        let mut summary = PublishSummary::default();
        let PublishSettings { topic, key, .. } = &self.settings;

        for line in lines {
            debug!(line = line.number, "Publishing line");
            summary.submitted += 1;
            let outcome = self.publish(topic, &line.text, key).await;
            summary.record(line.number, &outcome);
        }

        summary
    }

    async fn publish_batched(&self, lines: &[InputLine]) -> PublishSummary {
        let mut summary = PublishSummary::default();
        let mut pending = Vec::with_capacity(lines.len());

        for line in lines {
            summary.submitted += 1;
            match self.client.send(self.message_for(line)).await {
                Ok(delivery) => pending.push((line.number, delivery)),
                Err(e) => {
                    let outcome = DeliveryOutcome::failed(e.to_string());
                    report_delivery(&outcome);
                    summary.record(line.number, &outcome);
                }
            }
        }

        debug!(in_flight = pending.len(), "Submitted batch, flushing");
        let deadline = self.deadline();
        if !pending.is_empty() {
            self.flush().await;
        }

        for (number, delivery) in pending {
            let outcome = await_outcome(delivery, deadline).await;
            report_delivery(&outcome);
            summary.record(number, &outcome);
        }

        summary.failures.sort_by_key(|f| f.line);
        summary
    }

    fn message_for(&self, line: &InputLine) -> OutgoingMessage {
        OutgoingMessage::new(&self.settings.topic, &self.settings.key, &line.text)
    }

    /// Outcomes still unknown at this instant count as failed.
    fn deadline(&self) -> Instant {
        let timeout = self.settings.flush_timeout.min(MAX_TIMEOUT);
        Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(|| Instant::now() + MAX_TIMEOUT)
    }

    async fn flush(&self) {
        if let Err(e) = self.client.flush(self.settings.flush_timeout).await {
            warn!(error = %e, "Flush did not complete");
        }
    }
}

async fn await_outcome(pending: PendingDelivery, deadline: Instant) -> DeliveryOutcome {
    tokio::time::timeout_at(deadline, pending)
        .await
        .unwrap_or_else(|_| DeliveryOutcome::failed("not acknowledged before flush timeout"))
}
