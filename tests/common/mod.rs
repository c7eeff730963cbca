#![allow(dead_code)]

use futures::FutureExt;
use line_publisher::kafka::{BrokerClient, DeliveryOutcome, OutgoingMessage, PendingDelivery};
use line_publisher::{Error, Result};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;

/// A call the publisher made against the broker client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        topic: String,
        key: String,
        value: String,
    },
    Flush(Duration),
}

impl Call {
    pub fn send(topic: &str, key: &str, value: &str) -> Self {
        Call::Send {
            topic: topic.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// How the stub answers each submitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    Acknowledge,
    FailDelivery,
    RejectEnqueue,
    NeverAcknowledge,
}

/// Broker client that records calls and answers from a fixed behavior.
pub struct StubBrokerClient {
    behavior: StubBehavior,
    /// 1-based send numbers that are rejected at enqueue time
    reject_sends: Vec<usize>,
    calls: Mutex<Vec<Call>>,
}

impl StubBrokerClient {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            reject_sends: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(mut self, sends: &[usize]) -> Self {
        self.reject_sends = sends.to_vec();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Send { .. }))
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Flush(_)))
            .count()
    }
}

impl BrokerClient for StubBrokerClient {
    async fn send(&self, message: OutgoingMessage) -> Result<PendingDelivery> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Call::send(&message.topic, &message.key, &message.value));
        let number = calls.iter().filter(|c| matches!(c, Call::Send { .. })).count();

        if self.behavior == StubBehavior::RejectEnqueue || self.reject_sends.contains(&number) {
            return Err(Error::Delivery {
                message: format!("local queue rejected message {}", number),
            });
        }

        let pending = match self.behavior {
            StubBehavior::Acknowledge => {
                futures::future::ready(DeliveryOutcome::delivered(message.topic, 0, number as i64 - 1))
                    .boxed()
            }
            StubBehavior::FailDelivery => {
                futures::future::ready(DeliveryOutcome::failed("Broker: Message timed out")).boxed()
            }
            StubBehavior::NeverAcknowledge | StubBehavior::RejectEnqueue => {
                futures::future::pending::<DeliveryOutcome>().boxed()
            }
        };
        Ok(pending)
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Flush(timeout));
        if self.behavior == StubBehavior::NeverAcknowledge {
            return Err(Error::Timeout {
                message: format!("flush did not complete within {:?}", timeout),
            });
        }
        Ok(())
    }
}

/// Write `content` to a temporary input file.
pub fn input_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
