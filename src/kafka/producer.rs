use super::delivery::outcome_from_delivery;
use super::{BrokerClient, OutgoingMessage, PendingDelivery};
use crate::config::{check_timeout, ConnectionConfig, MAX_TIMEOUT};
use crate::{Error, Result};
use futures::FutureExt;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(100);
const QUEUE_FULL_MAX_RETRIES: u32 = 50;

/// rdkafka-backed broker client holding one long-lived producer.
pub struct KafkaBrokerClient {
    producer: FutureProducer,
}

impl KafkaBrokerClient {
    /// Create the producer and confirm the cluster answers within `connect_timeout`.
    ///
    /// The metadata round trip blocks inside librdkafka, so it runs on the
    /// blocking pool.
    #[instrument(skip(config), fields(brokers = %config.bootstrap_servers()))]
    pub async fn connect(config: &ConnectionConfig, connect_timeout: Duration) -> Result<Self> {
        let connect_timeout = check_timeout("connect_timeout", connect_timeout)?;

        if config.security_protocol.uses_tls() {
            if let Some(ref ca) = config.ssl_ca_location {
                if !ca.is_file() {
                    return Err(Error::Connect(format!(
                        "CA certificate {} does not exist",
                        ca.display()
                    )));
                }
            }
        }

        let producer: FutureProducer = config
            .to_client_config()
            .create()
            .map_err(|e| Error::Connect(format!("failed to create producer: {}", e)))?;

        let metadata_producer = producer.clone();
        let (brokers, topics) = tokio::task::spawn_blocking(move || {
            metadata_producer
                .client()
                .fetch_metadata(None, connect_timeout)
                .map(|metadata| (metadata.brokers().len(), metadata.topics().len()))
        })
        .await
        .map_err(|e| Error::Connect(format!("metadata request aborted: {}", e)))?
        .map_err(|e| {
            Error::Connect(format!(
                "broker {} unreachable: {}",
                config.bootstrap_servers(),
                e
            ))
        })?;

        info!(
            brokers,
            topics,
            client_id = %config.client_id,
            idempotence = config.enable_idempotence,
            "Connected to broker"
        );

        Ok(Self { producer })
    }

    /// Client over a producer that has not confirmed the cluster is reachable.
    #[cfg(test)]
    pub(crate) fn unconnected(config: &ConnectionConfig) -> Result<Self> {
        let producer = config.to_client_config().create()?;
        Ok(Self { producer })
    }

    /// Number of messages still queued or awaiting acknowledgement.
    pub fn in_flight(&self) -> i32 {
        self.producer.in_flight_count()
    }
}

impl BrokerClient for KafkaBrokerClient {
    async fn send(&self, message: OutgoingMessage) -> Result<PendingDelivery> {
        let mut retries = 0;

        loop {
            let record = FutureRecord::to(&message.topic)
                .key(&message.key)
                .payload(&message.value);

            match self.producer.send_result(record) {
                Ok(delivery) => {
                    let topic = message.topic.clone();
                    return Ok(delivery
                        .map(move |result| outcome_from_delivery(&topic, result))
                        .boxed());
                }
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {}
                Err((e, _)) => return Err(Error::Kafka(e)),
            };

            if retries >= QUEUE_FULL_MAX_RETRIES {
                return Err(Error::Delivery {
                    message: format!("producer queue still full after {} retries", retries),
                });
            }
            retries += 1;
            debug!(retries, "Producer queue full, backing off");
            tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
        }
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        let timeout = bounded_timeout(timeout);
        let producer = self.producer.clone();

        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| Error::Delivery {
                message: format!("flush task aborted: {}", e),
            })?
            .map_err(|e| match e {
                KafkaError::Flush(RDKafkaErrorCode::OperationTimedOut) => Error::Timeout {
                    message: format!(
                        "flush did not complete within {:?}, {} message(s) in flight",
                        timeout,
                        self.producer.in_flight_count()
                    ),
                },
                other => Error::Kafka(other),
            })
    }
}

/// librdkafka cannot wait longer than `i32::MAX` milliseconds.
pub(crate) fn bounded_timeout(timeout: Duration) -> Duration {
    timeout.min(MAX_TIMEOUT)
}

impl Drop for KafkaBrokerClient {
    fn drop(&mut self) {
        let remaining = self.producer.in_flight_count();
        if remaining > 0 {
            warn!(remaining, "Dropping producer with undelivered messages");
        }
    }
}
