//! Kafka-compatible bus transport (rdkafka).
//!
//! One `FutureProducer` serves every outbound topic; consumers are
//! created per inbound kind with their own group id so each kind keeps
//! independent offsets and failure behavior.

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::{debug, error, info};

use super::publisher::{EventPublisher, OutboundEvent};
use crate::domain::InfraError;

/// Bus connection settings.
#[derive(Debug, Clone)]
pub struct KafkaSettings {
    /// Comma-separated broker addresses.
    pub brokers: String,
    /// Base consumer group id; each kind appends its own suffix.
    pub group_base: String,
    /// Producer send timeout.
    pub publish_timeout: Duration,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_base: "reservation-service".to_string(),
            publish_timeout: Duration::from_secs(5),
        }
    }
}

pub fn create_producer(settings: &KafkaSettings) -> Result<FutureProducer, InfraError> {
    let producer = ClientConfig::new()
        .set("bootstrap.servers", &settings.brokers)
        .set("message.timeout.ms", "5000")
        .set("acks", "1")
        .create()
        .map_err(|e| InfraError::Bus(format!("failed to create producer: {}", e)))?;
    info!(brokers = settings.brokers.as_str(), "Kafka producer created");
    Ok(producer)
}

/// Consumer for one inbound kind. Offsets reset to earliest on first
/// start so responses published before our first boot are not lost.
pub fn create_consumer(
    settings: &KafkaSettings,
    group_suffix: &str,
) -> Result<StreamConsumer, InfraError> {
    let group_id = format!("{}-{}", settings.group_base, group_suffix);
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &settings.brokers)
        .set("group.id", &group_id)
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "true")
        .set("session.timeout.ms", "6000")
        .set("enable.partition.eof", "false")
        .create()
        .map_err(|e| InfraError::Bus(format!("failed to create consumer {}: {}", group_id, e)))?;
    info!(group_id = group_id.as_str(), "Kafka consumer created");
    Ok(consumer)
}

pub fn subscribe(consumer: &StreamConsumer, topic: &str) -> Result<(), InfraError> {
    consumer
        .subscribe(&[topic])
        .map_err(|e| InfraError::Bus(format!("failed to subscribe to {}: {}", topic, e)))
}

/// rdkafka-backed implementation of the outbound port.
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaEventPublisher {
    pub fn new(producer: FutureProducer, timeout: Duration) -> Self {
        Self { producer, timeout }
    }
}

#[async_trait::async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: OutboundEvent) -> Result<(), InfraError> {
        let topic = event.topic();
        let key = event.key().to_string();
        let type_name = event.type_name();
        let payload = event.payload_json()?;

        let record = FutureRecord::to(topic)
            .key(&key)
            .payload(&payload)
            .headers(OwnedHeaders::new().insert(Header {
                key: "type",
                value: Some(type_name),
            }));

        match self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
        {
            Ok((partition, offset)) => {
                debug!(topic, key = key.as_str(), type_name, partition, offset, "Published");
                metrics::counter!("bus_messages_published_total", "topic" => topic).increment(1);
                Ok(())
            }
            Err((kafka_error, _)) => {
                error!(topic, key = key.as_str(), error = %kafka_error, "Publish failed");
                Err(InfraError::Bus(kafka_error.to_string()))
            }
        }
    }
}
