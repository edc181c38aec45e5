//! Domain event publishing.

use async_trait::async_trait;

use crate::domain::events::DomainEvent;

/// Subject prefix for every published event.
pub const SUBJECT_PREFIX: &str = "commerce";

/// Sink for domain events. Delivery is best effort: implementations log
/// failures instead of returning them.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent);

    async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in &events {
            self.publish(event).await;
        }
    }
}

/// Publishes JSON-encoded events to `commerce.<aggregate>.<kind>`.
#[derive(Clone, Debug)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }

    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        Ok(Self::new(async_nats::connect(url).await?))
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &DomainEvent) {
        let subject = format!("{SUBJECT_PREFIX}.{}", event.subject());
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, %subject, "failed to encode event");
                return;
            }
        };
        if let Err(e) = self.client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(error = %e, %subject, "failed to publish event");
        }
    }
}

/// Writes events to the log only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &DomainEvent) {
        tracing::debug!(subject = %event.subject(), ?event, "domain event");
    }
}
