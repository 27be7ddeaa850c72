//! Publishing ingestion outcomes to the feedback topic.

use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::intake::IngestionOutcome;

use super::retry::RetryPolicy;
use super::transport::{FeedbackTransport, TopicSpec, TransportError};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize feedback: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to deliver feedback: {0}")]
    Delivery(#[from] TransportError),
}

/// Sink for job outcomes.
pub trait FeedbackPublisher: Send + Sync {
    fn publish(&self, outcome: &IngestionOutcome) -> Result<(), PublishError>;
}

/// Publishes outcomes as JSON messages keyed by request id on one topic,
/// provisioning the topic when the broker does not know it.
#[derive(Debug)]
pub struct TopicFeedbackPublisher<T> {
    transport: T,
    topic: String,
    delivery: RetryPolicy,
    provisioning: RetryPolicy,
}

impl<T: FeedbackTransport> TopicFeedbackPublisher<T> {
    pub fn new(transport: T, topic: impl Into<String>) -> Self {
        Self {
            transport,
            topic: topic.into(),
            delivery: RetryPolicy::delivery(),
            provisioning: RetryPolicy::provisioning(),
        }
    }

    pub fn with_delivery_policy(mut self, policy: RetryPolicy) -> Self {
        self.delivery = policy;
        self
    }

    pub fn with_provisioning_policy(mut self, policy: RetryPolicy) -> Self {
        self.provisioning = policy;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Make sure the topic exists; a concurrent creation counts as success.
    pub fn ensure_topic(&self) -> Result<(), TransportError> {
        match self.transport.topic_partitions(&self.topic) {
            Ok(partitions) if partitions > 0 => return Ok(()),
            Ok(_) => {}
            Err(e) => debug!(topic = %self.topic, error = %e, "could not read topic partitions"),
        }

        let controller = self.transport.controller()?;
        match self
            .transport
            .create_topic(&controller, &TopicSpec::single(self.topic.clone()))
        {
            Ok(()) => {
                info!(topic = %self.topic, controller = %controller.address, "feedback topic created");
                Ok(())
            }
            Err(TransportError::TopicAlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Best-effort provisioning before the first publish.
    ///
    /// Never fails: an unresolved topic is logged and left to delivery-time
    /// provisioning. Returns whether the topic is known to exist.
    pub fn provision_on_startup(&self) -> bool {
        let mut attempt = 1;
        loop {
            match self.ensure_topic() {
                Ok(()) => return true,
                Err(e) if self.provisioning.should_retry(attempt) => {
                    debug!(topic = %self.topic, attempt, error = %e, "feedback topic not ready; retrying");
                    thread::sleep(self.provisioning.delay);
                    attempt += 1;
                }
                Err(e) => {
                    warn!(topic = %self.topic, attempts = attempt, error = %e, "feedback topic ensure failed");
                    return false;
                }
            }
        }
    }
}

impl<T: FeedbackTransport> FeedbackPublisher for TopicFeedbackPublisher<T> {
    fn publish(&self, outcome: &IngestionOutcome) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(outcome)?;
        let key = outcome.request_id.to_string();

        let mut attempt = 1;
        loop {
            match self.transport.send(&self.topic, &key, &payload) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_unknown_topic() && self.delivery.should_retry(attempt) => {
                    warn!(topic = %self.topic, request_id = %key, attempt, "feedback topic unknown; provisioning");
                    if let Err(ensure_err) = self.ensure_topic() {
                        debug!(error = %ensure_err, "feedback topic ensure failed");
                    }
                    thread::sleep(self.delivery.delay);
                    attempt += 1;
                }
                Err(e) => return Err(PublishError::Delivery(e)),
            }
        }
    }
}
