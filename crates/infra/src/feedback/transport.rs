//! Broker-facing contract used by the feedback publisher.

use thiserror::Error;

/// A broker node, addressed by its connection URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerNode {
    pub address: String,
}

impl BrokerNode {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Topic to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u32,
}

impl TopicSpec {
    /// Single partition, replication factor one.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: 1,
            replication_factor: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("unknown topic or partition: {0}")]
    UnknownTopicOrPartition(String),

    #[error("topic already exists: {0}")]
    TopicAlreadyExists(String),

    #[error("no brokers configured")]
    NoBrokers,

    #[error("no controller broker available")]
    NoController,

    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("broker command error: {0}")]
    Command(String),
}

impl TransportError {
    /// Delivery failures worth retrying after the topic has been (re)provisioned.
    pub fn is_unknown_topic(&self) -> bool {
        matches!(self, TransportError::UnknownTopicOrPartition(_))
    }
}

/// Synchronous broker operations.
///
/// Called from the ingestion worker thread and from startup provisioning; never
/// from inside an async task.
pub trait FeedbackTransport: Send + Sync {
    /// Partition count of `topic`; zero when the topic does not exist.
    fn topic_partitions(&self, topic: &str) -> Result<u32, TransportError>;

    /// The node that accepts administrative requests.
    fn controller(&self) -> Result<BrokerNode, TransportError>;

    /// Create a topic through `controller`.
    fn create_topic(&self, controller: &BrokerNode, spec: &TopicSpec) -> Result<(), TransportError>;

    /// Write one keyed message to an existing topic.
    fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), TransportError>;
}
