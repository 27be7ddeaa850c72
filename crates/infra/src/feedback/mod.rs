//! Feedback delivery: one outcome message per ingestion job.

pub mod in_memory;
pub mod publisher;
pub mod redis_streams;
pub mod retry;
pub mod transport;

pub use in_memory::{DeliveredMessage, InMemoryTransport};
pub use publisher::{FeedbackPublisher, PublishError, TopicFeedbackPublisher};
pub use redis_streams::RedisStreamsTransport;
pub use retry::RetryPolicy;
pub use transport::{BrokerNode, FeedbackTransport, TopicSpec, TransportError};
