//! In-memory feedback transport for tests/dev.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::intake::IngestionOutcome;

use super::transport::{BrokerNode, FeedbackTransport, TopicSpec, TransportError};

/// A message accepted by the in-memory broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

impl DeliveredMessage {
    pub fn outcome(&self) -> Result<IngestionOutcome, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[derive(Debug, Default)]
struct State {
    topics: HashMap<String, u32>,
    delivered: Vec<DeliveredMessage>,
    send_failures: VecDeque<TransportError>,
    refused_creates: u32,
    create_calls: u32,
    send_calls: u32,
}

/// Broker double.
///
/// - Sends to a missing topic fail with `UnknownTopicOrPartition`
/// - Upcoming sends and creations can be scripted to fail
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    state: Mutex<State>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic(self, topic: impl Into<String>) -> Self {
        self.lock().topics.insert(topic.into(), 1);
        self
    }

    /// Fail the next `times` sends with `error`, before any topic check.
    pub fn fail_next_sends(&self, error: TransportError, times: usize) {
        let mut state = self.lock();
        for _ in 0..times {
            state.send_failures.push_back(error.clone());
        }
    }

    /// Refuse the next `times` topic creations with a connection error.
    pub fn refuse_next_creates(&self, times: u32) {
        self.lock().refused_creates += times;
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.lock().topics.contains_key(topic)
    }

    pub fn delivered(&self) -> Vec<DeliveredMessage> {
        self.lock().delivered.clone()
    }

    /// Delivered payloads decoded as outcomes; undecodable payloads are skipped.
    pub fn outcomes(&self) -> Vec<IngestionOutcome> {
        self.delivered()
            .iter()
            .filter_map(|m| m.outcome().ok())
            .collect()
    }

    pub fn create_calls(&self) -> u32 {
        self.lock().create_calls
    }

    pub fn send_calls(&self) -> u32 {
        self.lock().send_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FeedbackTransport for InMemoryTransport {
    fn topic_partitions(&self, topic: &str) -> Result<u32, TransportError> {
        Ok(self.lock().topics.get(topic).copied().unwrap_or(0))
    }

    fn controller(&self) -> Result<BrokerNode, TransportError> {
        Ok(BrokerNode::new("memory://controller"))
    }

    fn create_topic(&self, _controller: &BrokerNode, spec: &TopicSpec) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.create_calls += 1;

        if state.refused_creates > 0 {
            state.refused_creates -= 1;
            return Err(TransportError::Connection("controller unavailable".to_string()));
        }
        if state.topics.contains_key(&spec.name) {
            return Err(TransportError::TopicAlreadyExists(spec.name.clone()));
        }
        state.topics.insert(spec.name.clone(), spec.partitions);
        Ok(())
    }

    fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.send_calls += 1;

        if let Some(err) = state.send_failures.pop_front() {
            return Err(err);
        }
        if !state.topics.contains_key(topic) {
            return Err(TransportError::UnknownTopicOrPartition(topic.to_string()));
        }
        state.delivered.push(DeliveredMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
