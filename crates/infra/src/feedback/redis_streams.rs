//! Redis Streams feedback transport.
//!
//! ## Mapping
//!
//! - **Topic**: a stream key; it "has a partition" once the key exists as a stream
//! - **Controller**: first configured node whose `ROLE` is `master`
//! - **Create**: `XGROUP CREATE <topic> <client_id> $ MKSTREAM` (`BUSYGROUP` = already exists)
//! - **Send**: `XADD <topic> NOMKSTREAM * key <key> payload <payload>` (nil reply = unknown topic)
//!
//! Every connection is opened and used under [`DEFAULT_IO_TIMEOUT`]; an expired
//! timeout surfaces as [`TransportError::Connection`].

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::transport::{BrokerNode, FeedbackTransport, TopicSpec, TransportError};

/// Bound on connecting to a node and on each read or write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct Node {
    broker: BrokerNode,
    client: redis::Client,
}

/// Transport over one or more Redis nodes.
///
/// Sends reuse one cached connection to the first node; the connection is
/// dropped and reopened after an IO failure.
pub struct RedisStreamsTransport {
    nodes: Vec<Node>,
    client_id: String,
    io_timeout: Duration,
    producer: Mutex<Option<redis::Connection>>,
}

impl std::fmt::Debug for RedisStreamsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamsTransport")
            .field("nodes", &self.nodes)
            .field("client_id", &self.client_id)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStreamsTransport {
    /// Build clients for every broker URL. No connection is opened yet.
    pub fn new(brokers: &[String], client_id: impl Into<String>) -> Result<Self, TransportError> {
        if brokers.is_empty() {
            return Err(TransportError::NoBrokers);
        }

        let nodes = brokers
            .iter()
            .map(|address| {
                let client = redis::Client::open(address.as_str())
                    .map_err(|e| TransportError::Connection(format!("{}: {}", address, e)))?;
                Ok(Node {
                    broker: BrokerNode::new(address.clone()),
                    client,
                })
            })
            .collect::<Result<Vec<_>, TransportError>>()?;

        Ok(Self {
            nodes,
            client_id: client_id.into(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            producer: Mutex::new(None),
        })
    }

    /// Zero is raised to one millisecond.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn brokers(&self) -> impl Iterator<Item = &BrokerNode> {
        self.nodes.iter().map(|n| &n.broker)
    }

    fn connect(&self, node: &Node) -> redis::RedisResult<redis::Connection> {
        let conn = node.client.get_connection_with_timeout(self.io_timeout)?;
        conn.set_read_timeout(Some(self.io_timeout))?;
        conn.set_write_timeout(Some(self.io_timeout))?;
        Ok(conn)
    }

    fn lock_producer(&self) -> Result<MutexGuard<'_, Option<redis::Connection>>, TransportError> {
        self.producer
            .lock()
            .map_err(|_| TransportError::Connection("producer connection lock poisoned".to_string()))
    }

    /// Run `f` on the cached producer connection, opening it if needed.
    fn with_producer<R>(
        &self,
        f: impl FnOnce(&mut redis::Connection) -> redis::RedisResult<R>,
    ) -> Result<R, TransportError> {
        let mut guard = self.lock_producer()?;

        if guard.is_none() {
            let conn = self.connect(&self.nodes[0]).map_err(map_redis_error)?;
            *guard = Some(conn);
        }

        let Some(conn) = guard.as_mut() else {
            return Err(TransportError::Connection("producer connection missing".to_string()));
        };

        match f(conn) {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connection_failure(&e) {
                    warn!(error = %e, "dropping feedback producer connection");
                    *guard = None;
                }
                Err(map_redis_error(e))
            }
        }
    }

    fn node_for(&self, broker: &BrokerNode) -> Option<&Node> {
        self.nodes.iter().find(|n| n.broker == *broker)
    }
}

impl FeedbackTransport for RedisStreamsTransport {
    fn topic_partitions(&self, topic: &str) -> Result<u32, TransportError> {
        let kind: String = self.with_producer(|conn| redis::cmd("TYPE").arg(topic).query(conn))?;
        Ok(if kind == "stream" { 1 } else { 0 })
    }

    fn controller(&self) -> Result<BrokerNode, TransportError> {
        for node in &self.nodes {
            let mut conn = match self.connect(node) {
                Ok(conn) => conn,
                Err(e) => {
                    debug!(broker = %node.broker.address, error = %e, "broker unreachable");
                    continue;
                }
            };

            let role: Vec<redis::Value> = match redis::cmd("ROLE").query(&mut conn) {
                Ok(role) => role,
                Err(e) => {
                    debug!(broker = %node.broker.address, error = %e, "ROLE failed");
                    continue;
                }
            };

            let is_master = role
                .first()
                .and_then(|v| redis::from_redis_value::<String>(v).ok())
                .is_some_and(|r| r == "master");
            if is_master {
                return Ok(node.broker.clone());
            }
        }
        Err(TransportError::NoController)
    }

    #[instrument(skip(self, controller), fields(controller = %controller.address))]
    fn create_topic(&self, controller: &BrokerNode, spec: &TopicSpec) -> Result<(), TransportError> {
        let node = self.node_for(controller).ok_or(TransportError::NoController)?;
        let mut conn = self.connect(node).map_err(map_redis_error)?;

        // Streams have no partitions or replicas of their own; one stream is one partition.
        let result: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&spec.name)
            .arg(&self.client_id)
            .arg("$")
            .arg("MKSTREAM")
            .query(&mut conn);

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => {
                Err(TransportError::TopicAlreadyExists(spec.name.clone()))
            }
            Err(e) => Err(map_redis_error(e)),
        }
    }

    fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let id: Option<String> = self.with_producer(|conn| {
            redis::cmd("XADD")
                .arg(topic)
                .arg("NOMKSTREAM")
                .arg("*")
                .arg("key")
                .arg(key)
                .arg("payload")
                .arg(payload)
                .query(conn)
        })?;

        match id {
            Some(_) => Ok(()),
            None => Err(TransportError::UnknownTopicOrPartition(topic.to_string())),
        }
    }
}

fn is_connection_failure(err: &redis::RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
}

fn map_redis_error(err: redis::RedisError) -> TransportError {
    if is_connection_failure(&err) {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Command(err.to_string())
    }
}
