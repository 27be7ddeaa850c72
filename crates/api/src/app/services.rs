use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use opportunities_infra::config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES, FeedbackConfig};
use opportunities_infra::feedback::{FeedbackPublisher, RedisStreamsTransport, TopicFeedbackPublisher};
use opportunities_infra::intake::{
    IngestionWorker, IntakeQueue, IntakeStatsHandle, WorkerHandle, intake_queue,
};
use opportunities_infra::store::{InMemoryOpeningStore, OpeningStore, PostgresOpeningStore};
use opportunities_openings::CsvBatchParser;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppServices {
    /// `None` when CSV intake is not wired (uploads answer 503).
    pub intake: Option<IntakeQueue>,
    pub stats: Option<IntakeStatsHandle>,
    pub max_upload_bytes: usize,
}

impl AppServices {
    pub fn new(intake: IntakeQueue, stats: IntakeStatsHandle) -> Self {
        Self {
            intake: Some(intake),
            stats: Some(stats),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            intake: None,
            stats: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Wire store, publisher and worker from configuration.
///
/// Must run inside a Tokio runtime. Only store failures are fatal; a feedback
/// broker that cannot be set up leaves the worker without a publisher.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<(AppServices, WorkerHandle)> {
    let publisher = build_publisher(&config.feedback).await;
    let parser = CsvBatchParser::new(config.intake.chunk_size);
    let capacity = config.intake.queue_capacity;

    let (services, worker) = match &config.store.database_url {
        Some(url) => {
            let store = PostgresOpeningStore::connect(url, config.store.max_connections)
                .await
                .context("failed to connect to postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to prepare openings schema")?;
            info!("using postgres opening store");
            spawn_intake(store, parser, publisher, capacity)?
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory opening store");
            spawn_intake(InMemoryOpeningStore::arc(), parser, publisher, capacity)?
        }
    };

    Ok((services.with_max_upload_bytes(config.server.max_upload_bytes), worker))
}

/// Create the intake queue and start its worker on the current runtime.
pub fn spawn_intake<S>(
    store: S,
    parser: CsvBatchParser,
    publisher: Option<Arc<dyn FeedbackPublisher>>,
    queue_capacity: usize,
) -> anyhow::Result<(AppServices, WorkerHandle)>
where
    S: OpeningStore + 'static,
{
    info!(
        queue_capacity,
        chunk_size = parser.chunk_size(),
        "starting csv ingestion worker"
    );
    let (queue, receiver) = intake_queue(queue_capacity);

    let mut worker = IngestionWorker::new(store, parser);
    if let Some(publisher) = publisher {
        worker = worker.with_publisher(publisher);
    }
    let stats = worker.stats_handle();

    let handle = worker
        .spawn(receiver, Handle::current())
        .context("failed to spawn ingestion worker")?;

    Ok((AppServices::new(queue, stats), handle))
}

async fn build_publisher(config: &FeedbackConfig) -> Option<Arc<dyn FeedbackPublisher>> {
    if !config.enabled {
        info!("feedback publishing disabled");
        return None;
    }

    let transport = match RedisStreamsTransport::new(&config.brokers, config.client_id.clone()) {
        Ok(transport) => transport,
        Err(e) => {
            error!(error = %e, "feedback transport unavailable; outcomes will be dropped");
            return None;
        }
    };

    let brokers: Vec<&str> = transport.brokers().map(|b| b.address.as_str()).collect();
    info!(brokers = ?brokers, topic = %config.topic, "feedback transport configured");

    let publisher = Arc::new(TopicFeedbackPublisher::new(transport, config.topic.clone()));

    let provisioner = publisher.clone();
    match tokio::task::spawn_blocking(move || provisioner.provision_on_startup()).await {
        Ok(true) => info!(topic = %config.topic, "feedback topic ready"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "feedback topic provisioning task failed"),
    }

    Some(publisher as Arc<dyn FeedbackPublisher>)
}
