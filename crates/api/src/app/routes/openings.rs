use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Multipart},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::{info, warn};

use opportunities_core::RequestId;
use opportunities_infra::intake::IngestionJob;
use opportunities_openings::validate_header;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Multipart field carrying the CSV document.
const FILE_FIELD: &str = "file";

pub fn router() -> Router {
    Router::new()
        .route("/csv", post(upload_csv))
        .route("/csv/stats", get(intake_stats))
}

/// Accept a CSV upload for asynchronous ingestion.
///
/// Only the header is checked here; rows are validated by the worker and the
/// result is reported on the feedback topic under the returned `request_id`.
pub async fn upload_csv(
    Extension(services): Extension<Arc<AppServices>>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let Some(queue) = &services.intake else {
        return errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "csv service unavailable",
        );
    };

    let content = match read_file_field(&mut multipart).await {
        Ok(Some(content)) => content,
        Ok(None) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "file_required", "file is required");
        }
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_multipart", msg),
    };

    if let Err(e) = validate_header(&content) {
        return errors::document_error_to_response(e);
    }

    let request_id = RequestId::new();
    let bytes = content.len();
    match queue.try_enqueue(IngestionJob::new(request_id, content)) {
        Ok(()) => {
            info!(request_id = %request_id, bytes, "csv upload accepted");
            (StatusCode::ACCEPTED, Json(dto::csv_accepted(request_id))).into_response()
        }
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "csv upload rejected");
            errors::enqueue_error_to_response(e)
        }
    }
}

pub async fn intake_stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match &services.stats {
        Some(stats) => Json(stats.snapshot()).into_response(),
        None => errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "csv service unavailable",
        ),
    }
}

/// Bytes of the `file` field, or `None` if the form has no such field.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Vec<u8>>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("multipart error: {e}"))?
    {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| format!("failed to read file: {e}"))?;
            return Ok(Some(bytes.to_vec()));
        }
    }
    Ok(None)
}
