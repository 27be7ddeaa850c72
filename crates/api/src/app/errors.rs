use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use opportunities_infra::intake::EnqueueError;
use opportunities_openings::DocumentError;

pub fn enqueue_error_to_response(err: EnqueueError) -> axum::response::Response {
    match err {
        EnqueueError::QueueFull => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "queue_full", err.to_string())
        }
        EnqueueError::Unavailable => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "worker_unavailable", err.to_string())
        }
    }
}

pub fn document_error_to_response(err: DocumentError) -> axum::response::Response {
    let code = match err {
        DocumentError::Malformed(_) => "invalid_csv_format",
        DocumentError::Empty => "empty_csv",
        DocumentError::InvalidHeader => "invalid_csv_header",
    };
    json_error(StatusCode::BAD_REQUEST, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
