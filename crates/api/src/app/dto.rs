use serde::Serialize;

use opportunities_core::RequestId;

// -------------------------
// Response DTOs
// -------------------------

/// `{"message": ..., "data": ...}` envelope for successful responses.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct CsvAccepted {
    pub request_id: RequestId,
    pub status: &'static str,
}

pub fn csv_accepted(request_id: RequestId) -> Envelope<CsvAccepted> {
    Envelope {
        message: "openingCsvAccepted",
        data: CsvAccepted {
            request_id,
            status: "accepted",
        },
    }
}
