use axum::Router;

pub mod openings;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new().nest("/openings", openings::router())
}
