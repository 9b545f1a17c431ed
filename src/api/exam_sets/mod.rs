mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/auto-assign", post(handlers::auto_assign))
        .route("/assign", post(handlers::manual_assign))
        .route("/assignment", get(handlers::get_assignment))
        .route("/:exam_id", delete(handlers::delete_sets))
        .route("/:exam_id/generate", post(handlers::generate_sets))
        .route("/:exam_id/sets", get(handlers::list_sets))
        .route("/:exam_id/sets/:set_number", get(handlers::get_set_details))
        .route("/:exam_id/validate", get(handlers::validate_sets))
        .route("/:exam_id/stats", get(handlers::get_statistics))
        .route("/:exam_id/enroll", post(handlers::enroll_candidates))
}

#[cfg(test)]
mod tests;
