mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:student_id/exams/:exam_id/questions", get(handlers::get_questions))
        .route("/:student_id/exams/:exam_id/assignment", get(handlers::get_assignment))
        .route("/:student_id/exams/:exam_id/can-access", get(handlers::can_access))
        .route("/:student_id/exams/:exam_id/start", post(handlers::start_exam))
        .route("/:student_id/exams/:exam_id/complete", post(handlers::complete_exam))
}
