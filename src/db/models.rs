use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Directory entry for a person who can sit an exam.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Candidate {
    pub(crate) id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    /// Opaque login credential provisioned by the account service.
    pub(crate) access_code: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: i64,
    pub(crate) exam_id: i64,
    pub(crate) section: String,
    pub(crate) question_type: String,
    pub(crate) question_text: String,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) answer: Option<String>,
    pub(crate) marks: i32,
    pub(crate) q_no: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// One shuffled ordering of an exam's question bank. The ordered ids live in
/// `question_set_items` and are loaded separately.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionSet {
    pub(crate) id: String,
    pub(crate) exam_id: i64,
    pub(crate) set_number: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) exam_id: i64,
    pub(crate) set_number: i32,
    pub(crate) slot_number: i32,
    pub(crate) assigned_at: PrimitiveDateTime,
    pub(crate) has_started: bool,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) has_completed: bool,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}
