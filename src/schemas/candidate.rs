use serde::Serialize;

use crate::db::models::Question;
use crate::schemas::exam_set::AssignmentResponse;

/// A question as shown to the candidate: the answer key never leaves the service.
#[derive(Debug, Serialize)]
pub(crate) struct PublicQuestion {
    pub(crate) id: i64,
    pub(crate) section: String,
    pub(crate) question_type: String,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    pub(crate) marks: i32,
    pub(crate) q_no: Option<i32>,
}

impl From<Question> for PublicQuestion {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            section: question.section,
            question_type: question.question_type,
            question_text: question.question_text,
            options: question.options.0,
            marks: question.marks,
            q_no: question.q_no,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CandidateQuestionsResponse {
    pub(crate) success: bool,
    pub(crate) student_id: String,
    pub(crate) exam_id: i64,
    pub(crate) set_number: i32,
    pub(crate) slot_number: i32,
    pub(crate) total_questions: usize,
    pub(crate) total_marks: i64,
    pub(crate) questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessResponse {
    pub(crate) success: bool,
    pub(crate) can_access: bool,
    pub(crate) reason: Option<String>,
    pub(crate) set_number: Option<i32>,
    pub(crate) has_started: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct LifecycleResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) assignment: AssignmentResponse,
}
