use std::collections::HashSet;

use sqlx::PgPool;

use crate::db::models::Exam;
use crate::repositories;
use crate::services::balancer::{self, AssignmentResult};
use crate::services::errors::AllocationError;
use crate::services::notifications::{self, AssignmentNotice, AssignmentNotifier};
use crate::services::set_generator;

#[derive(Debug, Clone)]
pub(crate) struct EnrollmentFailure {
    pub(crate) student_id: String,
    pub(crate) reason: String,
}

#[derive(Debug, Clone)]
pub(crate) struct EnrollmentReport {
    pub(crate) exam_id: i64,
    pub(crate) assigned: Vec<AssignmentResult>,
    pub(crate) failed: Vec<EnrollmentFailure>,
    pub(crate) notification_failures: usize,
}

pub(crate) struct EnrollmentRequest<'a> {
    pub(crate) exam: &'a Exam,
    pub(crate) student_ids: &'a [String],
    pub(crate) set_count: i32,
    pub(crate) exam_link: String,
}

/// Trims ids, drops blanks and repeats, keeps first-seen order.
pub(crate) fn normalize_ids(student_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    student_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Auto-assigns every listed candidate and sends each one their exam link.
///
/// Only a missing question bank aborts the batch. Per-candidate failures are collected
/// and notification failures are counted; candidates who were already enrolled are
/// notified again.
pub(crate) async fn enroll_candidates(
    pool: &PgPool,
    notifier: &dyn AssignmentNotifier,
    request: EnrollmentRequest<'_>,
) -> Result<EnrollmentReport, AllocationError> {
    let exam_id = request.exam.id;
    set_generator::ensure_sets(pool, exam_id, request.set_count).await?;

    let mut report = EnrollmentReport {
        exam_id,
        assigned: Vec::new(),
        failed: Vec::new(),
        notification_failures: 0,
    };

    for student_id in normalize_ids(request.student_ids) {
        let candidate = match repositories::candidates::find_by_id(pool, &student_id).await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                report.failed.push(EnrollmentFailure {
                    student_id,
                    reason: "Candidate not found".to_string(),
                });
                continue;
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    student_id = %student_id,
                    exam_id,
                    "Candidate lookup failed"
                );
                report.failed.push(EnrollmentFailure { student_id, reason: err.to_string() });
                continue;
            }
        };

        let result =
            match balancer::auto_assign(pool, &candidate.id, exam_id, request.set_count).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        student_id = %student_id,
                        exam_id,
                        "Enrollment failed"
                    );
                    report.failed.push(EnrollmentFailure { student_id, reason: err.to_string() });
                    continue;
                }
            };

        let notice = AssignmentNotice {
            student_id: candidate.id,
            full_name: candidate.full_name,
            email: candidate.email,
            access_code: candidate.access_code,
            exam_id,
            exam_title: request.exam.title.clone(),
            exam_link: request.exam_link.clone(),
            set_number: result.assignment.set_number,
            slot_number: result.assignment.slot_number,
        };
        if !notifications::notify_best_effort(notifier, &notice).await {
            report.notification_failures += 1;
        }

        report.assigned.push(result);
    }

    tracing::info!(
        exam_id,
        assigned = report.assigned.len(),
        failed = report.failed.len(),
        notification_failures = report.notification_failures,
        "Bulk enrollment finished"
    );

    Ok(report)
}
