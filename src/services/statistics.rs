use std::collections::HashMap;

use sqlx::PgPool;

use crate::repositories;
use crate::repositories::assignments::SetOccupancyRow;
use crate::services::errors::AllocationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SetLoad {
    pub(crate) set_number: i32,
    pub(crate) assigned: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct ExamStatistics {
    pub(crate) exam_id: i64,
    pub(crate) total_sets: i64,
    pub(crate) total_assigned: i64,
    pub(crate) started: i64,
    pub(crate) completed: i64,
    pub(crate) distribution: Vec<SetLoad>,
}

/// Every active set appears, with zero when nobody holds it.
pub(crate) fn distribution(active_sets: &[i32], occupancy: &[SetOccupancyRow]) -> Vec<SetLoad> {
    let counts: HashMap<i32, i64> =
        occupancy.iter().map(|row| (row.set_number, row.assigned)).collect();
    active_sets
        .iter()
        .map(|&set_number| SetLoad {
            set_number,
            assigned: counts.get(&set_number).copied().unwrap_or(0),
        })
        .collect()
}

pub(crate) async fn exam_statistics(
    pool: &PgPool,
    exam_id: i64,
) -> Result<ExamStatistics, AllocationError> {
    let active_sets = repositories::question_sets::list_active_numbers(pool, exam_id).await?;
    let occupancy = repositories::assignments::occupancy_by_set(pool, exam_id).await?;
    let totals = repositories::assignments::totals(pool, exam_id).await?;

    Ok(ExamStatistics {
        exam_id,
        total_sets: active_sets.len() as i64,
        total_assigned: totals.assigned,
        started: totals.started,
        completed: totals.completed,
        distribution: distribution(&active_sets, &occupancy),
    })
}
