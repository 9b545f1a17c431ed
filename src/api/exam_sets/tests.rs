use std::collections::HashSet;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::services::balancer;
use crate::test_support::{self, TestContext};

async fn send(
    ctx: &TestContext,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

fn ids_of(value: &Value) -> Vec<i64> {
    value.as_array().expect("id array").iter().map(|id| id.as_i64().expect("id")).collect()
}

async fn auto_assign(ctx: &TestContext, student_id: &str, exam_id: i64) -> Value {
    let (status, body) = send(
        ctx,
        Method::POST,
        "/api/v1/exam-sets/auto-assign",
        Some(json!({"student_id": student_id, "exam_id": exam_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    body
}

#[tokio::test]
async fn generate_builds_shuffled_sets_grouped_by_section() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Physics").await;
    // Section B is stored first so the grouping cannot rely on insertion order.
    let section_b = test_support::insert_questions(ctx.state.db(), exam.id, &["B"], 6).await;
    let section_a = test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 6).await;

    let (status, body) =
        send(&ctx, Method::POST, &format!("/api/v1/exam-sets/{}/generate", exam.id), None).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["total_questions"], 12);

    let sets = body["sets"].as_array().expect("sets");
    assert_eq!(sets.len(), 5);

    let a: HashSet<i64> = section_a.iter().copied().collect();
    let b: HashSet<i64> = section_b.iter().copied().collect();
    for (index, set) in sets.iter().enumerate() {
        assert_eq!(set["set_number"], index as i64 + 1);
        let ids = ids_of(&set["question_ids"]);
        assert_eq!(ids.len(), 12);
        assert_eq!(ids[..6].iter().copied().collect::<HashSet<_>>(), a);
        assert_eq!(ids[6..].iter().copied().collect::<HashSet<_>>(), b);
    }

    let (status, listed) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/sets", exam.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["has_question_sets"], true);
    assert_eq!(listed["total_sets"], 5);
    assert_eq!(listed["sets"][2]["question_ids"], sets[2]["question_ids"]);
}

#[tokio::test]
async fn generate_without_questions_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Empty").await;

    let (status, body) =
        send(&ctx, Method::POST, &format!("/api/v1/exam-sets/{}/generate", exam.id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["detail"].as_str().unwrap_or_default().contains("no questions"));

    let (status, body) = auto_assign_raw(&ctx, "cand-1", exam.id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
}

async fn auto_assign_raw(
    ctx: &TestContext,
    student_id: &str,
    exam_id: i64,
) -> (StatusCode, Value) {
    send(
        ctx,
        Method::POST,
        "/api/v1/exam-sets/auto-assign",
        Some(json!({"studentId": student_id, "examId": exam_id})),
    )
    .await
}

#[tokio::test]
async fn unknown_exam_returns_404() {
    let ctx = test_support::setup_test_context().await;

    let (status, body) = send(&ctx, Method::POST, "/api/v1/exam-sets/999/generate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = auto_assign_raw(&ctx, "cand-1", 999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_payload_returns_400_envelope() {
    let ctx = test_support::setup_test_context().await;

    let (status, body) = send(
        &ctx,
        Method::POST,
        "/api/v1/exam-sets/auto-assign",
        Some(json!({"student_id": "", "exam_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], 400);

    let (status, body) =
        send(&ctx, Method::POST, "/api/v1/exam-sets/assign", Some(json!({"exam_id": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn blank_student_id_is_rejected_without_writing() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Chemistry").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 3).await;

    let (status, body) = auto_assign_raw(&ctx, "   ", exam.id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &ctx,
        Method::POST,
        "/api/v1/exam-sets/assign",
        Some(json!({"student_id": " \t ", "exam_id": exam.id, "set_number": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exam_assignments")
        .fetch_one(ctx.state.db())
        .await
        .expect("count assignments");
    assert_eq!(total, 0);

    let (status, _) = send(
        &ctx,
        Method::GET,
        &format!("/api/v1/exam-sets/assignment?student_id=%20%20&exam_id={}", exam.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn padded_student_id_is_stored_and_found_trimmed() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Biology").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 3).await;

    let assigned = auto_assign(&ctx, " cand-9 ", exam.id).await;
    assert_eq!(assigned["assignment"]["student_id"], "cand-9");
    assert_eq!(test_support::count_assignments(ctx.state.db(), "cand-9", exam.id).await, 1);

    let again = auto_assign(&ctx, "cand-9", exam.id).await;
    assert_eq!(again["outcome"], "already_assigned");

    let (status, lookup) = send(
        &ctx,
        Method::GET,
        &format!("/api/v1/exam-sets/assignment?student_id=%20cand-9%20&exam_id={}", exam.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {lookup}");
    assert_eq!(lookup["assignment"]["student_id"], "cand-9");
}

#[tokio::test]
async fn auto_assign_generates_lazily_and_is_idempotent() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Chemistry").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A", "B"], 3).await;

    let (_, listed) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/sets", exam.id), None).await;
    assert_eq!(listed["has_question_sets"], false);

    let first = auto_assign(&ctx, "cand-1", exam.id).await;
    assert_eq!(first["outcome"], "created");
    assert_eq!(first["set_number"], 1);
    assert_eq!(first["slot_number"], 1);

    let second = auto_assign(&ctx, "cand-1", exam.id).await;
    assert_eq!(second["outcome"], "already_assigned");
    assert_eq!(second["set_number"], first["set_number"]);
    assert_eq!(second["slot_number"], first["slot_number"]);
    assert_eq!(second["assignment"]["id"], first["assignment"]["id"]);

    assert_eq!(test_support::count_assignments(ctx.state.db(), "cand-1", exam.id).await, 1);

    let (_, listed) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/sets", exam.id), None).await;
    assert_eq!(listed["total_sets"], 5);
}

#[tokio::test]
async fn auto_assign_balances_across_sets() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Biology").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 4).await;

    for index in 0..13 {
        let body = auto_assign(&ctx, &format!("cand-{index}"), exam.id).await;
        let expected_set = index % 5 + 1;
        let expected_slot = index / 5 + 1;
        assert_eq!(body["set_number"], expected_set, "candidate {index}");
        assert_eq!(body["slot_number"], expected_slot, "candidate {index}");
    }

    let (status, stats) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/stats", exam.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_sets"], 5);
    assert_eq!(stats["total_students_assigned"], 13);
    assert_eq!(stats["students_started"], 0);

    let counts: Vec<i64> = stats["set_distribution"]
        .as_array()
        .expect("distribution")
        .iter()
        .map(|entry| entry["assigned"].as_i64().expect("count"))
        .collect();
    assert_eq!(counts, vec![3, 3, 3, 2, 2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_auto_assign_writes_one_row() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Race").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A", "B"], 5).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = ctx.state.db().clone();
            let exam_id = exam.id;
            tokio::spawn(async move { balancer::auto_assign(&pool, "racer", exam_id, 5).await })
        })
        .collect();

    let mut placements = HashSet::new();
    for handle in handles {
        let result = handle.await.expect("join").expect("every caller succeeds");
        placements.insert((
            result.assignment.id,
            result.assignment.set_number,
            result.assignment.slot_number,
        ));
    }

    assert_eq!(placements.len(), 1, "callers saw different rows: {placements:?}");
    assert_eq!(test_support::count_assignments(ctx.state.db(), "racer", exam.id).await, 1);

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM question_sets WHERE exam_id = $1 AND is_active = TRUE",
    )
    .bind(exam.id)
    .fetch_one(ctx.state.db())
    .await
    .expect("count sets");
    assert_eq!(active, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_manual_reassignments_keep_one_row() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Manual race").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 4).await;
    auto_assign(&ctx, "mover", exam.id).await;

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let pool = ctx.state.db().clone();
            let exam_id = exam.id;
            let set_number = index % 5 + 1;
            tokio::spawn(async move {
                balancer::manual_assign(&pool, "mover", exam_id, set_number, 1).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("join").expect("every caller succeeds");
    }

    assert_eq!(test_support::count_assignments(ctx.state.db(), "mover", exam.id).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_auto_and_manual_assignment_keeps_one_row() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Mixed race").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 4).await;
    send(&ctx, Method::POST, &format!("/api/v1/exam-sets/{}/generate", exam.id), None).await;

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let pool = ctx.state.db().clone();
            let exam_id = exam.id;
            tokio::spawn(async move {
                if index % 2 == 0 {
                    balancer::auto_assign(&pool, "mixed", exam_id, 5).await
                } else {
                    balancer::manual_assign(&pool, "mixed", exam_id, 3, 1).await
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("join").expect("every caller succeeds");
    }

    assert_eq!(test_support::count_assignments(ctx.state.db(), "mixed", exam.id).await, 1);
}

#[tokio::test]
async fn manual_assign_replaces_previous_set() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "History").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 3).await;
    send(&ctx, Method::POST, &format!("/api/v1/exam-sets/{}/generate", exam.id), None).await;

    let assign = |set_number: i32, slot_number: i32| {
        json!({
            "student_id": "cand-7",
            "exam_id": exam.id,
            "set_number": set_number,
            "slot_number": slot_number
        })
    };

    let (status, first) =
        send(&ctx, Method::POST, "/api/v1/exam-sets/assign", Some(assign(2, 9))).await;
    assert_eq!(status, StatusCode::OK, "response: {first}");
    assert_eq!(first["outcome"], "created");
    assert_eq!(first["slot_number"], 9);

    let (_, again) = send(&ctx, Method::POST, "/api/v1/exam-sets/assign", Some(assign(2, 1))).await;
    assert_eq!(again["outcome"], "unchanged");
    assert_eq!(again["slot_number"], 9);

    let (status, moved) =
        send(&ctx, Method::POST, "/api/v1/exam-sets/assign", Some(assign(4, 1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["outcome"], "reassigned");
    assert_eq!(moved["previous_set_number"], 2);
    assert_eq!(moved["set_number"], 4);

    assert_eq!(test_support::count_assignments(ctx.state.db(), "cand-7", exam.id).await, 1);
    let (status, lookup) = send(
        &ctx,
        Method::GET,
        &format!("/api/v1/exam-sets/assignment?student_id=cand-7&exam_id={}", exam.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lookup["assignment"]["set_number"], 4);
}

#[tokio::test]
async fn manual_assign_to_missing_set_fails() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Geography").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 3).await;
    send(&ctx, Method::POST, &format!("/api/v1/exam-sets/{}/generate", exam.id), None).await;

    let (status, body) = send(
        &ctx,
        Method::POST,
        "/api/v1/exam-sets/assign",
        Some(json!({"student_id": "cand-1", "exam_id": exam.id, "set_number": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(test_support::count_assignments(ctx.state.db(), "cand-1", exam.id).await, 0);
}

#[tokio::test]
async fn assignment_lookup_reports_missing_assignment() {
    let ctx = test_support::setup_test_context().await;

    let (status, body) = send(
        &ctx,
        Method::GET,
        "/api/v1/exam-sets/assignment?student_id=nobody&exam_id=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, body) =
        send(&ctx, Method::GET, "/api/v1/exam-sets/assignment?student_id=nobody", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn regeneration_clears_assignments() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Algebra").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 4).await;

    auto_assign(&ctx, "cand-1", exam.id).await;
    auto_assign(&ctx, "cand-2", exam.id).await;

    let (status, body) =
        send(&ctx, Method::POST, &format!("/api/v1/exam-sets/{}/generate", exam.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared_assignments"], 2);

    let (_, stats) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/stats", exam.id), None).await;
    assert_eq!(stats["total_students_assigned"], 0);
    assert_eq!(stats["total_sets"], 5);
}

#[tokio::test]
async fn failed_regeneration_keeps_previous_sets() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Geometry").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 4).await;

    let (status, generated) =
        send(&ctx, Method::POST, &format!("/api/v1/exam-sets/{}/generate", exam.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let assigned = auto_assign(&ctx, "cand-1", exam.id).await;

    sqlx::query("DELETE FROM questions WHERE exam_id = $1")
        .bind(exam.id)
        .execute(ctx.state.db())
        .await
        .expect("delete questions");

    let (status, body) =
        send(&ctx, Method::POST, &format!("/api/v1/exam-sets/{}/generate", exam.id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");

    let (_, listed) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/sets", exam.id), None).await;
    let before: Vec<&Value> =
        generated["sets"].as_array().expect("sets").iter().map(|set| &set["id"]).collect();
    let after: Vec<&Value> =
        listed["sets"].as_array().expect("sets").iter().map(|set| &set["id"]).collect();
    assert_eq!(after.len(), 5);
    assert_eq!(after, before);

    let (status, lookup) = send(
        &ctx,
        Method::GET,
        &format!("/api/v1/exam-sets/assignment?student_id=cand-1&exam_id={}", exam.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lookup["assignment"]["id"], assigned["assignment"]["id"]);
}

#[tokio::test]
async fn set_details_and_validation_track_question_bank() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Literature").await;
    let ids = test_support::insert_questions(ctx.state.db(), exam.id, &["A", "B"], 2).await;
    auto_assign(&ctx, "cand-1", exam.id).await;

    let (status, details) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/sets/1", exam.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["question_count"], 4);
    assert_eq!(details["student_count"], 1);

    let (status, _) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/sets/9", exam.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/exam-sets/{}/validate", exam.id);
    let (_, report) = send(&ctx, Method::GET, &uri, None).await;
    assert_eq!(report["all_sets_valid"], true);

    test_support::delete_question(ctx.state.db(), ids[1]).await;

    let (status, report) = send(&ctx, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["all_sets_valid"], false);
    for set in report["sets"].as_array().expect("sets") {
        assert_eq!(set["is_valid"], false);
        assert_eq!(ids_of(&set["invalid_question_ids"]), vec![ids[1]]);
    }
}

#[tokio::test]
async fn delete_removes_sets_and_assignments() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Economics").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A"], 3).await;
    auto_assign(&ctx, "cand-1", exam.id).await;

    let uri = format!("/api/v1/exam-sets/{}", exam.id);
    let (status, body) = send(&ctx, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["deleted_count"], 5);
    assert_eq!(body["deleted_assignments"], 1);

    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM question_set_items")
        .fetch_one(ctx.state.db())
        .await
        .expect("count items");
    assert_eq!(items, 0);

    let (status, body) = send(&ctx, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_count"], 0);
    assert_eq!(body["message"], "No question sets found to delete");
}

#[tokio::test]
async fn enroll_assigns_and_notifies_candidates() {
    let ctx = test_support::setup_test_context().await;
    let exam = test_support::insert_exam(ctx.state.db(), "Statistics").await;
    test_support::insert_questions(ctx.state.db(), exam.id, &["A", "B"], 2).await;
    test_support::insert_candidate(ctx.state.db(), "cand-1", "one@example.com").await;
    test_support::insert_candidate(ctx.state.db(), "cand-2", "two@example.com").await;
    test_support::insert_candidate(ctx.state.db(), "cand-3", "").await;

    let (status, body) = send(
        &ctx,
        Method::POST,
        &format!("/api/v1/exam-sets/{}/enroll", exam.id),
        Some(json!({"student_ids": ["cand-1", "cand-2", "cand-1", "ghost", "cand-3"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let assigned: Vec<&str> = body["assigned"]
        .as_array()
        .expect("assigned")
        .iter()
        .map(|entry| entry["student_id"].as_str().expect("student id"))
        .collect();
    assert_eq!(assigned, vec!["cand-1", "cand-2", "cand-3"]);
    assert_eq!(body["failed"][0]["student_id"], "ghost");
    assert_eq!(body["failed"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["notification_failures"], 1);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].email, "one@example.com");
    assert_eq!(sent[0].access_code, "code-cand-1");
    assert_eq!(sent[0].exam_link, format!("http://localhost:3000/exam/{}", exam.id));
    assert_eq!(sent[1].set_number, 2);

    let (_, stats) =
        send(&ctx, Method::GET, &format!("/api/v1/exam-sets/{}/stats", exam.id), None).await;
    assert_eq!(stats["total_students_assigned"], 3);
}
