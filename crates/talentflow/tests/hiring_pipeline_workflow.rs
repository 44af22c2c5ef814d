//! End-to-end scenarios through the HTTP router: posting jobs, moving candidates through the
//! pipeline, building and submitting assessments, and reading analytics.

mod common {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use talentflow::mock_api::{hiring_router, ChaosConfig, MockApi};
    use talentflow::store::LocalStore;

    pub(super) fn build_router() -> (Router, Arc<LocalStore>) {
        let store = Arc::new(LocalStore::in_memory());
        let api = Arc::new(MockApi::new(store.clone(), ChaosConfig::calm()));
        (hiring_router(api), store)
    }

    pub(super) async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&body).expect("serialize body"),
                )),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json")
        };
        (status, payload)
    }
}

use axum::http::StatusCode;
use serde_json::json;

use common::{build_router, send};

fn assessment_body() -> serde_json::Value {
    json!({
        "title": "Backend screening",
        "sections": [
            {
                "id": "basics",
                "title": "Basics",
                "questions": [
                    {
                        "id": "language",
                        "prompt": "Primary language?",
                        "required": true,
                        "kind": "single_choice",
                        "options": ["Rust", "Go", "Java"],
                        "correct": "Rust"
                    },
                    {
                        "id": "unsafe",
                        "prompt": "Have you written unsafe code?",
                        "required": true,
                        "kind": "single_choice",
                        "options": ["Yes", "No"]
                    },
                    {
                        "id": "unsafe_story",
                        "prompt": "Tell us about it",
                        "required": true,
                        "kind": "long_text",
                        "validation": { "min_length": 10 },
                        "show_if": { "question_id": "unsafe", "equals": "Yes" }
                    },
                    {
                        "id": "traits",
                        "prompt": "Which traits are auto traits?",
                        "required": true,
                        "kind": "multi_choice",
                        "options": ["Send", "Sync", "Clone", "Debug"],
                        "correct": ["Send", "Sync"]
                    },
                    {
                        "id": "years",
                        "prompt": "Years of experience",
                        "kind": "numeric",
                        "validation": { "min": 0, "max": 50 }
                    },
                    {
                        "id": "cv",
                        "prompt": "Resume",
                        "kind": "file_upload"
                    }
                ]
            }
        ]
    })
}

#[tokio::test]
async fn candidate_moves_through_the_pipeline() {
    let (router, _) = build_router();

    let (status, job) = send(
        &router,
        "POST",
        "/api/jobs",
        Some(json!({ "title": "Backend Engineer", "tags": ["rust", "postgres"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = job["id"].as_str().expect("job id").to_string();

    let (status, candidate) = send(
        &router,
        "POST",
        "/api/candidates",
        Some(json!({
            "name": "Ada Lovelace",
            "email": "Ada@Example.com",
            "job_id": job_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(candidate["email"], "ada@example.com");
    assert_eq!(candidate["stage"], "applied");
    let candidate_id = candidate["id"].as_str().expect("candidate id").to_string();

    for stage in ["screen", "offer"] {
        let (status, _) = send(
            &router,
            "PATCH",
            &format!("/api/candidates/{candidate_id}"),
            Some(json!({ "stage": stage })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(
        &router,
        "PATCH",
        &format!("/api/candidates/{candidate_id}"),
        Some(json!({ "stage": "tech" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "backwards moves are refused");

    let (status, timeline) = send(
        &router,
        "GET",
        &format!("/api/candidates/{candidate_id}/timeline"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = timeline
        .as_array()
        .expect("timeline array")
        .iter()
        .filter_map(|event| event["type"].as_str())
        .collect();
    assert_eq!(kinds, vec!["created", "stage_changed", "stage_changed"]);

    let (status, page) = send(&router, "GET", "/api/candidates?stage=offer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn assessment_submission_is_scored_and_counted() {
    let (router, _) = build_router();

    let (_, job) = send(
        &router,
        "POST",
        "/api/jobs",
        Some(json!({ "title": "Backend Engineer" })),
    )
    .await;
    let job_id = job["id"].as_str().expect("job id").to_string();
    let (_, candidate) = send(
        &router,
        "POST",
        "/api/candidates",
        Some(json!({
            "name": "Grace Hopper",
            "email": "grace@example.com",
            "job_id": job_id,
        })),
    )
    .await;
    let candidate_id = candidate["id"].as_str().expect("candidate id").to_string();

    let (status, assessment) = send(
        &router,
        "PUT",
        &format!("/api/assessments/{job_id}"),
        Some(assessment_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assessment["sections"][0]["questions"].as_array().map(Vec::len), Some(6));

    let (status, error) = send(
        &router,
        "POST",
        &format!("/api/assessments/{job_id}/submit"),
        Some(json!({
            "candidate_id": candidate_id,
            "answers": {
                "language": { "type": "choice", "value": "Rust" },
                "unsafe": { "type": "choice", "value": "Yes" },
                "traits": { "type": "choices", "value": ["Send", "Sync"] }
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["fields"][0]["field"], "answers.unsafe_story");

    let (status, submission) = send(
        &router,
        "POST",
        &format!("/api/assessments/{job_id}/submit"),
        Some(json!({
            "candidate_id": candidate_id,
            "answers": {
                "language": { "type": "choice", "value": "Rust" },
                "unsafe": { "type": "choice", "value": "No" },
                "unsafe_story": { "type": "text", "value": "hidden answers are dropped" },
                "traits": { "type": "choices", "value": ["Send", "Clone"] },
                "years": { "type": "number", "value": 7 }
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(submission["score"], 50);
    assert!(submission["answers"].get("unsafe_story").is_none());

    let (status, dashboard) = send(&router, "GET", "/api/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["assessments"]["submissions"], 1);
    assert_eq!(dashboard["assessments"]["candidates_assessed"], 1);
    assert_eq!(dashboard["assessments"]["average_score"], 50.0);
}

#[tokio::test]
async fn job_board_reorders_densely() {
    let (router, store) = build_router();
    for title in ["Alpha", "Bravo", "Charlie", "Delta"] {
        let (status, _) = send(&router, "POST", "/api/jobs", Some(json!({ "title": title }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let delta = store.find_job_by_slug("delta").expect("delta exists");

    let (status, moved) = send(
        &router,
        "PATCH",
        &format!("/api/jobs/{}/reorder", delta.id),
        Some(json!({ "from_order": 4, "to_order": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["order"], 2);

    let (_, page) = send(&router, "GET", "/api/jobs?sort=order", None).await;
    let titles: Vec<&str> = page["data"]
        .as_array()
        .expect("jobs")
        .iter()
        .filter_map(|job| job["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Delta", "Bravo", "Charlie"]);

    let (status, _) = send(
        &router,
        "POST",
        "/api/jobs",
        Some(json!({ "title": "alpha" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "slugs are unique");
}
