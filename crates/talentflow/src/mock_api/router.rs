use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use super::{ApiError, MockApi};
use crate::pipeline::{
    AssessmentDraft, CandidateDraft, CandidateId, CandidatePatch, CandidateQuery, JobDraft, JobId,
    JobPatch, JobQuery, NoteDraft, ReorderRequest, SubmissionDraft,
};
use crate::store::StoreError;

/// JSON routes of the simulated hiring backend.
pub fn hiring_router(api: Arc<MockApi>) -> Router {
    Router::new()
        .route("/api/jobs", get(list_jobs_handler).post(create_job_handler))
        .route(
            "/api/jobs/:job_id",
            get(get_job_handler).patch(update_job_handler),
        )
        .route("/api/jobs/:job_id/reorder", patch(reorder_job_handler))
        .route(
            "/api/candidates",
            get(list_candidates_handler).post(create_candidate_handler),
        )
        .route(
            "/api/candidates/:candidate_id",
            get(get_candidate_handler).patch(update_candidate_handler),
        )
        .route(
            "/api/candidates/:candidate_id/timeline",
            get(timeline_handler),
        )
        .route("/api/candidates/:candidate_id/notes", post(add_note_handler))
        .route(
            "/api/assessments/:job_id",
            get(get_assessment_handler).put(save_assessment_handler),
        )
        .route(
            "/api/assessments/:job_id/submit",
            post(submit_assessment_handler),
        )
        .route(
            "/api/assessments/:job_id/submissions",
            get(list_submissions_handler),
        )
        .route("/api/analytics", get(analytics_handler))
        .with_state(api)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, payload) = match &self {
            ApiError::Unavailable { operation } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "simulated server error",
                    "operation": operation,
                }),
            ),
            ApiError::Store(StoreError::NotFound { kind, id }) => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": self.to_string(),
                    "kind": kind,
                    "id": id,
                }),
            ),
            ApiError::Store(StoreError::Conflict(message)) => (
                StatusCode::CONFLICT,
                json!({ "error": message }),
            ),
            ApiError::Store(StoreError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "validation failed",
                    "fields": errors.fields,
                }),
            ),
            ApiError::Store(StoreError::InvalidTransition { from, to }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": self.to_string(),
                    "from": from,
                    "to": to,
                }),
            ),
            ApiError::Store(StoreError::Snapshot(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
        };
        (status, Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ApiError>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn list_jobs_handler(
    State(api): State<Arc<MockApi>>,
    Query(query): Query<JobQuery>,
) -> Response {
    respond(StatusCode::OK, api.list_jobs(&query).await)
}

async fn create_job_handler(
    State(api): State<Arc<MockApi>>,
    Json(draft): Json<JobDraft>,
) -> Response {
    respond(StatusCode::CREATED, api.create_job(draft).await)
}

async fn get_job_handler(
    State(api): State<Arc<MockApi>>,
    Path(job_id): Path<String>,
) -> Response {
    respond(StatusCode::OK, api.get_job(&JobId(job_id)).await)
}

async fn update_job_handler(
    State(api): State<Arc<MockApi>>,
    Path(job_id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> Response {
    respond(StatusCode::OK, api.update_job(&JobId(job_id), patch).await)
}

async fn reorder_job_handler(
    State(api): State<Arc<MockApi>>,
    Path(job_id): Path<String>,
    Json(request): Json<ReorderRequest>,
) -> Response {
    respond(
        StatusCode::OK,
        api.reorder_job(&JobId(job_id), request).await,
    )
}

async fn list_candidates_handler(
    State(api): State<Arc<MockApi>>,
    Query(query): Query<CandidateQuery>,
) -> Response {
    respond(StatusCode::OK, api.list_candidates(&query).await)
}

async fn create_candidate_handler(
    State(api): State<Arc<MockApi>>,
    Json(draft): Json<CandidateDraft>,
) -> Response {
    respond(StatusCode::CREATED, api.create_candidate(draft).await)
}

async fn get_candidate_handler(
    State(api): State<Arc<MockApi>>,
    Path(candidate_id): Path<String>,
) -> Response {
    respond(
        StatusCode::OK,
        api.get_candidate(&CandidateId(candidate_id)).await,
    )
}

async fn update_candidate_handler(
    State(api): State<Arc<MockApi>>,
    Path(candidate_id): Path<String>,
    Json(patch): Json<CandidatePatch>,
) -> Response {
    respond(
        StatusCode::OK,
        api.update_candidate(&CandidateId(candidate_id), patch)
            .await,
    )
}

async fn timeline_handler(
    State(api): State<Arc<MockApi>>,
    Path(candidate_id): Path<String>,
) -> Response {
    respond(
        StatusCode::OK,
        api.candidate_timeline(&CandidateId(candidate_id)).await,
    )
}

async fn add_note_handler(
    State(api): State<Arc<MockApi>>,
    Path(candidate_id): Path<String>,
    Json(draft): Json<NoteDraft>,
) -> Response {
    respond(
        StatusCode::CREATED,
        api.add_note(&CandidateId(candidate_id), draft).await,
    )
}

async fn get_assessment_handler(
    State(api): State<Arc<MockApi>>,
    Path(job_id): Path<String>,
) -> Response {
    respond(StatusCode::OK, api.get_assessment(&JobId(job_id)).await)
}

async fn save_assessment_handler(
    State(api): State<Arc<MockApi>>,
    Path(job_id): Path<String>,
    Json(draft): Json<AssessmentDraft>,
) -> Response {
    respond(
        StatusCode::OK,
        api.save_assessment(&JobId(job_id), draft).await,
    )
}

async fn submit_assessment_handler(
    State(api): State<Arc<MockApi>>,
    Path(job_id): Path<String>,
    Json(draft): Json<SubmissionDraft>,
) -> Response {
    respond(
        StatusCode::CREATED,
        api.submit_assessment(&JobId(job_id), draft).await,
    )
}

async fn list_submissions_handler(
    State(api): State<Arc<MockApi>>,
    Path(job_id): Path<String>,
) -> Response {
    respond(StatusCode::OK, api.list_submissions(&JobId(job_id)).await)
}

async fn analytics_handler(State(api): State<Arc<MockApi>>) -> Response {
    respond(StatusCode::OK, api.dashboard().await)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::mock_api::ChaosConfig;
    use crate::store::fixtures::{candidate_draft, job_draft};
    use crate::store::LocalStore;

    fn router_with(chaos: ChaosConfig) -> (Router, Arc<LocalStore>) {
        let store = Arc::new(LocalStore::in_memory());
        let api = Arc::new(MockApi::new(store.clone(), chaos));
        (hiring_router(api), store)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request builds")
    }

    async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn create_job_returns_created() {
        let (router, store) = router_with(ChaosConfig::calm());
        let response = router
            .oneshot(json_request(
                "POST",
                "/api/jobs",
                json!({ "title": "Rust Engineer", "tags": ["rust"] }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::CREATED);
        let payload = read_json_body(response).await;
        assert_eq!(payload["slug"], "rust-engineer");
        assert_eq!(payload["status"], "active");
        assert_eq!(store.snapshot().jobs.len(), 1);
    }

    #[tokio::test]
    async fn list_jobs_applies_query_parameters() {
        let (router, store) = router_with(ChaosConfig::calm());
        for title in ["Rust Engineer", "Designer", "Rust Lead"] {
            store.create_job(job_draft(title)).expect("job created");
        }

        let response = router
            .oneshot(get_request("/api/jobs?search=rust&page_size=1&sort=title"))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["total"], 2);
        assert_eq!(payload["page_size"], 1);
        assert_eq!(payload["data"][0]["title"], "Rust Engineer");
    }

    #[tokio::test]
    async fn missing_candidate_is_not_found() {
        let (router, _) = router_with(ChaosConfig::calm());
        let response = router
            .oneshot(get_request("/api/candidates/cand-404"))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let payload = read_json_body(response).await;
        assert_eq!(payload["kind"], "candidate");
    }

    #[tokio::test]
    async fn invalid_candidate_reports_fields() {
        let (router, store) = router_with(ChaosConfig::calm());
        let job = store
            .create_job(job_draft("Rust Engineer"))
            .expect("job created");

        let response = router
            .oneshot(json_request(
                "POST",
                "/api/candidates",
                json!({ "name": "", "email": "nope", "job_id": job.id }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let payload = read_json_body(response).await;
        let fields: Vec<&str> = payload["fields"]
            .as_array()
            .expect("fields array")
            .iter()
            .filter_map(|field| field["field"].as_str())
            .collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"email"));
    }

    #[tokio::test]
    async fn stale_reorder_is_a_conflict() {
        let (router, store) = router_with(ChaosConfig::calm());
        let first = store
            .create_job(job_draft("Rust Engineer"))
            .expect("job created");
        store.create_job(job_draft("Designer")).expect("job created");

        let response = router
            .oneshot(json_request(
                "PATCH",
                &format!("/api/jobs/{}/reorder", first.id),
                json!({ "from_order": 2, "to_order": 1 }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn terminal_candidates_cannot_move() {
        let (router, store) = router_with(ChaosConfig::calm());
        let job = store
            .create_job(job_draft("Rust Engineer"))
            .expect("job created");
        let candidate = store
            .create_candidate(candidate_draft(&job, "Ada Lovelace"))
            .expect("candidate created");
        store
            .move_candidate(&candidate.id, crate::pipeline::Stage::Rejected)
            .expect("rejected");

        let response = router
            .oneshot(json_request(
                "PATCH",
                &format!("/api/candidates/{}", candidate.id),
                json!({ "stage": "screen" }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let payload = read_json_body(response).await;
        assert_eq!(payload["from"], "rejected");
    }

    #[tokio::test]
    async fn notes_are_created_with_mentions() {
        let (router, store) = router_with(ChaosConfig::calm());
        let job = store
            .create_job(job_draft("Rust Engineer"))
            .expect("job created");
        let candidate = store
            .create_candidate(candidate_draft(&job, "Ada Lovelace"))
            .expect("candidate created");

        let response = router
            .oneshot(json_request(
                "POST",
                &format!("/api/candidates/{}/notes", candidate.id),
                json!({ "body": "Strong systems answers, looping in @grace." }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::CREATED);
        let payload = read_json_body(response).await;
        assert_eq!(payload["mentions"], json!(["grace"]));
    }

    #[tokio::test]
    async fn injected_failure_maps_to_simulated_error() {
        let (router, store) = router_with(ChaosConfig::outage());
        let response = router
            .oneshot(json_request(
                "POST",
                "/api/jobs",
                json!({ "title": "Rust Engineer" }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = read_json_body(response).await;
        assert_eq!(payload["error"], "simulated server error");
        assert_eq!(payload["operation"], "jobs.create");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn analytics_reports_counts() {
        let (router, store) = router_with(ChaosConfig::calm());
        let job = store
            .create_job(job_draft("Rust Engineer"))
            .expect("job created");
        store
            .create_candidate(candidate_draft(&job, "Ada Lovelace"))
            .expect("candidate created");

        let response = router
            .oneshot(get_request("/api/analytics"))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["candidates"], 1);
        assert_eq!(payload["jobs"]["active"], 1);
    }
}
