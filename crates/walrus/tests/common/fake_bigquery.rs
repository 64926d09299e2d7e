//! In-process fake of the BigQuery jobs API.
//!
//! Jobs report `RUNNING` on the first poll and `DONE` on the second. Loads
//! into [`BROKEN_TABLE`] finish with an `errorResult`; inserts into
//! [`FORBIDDEN_PROJECT`] are rejected with 403, and any token other than
//! [`TOKEN`] with 401.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "test-token";
pub const BROKEN_TABLE: &str = "broken";
pub const FORBIDDEN_PROJECT: &str = "forbidden";

/// What the fake has seen.
#[derive(Default)]
pub struct FakeBigQuery {
    pub inserts: Vec<Value>,
    pub polls: HashMap<String, usize>,
    pub poll_locations: Vec<Option<String>>,
    failing_jobs: Vec<String>,
}

pub type Shared = Arc<Mutex<FakeBigQuery>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

fn api_error(status: StatusCode, message: &str) -> Response {
    let body = json!({"error": {"code": status.as_u16(), "message": message}});
    (status, Json(body)).into_response()
}

async fn insert_job(
    State(state): State<Shared>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    if project == FORBIDDEN_PROJECT {
        return api_error(
            StatusCode::FORBIDDEN,
            "Access Denied: Project forbidden: User does not have bigquery.jobs.create permission",
        );
    }

    let job_id = body["jobReference"]["jobId"].as_str().unwrap_or_default().to_string();
    let table = body["configuration"]["load"]["destinationTable"]["tableId"]
        .as_str()
        .unwrap_or_default();

    let mut state = state.lock().unwrap();
    if table == BROKEN_TABLE {
        state.failing_jobs.push(job_id.clone());
    }
    state.inserts.push(body.clone());

    Json(json!({
        "jobReference": {"projectId": project, "jobId": job_id, "location": "US"},
        "status": {"state": "PENDING"}
    }))
    .into_response()
}

async fn get_job(
    State(state): State<Shared>,
    Path((project, job_id)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }

    let mut state = state.lock().unwrap();
    state.poll_locations.push(query.get("location").cloned());

    let polls = state.polls.entry(job_id.clone()).or_default();
    *polls += 1;
    let done = *polls >= 2;

    let mut status = json!({"state": if done { "DONE" } else { "RUNNING" }});
    if done && state.failing_jobs.contains(&job_id) {
        status["errorResult"] = json!({
            "reason": "invalid",
            "message": "Error while reading data, error message: Parquet column 'title' has type INT64 which does not match the target STRING"
        });
    }

    Json(json!({
        "jobReference": {"projectId": project, "jobId": job_id, "location": "US"},
        "status": status
    }))
    .into_response()
}

/// Serve the fake on an ephemeral port; returns its endpoint and state.
pub async fn start_fake() -> (String, Shared) {
    let state = Shared::default();
    let app = Router::new()
        .route("/bigquery/v2/projects/:project/jobs", post(insert_job))
        .route("/bigquery/v2/projects/:project/jobs/:job_id", get(get_job))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}
