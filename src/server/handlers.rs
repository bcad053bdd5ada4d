//! server::handlers
//!
//! One handler per endpoint. A handler only extracts and checks its
//! inputs, runs the matching [`RepositorySession`] operation on the blocking
//! pool, and shapes the JSON response. No handler touches Git directly.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use super::error::ApiError;
use super::AppState;
use crate::core::types::{BranchName, CommitMetadata};
use crate::session::{RepositorySession, SessionError};

type ApiResult = Result<Json<Value>, ApiError>;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RepoPathPayload {
    repo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserPayload {
    user_name: Option<String>,
    user_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    metadata: CommitMetadata,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemotePayload {
    username: Option<String>,
    repo: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PushPayload {
    repo_path: Option<String>,
    branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchQuery {
    branch: Option<String>,
    limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Extraction helpers
// ---------------------------------------------------------------------------

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e.body_text())))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(value)| value)
        .map_err(|e| ApiError::BadRequest(format!("invalid query: {}", e.body_text())))
}

fn branch_name(raw: &str) -> Result<BranchName, ApiError> {
    BranchName::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Branch from the query, or the configured default.
fn branch_or_default(raw: Option<&str>, session: &RepositorySession) -> Result<BranchName, ApiError> {
    match raw {
        Some(raw) if !raw.is_empty() => branch_name(raw),
        _ => Ok(session.settings().default_branch.clone()),
    }
}

/// Run a session operation on the blocking pool.
async fn run<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&RepositorySession) -> Result<T, SessionError> + Send + 'static,
    T: Send + 'static,
{
    let session = Arc::clone(&state.session);
    tokio::task::spawn_blocking(move || op(&session))
        .await
        .map_err(|e| SessionError::internal(format!("session task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn paths_json(paths: Vec<PathBuf>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /set-repo-path`
#[instrument(skip_all)]
pub(crate) async fn set_repo_path(
    State(state): State<AppState>,
    payload: Result<Json<RepoPathPayload>, JsonRejection>,
) -> ApiResult {
    let repo_path = body(payload)?
        .repo_path
        .ok_or_else(|| ApiError::missing("repo_path"))?;

    let path = run(&state, move |session| session.set_repository_path(repo_path)).await?;
    Ok(Json(json!({
        "status": "success",
        "path": path.to_string_lossy(),
    })))
}

/// `POST /setup-user`
#[instrument(skip_all)]
pub(crate) async fn setup_user(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult {
    let payload = body(payload)?;
    let (name, email) = match (payload.user_name, payload.user_email) {
        (Some(name), Some(email)) => (name, email),
        _ => return Err(ApiError::BadRequest("Name or Email missing".into())),
    };

    run(&state, move |session| session.set_user_identity(&name, &email)).await?;
    Ok(Json(json!({ "status": "success" })))
}

/// `GET /branches`
#[instrument(skip_all)]
pub(crate) async fn branches(State(state): State<AppState>) -> ApiResult {
    let branches = run(&state, |session| session.list_branches()).await?;
    Ok(Json(json!({
        "status": "success",
        "branches": branches,
    })))
}

/// `GET /all-branches-files`
#[instrument(skip_all)]
pub(crate) async fn all_branches_files(State(state): State<AppState>) -> ApiResult {
    let sets = run(&state, |session| session.list_all_branches_files()).await?;
    let all_branches: serde_json::Map<String, Value> = sets
        .into_iter()
        .map(|(branch, set)| (branch.to_string(), json!(paths_json(set.all()))))
        .collect();

    Ok(Json(json!({
        "status": "success",
        "all_branches": all_branches,
    })))
}

/// `GET /files/all?branch=`
#[instrument(skip_all)]
pub(crate) async fn all_files(
    State(state): State<AppState>,
    params: Result<Query<BranchQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let branch = branch_or_default(params.branch.as_deref(), &state.session)?;

    let target = branch.clone();
    let files = run(&state, move |session| session.list_all_files(&target)).await?;
    Ok(Json(json!({
        "status": "success",
        "branch": branch,
        "files": paths_json(files),
    })))
}

/// `GET /changed-files?branch=`
#[instrument(skip_all)]
pub(crate) async fn changed_files(
    State(state): State<AppState>,
    params: Result<Query<BranchQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let branch = match params.branch.as_deref() {
        Some(raw) if !raw.is_empty() => branch_name(raw)?,
        _ => return Err(ApiError::missing("branch")),
    };

    let target = branch.clone();
    let set = run(&state, move |session| session.list_changed_files(&target)).await?;
    Ok(Json(json!({
        "status": "success",
        "branch": branch,
        "files": paths_json(set.all()),
    })))
}

/// `POST /commit`
///
/// The body is echoed back under `received`.
#[instrument(skip_all)]
pub(crate) async fn commit(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let received = body(payload)?;
    if !received.is_object() {
        return Err(ApiError::BadRequest("request body must be a JSON object".into()));
    }
    let CommitPayload { message, metadata } = serde_json::from_value(received.clone())
        .map_err(|e| ApiError::BadRequest(format!("invalid commit payload: {}", e)))?;

    let message = message.unwrap_or_default();
    let id = run(&state, move |session| session.commit(&message, &metadata)).await?;
    Ok(Json(json!({
        "status": "success",
        "commit": id,
        "received": received,
    })))
}

/// `GET /commits?branch=&limit=`
#[instrument(skip_all)]
pub(crate) async fn commits(
    State(state): State<AppState>,
    params: Result<Query<BranchQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let branch = branch_or_default(params.branch.as_deref(), &state.session)?;
    let limit = params.limit;
    if limit == Some(0) {
        return Err(ApiError::BadRequest("limit must be greater than zero".into()));
    }

    let target = branch.clone();
    let commits = run(&state, move |session| {
        session.list_commit_history(&target, limit)
    })
    .await?;
    Ok(Json(json!({
        "status": "success",
        "branch": branch,
        "commits": commits,
    })))
}

/// `POST /set-remote`
#[instrument(skip_all)]
pub(crate) async fn set_remote(
    State(state): State<AppState>,
    payload: Result<Json<RemotePayload>, JsonRejection>,
) -> ApiResult {
    let payload = body(payload)?;
    let username = payload.username.ok_or_else(|| ApiError::missing("username"))?;
    let repo = payload.repo.ok_or_else(|| ApiError::missing("repo"))?;
    let token = payload.token.ok_or_else(|| ApiError::missing("token"))?;

    let (remote, action) =
        run(&state, move |session| session.set_remote(&username, &repo, &token)).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("remote '{}' {}", remote.name(), action),
        "action": action,
    })))
}

/// `POST /push`
#[instrument(skip_all)]
pub(crate) async fn push(
    State(state): State<AppState>,
    payload: Result<Json<PushPayload>, JsonRejection>,
) -> ApiResult {
    let payload = body(payload)?;
    let repo_path = payload
        .repo_path
        .map(PathBuf::from)
        .ok_or_else(|| ApiError::missing("repo_path"))?;
    let branch = branch_or_default(payload.branch.as_deref(), &state.session)?;

    let target = branch.clone();
    run(&state, move |session| session.push(&repo_path, Some(&target))).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("pushed {} to origin", branch),
    })))
}

/// `GET /session`
pub(crate) async fn session_status(State(state): State<AppState>) -> ApiResult {
    let status = run(&state, |session| Ok(session.status())).await?;
    Ok(Json(json!({
        "status": "success",
        "repo_path": status.repo_path.map(|p| p.to_string_lossy().into_owned()),
        "current_branch": status.current_branch,
    })))
}

/// `GET /healthz`
pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

/// Fallback for routes that only accept GET.
pub(crate) async fn get_only() -> ApiError {
    ApiError::MethodNotAllowed("GET")
}

/// Fallback for routes that only accept POST.
pub(crate) async fn post_only() -> ApiError {
    ApiError::MethodNotAllowed("POST")
}
