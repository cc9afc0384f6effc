use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use seatwatch::protocol::{
	CheckOutcome, CheckTaskResponse, ConfigUpdate, SearchRequest, SearchResponse, StartTaskRequest, StartTaskResponse,
	StatusReport, StopTaskResponse, UpdateTaskResponse,
};
use seatwatch::{Scheduler, TickOutcome};
use tracing::info;

use super::error::ApiError;

type ApiResult<T> = Result<T, ApiError>;

pub async fn status(State(scheduler): State<Arc<Scheduler>>) -> Json<StatusReport> {
	Json(scheduler.status())
}

pub async fn start_task(
	State(scheduler): State<Arc<Scheduler>>,
	Json(request): Json<StartTaskRequest>,
) -> ApiResult<(StatusCode, Json<StartTaskResponse>)> {
	let task_id = scheduler.start(&request.target, request.interval_secs.map(Duration::from_secs))?;
	info!(target = "seatwatch.server", task_id = %task_id, match_name = %request.target.name, "task started via control plane");
	Ok((StatusCode::CREATED, Json(StartTaskResponse { task_id })))
}

pub async fn stop_task(State(scheduler): State<Arc<Scheduler>>, Path(id): Path<String>) -> ApiResult<Json<StopTaskResponse>> {
	if !scheduler.stop(&id) {
		return Err(ApiError::task_not_found(&id));
	}
	Ok(Json(StopTaskResponse { task_id: id, stopped: true }))
}

pub async fn update_task(
	State(scheduler): State<Arc<Scheduler>>,
	Path(id): Path<String>,
	Json(update): Json<ConfigUpdate>,
) -> ApiResult<Json<UpdateTaskResponse>> {
	if update.is_empty() {
		return Err(ApiError::bad_request("no configuration fields given"));
	}
	if !scheduler.update_config(&id, &update)? {
		return Err(ApiError::task_not_found(&id));
	}
	Ok(Json(UpdateTaskResponse { task_id: id, updated: true }))
}

pub async fn check_task(State(scheduler): State<Arc<Scheduler>>, Path(id): Path<String>) -> ApiResult<Json<CheckTaskResponse>> {
	let outcome = scheduler.check_now(&id).await.ok_or_else(|| ApiError::task_not_found(&id))?;
	Ok(Json(check_response(id, outcome)))
}

pub async fn search(State(scheduler): State<Arc<Scheduler>>, Json(request): Json<SearchRequest>) -> ApiResult<Json<SearchResponse>> {
	let term = request.search_term.trim();
	if term.is_empty() {
		return Err(ApiError::bad_request("searchTerm is required"));
	}
	let pipeline = scheduler.pipeline();
	let events = pipeline.finder(pipeline.session()).find(term).await?;
	Ok(Json(SearchResponse {
		success: true,
		message: format!("found {} event(s)", events.len()),
		events,
	}))
}

fn check_response(task_id: String, outcome: TickOutcome) -> CheckTaskResponse {
	let (outcome, snapshot, purchase) = match outcome {
		TickOutcome::Skipped => (CheckOutcome::Skipped, None, None),
		TickOutcome::AlreadyPurchased => (CheckOutcome::AlreadyPurchased, None, None),
		TickOutcome::Checked(snapshot) => (CheckOutcome::Checked, Some(snapshot), None),
		TickOutcome::Attempted(result) => (CheckOutcome::Attempted, None, Some(result)),
	};
	CheckTaskResponse {
		task_id,
		outcome,
		snapshot,
		purchase,
	}
}
