use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use mnemo_service::{
	AddRequest, AddResponse, DeleteRequest, DeleteResponse, Error, ExportResponse, GetRequest,
	ImportRequest, ImportResponse, ListRequest, ListResponse, MemoryItem, SearchRequest,
	SearchResponse, StatsResponse, UpdateRequest, UpdateResponse,
};

/// Body of `PATCH /v1/memories/{id}`; the id comes from the path.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub tags: Option<Vec<String>>,
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	fn not_found(id: &str) -> Self {
		json_error(StatusCode::NOT_FOUND, "not_found", format!("Memory {id} does not exist."), None)
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::Validation { field, message } => json_error(
				StatusCode::UNPROCESSABLE_ENTITY,
				"validation",
				message,
				Some(vec![field]),
			),
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "not_found", message, None),
			Error::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "conflict", message, None),
			Error::Provider { message } => {
				tracing::error!(error = %message, "Embedding provider failed.");

				json_error(StatusCode::BAD_GATEWAY, "provider", message, None)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage operation failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage", message, None)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/memories", post(add).get(list))
		.route("/v1/memories/search", post(search))
		.route("/v1/memories/{id}", get(fetch).patch(update).delete(delete))
		.route("/v1/stats", get(stats))
		.route("/v1/export", get(export))
		.route("/v1/import", post(import))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn add(
	State(state): State<AppState>,
	Json(payload): Json<AddRequest>,
) -> Result<Json<AddResponse>, ApiError> {
	let response = state.service.add(payload).await?;

	Ok(Json(response))
}

async fn fetch(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<MemoryItem>, ApiError> {
	let response = state.service.get(GetRequest { id: id.clone() }).await?;

	response.memory.map(Json).ok_or_else(|| ApiError::not_found(&id))
}

async fn update(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(payload): Json<UpdateBody>,
) -> Result<Json<UpdateResponse>, ApiError> {
	let req = UpdateRequest {
		id,
		content: payload.content,
		category: payload.category,
		tags: payload.tags,
		embedding: payload.embedding,
	};
	let response = state.service.update(req).await?;

	if !response.updated {
		return Err(ApiError::not_found(&response.id));
	}

	Ok(Json(response))
}

async fn delete(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let response = state.service.delete(DeleteRequest { id }).await?;

	if !response.deleted {
		return Err(ApiError::not_found(&response.id));
	}

	Ok(Json(response))
}

async fn list(
	State(state): State<AppState>,
	Query(params): Query<ListRequest>,
) -> Result<Json<ListResponse>, ApiError> {
	let response = state.service.list(params).await?;

	Ok(Json(response))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
	let response = state.service.stats().await?;

	Ok(Json(response))
}

async fn export(State(state): State<AppState>) -> Result<Json<ExportResponse>, ApiError> {
	let response = state.service.export().await?;

	Ok(Json(response))
}

async fn import(
	State(state): State<AppState>,
	Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ApiError> {
	let response = state.service.import(payload).await?;

	Ok(Json(response))
}
