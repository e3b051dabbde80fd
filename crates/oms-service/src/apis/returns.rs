//! Return API handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use oms_core::ReturnFilter;
use oms_types::{CreateReturnRequest, Return, ReturnStatus, TransitionRequest, UpdateReturnRequest};

use crate::apis::ApiError;
use crate::server::AppState;

/// Query parameters for listing returns.
#[derive(Debug, Default, Deserialize)]
pub struct ListReturnsParams {
	/// Only returns opened against this order.
	pub order_id: Option<String>,
	/// Only returns currently in this status.
	pub status: Option<ReturnStatus>,
	/// Pagination offset.
	pub offset: Option<usize>,
	/// Pagination limit.
	pub limit: Option<usize>,
}

/// Handles POST /api/v1/returns requests.
pub async fn create_return(
	State(state): State<AppState>,
	Json(request): Json<CreateReturnRequest>,
) -> Result<(StatusCode, Json<Return>), ApiError> {
	let ret = state.engine.returns().create_return(request).await?;
	Ok((StatusCode::CREATED, Json(ret)))
}

/// Handles GET /api/v1/returns requests.
pub async fn list_returns(
	State(state): State<AppState>,
	Query(params): Query<ListReturnsParams>,
) -> Result<Json<Vec<Return>>, ApiError> {
	let returns = state
		.engine
		.returns()
		.list_returns(ReturnFilter {
			order_id: params.order_id,
			status: params.status,
			offset: params.offset,
			limit: params.limit,
		})
		.await?;
	Ok(Json(returns))
}

/// Handles GET /api/v1/returns/{id} requests.
pub async fn get_return(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Return>, ApiError> {
	let ret = state.engine.returns().get_return(&id).await?;
	Ok(Json(ret))
}

/// Handles PATCH /api/v1/returns/{id} requests.
pub async fn update_return(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<UpdateReturnRequest>,
) -> Result<Json<Return>, ApiError> {
	let ret = state.engine.returns().update_return(&id, request).await?;
	Ok(Json(ret))
}

/// Handles POST /api/v1/returns/{id}/transitions requests.
///
/// `reason` is only meaningful for the `reject` action, where it is
/// stored as the rejection reason.
pub async fn transition_return(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<TransitionRequest>,
) -> Result<Json<Return>, ApiError> {
	let ret = state
		.engine
		.returns()
		.transition(&id, &request.action, request.reason)
		.await?;
	Ok(Json(ret))
}
