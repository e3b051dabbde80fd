//! Order API handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use oms_core::OrderFilter;
use oms_types::{CreateOrderRequest, Order, OrderStatus, TransitionRequest, UpdateOrderRequest};

use crate::apis::ApiError;
use crate::server::AppState;

/// Query parameters for listing orders.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersParams {
	/// Only orders belonging to this customer.
	pub customer_id: Option<i64>,
	/// Only orders currently in this status.
	pub status: Option<OrderStatus>,
	/// Pagination offset.
	pub offset: Option<usize>,
	/// Pagination limit.
	pub limit: Option<usize>,
}

/// Handles POST /api/v1/orders requests.
pub async fn create_order(
	State(state): State<AppState>,
	Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
	let order = state.engine.orders().create_order(request).await?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/v1/orders requests.
pub async fn list_orders(
	State(state): State<AppState>,
	Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<Order>>, ApiError> {
	let orders = state
		.engine
		.orders()
		.list_orders(OrderFilter {
			customer_id: params.customer_id,
			status: params.status,
			offset: params.offset,
			limit: params.limit,
		})
		.await?;
	Ok(Json(orders))
}

/// Handles GET /api/v1/orders/{id} requests.
pub async fn get_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Order>, ApiError> {
	let order = state.engine.orders().get_order(&id).await?;
	Ok(Json(order))
}

/// Handles PATCH /api/v1/orders/{id} requests.
pub async fn update_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
	let order = state.engine.orders().update_order(&id, request).await?;
	Ok(Json(order))
}

/// Handles POST /api/v1/orders/{id}/transitions requests.
///
/// The response carries the updated entity including `status`,
/// `previous_status`, and every transition timestamp.
pub async fn transition_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<TransitionRequest>,
) -> Result<Json<Order>, ApiError> {
	let order = state
		.engine
		.orders()
		.transition(&id, &request.action)
		.await?;
	Ok(Json(order))
}
