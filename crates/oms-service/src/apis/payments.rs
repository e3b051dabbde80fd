//! Payment API handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use oms_core::PaymentFilter;
use oms_types::{CreatePaymentRequest, Payment, PaymentStatus, RefundRequest};

use crate::apis::ApiError;
use crate::server::AppState;

/// Query parameters for listing payments.
#[derive(Debug, Default, Deserialize)]
pub struct ListPaymentsParams {
	/// Only payments for this order.
	pub order_id: Option<String>,
	/// Only payments currently in this status.
	pub status: Option<PaymentStatus>,
	/// Pagination offset.
	pub offset: Option<usize>,
	/// Pagination limit.
	pub limit: Option<usize>,
}

/// Handles POST /api/v1/payments requests.
pub async fn create_payment(
	State(state): State<AppState>,
	Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
	let payment = state.engine.payments().create_payment(request).await?;
	Ok((StatusCode::CREATED, Json(payment)))
}

/// Handles GET /api/v1/payments requests.
pub async fn list_payments(
	State(state): State<AppState>,
	Query(params): Query<ListPaymentsParams>,
) -> Result<Json<Vec<Payment>>, ApiError> {
	let payments = state
		.engine
		.payments()
		.list_payments(PaymentFilter {
			order_id: params.order_id,
			status: params.status,
			offset: params.offset,
			limit: params.limit,
		})
		.await?;
	Ok(Json(payments))
}

/// Handles GET /api/v1/payments/{id} requests.
pub async fn get_payment(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Payment>, ApiError> {
	let payment = state.engine.payments().get_payment(&id).await?;
	Ok(Json(payment))
}

/// Handles POST /api/v1/payments/{id}/process requests.
pub async fn process_payment(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Payment>, ApiError> {
	let payment = state.engine.payments().process_payment(&id).await?;
	Ok(Json(payment))
}

/// Handles POST /api/v1/payments/{id}/refund requests.
///
/// Omitting `amount` in the body refunds the full remaining amount.
pub async fn refund_payment(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<RefundRequest>,
) -> Result<Json<Payment>, ApiError> {
	let payment = state.engine.payments().refund(&id, request.amount).await?;
	Ok(Json(payment))
}
