//! Invoice API handlers.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;

use oms_core::InvoiceFilter;
use oms_types::{Invoice, InvoiceType};

use crate::apis::ApiError;
use crate::server::AppState;

/// Query parameters for listing invoice records.
#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesParams {
	/// Only records of this type (`order` or `return`).
	pub invoice_type: Option<InvoiceType>,
	/// Only records referencing this order.
	pub order_id: Option<String>,
	/// Only records referencing this return.
	pub return_id: Option<String>,
}

/// Handles GET /api/v1/invoices requests.
pub async fn list_invoices(
	State(state): State<AppState>,
	Query(params): Query<ListInvoicesParams>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
	let invoices = state
		.engine
		.invoices()
		.list_invoices(InvoiceFilter {
			invoice_type: params.invoice_type,
			order_id: params.order_id,
			return_id: params.return_id,
		})
		.await?;
	Ok(Json(invoices))
}

/// Handles GET /api/v1/invoices/{id} requests.
pub async fn get_invoice(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Invoice>, ApiError> {
	let invoice = state.engine.invoices().get_invoice(&id).await?;
	Ok(Json(invoice))
}
