//! HTTP server for the order management API.
//!
//! This module owns the router and middleware; the handlers live in the
//! `apis` modules.

use axum::{
	routing::{get, post},
	Json, Router,
};
use oms_config::ApiConfig;
use oms_core::OmsEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::apis;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the engine for processing requests.
	pub engine: Arc<OmsEngine>,
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<OmsEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { engine };

	let app = Router::new()
		.route("/health", get(health))
		.nest(
			"/api/v1",
			Router::new()
				.route(
					"/orders",
					post(apis::orders::create_order).get(apis::orders::list_orders),
				)
				.route(
					"/orders/{id}",
					get(apis::orders::get_order).patch(apis::orders::update_order),
				)
				.route(
					"/orders/{id}/transitions",
					post(apis::orders::transition_order),
				)
				.route(
					"/returns",
					post(apis::returns::create_return).get(apis::returns::list_returns),
				)
				.route(
					"/returns/{id}",
					get(apis::returns::get_return).patch(apis::returns::update_return),
				)
				.route(
					"/returns/{id}/transitions",
					post(apis::returns::transition_return),
				)
				.route(
					"/payments",
					post(apis::payments::create_payment).get(apis::payments::list_payments),
				)
				.route("/payments/{id}", get(apis::payments::get_payment))
				.route("/payments/{id}/process", post(apis::payments::process_payment))
				.route("/payments/{id}/refund", post(apis::payments::refund_payment))
				.route("/invoices", get(apis::invoices::list_invoices))
				.route("/invoices/{id}", get(apis::invoices::get_invoice)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /health requests.
async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}
