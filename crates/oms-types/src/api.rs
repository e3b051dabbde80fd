//! API types for the order management HTTP API.
//!
//! This module defines the request and response types for the API
//! endpoints. Entities serialize directly as responses; the types here
//! cover inbound payloads and the error body.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PaymentMethod, ReturnReason};

/// Request to create a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
	/// Reference to the customer placing the order.
	pub customer_id: i64,
	/// Customer email for notifications.
	pub customer_email: String,
	/// Customer display name.
	pub customer_name: String,
	/// Line items; must be non-empty.
	pub items: Vec<OrderItemRequest>,
	/// Optional free-form notes.
	#[serde(default)]
	pub notes: Option<String>,
}

/// A line item within an order creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
	/// Product reference.
	pub product_id: i64,
	/// Product name snapshot.
	pub product_name: String,
	/// Product SKU snapshot.
	pub product_sku: String,
	/// Unit price.
	pub unit_price: Decimal,
	/// Quantity ordered; must be positive.
	pub quantity: u32,
}

/// Request to update mutable order fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
	/// Replacement notes, if provided.
	#[serde(default)]
	pub notes: Option<String>,
}

/// Request to apply a lifecycle action to an order or return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
	/// The action to perform, e.g. `confirm` or `ship`.
	pub action: String,
	/// Optional free-text reason; only meaningful for return rejection.
	#[serde(default)]
	pub reason: Option<String>,
}

/// Request to create a new return against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReturnRequest {
	/// The order the return is opened against.
	pub order_id: String,
	/// Why the customer is returning the items.
	pub reason: ReturnReason,
	/// Free-text elaboration on the reason.
	#[serde(default)]
	pub reason_description: Option<String>,
	/// Items being returned; must be non-empty.
	pub items: Vec<ReturnItemRequest>,
	/// Optional free-form notes.
	#[serde(default)]
	pub notes: Option<String>,
}

/// An item within a return creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnItemRequest {
	/// The order item being returned; must belong to the target order.
	pub order_item_id: String,
	/// Quantity being returned; must be positive.
	pub quantity: u32,
	/// Reported condition (new, used, damaged, ...).
	#[serde(default)]
	pub condition: Option<String>,
	/// Free-text notes on the condition.
	#[serde(default)]
	pub condition_notes: Option<String>,
}

/// Request to update mutable return fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReturnRequest {
	/// Carrier tracking number for the inbound parcel.
	#[serde(default)]
	pub tracking_number: Option<String>,
	/// Replacement notes, if provided.
	#[serde(default)]
	pub notes: Option<String>,
}

/// Request to create a new payment for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
	/// The order being paid for.
	pub order_id: String,
	/// How the customer is paying.
	pub method: PaymentMethod,
	/// Amount to charge.
	pub amount: Decimal,
	/// External gateway transaction id, if already known.
	#[serde(default)]
	pub transaction_id: Option<String>,
}

/// Request to refund a completed payment.
///
/// Omitting `amount` refunds everything still refundable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundRequest {
	/// Partial refund amount; full refund when absent.
	#[serde(default)]
	pub amount: Option<Decimal>,
}

/// Error body returned by the API on any failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error code, e.g. `INVALID_TRANSITION`.
	pub error: String,
	/// Human-readable message naming the rejected action and state.
	pub message: String,
}
