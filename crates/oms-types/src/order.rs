//! Order types for the order management service.
//!
//! This module defines the order entity, its line items, and the lifecycle
//! statuses an order moves through from creation to delivery or cancellation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::Versioned;

/// A customer order with its line items and lifecycle state.
///
/// Orders own their items; deleting an order removes the items with it.
/// Monetary fields hold fixed-point decimals with two fraction digits and
/// satisfy `total = subtotal + tax + shipping_cost`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order (UUID v4).
	pub id: String,
	/// Human-readable business number, e.g. `ORD-20250101-3FA9C1D2`.
	pub order_number: String,
	/// Reference to the customer that placed the order.
	pub customer_id: i64,
	/// Customer email used for notifications.
	pub customer_email: String,
	/// Customer display name.
	pub customer_name: String,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Status before the most recent transition.
	pub previous_status: Option<OrderStatus>,
	/// Sum of all line totals.
	pub subtotal: Decimal,
	/// Tax applied on the subtotal.
	pub tax: Decimal,
	/// Flat shipping cost.
	pub shipping_cost: Decimal,
	/// Grand total charged to the customer.
	pub total: Decimal,
	/// ISO 4217 currency code.
	pub currency: String,
	/// Ordered line items; never empty for a persisted order.
	pub items: Vec<OrderItem>,
	/// Free-form notes attached by staff or the customer.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Timestamp when this order was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this order was last updated.
	pub updated_at: DateTime<Utc>,
	/// Set once, on first entry into `confirmed`.
	pub confirmed_at: Option<DateTime<Utc>>,
	/// Set once, on first entry into `shipped`.
	pub shipped_at: Option<DateTime<Utc>>,
	/// Set once, on first entry into `delivered`.
	pub delivered_at: Option<DateTime<Utc>>,
	/// Set once, on first entry into `cancelled`.
	pub cancelled_at: Option<DateTime<Utc>>,
	/// Optimistic concurrency version, bumped on every committed write.
	#[serde(default)]
	pub version: u64,
}

impl Order {
	/// Looks up a line item by its identifier.
	pub fn find_item(&self, order_item_id: &str) -> Option<&OrderItem> {
		self.items.iter().find(|item| item.id == order_item_id)
	}

	/// Whether a return may be opened against this order.
	pub fn is_returnable(&self) -> bool {
		matches!(self.status, OrderStatus::Delivered | OrderStatus::Returned)
	}
}

impl Versioned for Order {
	fn version(&self) -> u64 {
		self.version
	}

	fn set_version(&mut self, version: u64) {
		self.version = version;
	}
}

/// A single product line within an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
	/// Unique identifier for this line item (UUID v4).
	pub id: String,
	/// Reference to the product in the catalog.
	pub product_id: i64,
	/// Product name at time of ordering.
	pub product_name: String,
	/// Product SKU at time of ordering.
	pub product_sku: String,
	/// Unit price at time of ordering.
	pub unit_price: Decimal,
	/// Quantity ordered.
	pub quantity: u32,
	/// Line total, `unit_price * quantity`.
	pub total_price: Decimal,
}

/// Status of an order in the fulfillment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order created but not yet confirmed.
	Pending,
	/// Order confirmed and payment accepted.
	Confirmed,
	/// Order being prepared for shipment.
	Processing,
	/// Order handed to the carrier.
	Shipped,
	/// Order delivered to the customer.
	Delivered,
	/// Order cancelled before shipment. Terminal.
	Cancelled,
	/// Order returned by the customer. Terminal.
	Returned,
}

impl OrderStatus {
	/// Returns the wire representation of this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Confirmed => "confirmed",
			OrderStatus::Processing => "processing",
			OrderStatus::Shipped => "shipped",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
			OrderStatus::Returned => "returned",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
