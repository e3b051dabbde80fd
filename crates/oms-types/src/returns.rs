//! Return types for the order management service.
//!
//! This module defines the return entity, its items, and the lifecycle
//! statuses a return moves through from initiation to refund, rejection,
//! or cancellation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::Versioned;

/// A customer return opened against a delivered order.
///
/// `refund_amount` is computed once at creation from the referenced order
/// items and is never recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Return {
	/// Unique identifier for this return (UUID v4).
	pub id: String,
	/// Human-readable business number, e.g. `RET-20250101-3FA9C1D2`.
	pub return_number: String,
	/// The order this return belongs to.
	pub order_id: String,
	/// Current lifecycle status.
	pub status: ReturnStatus,
	/// Status before the most recent transition.
	pub previous_status: Option<ReturnStatus>,
	/// Why the customer is returning the items.
	pub reason: ReturnReason,
	/// Free-text elaboration on the reason.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason_description: Option<String>,
	/// Total refund owed, summed over the items at creation.
	pub refund_amount: Decimal,
	/// ISO 4217 currency code, copied from the order.
	pub currency: String,
	/// Items being returned.
	pub items: Vec<ReturnItem>,
	/// Set only when the return is rejected, by the reject effect.
	pub rejection_reason: Option<String>,
	/// Carrier tracking number for the inbound parcel.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tracking_number: Option<String>,
	/// Free-form notes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Timestamp when this return was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this return was last updated.
	pub updated_at: DateTime<Utc>,
	/// Set once, on first entry into `approved`.
	pub approved_at: Option<DateTime<Utc>>,
	/// Set once, on first entry into `pickup_scheduled`.
	pub pickup_scheduled_at: Option<DateTime<Utc>>,
	/// Set once, on first entry into `received`.
	pub received_at: Option<DateTime<Utc>>,
	/// Set once, on first entry into `processed`.
	pub processed_at: Option<DateTime<Utc>>,
	/// Set once, on first entry into `refunded`.
	pub refunded_at: Option<DateTime<Utc>>,
	/// Optimistic concurrency version, bumped on every committed write.
	#[serde(default)]
	pub version: u64,
}

impl Versioned for Return {
	fn version(&self) -> u64 {
		self.version
	}

	fn set_version(&mut self, version: u64) {
		self.version = version;
	}
}

/// A single item within a return.
///
/// Each item references an order item from the parent order; the reference
/// is validated at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnItem {
	/// Unique identifier for this return item (UUID v4).
	pub id: String,
	/// The order item being returned.
	pub order_item_id: String,
	/// Product reference, snapshotted from the order item.
	pub product_id: i64,
	/// Product name, snapshotted from the order item.
	pub product_name: String,
	/// Product SKU, snapshotted from the order item.
	pub product_sku: String,
	/// Quantity being returned.
	pub quantity: u32,
	/// Refund for this item, `unit_price * quantity` at creation.
	pub refund_amount: Decimal,
	/// Reported condition of the item (new, used, damaged, ...).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,
	/// Free-text notes on the condition.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition_notes: Option<String>,
}

/// Status of a return in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
	/// Return request created by the customer.
	Initiated,
	/// Return approved by an operator.
	Approved,
	/// Return rejected. Terminal.
	Rejected,
	/// Carrier pickup scheduled.
	PickupScheduled,
	/// Parcel in transit back to the warehouse.
	InTransit,
	/// Parcel received at the warehouse.
	Received,
	/// Items inspected and the return processed.
	Processed,
	/// Refund issued. Terminal.
	Refunded,
	/// Return cancelled by the customer. Terminal.
	Cancelled,
}

impl ReturnStatus {
	/// Returns the wire representation of this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			ReturnStatus::Initiated => "initiated",
			ReturnStatus::Approved => "approved",
			ReturnStatus::Rejected => "rejected",
			ReturnStatus::PickupScheduled => "pickup_scheduled",
			ReturnStatus::InTransit => "in_transit",
			ReturnStatus::Received => "received",
			ReturnStatus::Processed => "processed",
			ReturnStatus::Refunded => "refunded",
			ReturnStatus::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for ReturnStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Why a return was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
	Defective,
	WrongItem,
	NotAsDescribed,
	Damaged,
	SizeIssue,
	ChangeOfMind,
	Other,
}
