//! Payment types for the order management service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::Versioned;

/// A payment transaction against an order.
///
/// `refunded_amount` starts at zero and only grows; it never exceeds
/// `amount`. The status is derived from the two after every refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
	/// Unique identifier for this payment (UUID v4).
	pub id: String,
	/// Human-readable business number, e.g. `PAY-20250101-3FA9C1D2`.
	pub payment_number: String,
	/// The order this payment pays for.
	pub order_id: String,
	/// Current payment status.
	pub status: PaymentStatus,
	/// How the customer paid.
	pub method: PaymentMethod,
	/// Amount charged.
	pub amount: Decimal,
	/// Total refunded so far; monotonically non-decreasing.
	pub refunded_amount: Decimal,
	/// ISO 4217 currency code.
	pub currency: String,
	/// External gateway transaction id, filled when processing completes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transaction_id: Option<String>,
	/// Timestamp when this payment was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this payment was last updated.
	pub updated_at: DateTime<Utc>,
	/// When the gateway confirmed the charge.
	pub completed_at: Option<DateTime<Utc>>,
	/// When the most recent refund was issued.
	pub refunded_at: Option<DateTime<Utc>>,
	/// Optimistic concurrency version, bumped on every committed write.
	#[serde(default)]
	pub version: u64,
}

impl Payment {
	/// Amount still available to refund.
	pub fn refundable_amount(&self) -> Decimal {
		self.amount - self.refunded_amount
	}
}

impl Versioned for Payment {
	fn version(&self) -> u64 {
		self.version
	}

	fn set_version(&mut self, version: u64) {
		self.version = version;
	}
}

/// Status of a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
	/// Payment created but not yet sent to the gateway.
	Pending,
	/// Payment submitted to the gateway.
	Processing,
	/// Gateway confirmed the charge.
	Completed,
	/// Gateway declined or errored.
	Failed,
	/// Fully refunded.
	Refunded,
	/// Partially refunded; some amount remains.
	PartiallyRefunded,
	/// Payment cancelled before processing.
	Cancelled,
}

impl PaymentStatus {
	/// Returns the wire representation of this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			PaymentStatus::Pending => "pending",
			PaymentStatus::Processing => "processing",
			PaymentStatus::Completed => "completed",
			PaymentStatus::Failed => "failed",
			PaymentStatus::Refunded => "refunded",
			PaymentStatus::PartiallyRefunded => "partially_refunded",
			PaymentStatus::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for PaymentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
	CreditCard,
	DebitCard,
	Paypal,
	BankTransfer,
	Stripe,
	Other,
}
