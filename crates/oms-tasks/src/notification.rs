//! Notification consumers.
//!
//! Email delivery is simulated: each consumer logs the send and succeeds.
//! In production these would hand off to an email provider; the queueing,
//! retry, and time-limit behavior around them is the part this service
//! owns.

use rust_decimal::Decimal;

use oms_types::truncate_id;

use crate::TaskOutcome;

/// Sends (simulated) customer notifications.
pub struct Notifier;

impl Notifier {
	/// Creates a notifier.
	pub fn new() -> Self {
		Self
	}

	/// Order confirmation email.
	pub async fn order_confirmation(&self, order_id: &str, customer_email: &str) -> TaskOutcome {
		tracing::info!(
			order_id = %truncate_id(order_id),
			email = %customer_email,
			"Sending order confirmation email"
		);
		TaskOutcome::Success
	}

	/// Shipment notification email.
	pub async fn shipment_notification(
		&self,
		order_id: &str,
		customer_email: &str,
	) -> TaskOutcome {
		tracing::info!(
			order_id = %truncate_id(order_id),
			email = %customer_email,
			"Sending shipment notification email"
		);
		TaskOutcome::Success
	}

	/// Return approval notification email.
	pub async fn return_approval(&self, return_id: &str, customer_email: &str) -> TaskOutcome {
		tracing::info!(
			return_id = %truncate_id(return_id),
			email = %customer_email,
			"Sending return approval notification"
		);
		TaskOutcome::Success
	}

	/// Refund confirmation email.
	pub async fn refund_confirmation(
		&self,
		return_id: &str,
		customer_email: &str,
		refund_amount: Decimal,
	) -> TaskOutcome {
		tracing::info!(
			return_id = %truncate_id(return_id),
			email = %customer_email,
			amount = %refund_amount,
			"Sending refund confirmation email"
		);
		TaskOutcome::Success
	}
}

impl Default for Notifier {
	fn default() -> Self {
		Self::new()
	}
}
