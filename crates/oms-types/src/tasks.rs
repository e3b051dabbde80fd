//! Background task message types.
//!
//! Messages are serialized with a `task` tag so the wire shape is
//! `{"task": "generate_order_invoice", "order_id": "..."}`. Delivery is
//! at-least-once; every handler must be idempotent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A message placed on the durable background task queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskMessage {
	/// Generate the PDF invoice for a shipped order.
	GenerateOrderInvoice { order_id: String },
	/// Generate the PDF credit memo for a processed return.
	GenerateReturnInvoice { return_id: String },
	/// Send the order confirmation email.
	SendOrderConfirmationEmail {
		order_id: String,
		customer_email: String,
	},
	/// Send the shipment notification email.
	SendOrderShipmentNotification {
		order_id: String,
		customer_email: String,
	},
	/// Send the return approval notification email.
	SendReturnApprovalNotification {
		return_id: String,
		customer_email: String,
	},
	/// Send the refund confirmation email.
	SendRefundConfirmation {
		return_id: String,
		customer_email: String,
		refund_amount: Decimal,
	},
}

impl TaskMessage {
	/// Returns the wire name of the task, for logging.
	pub fn kind(&self) -> &'static str {
		match self {
			TaskMessage::GenerateOrderInvoice { .. } => "generate_order_invoice",
			TaskMessage::GenerateReturnInvoice { .. } => "generate_return_invoice",
			TaskMessage::SendOrderConfirmationEmail { .. } => "send_order_confirmation_email",
			TaskMessage::SendOrderShipmentNotification { .. } => "send_order_shipment_notification",
			TaskMessage::SendReturnApprovalNotification { .. } => {
				"send_return_approval_notification"
			}
			TaskMessage::SendRefundConfirmation { .. } => "send_refund_confirmation",
		}
	}

	/// Returns the id of the entity this task works on.
	pub fn entity_id(&self) -> &str {
		match self {
			TaskMessage::GenerateOrderInvoice { order_id }
			| TaskMessage::SendOrderConfirmationEmail { order_id, .. }
			| TaskMessage::SendOrderShipmentNotification { order_id, .. } => order_id,
			TaskMessage::GenerateReturnInvoice { return_id }
			| TaskMessage::SendReturnApprovalNotification { return_id, .. }
			| TaskMessage::SendRefundConfirmation { return_id, .. } => return_id,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wire_shape() {
		let message = TaskMessage::GenerateOrderInvoice {
			order_id: "o-1".to_string(),
		};
		let json = serde_json::to_value(&message).unwrap();
		assert_eq!(json["task"], "generate_order_invoice");
		assert_eq!(json["order_id"], "o-1");
	}

	#[test]
	fn test_round_trip() {
		let message = TaskMessage::GenerateReturnInvoice {
			return_id: "r-1".to_string(),
		};
		let json = serde_json::to_string(&message).unwrap();
		let back: TaskMessage = serde_json::from_str(&json).unwrap();
		assert_eq!(back, message);
	}
}
