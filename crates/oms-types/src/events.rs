//! Event types for inter-service communication.
//!
//! This module defines the event system used by the service for
//! asynchronous communication between components. Events flow through a
//! broadcast bus after the originating write has committed, allowing
//! consumers such as the notification dispatcher to react without being
//! part of the request path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderStatus, PaymentStatus, ReturnStatus};

/// Main event type encompassing all service events.
///
/// Events are categorized by the entity that produced them, allowing
/// consumers to filter and handle specific event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OmsEvent {
	/// Events from the order lifecycle.
	Order(OrderEvent),
	/// Events from the return lifecycle.
	Return(ReturnEvent),
	/// Events from payment processing.
	Payment(PaymentEvent),
}

/// Events related to orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A new order has been created.
	Created { order_id: String },
	/// An order transitioned between lifecycle states.
	StatusChanged {
		order_id: String,
		action: String,
		from: OrderStatus,
		to: OrderStatus,
		occurred_at: DateTime<Utc>,
	},
}

/// Events related to returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReturnEvent {
	/// A new return has been created.
	Created { return_id: String },
	/// A return transitioned between lifecycle states.
	StatusChanged {
		return_id: String,
		order_id: String,
		action: String,
		from: ReturnStatus,
		to: ReturnStatus,
		refund_amount: Decimal,
		occurred_at: DateTime<Utc>,
	},
}

/// Events related to payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentEvent {
	/// A payment was confirmed by the (simulated) gateway.
	Completed {
		payment_id: String,
		order_id: String,
	},
	/// A refund was applied to a payment.
	RefundProcessed {
		payment_id: String,
		order_id: String,
		amount: Decimal,
		status: PaymentStatus,
	},
}
