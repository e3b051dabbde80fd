//! Order lifecycle implementation.
//!
//! Orders move through: pending -> confirmed -> processing -> shipped ->
//! delivered -> returned, with cancellation possible until shipment.
//! `cancelled` and `returned` are terminal.

use once_cell::sync::Lazy;
use oms_types::{Order, OrderStatus};

use crate::machine::{ActionContext, Stateful, TransitionTable};
use crate::StateError;

impl Stateful for Order {
	type State = OrderStatus;

	const ENTITY: &'static str = "Order";

	fn status(&self) -> OrderStatus {
		self.status
	}

	fn set_status(&mut self, status: OrderStatus) {
		self.status = status;
	}

	fn set_previous_status(&mut self, previous: OrderStatus) {
		self.previous_status = Some(previous);
	}
}

fn stamp_confirmed(order: &mut Order, ctx: &ActionContext) {
	order.confirmed_at = Some(ctx.now);
}

fn stamp_shipped(order: &mut Order, ctx: &ActionContext) {
	order.shipped_at = Some(ctx.now);
}

fn stamp_delivered(order: &mut Order, ctx: &ActionContext) {
	order.delivered_at = Some(ctx.now);
}

fn stamp_cancelled(order: &mut Order, ctx: &ActionContext) {
	order.cancelled_at = Some(ctx.now);
}

/// Rejects cancellation once the order has left the warehouse.
///
/// The transition table already omits `cancel` rows for these states; this
/// guard states the business rule in its own right and fires for `cancel`
/// from any state, so the rejection is an explicit refusal rather than an
/// unknown-transition error.
fn reject_cancel_after_dispatch(order: &Order) -> Result<(), StateError> {
	match order.status {
		OrderStatus::Shipped => Err(StateError::InvalidOperation(
			"cannot cancel an order that has already been shipped".to_string(),
		)),
		OrderStatus::Delivered => Err(StateError::InvalidOperation(
			"cannot cancel an order that has already been delivered".to_string(),
		)),
		_ => Ok(()),
	}
}

static TABLE: Lazy<TransitionTable<Order>> = Lazy::new(|| {
	TransitionTable::builder()
		.synonym("cancelled", "cancel")
		.already_in_state("cancel", OrderStatus::Cancelled)
		.already_in_state("confirm", OrderStatus::Confirmed)
		.already_in_state("deliver", OrderStatus::Delivered)
		.action_guard("cancel", reject_cancel_after_dispatch)
		// From pending
		.rule(
			"confirm",
			OrderStatus::Pending,
			OrderStatus::Confirmed,
			Some(stamp_confirmed),
		)
		.rule(
			"cancel",
			OrderStatus::Pending,
			OrderStatus::Cancelled,
			Some(stamp_cancelled),
		)
		// From confirmed
		.rule(
			"start_processing",
			OrderStatus::Confirmed,
			OrderStatus::Processing,
			None,
		)
		.rule(
			"cancel",
			OrderStatus::Confirmed,
			OrderStatus::Cancelled,
			Some(stamp_cancelled),
		)
		// From processing
		.rule(
			"ship",
			OrderStatus::Processing,
			OrderStatus::Shipped,
			Some(stamp_shipped),
		)
		.rule(
			"cancel",
			OrderStatus::Processing,
			OrderStatus::Cancelled,
			Some(stamp_cancelled),
		)
		// From shipped
		.rule(
			"deliver",
			OrderStatus::Shipped,
			OrderStatus::Delivered,
			Some(stamp_delivered),
		)
		// From delivered
		.rule(
			"return_order",
			OrderStatus::Delivered,
			OrderStatus::Returned,
			None,
		)
		.build()
});

/// Returns the order transition table.
pub fn order_lifecycle() -> &'static TransitionTable<Order> {
	&TABLE
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use rust_decimal::Decimal;

	fn sample_order(status: OrderStatus) -> Order {
		let now = Utc::now();
		Order {
			id: "order-1".to_string(),
			order_number: "ORD-20250101-AAAAAAAA".to_string(),
			customer_id: 7,
			customer_email: "customer@example.com".to_string(),
			customer_name: "Test Customer".to_string(),
			status,
			previous_status: None,
			subtotal: Decimal::new(25000, 2),
			tax: Decimal::new(2500, 2),
			shipping_cost: Decimal::new(500, 2),
			total: Decimal::new(28000, 2),
			currency: "USD".to_string(),
			items: Vec::new(),
			notes: None,
			created_at: now,
			updated_at: now,
			confirmed_at: None,
			shipped_at: None,
			delivered_at: None,
			cancelled_at: None,
			version: 0,
		}
	}

	#[test]
	fn test_confirm_sets_previous_status_and_timestamp() {
		let mut order = sample_order(OrderStatus::Pending);
		let created = order.created_at;
		let next = order_lifecycle()
			.apply(&mut order, "confirm", &ActionContext::new(Utc::now()))
			.unwrap();

		assert_eq!(next, OrderStatus::Confirmed);
		assert_eq!(order.status, OrderStatus::Confirmed);
		assert_eq!(order.previous_status, Some(OrderStatus::Pending));
		assert!(order.confirmed_at.unwrap() >= created);
	}

	#[test]
	fn test_undefined_pair_is_invalid_and_leaves_entity_untouched() {
		let mut order = sample_order(OrderStatus::Pending);
		let err = order_lifecycle()
			.apply(&mut order, "ship", &ActionContext::new(Utc::now()))
			.unwrap_err();

		match err {
			StateError::InvalidTransition {
				action,
				current,
				available,
			} => {
				assert_eq!(action, "ship");
				assert_eq!(current, "pending");
				assert_eq!(available, vec!["confirm", "cancel"]);
			}
			other => panic!("unexpected error: {other:?}"),
		}
		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(order.previous_status, None);
		assert!(order.shipped_at.is_none());
	}

	#[test]
	fn test_confirm_twice_reports_already_confirmed() {
		let mut order = sample_order(OrderStatus::Confirmed);
		let err = order_lifecycle()
			.apply(&mut order, "confirm", &ActionContext::new(Utc::now()))
			.unwrap_err();

		assert_eq!(
			err,
			StateError::AlreadyInState {
				entity: "Order",
				state: "confirmed".to_string(),
			}
		);
	}

	#[test]
	fn test_cancel_from_shipped_hits_guard_not_table() {
		// The table has no cancel row from shipped, but the action guard
		// must answer first with the business reason.
		let mut order = sample_order(OrderStatus::Shipped);
		let err = order_lifecycle()
			.apply(&mut order, "cancel", &ActionContext::new(Utc::now()))
			.unwrap_err();

		assert!(matches!(err, StateError::InvalidOperation(_)));
		assert_eq!(order.status, OrderStatus::Shipped);
	}

	#[test]
	fn test_cancel_from_delivered_hits_guard() {
		let mut order = sample_order(OrderStatus::Delivered);
		let err = order_lifecycle()
			.apply(&mut order, "cancel", &ActionContext::new(Utc::now()))
			.unwrap_err();

		assert!(matches!(err, StateError::InvalidOperation(_)));
	}

	#[test]
	fn test_cancelled_synonym_and_whitespace_normalization() {
		let mut order = sample_order(OrderStatus::Pending);
		let next = order_lifecycle()
			.apply(&mut order, "  Cancelled ", &ActionContext::new(Utc::now()))
			.unwrap();

		assert_eq!(next, OrderStatus::Cancelled);
		assert!(order.cancelled_at.is_some());
	}

	#[test]
	fn test_cancel_when_already_cancelled() {
		let mut order = sample_order(OrderStatus::Cancelled);
		let err = order_lifecycle()
			.apply(&mut order, "cancel", &ActionContext::new(Utc::now()))
			.unwrap_err();

		assert!(matches!(err, StateError::AlreadyInState { .. }));
	}

	#[test]
	fn test_terminal_states_have_no_transitions() {
		let table = order_lifecycle();
		assert!(table.available_transitions(OrderStatus::Cancelled).is_empty());
		assert!(table.available_transitions(OrderStatus::Returned).is_empty());
	}

	#[test]
	fn test_full_happy_path() {
		let mut order = sample_order(OrderStatus::Pending);
		let table = order_lifecycle();
		let ctx = ActionContext::new(Utc::now());

		table.apply(&mut order, "confirm", &ctx).unwrap();
		table.apply(&mut order, "start_processing", &ctx).unwrap();
		table.apply(&mut order, "ship", &ctx).unwrap();
		table.apply(&mut order, "deliver", &ctx).unwrap();
		table.apply(&mut order, "return_order", &ctx).unwrap();

		assert_eq!(order.status, OrderStatus::Returned);
		assert_eq!(order.previous_status, Some(OrderStatus::Delivered));
		assert!(order.confirmed_at.is_some());
		assert!(order.shipped_at.is_some());
		assert!(order.delivered_at.is_some());
		assert!(order.cancelled_at.is_none());
	}

	#[test]
	fn test_can_transition_matches_table() {
		let table = order_lifecycle();
		assert!(table.can_transition(OrderStatus::Pending, "confirm"));
		assert!(table.can_transition(OrderStatus::Processing, "ship"));
		assert!(!table.can_transition(OrderStatus::Shipped, "cancel"));
		assert!(!table.can_transition(OrderStatus::Pending, "deliver"));
	}
}
