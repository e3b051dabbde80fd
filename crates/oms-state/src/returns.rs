//! Return lifecycle implementation.
//!
//! Returns move through: initiated -> approved -> pickup_scheduled ->
//! in_transit -> received -> processed -> refunded, with rejection
//! possible until pickup and cancellation until approval. `rejected`,
//! `refunded`, and `cancelled` are terminal.

use once_cell::sync::Lazy;
use oms_types::{Return, ReturnStatus};

use crate::machine::{ActionContext, Stateful, TransitionTable};

impl Stateful for Return {
	type State = ReturnStatus;

	const ENTITY: &'static str = "Return";

	fn status(&self) -> ReturnStatus {
		self.status
	}

	fn set_status(&mut self, status: ReturnStatus) {
		self.status = status;
	}

	fn set_previous_status(&mut self, previous: ReturnStatus) {
		self.previous_status = Some(previous);
	}
}

fn stamp_approved(ret: &mut Return, ctx: &ActionContext) {
	ret.approved_at = Some(ctx.now);
}

/// Stores the operator's reason alongside the rejection, when given.
fn stamp_rejected(ret: &mut Return, ctx: &ActionContext) {
	if let Some(reason) = &ctx.reason {
		ret.rejection_reason = Some(reason.clone());
	}
}

fn stamp_pickup_scheduled(ret: &mut Return, ctx: &ActionContext) {
	ret.pickup_scheduled_at = Some(ctx.now);
}

fn stamp_received(ret: &mut Return, ctx: &ActionContext) {
	ret.received_at = Some(ctx.now);
}

fn stamp_processed(ret: &mut Return, ctx: &ActionContext) {
	ret.processed_at = Some(ctx.now);
}

fn stamp_refunded(ret: &mut Return, ctx: &ActionContext) {
	ret.refunded_at = Some(ctx.now);
}

static TABLE: Lazy<TransitionTable<Return>> = Lazy::new(|| {
	TransitionTable::builder()
		.already_in_state("approve", ReturnStatus::Approved)
		.already_in_state("refund", ReturnStatus::Refunded)
		.already_in_state("reject", ReturnStatus::Rejected)
		// From initiated
		.rule(
			"approve",
			ReturnStatus::Initiated,
			ReturnStatus::Approved,
			Some(stamp_approved),
		)
		.rule(
			"reject",
			ReturnStatus::Initiated,
			ReturnStatus::Rejected,
			Some(stamp_rejected),
		)
		.rule(
			"cancel",
			ReturnStatus::Initiated,
			ReturnStatus::Cancelled,
			None,
		)
		// From approved
		.rule(
			"schedule_pickup",
			ReturnStatus::Approved,
			ReturnStatus::PickupScheduled,
			Some(stamp_pickup_scheduled),
		)
		.rule(
			"reject",
			ReturnStatus::Approved,
			ReturnStatus::Rejected,
			Some(stamp_rejected),
		)
		.rule(
			"cancel",
			ReturnStatus::Approved,
			ReturnStatus::Cancelled,
			None,
		)
		// From pickup_scheduled
		.rule(
			"start_transit",
			ReturnStatus::PickupScheduled,
			ReturnStatus::InTransit,
			None,
		)
		// From in_transit
		.rule(
			"receive",
			ReturnStatus::InTransit,
			ReturnStatus::Received,
			Some(stamp_received),
		)
		// From received
		.rule(
			"process",
			ReturnStatus::Received,
			ReturnStatus::Processed,
			Some(stamp_processed),
		)
		// From processed
		.rule(
			"refund",
			ReturnStatus::Processed,
			ReturnStatus::Refunded,
			Some(stamp_refunded),
		)
		.build()
});

/// Returns the return transition table.
pub fn return_lifecycle() -> &'static TransitionTable<Return> {
	&TABLE
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::StateError;
	use chrono::Utc;
	use oms_types::ReturnReason;
	use rust_decimal::Decimal;

	fn sample_return(status: ReturnStatus) -> Return {
		let now = Utc::now();
		Return {
			id: "return-1".to_string(),
			return_number: "RET-20250101-AAAAAAAA".to_string(),
			order_id: "order-1".to_string(),
			status,
			previous_status: None,
			reason: ReturnReason::Defective,
			reason_description: None,
			refund_amount: Decimal::new(10000, 2),
			currency: "USD".to_string(),
			items: Vec::new(),
			rejection_reason: None,
			tracking_number: None,
			notes: None,
			created_at: now,
			updated_at: now,
			approved_at: None,
			pickup_scheduled_at: None,
			received_at: None,
			processed_at: None,
			refunded_at: None,
			version: 0,
		}
	}

	#[test]
	fn test_approve_sets_timestamp_and_previous_status() {
		let mut ret = sample_return(ReturnStatus::Initiated);
		let next = return_lifecycle()
			.apply(&mut ret, "approve", &ActionContext::new(Utc::now()))
			.unwrap();

		assert_eq!(next, ReturnStatus::Approved);
		assert_eq!(ret.previous_status, Some(ReturnStatus::Initiated));
		assert!(ret.approved_at.is_some());
	}

	#[test]
	fn test_reject_stores_reason() {
		let mut ret = sample_return(ReturnStatus::Initiated);
		let ctx = ActionContext::new(Utc::now())
			.with_reason(Some("items show heavy wear".to_string()));
		return_lifecycle().apply(&mut ret, "reject", &ctx).unwrap();

		assert_eq!(ret.status, ReturnStatus::Rejected);
		assert_eq!(
			ret.rejection_reason.as_deref(),
			Some("items show heavy wear")
		);
	}

	#[test]
	fn test_reject_without_reason_leaves_field_unset() {
		let mut ret = sample_return(ReturnStatus::Approved);
		return_lifecycle()
			.apply(&mut ret, "reject", &ActionContext::new(Utc::now()))
			.unwrap();

		assert_eq!(ret.status, ReturnStatus::Rejected);
		assert!(ret.rejection_reason.is_none());
	}

	#[test]
	fn test_idempotency_short_circuits() {
		let table = return_lifecycle();
		let ctx = ActionContext::new(Utc::now());

		let mut approved = sample_return(ReturnStatus::Approved);
		assert!(matches!(
			table.apply(&mut approved, "approve", &ctx).unwrap_err(),
			StateError::AlreadyInState { .. }
		));

		let mut refunded = sample_return(ReturnStatus::Refunded);
		assert!(matches!(
			table.apply(&mut refunded, "refund", &ctx).unwrap_err(),
			StateError::AlreadyInState { .. }
		));

		let mut rejected = sample_return(ReturnStatus::Rejected);
		assert!(matches!(
			table.apply(&mut rejected, "reject", &ctx).unwrap_err(),
			StateError::AlreadyInState { .. }
		));
	}

	#[test]
	fn test_skipping_states_is_invalid() {
		let mut ret = sample_return(ReturnStatus::Initiated);
		let err = return_lifecycle()
			.apply(&mut ret, "refund", &ActionContext::new(Utc::now()))
			.unwrap_err();

		match err {
			StateError::InvalidTransition { available, .. } => {
				assert_eq!(available, vec!["approve", "reject", "cancel"]);
			}
			other => panic!("unexpected error: {other:?}"),
		}
		assert_eq!(ret.status, ReturnStatus::Initiated);
		assert!(ret.refunded_at.is_none());
	}

	#[test]
	fn test_terminal_states_have_no_transitions() {
		let table = return_lifecycle();
		assert!(table.available_transitions(ReturnStatus::Rejected).is_empty());
		assert!(table.available_transitions(ReturnStatus::Refunded).is_empty());
		assert!(table.available_transitions(ReturnStatus::Cancelled).is_empty());
	}

	#[test]
	fn test_full_happy_path_timestamps() {
		let mut ret = sample_return(ReturnStatus::Initiated);
		let table = return_lifecycle();
		let ctx = ActionContext::new(Utc::now());

		table.apply(&mut ret, "approve", &ctx).unwrap();
		table.apply(&mut ret, "schedule_pickup", &ctx).unwrap();
		table.apply(&mut ret, "start_transit", &ctx).unwrap();
		table.apply(&mut ret, "receive", &ctx).unwrap();
		table.apply(&mut ret, "process", &ctx).unwrap();
		table.apply(&mut ret, "refund", &ctx).unwrap();

		assert_eq!(ret.status, ReturnStatus::Refunded);
		assert_eq!(ret.previous_status, Some(ReturnStatus::Processed));
		assert!(ret.approved_at.is_some());
		assert!(ret.pickup_scheduled_at.is_some());
		assert!(ret.received_at.is_some());
		assert!(ret.processed_at.is_some());
		assert!(ret.refunded_at.is_some());
	}
}
