//! Payment refund computation.
//!
//! Not a state machine, but the same invariant discipline: the refunded
//! amount only grows, never exceeds the charged amount, and the payment
//! status is derived from the two after every refund.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use oms_types::{Payment, PaymentStatus};

use crate::StateError;

/// Applies a refund to a completed payment.
///
/// When `requested` is `None` the full remaining refundable amount is
/// refunded. Partial refunds may be repeated until the payment is fully
/// refunded; a request exceeding the remaining amount is rejected without
/// mutating the payment. Returns the amount actually refunded.
pub fn process_refund(
	payment: &mut Payment,
	requested: Option<Decimal>,
	now: DateTime<Utc>,
) -> Result<Decimal, StateError> {
	if !matches!(
		payment.status,
		PaymentStatus::Completed | PaymentStatus::PartiallyRefunded
	) {
		return Err(StateError::InvalidState(format!(
			"payment {} is not completed and cannot be refunded (current: {})",
			payment.payment_number, payment.status
		)));
	}

	let amount_to_refund = requested.unwrap_or_else(|| payment.refundable_amount());
	if amount_to_refund > payment.refundable_amount() {
		return Err(StateError::InvalidOperation(format!(
			"refund amount {} exceeds available amount {}",
			amount_to_refund,
			payment.refundable_amount()
		)));
	}

	payment.refunded_amount += amount_to_refund;
	payment.refunded_at = Some(now);
	payment.status = if payment.refunded_amount >= payment.amount {
		PaymentStatus::Refunded
	} else {
		PaymentStatus::PartiallyRefunded
	};

	Ok(amount_to_refund)
}

#[cfg(test)]
mod tests {
	use super::*;
	use oms_types::PaymentMethod;

	fn sample_payment(status: PaymentStatus, amount: Decimal) -> Payment {
		let now = Utc::now();
		Payment {
			id: "payment-1".to_string(),
			payment_number: "PAY-20250101-AAAAAAAA".to_string(),
			order_id: "order-1".to_string(),
			status,
			method: PaymentMethod::CreditCard,
			amount,
			refunded_amount: Decimal::ZERO,
			currency: "USD".to_string(),
			transaction_id: Some("TXN-1".to_string()),
			created_at: now,
			updated_at: now,
			completed_at: Some(now),
			refunded_at: None,
			version: 0,
		}
	}

	#[test]
	fn test_full_refund_when_amount_omitted() {
		let mut payment = sample_payment(PaymentStatus::Completed, Decimal::new(28000, 2));
		let refunded = process_refund(&mut payment, None, Utc::now()).unwrap();

		assert_eq!(refunded, Decimal::new(28000, 2));
		assert_eq!(payment.refunded_amount, Decimal::new(28000, 2));
		assert_eq!(payment.status, PaymentStatus::Refunded);
		assert!(payment.refunded_at.is_some());
	}

	#[test]
	fn test_two_partial_refunds_reach_refunded() {
		let mut payment = sample_payment(PaymentStatus::Completed, Decimal::new(28000, 2));

		process_refund(&mut payment, Some(Decimal::new(10000, 2)), Utc::now()).unwrap();
		assert_eq!(payment.status, PaymentStatus::PartiallyRefunded);
		assert_eq!(payment.refunded_amount, Decimal::new(10000, 2));

		process_refund(&mut payment, Some(Decimal::new(18000, 2)), Utc::now()).unwrap();
		assert_eq!(payment.status, PaymentStatus::Refunded);
		assert_eq!(payment.refunded_amount, Decimal::new(28000, 2));
	}

	#[test]
	fn test_overdraw_is_rejected_without_mutation() {
		let mut payment = sample_payment(PaymentStatus::Completed, Decimal::new(28000, 2));
		process_refund(&mut payment, Some(Decimal::new(20000, 2)), Utc::now()).unwrap();

		let err =
			process_refund(&mut payment, Some(Decimal::new(10000, 2)), Utc::now()).unwrap_err();
		assert!(matches!(err, StateError::InvalidOperation(_)));
		assert_eq!(payment.refunded_amount, Decimal::new(20000, 2));
		assert_eq!(payment.status, PaymentStatus::PartiallyRefunded);
	}

	#[test]
	fn test_refund_requires_completed_payment() {
		let mut payment = sample_payment(PaymentStatus::Pending, Decimal::new(5000, 2));
		let err = process_refund(&mut payment, None, Utc::now()).unwrap_err();

		assert!(matches!(err, StateError::InvalidState(_)));
		assert_eq!(payment.refunded_amount, Decimal::ZERO);
		assert_eq!(payment.status, PaymentStatus::Pending);
	}
}
