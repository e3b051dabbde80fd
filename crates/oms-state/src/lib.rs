//! Lifecycle state machines for the order management service.
//!
//! This crate contains the table-driven transition engine and the two
//! lifecycles built on it (orders and returns), plus the refund rule for
//! payments. Transition tables are declared ahead of time as static data;
//! the engine is a pure function of the table and the entity it is handed,
//! and holds no other state.

use thiserror::Error;

/// Generic transition engine evaluating declared transition tables.
pub mod machine;
/// Order lifecycle: transition table, guards, and effects.
pub mod order;
/// Payment refund computation.
pub mod refund;
/// Return lifecycle: transition table, guards, and effects.
pub mod returns;

pub use machine::{ActionContext, Stateful, TransitionTable};
pub use order::order_lifecycle;
pub use refund::process_refund;
pub use returns::return_lifecycle;

/// Formats an action list for error messages.
///
/// Terminal states have no outgoing transitions; that is reported rather
/// than rendered as an empty list.
fn format_actions(actions: &[String]) -> String {
	if actions.is_empty() {
		"none (entity is in a final state)".to_string()
	} else {
		actions.join(", ")
	}
}

/// Errors produced by lifecycle evaluation and the refund rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
	/// The requested action is not defined for the entity's current state.
	#[error("cannot perform action '{action}' from state '{current}'. Available actions: {}", format_actions(.available))]
	InvalidTransition {
		action: String,
		current: String,
		available: Vec<String>,
	},
	/// The entity already went through the requested transition.
	#[error("{entity} is already {state}")]
	AlreadyInState {
		entity: &'static str,
		state: String,
	},
	/// A guard vetoed the transition before any mutation.
	#[error("{0}")]
	InvalidOperation(String),
	/// The entity is not in a state the operation accepts.
	#[error("{0}")]
	InvalidState(String),
}
