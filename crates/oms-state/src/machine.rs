//! Table-driven transition engine.
//!
//! A [`TransitionTable`] is declared once per lifecycle (as a
//! `once_cell::sync::Lazy` static) and evaluated against entities
//! implementing [`Stateful`]. Evaluation order for `apply`:
//!
//! 1. normalize the action token (trim, lowercase, declared synonyms),
//! 2. already-in-state rules (idempotency short-circuit),
//! 3. action guards, which apply to an action regardless of the source
//!    state and therefore run before the table lookup,
//! 4. table lookup; a miss reports the actions available from the
//!    current state,
//! 5. the row guard, if any,
//! 6. mutation: `previous_status`, `status`, then the row effect
//!    (timestamps and any extra fields).
//!
//! Guards run strictly before any mutation, so a vetoed transition leaves
//! the entity untouched.

use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::hash::Hash;

use crate::StateError;

/// Entities whose lifecycle is driven by a transition table.
pub trait Stateful {
	/// The status enum of the entity.
	type State: Copy + Eq + Hash + Display + 'static;

	/// Entity name used in error messages ("Order", "Return").
	const ENTITY: &'static str;

	/// Current lifecycle status.
	fn status(&self) -> Self::State;
	/// Overwrites the lifecycle status.
	fn set_status(&mut self, status: Self::State);
	/// Records the status the entity is transitioning away from.
	fn set_previous_status(&mut self, previous: Self::State);
}

/// Data handed to effects when a transition is accepted.
#[derive(Debug, Clone)]
pub struct ActionContext {
	/// Transition time; effects stamp it into the timestamp field.
	pub now: DateTime<Utc>,
	/// Optional free-text reason (return rejection).
	pub reason: Option<String>,
}

impl ActionContext {
	/// Creates a context for a transition occurring at `now`.
	pub fn new(now: DateTime<Utc>) -> Self {
		Self { now, reason: None }
	}

	/// Attaches a free-text reason to the context.
	pub fn with_reason(mut self, reason: Option<String>) -> Self {
		self.reason = reason;
		self
	}
}

/// Precondition check that may veto a transition.
pub type Guard<E> = fn(&E) -> Result<(), StateError>;
/// Mutation applied once a transition is accepted.
pub type Effect<E> = fn(&mut E, &ActionContext);

/// A single `(from, action) -> to` row in a transition table.
struct Rule<E: Stateful> {
	action: &'static str,
	from: E::State,
	to: E::State,
	guard: Option<Guard<E>>,
	effect: Option<Effect<E>>,
}

/// An immutable transition table for one lifecycle.
pub struct TransitionTable<E: Stateful> {
	rules: Vec<Rule<E>>,
	action_guards: Vec<(&'static str, Guard<E>)>,
	already_in_state: Vec<(&'static str, E::State)>,
	synonyms: Vec<(&'static str, &'static str)>,
}

impl<E: Stateful> TransitionTable<E> {
	/// Starts building a table.
	pub fn builder() -> TransitionTableBuilder<E> {
		TransitionTableBuilder {
			table: TransitionTable {
				rules: Vec::new(),
				action_guards: Vec::new(),
				already_in_state: Vec::new(),
				synonyms: Vec::new(),
			},
		}
	}

	/// Normalizes an action token: trim, lowercase, declared synonyms.
	pub fn normalize(&self, action: &str) -> String {
		let action = action.trim().to_lowercase();
		self.synonyms
			.iter()
			.find(|(from, _)| *from == action)
			.map(|(_, to)| to.to_string())
			.unwrap_or(action)
	}

	/// Whether `(state, action)` exists in the table.
	pub fn can_transition(&self, state: E::State, action: &str) -> bool {
		let action = self.normalize(action);
		self.rules
			.iter()
			.any(|rule| rule.from == state && rule.action == action)
	}

	/// All actions legal from `state`, in declaration order.
	///
	/// Terminal states yield an empty list; that is expected, not an error.
	pub fn available_transitions(&self, state: E::State) -> Vec<&'static str> {
		let mut actions = Vec::new();
		for rule in &self.rules {
			if rule.from == state && !actions.contains(&rule.action) {
				actions.push(rule.action);
			}
		}
		actions
	}

	/// Applies `action` to `entity`, returning the new state.
	///
	/// On any error the entity is left exactly as it was handed in.
	pub fn apply(
		&self,
		entity: &mut E,
		action: &str,
		ctx: &ActionContext,
	) -> Result<E::State, StateError> {
		let action = self.normalize(action);
		let current = entity.status();

		// Idempotency short-circuit: re-requesting a transition the entity
		// already went through is reported distinctly from an illegal one.
		if self
			.already_in_state
			.iter()
			.any(|(name, state)| *name == action && *state == current)
		{
			return Err(StateError::AlreadyInState {
				entity: E::ENTITY,
				state: current.to_string(),
			});
		}

		// Action guards carry rules that hold regardless of the source
		// state, so they fire even where the table has no matching row.
		for (name, guard) in &self.action_guards {
			if *name == action {
				guard(entity)?;
			}
		}

		let Some(rule) = self
			.rules
			.iter()
			.find(|rule| rule.from == current && rule.action == action)
		else {
			return Err(StateError::InvalidTransition {
				action,
				current: current.to_string(),
				available: self
					.available_transitions(current)
					.iter()
					.map(|a| a.to_string())
					.collect(),
			});
		};

		if let Some(guard) = rule.guard {
			guard(entity)?;
		}

		entity.set_previous_status(current);
		entity.set_status(rule.to);
		if let Some(effect) = rule.effect {
			effect(entity, ctx);
		}

		Ok(rule.to)
	}
}

/// Builder assembling a [`TransitionTable`].
pub struct TransitionTableBuilder<E: Stateful> {
	table: TransitionTable<E>,
}

impl<E: Stateful> TransitionTableBuilder<E> {
	/// Adds a `(from, action) -> to` row with an optional effect.
	pub fn rule(
		mut self,
		action: &'static str,
		from: E::State,
		to: E::State,
		effect: Option<Effect<E>>,
	) -> Self {
		self.table.rules.push(Rule {
			action,
			from,
			to,
			guard: None,
			effect,
		});
		self
	}

	/// Adds a row whose guard runs after lookup, before mutation.
	pub fn guarded_rule(
		mut self,
		action: &'static str,
		from: E::State,
		to: E::State,
		guard: Guard<E>,
		effect: Option<Effect<E>>,
	) -> Self {
		self.table.rules.push(Rule {
			action,
			from,
			to,
			guard: Some(guard),
			effect,
		});
		self
	}

	/// Adds a guard that fires for `action` from any state.
	pub fn action_guard(mut self, action: &'static str, guard: Guard<E>) -> Self {
		self.table.action_guards.push((action, guard));
		self
	}

	/// Declares that `action` requested while in `state` is a repeat.
	pub fn already_in_state(mut self, action: &'static str, state: E::State) -> Self {
		self.table.already_in_state.push((action, state));
		self
	}

	/// Declares a synonym mapping applied during normalization.
	pub fn synonym(mut self, from: &'static str, to: &'static str) -> Self {
		self.table.synonyms.push((from, to));
		self
	}

	/// Finishes the table.
	pub fn build(self) -> TransitionTable<E> {
		self.table
	}
}
