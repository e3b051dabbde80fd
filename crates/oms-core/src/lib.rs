//! Core orchestration for the order management service.
//!
//! This crate wraps entity mutation, lifecycle evaluation, committed
//! persistence, and post-commit task enqueueing into one layer. The
//! [`engine::OmsEngine`] wires the services to a storage backend, the
//! durable task queue, and the event bus, and owns the background worker
//! pool.

use thiserror::Error;

use oms_state::StateError;
use oms_storage::StorageError;

/// Engine wiring, builder, and event bus.
pub mod engine;
/// Orchestration services for orders, returns, payments, and invoices.
pub mod services;

pub use engine::{EventBus, OmsBuilder, OmsEngine};
pub use services::{
	InvoiceFilter, InvoiceService, OrderFilter, OrderService, PaymentFilter, PaymentService,
	ReturnFilter, ReturnService,
};

/// Errors surfaced by the orchestration layer.
#[derive(Debug, Error)]
pub enum OmsError {
	/// Lifecycle evaluation or refund rule rejection.
	#[error(transparent)]
	State(#[from] StateError),
	/// A reference points at a missing or foreign entity.
	#[error("{0}")]
	Reference(String),
	/// The requested entity does not exist.
	#[error("{0}")]
	NotFound(String),
	/// The request payload is structurally invalid.
	#[error("{0}")]
	Validation(String),
	/// A concurrent commit won the race for this entity.
	#[error("{0}")]
	Conflict(String),
	/// Failure in the storage layer.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl OmsError {
	/// Maps a storage failure on an entity lookup/commit into the
	/// caller-facing taxonomy.
	fn from_storage(entity: &str, id: &str, err: StorageError) -> Self {
		match err {
			StorageError::NotFound => OmsError::NotFound(format!("{} {} not found", entity, id)),
			StorageError::VersionConflict { .. } => OmsError::Conflict(format!(
				"{} {} was modified concurrently, retry the request",
				entity, id
			)),
			other => OmsError::Storage(other.to_string()),
		}
	}
}
