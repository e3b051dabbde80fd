//! Storage-related types for the order management service.

use std::str::FromStr;

/// Storage namespaces for the different data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Namespace for order entities.
	Orders,
	/// Namespace for return entities.
	Returns,
	/// Namespace for payment entities.
	Payments,
	/// Namespace for invoice records.
	Invoices,
	/// Namespace for durable background task envelopes.
	Tasks,
	/// Index mapping order numbers to order ids.
	OrderByNumber,
	/// Index mapping return numbers to return ids.
	ReturnByNumber,
	/// Index mapping payment numbers to payment ids.
	PaymentByNumber,
}

impl StorageKey {
	/// Returns the string representation of the storage namespace.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Returns => "returns",
			StorageKey::Payments => "payments",
			StorageKey::Invoices => "invoices",
			StorageKey::Tasks => "tasks",
			StorageKey::OrderByNumber => "order_by_number",
			StorageKey::ReturnByNumber => "return_by_number",
			StorageKey::PaymentByNumber => "payment_by_number",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Returns,
			Self::Payments,
			Self::Invoices,
			Self::Tasks,
			Self::OrderByNumber,
			Self::ReturnByNumber,
			Self::PaymentByNumber,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"returns" => Ok(Self::Returns),
			"payments" => Ok(Self::Payments),
			"invoices" => Ok(Self::Invoices),
			"tasks" => Ok(Self::Tasks),
			"order_by_number" => Ok(Self::OrderByNumber),
			"return_by_number" => Ok(Self::ReturnByNumber),
			"payment_by_number" => Ok(Self::PaymentByNumber),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}

/// Entities that carry an optimistic concurrency version.
///
/// The storage service bumps the version on every committed write and
/// rejects writes whose expected version no longer matches the stored one,
/// so two concurrent read-modify-write cycles cannot both succeed.
pub trait Versioned {
	/// Current version of the entity.
	fn version(&self) -> u64;
	/// Overwrites the version; called by the storage service on commit.
	fn set_version(&mut self, version: u64);
}
