//! Storage module for the order management service.
//!
//! This module provides abstractions for persistent storage of service
//! data, supporting different backend implementations such as in-memory
//! or file-based storage.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use oms_types::Versioned;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs when a versioned write lost a concurrent race.
	#[error("Version conflict: expected version {expected}, stored version is {stored}")]
	VersionConflict { expected: u64, stored: u64 },
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the service. It provides basic key-value operations
/// with optional TTL support and prefix enumeration.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes with optional time-to-live.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns all keys starting with the given prefix.
	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

	/// Removes expired entries from storage (optional operation).
	/// Returns the number of entries removed.
	/// Implementations that don't support expiration can return Ok(0).
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0) // Default implementation for backends without TTL support
	}
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed data with
/// automatic serialization/deserialization, plus version-checked writes
/// for entities participating in optimistic concurrency.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
	/// Per-key write locks serializing versioned read-modify-write cycles.
	write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self {
			backend,
			write_locks: DashMap::new(),
		}
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
		self.write_locks
			.entry(key.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	/// Stores a serializable value with optional time-to-live.
	///
	/// The namespace and id are combined to form a unique key.
	/// The data is serialized to JSON before storage.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes, ttl).await
	}

	/// Stores a serializable value without time-to-live.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(namespace, id, data, None).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let key = Self::key(namespace, id);
		let bytes = self.backend.get_bytes(&key).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		self.backend.delete(&key).await
	}

	/// Updates an existing value in storage.
	///
	/// This method first checks if the key exists, then updates the value.
	/// Returns an error if the key doesn't exist, making it semantically
	/// different from store() which will create or overwrite.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);

		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}

		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes, None).await
	}

	/// Commits a versioned entity, rejecting stale writes.
	///
	/// The entity must have been read at the version it still carries; the
	/// stored version is compared under a per-key lock, the entity's
	/// version is bumped, and the new value written. A mismatch means a
	/// concurrent commit won the race and this one must not be applied.
	pub async fn update_versioned<T: Serialize + DeserializeOwned + Versioned>(
		&self,
		namespace: &str,
		id: &str,
		data: &mut T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		let lock = self.lock_for(&key);
		let _guard = lock.lock().await;

		let bytes = self.backend.get_bytes(&key).await?;
		let stored: T =
			serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;

		if stored.version() != data.version() {
			return Err(StorageError::VersionConflict {
				expected: data.version(),
				stored: stored.version(),
			});
		}

		data.set_version(data.version() + 1);
		let bytes =
			serde_json::to_vec(&*data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes, None).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		let key = Self::key(namespace, id);
		self.backend.exists(&key).await
	}

	/// Retrieves every value stored under a namespace.
	///
	/// Entries that fail to deserialize are skipped with a warning rather
	/// than failing the whole listing.
	pub async fn list<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		let prefix = format!("{}:", namespace);
		let keys = self.backend.keys(&prefix).await?;

		let mut values = Vec::with_capacity(keys.len());
		for key in keys {
			match self.backend.get_bytes(&key).await {
				Ok(bytes) => match serde_json::from_slice(&bytes) {
					Ok(value) => values.push(value),
					Err(e) => {
						tracing::warn!(key = %key, error = %e, "Skipping undecodable entry");
					}
				},
				// Deleted or expired between listing and read
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(values)
	}

	/// Removes expired entries from storage.
	///
	/// Returns the number of entries that were removed.
	/// This is a no-op for backends that don't support TTL.
	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
	struct Record {
		id: String,
		value: u32,
		version: u64,
	}

	impl Versioned for Record {
		fn version(&self) -> u64 {
			self.version
		}

		fn set_version(&mut self, version: u64) {
			self.version = version;
		}
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_store_retrieve_update_remove() {
		let storage = service();
		let record = Record {
			id: "a".to_string(),
			value: 1,
			version: 0,
		};

		storage.store("records", "a", &record).await.unwrap();
		let loaded: Record = storage.retrieve("records", "a").await.unwrap();
		assert_eq!(loaded, record);

		storage.remove("records", "a").await.unwrap();
		let missing = storage.retrieve::<Record>("records", "a").await;
		assert!(matches!(missing, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_update_requires_existing_key() {
		let storage = service();
		let record = Record {
			id: "a".to_string(),
			value: 1,
			version: 0,
		};

		let result = storage.update("records", "a", &record).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_versioned_update_bumps_version() {
		let storage = service();
		let mut record = Record {
			id: "a".to_string(),
			value: 1,
			version: 0,
		};
		storage.store("records", "a", &record).await.unwrap();

		record.value = 2;
		storage
			.update_versioned("records", "a", &mut record)
			.await
			.unwrap();
		assert_eq!(record.version, 1);

		let loaded: Record = storage.retrieve("records", "a").await.unwrap();
		assert_eq!(loaded.value, 2);
		assert_eq!(loaded.version, 1);
	}

	#[tokio::test]
	async fn test_versioned_update_rejects_stale_writer() {
		let storage = service();
		let record = Record {
			id: "a".to_string(),
			value: 1,
			version: 0,
		};
		storage.store("records", "a", &record).await.unwrap();

		// Two readers take the same snapshot; only the first commit wins.
		let mut first = record.clone();
		let mut second = record.clone();

		first.value = 2;
		storage
			.update_versioned("records", "a", &mut first)
			.await
			.unwrap();

		second.value = 3;
		let err = storage
			.update_versioned("records", "a", &mut second)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			StorageError::VersionConflict {
				expected: 0,
				stored: 1
			}
		));

		let loaded: Record = storage.retrieve("records", "a").await.unwrap();
		assert_eq!(loaded.value, 2);
	}

	#[tokio::test]
	async fn test_list_scans_namespace_only() {
		let storage = service();
		for i in 0..3u32 {
			let record = Record {
				id: format!("r{}", i),
				value: i,
				version: 0,
			};
			storage
				.store("records", &record.id, &record)
				.await
				.unwrap();
		}
		storage
			.store("other", "x", &Record {
				id: "x".to_string(),
				value: 99,
				version: 0,
			})
			.await
			.unwrap();

		let records: Vec<Record> = storage.list("records").await.unwrap();
		assert_eq!(records.len(), 3);
		assert!(records.iter().all(|r| r.value < 3));
	}
}
