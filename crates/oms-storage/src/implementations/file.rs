//! File-based storage backend implementation.
//!
//! Stores each entry as a binary file under a per-namespace directory,
//! providing simple persistence without external dependencies. Files carry
//! a fixed-size header with TTL information for automatic expiration.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use oms_types::StorageKey;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Fixed-size file header for TTL support.
///
/// Binary layout (64 bytes total):
/// - bytes 0-3: magic bytes "OMSF"
/// - bytes 4-5: version (u16, little-endian)
/// - bytes 6-13: expiration timestamp (u64, little-endian, Unix seconds, 0 = never)
/// - bytes 14-63: reserved/padding for future use
#[derive(Debug, Clone)]
struct FileHeader {
	magic: [u8; 4],
	version: u16,
	expires_at: u64,
	padding: [u8; 50],
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"OMSF";
	const VERSION: u16 = 1;
	const SIZE: usize = 64;

	/// Creates a new header with the given TTL.
	fn new(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0 // Permanent storage
		} else {
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.unwrap_or_default()
				.as_secs()
				.saturating_add(ttl.as_secs())
		};

		Self {
			magic: *Self::MAGIC,
			version: Self::VERSION,
			expires_at,
			padding: [0; 50],
		}
	}

	/// Serializes the header to bytes.
	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(&self.magic);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes[14..64].copy_from_slice(&self.padding);
		bytes
	}

	/// Deserializes a header from bytes.
	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}

		let mut magic = [0u8; 4];
		magic.copy_from_slice(&bytes[0..4]);
		if magic != *Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized file format".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		let mut expires_bytes = [0u8; 8];
		expires_bytes.copy_from_slice(&bytes[6..14]);
		let expires_at = u64::from_le_bytes(expires_bytes);

		let mut padding = [0u8; 50];
		padding.copy_from_slice(&bytes[14..64]);

		Ok(Self {
			magic,
			version,
			expires_at,
			padding,
		})
	}

	/// Checks if the data has expired.
	fn is_expired(&self) -> bool {
		if self.expires_at == 0 {
			return false; // Permanent storage
		}

		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default()
			.as_secs();

		now >= self.expires_at
	}
}

/// TTL configuration for the different storage namespaces.
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	/// Creates a TTL config from per-namespace durations in seconds.
	pub fn new(ttls: HashMap<StorageKey, u64>) -> Self {
		Self {
			ttls: ttls
				.into_iter()
				.map(|(key, secs)| (key, Duration::from_secs(secs)))
				.collect(),
		}
	}

	/// Gets the TTL for a specific namespace; zero means permanent.
	fn get_ttl(&self, storage_key: StorageKey) -> Duration {
		self.ttls
			.get(&storage_key)
			.copied()
			.unwrap_or(Duration::ZERO)
	}
}

/// File-based storage implementation.
///
/// Keys of the form `namespace:id` map to `<base>/<namespace>/<id>.bin`,
/// which keeps prefix enumeration a directory listing. Writes go through a
/// temp file and an atomic rename so readers never observe partial data.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// TTL configuration for the storage namespaces.
	ttl_config: TtlConfig,
}

impl FileStorage {
	/// Creates a new FileStorage instance with the specified base path and TTL config.
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Self {
		Self {
			base_path,
			ttl_config,
		}
	}

	/// Splits a storage key into its namespace and id parts.
	fn split_key(key: &str) -> (&str, &str) {
		match key.split_once(':') {
			Some((namespace, id)) => (namespace, id),
			None => ("", key),
		}
	}

	/// Converts a storage key to a filesystem-safe file path.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let (namespace, id) = Self::split_key(key);
		let safe_id = id.replace(['/', ':', '\\'], "_");
		if namespace.is_empty() {
			self.base_path.join(format!("{}.bin", safe_id))
		} else {
			self.base_path
				.join(namespace)
				.join(format!("{}.bin", safe_id))
		}
	}

	/// Gets the TTL for a given key based on its namespace.
	fn get_ttl_for_key(&self, key: &str) -> Duration {
		let (namespace, _) = Self::split_key(key);
		namespace
			.parse::<StorageKey>()
			.map(|sk| self.ttl_config.get_ttl(sk))
			.unwrap_or(Duration::ZERO)
	}

	/// Removes all expired files from storage.
	async fn cleanup_expired_files(&self) -> Result<usize, StorageError> {
		let mut removed = 0;
		for storage_key in StorageKey::all() {
			let dir = self.base_path.join(storage_key.as_str());
			if !dir.exists() {
				continue;
			}
			let mut entries = fs::read_dir(&dir)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;

			while let Some(entry) = entries
				.next_entry()
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?
			{
				let path = entry.path();
				if path.extension() != Some(std::ffi::OsStr::new("bin")) {
					continue;
				}
				match fs::read(&path).await {
					Ok(data) if data.len() >= FileHeader::SIZE => {
						if let Ok(header) = FileHeader::deserialize(&data[..FileHeader::SIZE]) {
							if header.is_expired() {
								match fs::remove_file(&path).await {
									Ok(_) => removed += 1,
									Err(e) => {
										tracing::warn!(
											"Failed to remove expired file {:?}: {}",
											path,
											e
										);
									}
								}
							}
						}
					}
					Ok(_) => {
						tracing::debug!("Skipping file {:?}: too small for header", path);
					}
					Err(e) => {
						tracing::debug!("Skipping file {:?}: could not be read: {}", path, e);
					}
				}
			}
		}
		Ok(removed)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			}
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let header = FileHeader::deserialize(&data)?;
		if header.is_expired() {
			return Err(StorageError::NotFound);
		}

		if data.len() > FileHeader::SIZE {
			Ok(data[FileHeader::SIZE..].to_vec())
		} else {
			Ok(Vec::new())
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// Use the provided TTL, or fall back to the namespace default
		let ttl = ttl.unwrap_or_else(|| self.get_ttl_for_key(key));

		let header = FileHeader::new(ttl);
		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&header.serialize());
		file_data.extend_from_slice(&value);

		// Write atomically by writing to a temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.get_file_path(key);
		Ok(path.exists())
	}

	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let (namespace, id_prefix) = match prefix.split_once(':') {
			Some((namespace, rest)) => (namespace, rest),
			None => (prefix, ""),
		};

		let dir = self.base_path.join(namespace);
		if !dir.exists() {
			return Ok(Vec::new());
		}

		let mut keys = Vec::new();
		let mut entries = fs::read_dir(&dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("bin")) {
				continue;
			}
			if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
				if stem.starts_with(id_prefix) {
					keys.push(format!("{}:{}", namespace, stem));
				}
			}
		}
		keys.sort();
		Ok(keys)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.cleanup_expired_files().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn storage(dir: &tempfile::TempDir) -> FileStorage {
		FileStorage::new(dir.path().to_path_buf(), TtlConfig::default())
	}

	#[tokio::test]
	async fn test_round_trip_and_delete() {
		let dir = tempdir().unwrap();
		let storage = storage(&dir);

		storage
			.set_bytes("orders:abc", b"payload".to_vec(), None)
			.await
			.unwrap();
		assert!(storage.exists("orders:abc").await.unwrap());
		assert_eq!(storage.get_bytes("orders:abc").await.unwrap(), b"payload");

		storage.delete("orders:abc").await.unwrap();
		assert!(!storage.exists("orders:abc").await.unwrap());
		assert!(matches!(
			storage.get_bytes("orders:abc").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_keys_lists_namespace_directory() {
		let dir = tempdir().unwrap();
		let storage = storage(&dir);

		storage.set_bytes("orders:a", b"1".to_vec(), None).await.unwrap();
		storage.set_bytes("orders:b", b"2".to_vec(), None).await.unwrap();
		storage.set_bytes("tasks:c", b"3".to_vec(), None).await.unwrap();

		let keys = storage.keys("orders:").await.unwrap();
		assert_eq!(keys, vec!["orders:a".to_string(), "orders:b".to_string()]);

		let empty = storage.keys("returns:").await.unwrap();
		assert!(empty.is_empty());
	}

	#[tokio::test]
	async fn test_expired_entry_reads_as_missing_and_is_swept() {
		let dir = tempdir().unwrap();
		let storage = storage(&dir);

		// A sub-second TTL truncates to an expiry stamp of "now", which
		// is already expired by the read below.
		storage
			.set_bytes(
				"tasks:gone",
				b"x".to_vec(),
				Some(Duration::from_nanos(1)),
			)
			.await
			.unwrap();

		assert!(matches!(
			storage.get_bytes("tasks:gone").await,
			Err(StorageError::NotFound)
		));
		let removed = storage.cleanup_expired().await.unwrap();
		assert_eq!(removed, 1);
	}
}
