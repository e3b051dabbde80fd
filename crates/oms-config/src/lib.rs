//! Configuration module for the order management service.
//!
//! This module provides structures and utilities for managing service
//! configuration. It supports loading configuration from TOML files and
//! validates that all required configuration values are properly set.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the order management service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this service instance.
	#[serde(default)]
	pub service: ServiceConfig,
	/// Configuration for the storage backend.
	#[serde(default)]
	pub storage: StorageConfig,
	/// Pricing rules applied at order creation.
	#[serde(default)]
	pub pricing: PricingConfig,
	/// Configuration for generated invoice documents.
	#[serde(default)]
	pub invoices: InvoicesConfig,
	/// Configuration for the HTTP API server.
	#[serde(default)]
	pub api: ApiConfig,
}

impl Config {
	/// Loads and validates configuration from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path)?;
		Self::from_toml_str(&contents)
	}

	/// Parses and validates configuration from a TOML string.
	pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(contents)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates cross-field constraints the type system cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.storage.backend.as_str(), "memory" | "file") {
			return Err(ConfigError::Validation(format!(
				"unknown storage backend '{}' (expected 'memory' or 'file')",
				self.storage.backend
			)));
		}
		if self.service.worker_count == 0 {
			return Err(ConfigError::Validation(
				"service.worker_count must be at least 1".to_string(),
			));
		}
		if self.service.task_soft_time_limit_secs == 0
			|| self.service.task_time_limit_secs < self.service.task_soft_time_limit_secs
		{
			return Err(ConfigError::Validation(
				"task time limits must be positive and the hard limit must not be below the soft limit"
					.to_string(),
			));
		}
		if self.pricing.tax_rate < Decimal::ZERO {
			return Err(ConfigError::Validation(
				"pricing.tax_rate must not be negative".to_string(),
			));
		}
		if self.pricing.shipping_cost < Decimal::ZERO {
			return Err(ConfigError::Validation(
				"pricing.shipping_cost must not be negative".to_string(),
			));
		}
		Ok(())
	}
}

/// Configuration specific to this service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this instance, used in logs.
	#[serde(default = "default_service_id")]
	pub id: String,
	/// Number of background tasks executing concurrently.
	#[serde(default = "default_worker_count")]
	pub worker_count: usize,
	/// Soft execution limit for background tasks, in seconds. Exceeding it
	/// logs a warning while the task keeps running.
	#[serde(default = "default_soft_time_limit")]
	pub task_soft_time_limit_secs: u64,
	/// Hard execution limit for background tasks, in seconds. Exceeding it
	/// kills the task and marks it failed.
	#[serde(default = "default_time_limit")]
	pub task_time_limit_secs: u64,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			id: default_service_id(),
			worker_count: default_worker_count(),
			task_soft_time_limit_secs: default_soft_time_limit(),
			task_time_limit_secs: default_time_limit(),
		}
	}
}

fn default_service_id() -> String {
	"oms".to_string()
}

fn default_worker_count() -> usize {
	4
}

/// 25 minutes, mirroring the queue runtime this service replaced.
fn default_soft_time_limit() -> u64 {
	25 * 60
}

/// 30 minutes.
fn default_time_limit() -> u64 {
	30 * 60
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which backend to use: `memory` or `file`.
	#[serde(default = "default_storage_backend")]
	pub backend: String,
	/// Base directory for the file backend.
	#[serde(default = "default_storage_path")]
	pub path: String,
	/// Interval in seconds for sweeping expired storage entries.
	#[serde(default = "default_cleanup_interval")]
	pub cleanup_interval_seconds: u64,
	/// Per-namespace TTLs in seconds; entries absent here never expire.
	#[serde(default)]
	pub ttl_seconds: HashMap<String, u64>,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			backend: default_storage_backend(),
			path: default_storage_path(),
			cleanup_interval_seconds: default_cleanup_interval(),
			ttl_seconds: HashMap::new(),
		}
	}
}

fn default_storage_backend() -> String {
	"file".to_string()
}

fn default_storage_path() -> String {
	"./data/storage".to_string()
}

fn default_cleanup_interval() -> u64 {
	3600
}

/// Pricing rules applied at order creation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
	/// Tax rate applied to the subtotal, e.g. "0.10" for 10%.
	#[serde(default = "default_tax_rate")]
	pub tax_rate: Decimal,
	/// Flat shipping cost added to every order.
	#[serde(default = "default_shipping_cost")]
	pub shipping_cost: Decimal,
}

impl Default for PricingConfig {
	fn default() -> Self {
		Self {
			tax_rate: default_tax_rate(),
			shipping_cost: default_shipping_cost(),
		}
	}
}

fn default_tax_rate() -> Decimal {
	Decimal::from_str("0.10").unwrap_or_default()
}

fn default_shipping_cost() -> Decimal {
	Decimal::from_str("5.00").unwrap_or_default()
}

/// Configuration for generated invoice documents.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoicesConfig {
	/// Directory the PDF files are written into; shared by all workers.
	#[serde(default = "default_invoices_directory")]
	pub directory: String,
}

impl Default for InvoicesConfig {
	fn default() -> Self {
		Self {
			directory: default_invoices_directory(),
		}
	}
}

fn default_invoices_directory() -> String {
	"./invoices".to_string()
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: default_api_enabled(),
			host: default_api_host(),
			port: default_api_port(),
		}
	}
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_minimal_config_uses_defaults() {
		let config = Config::from_toml_str("").unwrap();
		assert_eq!(config.service.id, "oms");
		assert_eq!(config.service.worker_count, 4);
		assert_eq!(config.service.task_soft_time_limit_secs, 1500);
		assert_eq!(config.service.task_time_limit_secs, 1800);
		assert_eq!(config.storage.backend, "file");
		assert_eq!(config.pricing.tax_rate, Decimal::from_str("0.10").unwrap());
		assert_eq!(
			config.pricing.shipping_cost,
			Decimal::from_str("5.00").unwrap()
		);
		assert!(config.api.enabled);
	}

	#[test]
	fn test_full_config_round_trip() {
		let config = Config::from_toml_str(
			r#"
			[service]
			id = "oms-test"
			worker_count = 2
			task_soft_time_limit_secs = 10
			task_time_limit_secs = 20

			[storage]
			backend = "memory"
			cleanup_interval_seconds = 60

			[storage.ttl_seconds]
			tasks = 604800

			[pricing]
			tax_rate = "0.20"
			shipping_cost = "7.50"

			[invoices]
			directory = "/tmp/invoices"

			[api]
			enabled = false
			port = 8080
			"#,
		)
		.unwrap();

		assert_eq!(config.service.id, "oms-test");
		assert_eq!(config.storage.backend, "memory");
		assert_eq!(config.storage.ttl_seconds.get("tasks"), Some(&604800));
		assert_eq!(config.pricing.tax_rate, Decimal::from_str("0.20").unwrap());
		assert_eq!(config.invoices.directory, "/tmp/invoices");
		assert!(!config.api.enabled);
		assert_eq!(config.api.port, 8080);
	}

	#[test]
	fn test_unknown_backend_is_rejected() {
		let err = Config::from_toml_str("[storage]\nbackend = \"redis\"\n").unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_inverted_time_limits_are_rejected() {
		let err = Config::from_toml_str(
			"[service]\ntask_soft_time_limit_secs = 100\ntask_time_limit_secs = 50\n",
		)
		.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}
}
