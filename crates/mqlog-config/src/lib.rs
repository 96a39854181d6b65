// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the MQTT message log extension.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Validation that names the offending document field
//! - The vocabulary shared with the pipeline (packet kinds, topic patterns, redactions)
//!
//! # Usage
//!
//! ```ignore
//! use mqlog_config::load_config;
//!
//! let config = load_config(Path::new("/opt/broker/extensions/mqtt-message-log"))?;
//! println!("queue capacity {}", config.pipeline.queue_capacity);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::MessageLogConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, CONFIG_FILE, ENV_PREFIX,
};

use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Fully resolved extension configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLogConfig {
	pub policy: PolicyConfig,
	pub pipeline: PipelineConfig,
	pub sink: SinkConfig,
}

/// Path of the config document for an extension home directory.
pub fn config_path(home: &Path) -> PathBuf {
	home.join(CONFIG_FILE)
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`MQLOG_*`)
/// 2. Config file (`<home>/conf/config.toml`)
/// 3. Built-in defaults
pub fn load_config(home: &Path) -> Result<MessageLogConfig, ConfigError> {
	load_config_with_file(config_path(home))
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<MessageLogConfig, ConfigError> {
	load_config_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::default()),
	])
}

/// Merge the given sources in precedence order and finalize.
pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<MessageLogConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = MessageLogConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Parse and validate a raw TOML document on its own, without the
/// environment or file layers.
pub fn parse_document(raw: &str) -> Result<MessageLogConfig, ConfigError> {
	let layer: MessageLogConfigLayer = toml::from_str(raw).map_err(ConfigError::DocumentParse)?;
	finalize(layer)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: MessageLogConfigLayer) -> Result<MessageLogConfig, ConfigError> {
	let policy = layer.policy.unwrap_or_default().finalize()?;
	let pipeline = layer.pipeline.unwrap_or_default().finalize()?;
	let sink = layer.sink.unwrap_or_default().finalize()?;

	info!(
		enabled = policy.enabled,
		format = ?policy.format,
		verbose = policy.verbose,
		topic_rules = policy.topics.rules.len(),
		payload = policy.payload.include,
		queue_capacity = pipeline.queue_capacity,
		sink = ?sink,
		"Message log configuration loaded"
	);

	Ok(MessageLogConfig {
		policy,
		pipeline,
		sink,
	})
}
