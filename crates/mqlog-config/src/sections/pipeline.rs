// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `[pipeline]` and `[sink]` sections. Read once at start.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Queue and writer tuning (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
	pub queue_capacity: usize,
	pub batch_size: usize,
	pub retry_max_attempts: u32,
	pub retry_base_delay: Duration,
	pub retry_max_delay: Duration,
	pub retry_jitter: bool,
	pub shutdown_grace: Duration,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			queue_capacity: 10_000,
			batch_size: 256,
			retry_max_attempts: 3,
			retry_base_delay: Duration::from_millis(50),
			retry_max_delay: Duration::from_millis(2000),
			retry_jitter: true,
			shutdown_grace: Duration::from_millis(5000),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfigLayer {
	#[serde(default)]
	pub queue_capacity: Option<usize>,
	#[serde(default)]
	pub batch_size: Option<usize>,
	#[serde(default)]
	pub retry_max_attempts: Option<u32>,
	#[serde(default)]
	pub retry_base_delay_ms: Option<u64>,
	#[serde(default)]
	pub retry_max_delay_ms: Option<u64>,
	#[serde(default)]
	pub retry_jitter: Option<bool>,
	#[serde(default)]
	pub shutdown_grace_ms: Option<u64>,
}

impl PipelineConfigLayer {
	pub fn merge(&mut self, other: PipelineConfigLayer) {
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.batch_size.is_some() {
			self.batch_size = other.batch_size;
		}
		if other.retry_max_attempts.is_some() {
			self.retry_max_attempts = other.retry_max_attempts;
		}
		if other.retry_base_delay_ms.is_some() {
			self.retry_base_delay_ms = other.retry_base_delay_ms;
		}
		if other.retry_max_delay_ms.is_some() {
			self.retry_max_delay_ms = other.retry_max_delay_ms;
		}
		if other.retry_jitter.is_some() {
			self.retry_jitter = other.retry_jitter;
		}
		if other.shutdown_grace_ms.is_some() {
			self.shutdown_grace_ms = other.shutdown_grace_ms;
		}
	}

	pub fn finalize(self) -> Result<PipelineConfig, ConfigError> {
		let defaults = PipelineConfig::default();

		let queue_capacity = self.queue_capacity.unwrap_or(defaults.queue_capacity);
		if queue_capacity == 0 {
			return Err(ConfigError::validation(
				"pipeline.queue_capacity",
				"must be at least 1",
			));
		}
		let batch_size = self.batch_size.unwrap_or(defaults.batch_size);
		if batch_size == 0 {
			return Err(ConfigError::validation(
				"pipeline.batch_size",
				"must be at least 1",
			));
		}
		let retry_max_attempts = self
			.retry_max_attempts
			.unwrap_or(defaults.retry_max_attempts);
		if retry_max_attempts == 0 {
			return Err(ConfigError::validation(
				"pipeline.retry_max_attempts",
				"must be at least 1",
			));
		}

		let retry_base_delay = self
			.retry_base_delay_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.retry_base_delay);
		let retry_max_delay = self
			.retry_max_delay_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.retry_max_delay);
		if retry_max_delay < retry_base_delay {
			return Err(ConfigError::validation(
				"pipeline.retry_max_delay_ms",
				"must not be smaller than retry_base_delay_ms",
			));
		}

		Ok(PipelineConfig {
			queue_capacity,
			batch_size,
			retry_max_attempts,
			retry_base_delay,
			retry_max_delay,
			retry_jitter: self.retry_jitter.unwrap_or(defaults.retry_jitter),
			shutdown_grace: self
				.shutdown_grace_ms
				.map(Duration::from_millis)
				.unwrap_or(defaults.shutdown_grace),
		})
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
	#[default]
	Tracing,
	File,
}

/// Where log lines go (runtime, fully resolved).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SinkConfig {
	#[default]
	Tracing,
	File { path: PathBuf },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfigLayer {
	#[serde(default, rename = "type")]
	pub kind: Option<SinkKind>,
	#[serde(default)]
	pub path: Option<PathBuf>,
}

impl SinkConfigLayer {
	pub fn merge(&mut self, other: SinkConfigLayer) {
		if other.kind.is_some() {
			self.kind = other.kind;
		}
		if other.path.is_some() {
			self.path = other.path;
		}
	}

	pub fn finalize(self) -> Result<SinkConfig, ConfigError> {
		match self.kind.unwrap_or_default() {
			SinkKind::Tracing => Ok(SinkConfig::Tracing),
			SinkKind::File => {
				let path = self
					.path
					.filter(|p| !p.as_os_str().is_empty())
					.ok_or_else(|| ConfigError::validation("sink.path", "required for the file sink"))?;
				Ok(SinkConfig::File { path })
			}
		}
	}
}
