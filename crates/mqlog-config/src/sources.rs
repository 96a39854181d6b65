// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::MessageLogConfigLayer;
use crate::sections::{
	LineFormat, PayloadConfigLayer, PipelineConfigLayer, PolicyConfigLayer, SinkConfigLayer,
	SinkKind,
};

/// Relative location of the config document below the extension home.
pub const CONFIG_FILE: &str = "conf/config.toml";

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "MQLOG";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<MessageLogConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<MessageLogConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(MessageLogConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `<home>/conf/config.toml`.
	pub fn in_home(home: &Path) -> Self {
		Self::new(home.join(CONFIG_FILE))
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<MessageLogConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(MessageLogConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: MessageLogConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `<PREFIX>_<FIELD>`, with `MQLOG` as the default prefix.
pub struct EnvSource {
	prefix: String,
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new(ENV_PREFIX)
	}
}

impl EnvSource {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	fn key(&self, field: &str) -> String {
		format!("{}_{}", self.prefix, field)
	}

	fn load_policy(&self) -> Result<PolicyConfigLayer, ConfigError> {
		let format = match env_var(&self.key("FORMAT")) {
			Some(v) => Some(v.parse::<LineFormat>().map_err(|_| ConfigError::InvalidValue {
				key: self.key("FORMAT"),
				message: format!("expected 'text' or 'json', got '{v}'"),
			})?),
			None => None,
		};

		let include = env_bool(&self.key("PAYLOAD"));
		let max_bytes = env_i64(&self.key("PAYLOAD_MAX_BYTES"))?;
		let payload = (include.is_some() || max_bytes.is_some())
			.then_some(PayloadConfigLayer { include, max_bytes });

		Ok(PolicyConfigLayer {
			enabled: env_bool(&self.key("ENABLED")),
			verbose: env_bool(&self.key("VERBOSE")),
			format,
			payload,
			..Default::default()
		})
	}

	fn load_pipeline(&self) -> Result<PipelineConfigLayer, ConfigError> {
		Ok(PipelineConfigLayer {
			queue_capacity: env_usize(&self.key("QUEUE_CAPACITY"))?,
			batch_size: env_usize(&self.key("BATCH_SIZE"))?,
			retry_max_attempts: env_u32(&self.key("RETRY_MAX_ATTEMPTS"))?,
			shutdown_grace_ms: env_u64(&self.key("SHUTDOWN_GRACE_MS"))?,
			..Default::default()
		})
	}

	fn load_sink(&self) -> Result<SinkConfigLayer, ConfigError> {
		let path = env_var(&self.key("SINK_PATH")).map(PathBuf::from);
		let kind = match env_var(&self.key("SINK_TYPE")) {
			Some(v) if v.eq_ignore_ascii_case("tracing") => Some(SinkKind::Tracing),
			Some(v) if v.eq_ignore_ascii_case("file") => Some(SinkKind::File),
			Some(v) => {
				return Err(ConfigError::InvalidValue {
					key: self.key("SINK_TYPE"),
					message: format!("expected 'tracing' or 'file', got '{v}'"),
				});
			}
			None => path.as_ref().map(|_| SinkKind::File),
		};
		Ok(SinkConfigLayer { kind, path })
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<MessageLogConfigLayer, ConfigError> {
		debug!(prefix = %self.prefix, "loading environment variables");
		Ok(MessageLogConfigLayer {
			policy: Some(self.load_policy()?),
			pipeline: Some(self.load_pipeline()?),
			sink: Some(self.load_sink()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str, type_name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {type_name} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	env_parse(name, "u32")
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	env_parse(name, "u64")
}

fn env_i64(name: &str) -> Result<Option<i64>, ConfigError> {
	env_parse(name, "i64")
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	env_parse(name, "usize")
}
