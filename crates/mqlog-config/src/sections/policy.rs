// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `[policy]` section: what gets logged and how it is rendered.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::kinds::{KindFlags, KindToggle};
use super::topics::{TopicRules, TopicsConfigLayer};
use crate::error::ConfigError;

pub const DEFAULT_PAYLOAD_MAX_BYTES: usize = 4096;

/// Rendering of a log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
	#[default]
	Text,
	Json,
}

impl FromStr for LineFormat {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"text" => Ok(LineFormat::Text),
			"json" => Ok(LineFormat::Json),
			_ => Err(()),
		}
	}
}

/// A field that may be masked or removed before a record is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Redaction {
	ClientId,
	Topic,
	Payload,
	ReasonString,
	UserProperties,
}

impl Redaction {
	pub fn as_str(&self) -> &'static str {
		match self {
			Redaction::ClientId => "client_id",
			Redaction::Topic => "topic",
			Redaction::Payload => "payload",
			Redaction::ReasonString => "reason_string",
			Redaction::UserProperties => "user_properties",
		}
	}
}

impl fmt::Display for Redaction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Redaction {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"client_id" => Ok(Redaction::ClientId),
			"topic" => Ok(Redaction::Topic),
			"payload" => Ok(Redaction::Payload),
			"reason_string" => Ok(Redaction::ReasonString),
			"user_properties" => Ok(Redaction::UserProperties),
			_ => Err(()),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadConfig {
	pub include: bool,
	pub max_bytes: usize,
}

impl Default for PayloadConfig {
	fn default() -> Self {
		Self {
			include: true,
			max_bytes: DEFAULT_PAYLOAD_MAX_BYTES,
		}
	}
}

/// Fully resolved logging policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
	pub enabled: bool,
	pub verbose: bool,
	pub format: LineFormat,
	pub kinds: KindFlags,
	pub topics: TopicRules,
	pub payload: PayloadConfig,
	pub redact: BTreeSet<Redaction>,
}

impl Default for PolicyConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			verbose: false,
			format: LineFormat::Text,
			kinds: KindFlags::all_enabled(),
			topics: TopicRules::default(),
			payload: PayloadConfig::default(),
			redact: BTreeSet::new(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayloadConfigLayer {
	#[serde(default)]
	pub include: Option<bool>,
	#[serde(default)]
	pub max_bytes: Option<i64>,
}

impl PayloadConfigLayer {
	pub fn merge(&mut self, other: PayloadConfigLayer) {
		if other.include.is_some() {
			self.include = other.include;
		}
		if other.max_bytes.is_some() {
			self.max_bytes = other.max_bytes;
		}
	}

	pub fn finalize(self) -> Result<PayloadConfig, ConfigError> {
		let max_bytes = match self.max_bytes {
			Some(value) if value < 0 => {
				return Err(ConfigError::NegativeLimit {
					field: "policy.payload.max_bytes".to_string(),
					value,
				});
			}
			Some(value) => usize::try_from(value).map_err(|_| ConfigError::InvalidValue {
				key: "policy.payload.max_bytes".to_string(),
				message: format!("{value} does not fit in memory"),
			})?,
			None => DEFAULT_PAYLOAD_MAX_BYTES,
		};
		Ok(PayloadConfig {
			include: self.include.unwrap_or(true),
			max_bytes,
		})
	}
}

/// `[policy]` layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub verbose: Option<bool>,
	#[serde(default)]
	pub format: Option<LineFormat>,
	#[serde(default)]
	pub redact: Option<Vec<String>>,
	#[serde(default)]
	pub payload: Option<PayloadConfigLayer>,
	#[serde(default)]
	pub kinds: Option<BTreeMap<String, KindToggle>>,
	#[serde(default)]
	pub topics: Option<TopicsConfigLayer>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: PolicyConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.verbose.is_some() {
			self.verbose = other.verbose;
		}
		if other.format.is_some() {
			self.format = other.format;
		}
		if other.redact.is_some() {
			self.redact = other.redact;
		}
		match (self.payload.as_mut(), other.payload) {
			(Some(base), Some(over)) => base.merge(over),
			(None, Some(over)) => self.payload = Some(over),
			_ => {}
		}
		match (self.kinds.as_mut(), other.kinds) {
			(Some(base), Some(over)) => base.extend(over),
			(None, Some(over)) => self.kinds = Some(over),
			_ => {}
		}
		match (self.topics.as_mut(), other.topics) {
			(Some(base), Some(over)) => base.merge(over),
			(None, Some(over)) => self.topics = Some(over),
			_ => {}
		}
	}

	pub fn finalize(self) -> Result<PolicyConfig, ConfigError> {
		let kinds = match &self.kinds {
			Some(table) => KindFlags::from_table(table)?,
			None => KindFlags::all_enabled(),
		};
		let topics = self.topics.unwrap_or_default().finalize()?;
		let payload = self.payload.unwrap_or_default().finalize()?;

		let mut redact = BTreeSet::new();
		for (i, name) in self.redact.unwrap_or_default().into_iter().enumerate() {
			let redaction = name
				.parse::<Redaction>()
				.map_err(|_| ConfigError::UnknownRedaction {
					field: format!("policy.redact[{i}]"),
					name: name.clone(),
				})?;
			redact.insert(redaction);
		}

		Ok(PolicyConfig {
			enabled: self.enabled.unwrap_or(true),
			verbose: self.verbose.unwrap_or(false),
			format: self.format.unwrap_or_default(),
			kinds,
			topics,
			payload,
			redact,
		})
	}
}
