// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration error types.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error("Failed to parse TOML config at {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to parse config document: {0}")]
	DocumentParse(#[source] toml::de::Error),

	#[error("Failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Unknown packet kind '{name}' in {field}")]
	UnknownPacketKind { field: String, name: String },

	#[error("Malformed topic pattern '{pattern}' in {field}: {reason}")]
	MalformedTopicPattern {
		field: String,
		pattern: String,
		reason: String,
	},

	#[error("Negative value {value} for {field}")]
	NegativeLimit { field: String, value: i64 },

	#[error("Unknown redaction field '{name}' in {field}")]
	UnknownRedaction { field: String, name: String },

	#[error("Validation error in {field}: {message}")]
	Validation { field: String, message: String },
}

impl ConfigError {
	/// Dotted path of the offending document field, when the error is tied to one.
	pub fn field(&self) -> Option<&str> {
		match self {
			ConfigError::InvalidValue { key, .. } => Some(key),
			ConfigError::UnknownPacketKind { field, .. }
			| ConfigError::MalformedTopicPattern { field, .. }
			| ConfigError::NegativeLimit { field, .. }
			| ConfigError::UnknownRedaction { field, .. }
			| ConfigError::Validation { field, .. } => Some(field),
			ConfigError::TomlParse { .. }
			| ConfigError::DocumentParse(_)
			| ConfigError::FileRead { .. } => None,
		}
	}

	pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
		ConfigError::Validation {
			field: field.into(),
			message: message.into(),
		}
	}
}
