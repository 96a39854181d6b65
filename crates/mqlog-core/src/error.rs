// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use mqlog_config::ConfigError;
use thiserror::Error;

pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Failures at lifecycle boundaries. Event handling itself never errors.
#[derive(Error, Debug)]
pub enum ExtensionError {
	#[error("extension start prevented: {0}")]
	StartupPrevented(String),

	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("failed to watch {path}: {source}")]
	Watch {
		path: PathBuf,
		#[source]
		source: notify::Error,
	},

	#[error("no tokio runtime available to run the sink writer")]
	NoRuntime,
}
