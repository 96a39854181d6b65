// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::format::LogLine;

pub mod file;
pub mod tracing;

pub use self::file::FileSink;
pub use self::tracing::TracingSink;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
	#[error("transient error: {0}")]
	Transient(String),

	#[error("permanent error: {0}")]
	Permanent(String),
}

impl SinkError {
	pub fn is_transient(&self) -> bool {
		matches!(self, SinkError::Transient(_))
	}
}

#[async_trait]
pub trait LogSink: Send + Sync {
	/// Unique name for this sink (used in logs).
	fn name(&self) -> &str;

	/// Write one line.
	async fn write(&self, line: &LogLine) -> Result<(), SinkError>;

	/// Called after each batch (optional, default: Ok).
	async fn flush(&self) -> Result<(), SinkError> {
		Ok(())
	}
}
