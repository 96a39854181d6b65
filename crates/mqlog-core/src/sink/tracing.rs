// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use super::{LogSink, SinkError};
use crate::format::LogLine;

/// Target every line is emitted under, so hosts can route message log
/// output separately from their own diagnostics.
pub const LOG_TARGET: &str = "mqtt_message_log";

/// Emits each line through the host's `tracing` subscriber at INFO.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl LogSink for TracingSink {
	fn name(&self) -> &str {
		"tracing"
	}

	async fn write(&self, line: &LogLine) -> Result<(), SinkError> {
		let kind = line.kind().as_str();
		let client_id = line.client_id();
		tracing::info!(
			target: LOG_TARGET,
			kind,
			client_id,
			"{}",
			line.text()
		);
		Ok(())
	}
}
