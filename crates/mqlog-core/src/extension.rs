// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Start and stop hooks wiring the pipeline together.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mqlog_config::{
	config_path, load_config_with_file, ConfigError, MessageLogConfig, SinkConfig,
};
use tracing::{info, instrument, warn};

use crate::error::{ExtensionError, ExtensionResult};
use crate::event::BrokerEvent;
use crate::pipeline::{Disposition, MessageLogPipeline};
use crate::policy::{Policy, PolicyStore};
use crate::queue::DispatchQueue;
use crate::retry::RetryConfig;
use crate::sink::{FileSink, LogSink, TracingSink};
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::watch::{PolicyWatcher, DEFAULT_DEBOUNCE};
use crate::writer::{SinkWriter, SinkWriterHandle};

/// A running message log: pipeline, writer task and optional config watcher.
pub struct MessageLogExtension {
	pipeline: MessageLogPipeline,
	writer: SinkWriterHandle,
	watcher: Option<PolicyWatcher>,
	shutdown_grace: Duration,
}

impl MessageLogExtension {
	/// Load `<home>/conf/config.toml` (with defaults and environment), build
	/// the configured sink and watch the document for changes.
	#[instrument(skip_all, fields(home = %home.display()))]
	pub fn start(home: &Path) -> ExtensionResult<Self> {
		let path = config_path(home);
		let config = load_config_with_file(&path)?;
		let sink = build_sink(&config.sink);
		let watch_path = path.parent().filter(|dir| dir.is_dir()).map(|_| path.clone());
		if watch_path.is_none() {
			warn!(path = %path.display(), "config directory missing, hot reload disabled");
		}
		Self::start_with_sink(config, sink, watch_path)
	}

	/// Start with an explicit configuration and sink. Must run inside a
	/// tokio runtime.
	pub fn start_with_sink(
		config: MessageLogConfig,
		sink: Arc<dyn LogSink>,
		watch_path: Option<PathBuf>,
	) -> ExtensionResult<Self> {
		if config.policy.kinds.none_enabled() {
			let reason = "every packet kind is disabled, nothing would be logged".to_string();
			warn!(%reason, "message log extension not started");
			return Err(ExtensionError::StartupPrevented(reason));
		}
		if tokio::runtime::Handle::try_current().is_err() {
			return Err(ExtensionError::NoRuntime);
		}

		let store = Arc::new(PolicyStore::new(config.policy));
		let queue = Arc::new(DispatchQueue::new(config.pipeline.queue_capacity));
		let stats = Arc::new(PipelineStats::new());

		let sink_name = sink.name().to_string();
		let writer = SinkWriter::new(
			Arc::clone(&queue),
			sink,
			Arc::clone(&stats),
			RetryConfig::from(&config.pipeline),
			config.pipeline.batch_size,
		)
		.spawn();

		let watcher = match watch_path {
			Some(path) => Some(PolicyWatcher::start(
				Arc::clone(&store),
				path,
				DEFAULT_DEBOUNCE,
			)?),
			None => None,
		};

		info!(
			sink = %sink_name,
			queue_capacity = queue.capacity(),
			batch_size = config.pipeline.batch_size,
			hot_reload = watcher.is_some(),
			"message log extension started"
		);

		Ok(Self {
			pipeline: MessageLogPipeline::new(store, queue, stats),
			writer,
			watcher,
			shutdown_grace: config.pipeline.shutdown_grace,
		})
	}

	/// Handle for broker threads; clone freely.
	pub fn pipeline(&self) -> &MessageLogPipeline {
		&self.pipeline
	}

	pub fn on_event(&self, event: &BrokerEvent) -> Disposition {
		self.pipeline.on_event(event)
	}

	/// Explicit reload from a raw document.
	pub fn reload(&self, raw: &str) -> Result<Arc<Policy>, ConfigError> {
		self.pipeline.policy().reload(raw)
	}

	pub fn policy(&self) -> Arc<Policy> {
		self.pipeline.policy().current()
	}

	pub fn stats(&self) -> StatsSnapshot {
		self.pipeline.stats().snapshot()
	}

	pub fn is_watching(&self) -> bool {
		self.watcher.is_some()
	}

	/// Stop watching, drain the queue within the grace period and report
	/// the final counters.
	#[instrument(skip_all)]
	pub async fn stop(self) -> StatsSnapshot {
		drop(self.watcher);
		let snapshot = self.writer.shutdown(self.shutdown_grace).await;
		info!(
			events_seen = snapshot.events_seen,
			lines_written = snapshot.lines_written,
			lines_dropped = snapshot.lines_dropped,
			sink_errors = snapshot.sink_errors,
			"message log extension stopped"
		);
		snapshot
	}
}

fn build_sink(config: &SinkConfig) -> Arc<dyn LogSink> {
	match config {
		SinkConfig::Tracing => Arc::new(TracingSink::new()),
		SinkConfig::File { path } => Arc::new(FileSink::new(path.clone())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::packet_type;
	use mqlog_config::{Direction, KindFlags};

	#[tokio::test]
	async fn test_startup_prevented_when_all_kinds_disabled() {
		let mut config = MessageLogConfig::default();
		config.policy.kinds = KindFlags::all_disabled();
		let result = MessageLogExtension::start_with_sink(config, Arc::new(TracingSink::new()), None);
		assert!(matches!(result, Err(ExtensionError::StartupPrevented(_))));
	}

	#[test]
	fn test_start_requires_runtime() {
		let result = MessageLogExtension::start_with_sink(
			MessageLogConfig::default(),
			Arc::new(TracingSink::new()),
			None,
		);
		assert!(matches!(result, Err(ExtensionError::NoRuntime)));
	}

	#[tokio::test]
	async fn test_start_from_home_with_file_sink() {
		let home = tempfile::tempdir().unwrap();
		let log_path = home.path().join("messages.log");
		std::fs::create_dir_all(home.path().join("conf")).unwrap();
		std::fs::write(
			home.path().join("conf/config.toml"),
			format!(
				"[sink]\ntype = \"file\"\npath = \"{}\"\n",
				log_path.display()
			),
		)
		.unwrap();

		let extension = MessageLogExtension::start(home.path()).unwrap();
		assert!(extension.is_watching());

		let event = BrokerEvent::builder(packet_type::CONNECT, Direction::Inbound)
			.client_id("c1")
			.build();
		assert_eq!(extension.on_event(&event), Disposition::Queued);

		let snapshot = extension.stop().await;
		assert_eq!(snapshot.lines_written, 1);
		let content = std::fs::read_to_string(&log_path).unwrap();
		assert!(content.contains("kind=CONNECT"));
		assert!(content.contains("client=\"c1\""));
	}

	#[tokio::test]
	async fn test_start_without_conf_dir_disables_watch() {
		let home = tempfile::tempdir().unwrap();
		let extension = MessageLogExtension::start(home.path()).unwrap();
		assert!(!extension.is_watching());
		extension.stop().await;
	}

	#[tokio::test]
	async fn test_start_rejects_invalid_document() {
		let home = tempfile::tempdir().unwrap();
		std::fs::create_dir_all(home.path().join("conf")).unwrap();
		std::fs::write(home.path().join("conf/config.toml"), "[policy]\nformat = \"xml\"\n").unwrap();
		let result = MessageLogExtension::start(home.path());
		assert!(matches!(result, Err(ExtensionError::Config(_))));
	}
}
