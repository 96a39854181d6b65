// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background task that drains the dispatch queue into a sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::format::LogLine;
use crate::queue::DispatchQueue;
use crate::retry::{retry, RetryConfig};
use crate::sink::LogSink;
use crate::stats::{PipelineStats, StatsSnapshot};

pub struct SinkWriter {
	queue: Arc<DispatchQueue>,
	sink: Arc<dyn LogSink>,
	stats: Arc<PipelineStats>,
	retry: RetryConfig,
	batch_size: usize,
	in_flight: Arc<AtomicU64>,
}

impl SinkWriter {
	pub fn new(
		queue: Arc<DispatchQueue>,
		sink: Arc<dyn LogSink>,
		stats: Arc<PipelineStats>,
		retry: RetryConfig,
		batch_size: usize,
	) -> Self {
		Self {
			queue,
			sink,
			stats,
			retry,
			batch_size: batch_size.max(1),
			in_flight: Arc::new(AtomicU64::new(0)),
		}
	}

	/// Start draining on the current tokio runtime.
	pub fn spawn(self) -> SinkWriterHandle {
		let token = CancellationToken::new();
		let queue = Arc::clone(&self.queue);
		let stats = Arc::clone(&self.stats);
		let in_flight = Arc::clone(&self.in_flight);
		let task = tokio::spawn(self.run(token.clone()));
		SinkWriterHandle {
			token,
			task,
			queue,
			stats,
			in_flight,
		}
	}

	async fn run(self, token: CancellationToken) {
		info!(
			sink = self.sink.name(),
			batch_size = self.batch_size,
			"message log writer started"
		);

		loop {
			tokio::select! {
				biased;
				_ = token.cancelled() => break,
				_ = self.queue.notified() => self.drain_available().await,
			}
		}

		debug!(remaining = self.queue.len(), "message log writer draining");
		self.drain_available().await;
		info!(sink = self.sink.name(), "message log writer stopped");
	}

	async fn drain_available(&self) {
		loop {
			let batch = self.queue.drain_up_to(self.batch_size);
			if batch.is_empty() {
				break;
			}
			self.write_batch(batch).await;
		}
	}

	async fn write_batch(&self, batch: Vec<LogLine>) {
		let total = batch.len();
		self.in_flight.store(total as u64, Ordering::SeqCst);

		for (i, line) in batch.iter().enumerate() {
			match retry(&self.retry, || self.sink.write(line)).await {
				Ok(()) => {
					self.stats.record_written();
					self.in_flight.fetch_sub(1, Ordering::SeqCst);
				}
				Err(e) => {
					let dropped = (total - i) as u64;
					self.in_flight.store(0, Ordering::SeqCst);
					self.stats.record_sink_error();
					self.stats.record_dropped(dropped);
					warn!(
						sink = self.sink.name(),
						error = %e,
						dropped,
						"message log batch abandoned"
					);
					break;
				}
			}
		}

		if let Err(e) = self.sink.flush().await {
			warn!(sink = self.sink.name(), error = %e, "message log sink flush failed");
		}
	}
}

/// Owner of a running [`SinkWriter`].
pub struct SinkWriterHandle {
	token: CancellationToken,
	task: JoinHandle<()>,
	queue: Arc<DispatchQueue>,
	stats: Arc<PipelineStats>,
	in_flight: Arc<AtomicU64>,
}

impl SinkWriterHandle {
	/// Stop the writer, letting it drain for at most `grace`.
	///
	/// Lines still queued or in flight when the grace period ends are
	/// discarded and counted as dropped.
	pub async fn shutdown(mut self, grace: Duration) -> StatsSnapshot {
		self.token.cancel();

		match tokio::time::timeout(grace, &mut self.task).await {
			Ok(Ok(())) => {}
			Ok(Err(e)) => {
				warn!(error = %e, "message log writer task failed");
				self.discard_remaining();
			}
			Err(_) => {
				self.task.abort();
				// The task may still be running on another worker until it
				// reaches its next await point.
				let _ = (&mut self.task).await;
				let discarded = self.discard_remaining();
				warn!(
					grace_ms = grace.as_millis() as u64,
					discarded,
					"message log writer did not finish within grace period"
				);
			}
		}

		self.stats.snapshot()
	}

	fn discard_remaining(&self) -> u64 {
		let discarded =
			self.in_flight.swap(0, Ordering::SeqCst) + self.queue.drain().len() as u64;
		self.stats.record_dropped(discarded);
		discarded
	}
}
