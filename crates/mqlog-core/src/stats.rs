// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct PipelineStats {
	events_seen: AtomicU64,
	events_filtered: AtomicU64,
	lines_queued: AtomicU64,
	lines_written: AtomicU64,
	lines_dropped: AtomicU64,
	sink_errors: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
	pub events_seen: u64,
	pub events_filtered: u64,
	pub lines_queued: u64,
	pub lines_written: u64,
	/// Queue-full rejections plus lines the writer gave up on.
	pub lines_dropped: u64,
	pub sink_errors: u64,
}

impl PipelineStats {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_seen(&self) {
		self.events_seen.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_filtered(&self) {
		self.events_filtered.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_queued(&self) {
		self.lines_queued.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_written(&self) {
		self.lines_written.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_dropped(&self, n: u64) {
		self.lines_dropped.fetch_add(n, Ordering::Relaxed);
	}

	pub fn record_sink_error(&self) {
		self.sink_errors.fetch_add(1, Ordering::Relaxed);
	}

	pub fn snapshot(&self) -> StatsSnapshot {
		StatsSnapshot {
			events_seen: self.events_seen.load(Ordering::Relaxed),
			events_filtered: self.events_filtered.load(Ordering::Relaxed),
			lines_queued: self.lines_queued.load(Ordering::Relaxed),
			lines_written: self.lines_written.load(Ordering::Relaxed),
			lines_dropped: self.lines_dropped.load(Ordering::Relaxed),
			sink_errors: self.sink_errors.load(Ordering::Relaxed),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_counters_accumulate() {
		let stats = PipelineStats::new();
		stats.record_seen();
		stats.record_seen();
		stats.record_filtered();
		stats.record_queued();
		stats.record_dropped(3);
		stats.record_sink_error();

		let snap = stats.snapshot();
		assert_eq!(snap.events_seen, 2);
		assert_eq!(snap.events_filtered, 1);
		assert_eq!(snap.lines_queued, 1);
		assert_eq!(snap.lines_dropped, 3);
		assert_eq!(snap.sink_errors, 1);
		assert_eq!(snap.lines_written, 0);
	}

	#[test]
	fn test_snapshot_serializes() {
		let json = serde_json::to_value(StatsSnapshot::default()).unwrap();
		assert_eq!(json["lines_dropped"], 0);
		assert_eq!(json.as_object().unwrap().len(), 6);
	}
}
