// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The per-event entry point called on broker threads.

use std::sync::Arc;

use crate::classify::{classify, kind_for};
use crate::event::BrokerEvent;
use crate::filter::should_emit;
use crate::format::format;
use crate::policy::PolicyStore;
use crate::queue::DispatchQueue;
use crate::stats::PipelineStats;

/// What happened to an event handed to [`MessageLogPipeline::on_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
	Queued,
	Filtered,
	/// Accepted but the queue was full.
	Dropped,
}

/// Classify, filter, format and enqueue on the calling thread.
///
/// Cheap to clone; clones share the policy store, queue and counters.
#[derive(Clone)]
pub struct MessageLogPipeline {
	policy: Arc<PolicyStore>,
	queue: Arc<DispatchQueue>,
	stats: Arc<PipelineStats>,
}

impl MessageLogPipeline {
	pub fn new(
		policy: Arc<PolicyStore>,
		queue: Arc<DispatchQueue>,
		stats: Arc<PipelineStats>,
	) -> Self {
		Self {
			policy,
			queue,
			stats,
		}
	}

	/// Never blocks on I/O and never fails.
	pub fn on_event(&self, event: &BrokerEvent) -> Disposition {
		self.stats.record_seen();
		let policy = self.policy.current();

		// Skip classification for events the policy rejects outright.
		if !policy.enabled || !policy.kinds.allows(kind_for(event.packet_type), event.direction) {
			self.stats.record_filtered();
			return Disposition::Filtered;
		}

		let Some(record) = should_emit(classify(event), &policy) else {
			self.stats.record_filtered();
			return Disposition::Filtered;
		};

		let line = format(&record, &policy.format);
		if self.queue.offer(line) {
			self.stats.record_queued();
			Disposition::Queued
		} else {
			self.stats.record_dropped(1);
			Disposition::Dropped
		}
	}

	pub fn policy(&self) -> &Arc<PolicyStore> {
		&self.policy
	}

	pub fn queue(&self) -> &Arc<DispatchQueue> {
		&self.queue
	}

	pub fn stats(&self) -> &Arc<PipelineStats> {
		&self.stats
	}
}
