// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded hand-off buffer between broker threads and the sink writer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::format::LogLine;

/// FIFO of rendered lines. When full, the newest offer is rejected and
/// counted; the queued lines stay untouched.
pub struct DispatchQueue {
	lines: Mutex<VecDeque<LogLine>>,
	capacity: usize,
	dropped: AtomicU64,
	notify: Notify,
}

impl DispatchQueue {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			lines: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
			capacity,
			dropped: AtomicU64::new(0),
			notify: Notify::new(),
		}
	}

	/// Offer a line without blocking. Returns false when the queue was full.
	pub fn offer(&self, line: LogLine) -> bool {
		{
			let mut lines = self.lines.lock();
			if lines.len() >= self.capacity {
				drop(lines);
				self.dropped.fetch_add(1, Ordering::Relaxed);
				return false;
			}
			lines.push_back(line);
		}
		self.notify.notify_one();
		true
	}

	pub fn drain(&self) -> Vec<LogLine> {
		self.lines.lock().drain(..).collect()
	}

	pub fn drain_up_to(&self, max: usize) -> Vec<LogLine> {
		let mut lines = self.lines.lock();
		let n = max.min(lines.len());
		lines.drain(..n).collect()
	}

	pub fn len(&self) -> usize {
		self.lines.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Offers rejected because the queue was full.
	pub fn dropped(&self) -> u64 {
		self.dropped.load(Ordering::Relaxed)
	}

	/// Resolves once a line has been offered since the last wake-up.
	///
	/// A wake-up sent while nobody waits is kept, so an offer racing with
	/// the writer going idle is not lost.
	pub async fn notified(&self) {
		self.notify.notified().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use mqlog_config::PacketKind;
	use std::sync::Arc;
	use std::time::Duration;

	fn line(n: usize) -> LogLine {
		LogLine::new(PacketKind::Publish, "c", Utc::now(), format!("line {n}"))
	}

	#[test]
	fn test_fifo_order() {
		let queue = DispatchQueue::new(10);
		for i in 0..5 {
			assert!(queue.offer(line(i)));
		}
		let texts: Vec<_> = queue.drain().iter().map(|l| l.text().to_string()).collect();
		assert_eq!(texts, vec!["line 0", "line 1", "line 2", "line 3", "line 4"]);
		assert!(queue.is_empty());
	}

	#[test]
	fn test_full_queue_drops_newest() {
		let queue = DispatchQueue::new(2);
		assert!(queue.offer(line(0)));
		assert!(queue.offer(line(1)));
		assert!(!queue.offer(line(2)));
		assert!(!queue.offer(line(3)));
		assert_eq!(queue.dropped(), 2);
		assert_eq!(queue.len(), 2);

		let texts: Vec<_> = queue.drain().iter().map(|l| l.text().to_string()).collect();
		assert_eq!(texts, vec!["line 0", "line 1"]);
	}

	#[test]
	fn test_drain_up_to() {
		let queue = DispatchQueue::new(10);
		for i in 0..5 {
			queue.offer(line(i));
		}
		assert_eq!(queue.drain_up_to(3).len(), 3);
		assert_eq!(queue.len(), 2);
		assert_eq!(queue.drain_up_to(10).len(), 2);
		assert!(queue.drain_up_to(10).is_empty());
	}

	#[test]
	fn test_zero_capacity_clamped() {
		let queue = DispatchQueue::new(0);
		assert_eq!(queue.capacity(), 1);
		assert!(queue.offer(line(0)));
	}

	#[tokio::test]
	async fn test_offer_before_wait_is_not_lost() {
		let queue = DispatchQueue::new(4);
		queue.offer(line(0));
		tokio::time::timeout(Duration::from_secs(1), queue.notified())
			.await
			.expect("stored wake-up should resolve immediately");
	}

	#[test]
	fn test_concurrent_offers_keep_per_producer_order() {
		let queue = Arc::new(DispatchQueue::new(10_000));
		let handles: Vec<_> = (0..4)
			.map(|producer| {
				let queue = Arc::clone(&queue);
				std::thread::spawn(move || {
					for i in 0..500 {
						let line = LogLine::new(
							PacketKind::Publish,
							format!("p{producer}"),
							Utc::now(),
							i.to_string(),
						);
						assert!(queue.offer(line));
					}
				})
			})
			.collect();
		for h in handles {
			h.join().unwrap();
		}

		let lines = queue.drain();
		assert_eq!(lines.len(), 2000);
		for producer in 0..4 {
			let id = format!("p{producer}");
			let seq: Vec<usize> = lines
				.iter()
				.filter(|l| l.client_id() == id)
				.map(|l| l.text().parse().unwrap())
				.collect();
			assert_eq!(seq, (0..500).collect::<Vec<_>>());
		}
	}
}
