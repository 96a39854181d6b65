// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Versioned policy snapshots and the store that swaps them.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use mqlog_config::{
	load_config_with_file, parse_document, ConfigError, KindFlags, LineFormat, PolicyConfig,
	Redaction, TopicRules,
};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::classify::PAYLOAD_CAPTURE_CEILING;

/// How accepted records are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
	pub format: LineFormat,
	pub verbose: bool,
}

/// An immutable policy snapshot. A reload builds a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
	pub version: u64,
	pub enabled: bool,
	pub kinds: KindFlags,
	pub topics: TopicRules,
	pub include_payload: bool,
	/// Never above [`PAYLOAD_CAPTURE_CEILING`].
	pub payload_max_bytes: usize,
	pub redact: BTreeSet<Redaction>,
	pub format: FormatOptions,
}

impl Policy {
	pub fn from_config(version: u64, config: PolicyConfig) -> Self {
		Self {
			version,
			enabled: config.enabled,
			kinds: config.kinds,
			topics: config.topics,
			include_payload: config.payload.include,
			payload_max_bytes: config.payload.max_bytes.min(PAYLOAD_CAPTURE_CEILING),
			redact: config.redact,
			format: FormatOptions {
				format: config.format,
				verbose: config.verbose,
			},
		}
	}

	pub fn redacts(&self, field: Redaction) -> bool {
		self.redact.contains(&field)
	}
}

impl Default for Policy {
	fn default() -> Self {
		Self::from_config(1, PolicyConfig::default())
	}
}

/// Holds the current policy. Readers never block; writers are serialized.
pub struct PolicyStore {
	current: ArcSwap<Policy>,
	reload_lock: Mutex<()>,
}

impl PolicyStore {
	pub fn new(config: PolicyConfig) -> Self {
		Self {
			current: ArcSwap::from_pointee(Policy::from_config(1, config)),
			reload_lock: Mutex::new(()),
		}
	}

	pub fn current(&self) -> Arc<Policy> {
		self.current.load_full()
	}

	pub fn version(&self) -> u64 {
		self.current.load().version
	}

	/// Parse and validate a TOML document and install its policy section.
	///
	/// On error the current policy stays in place.
	#[instrument(skip(self, raw))]
	pub fn reload(&self, raw: &str) -> Result<Arc<Policy>, ConfigError> {
		match parse_document(raw) {
			Ok(config) => Ok(self.replace(config.policy)),
			Err(e) => {
				self.reject(&e);
				Err(e)
			}
		}
	}

	/// Reload through the layered sources (defaults, the file, environment).
	#[instrument(skip(self), fields(path = %path.display()))]
	pub fn reload_from_path(&self, path: &Path) -> Result<Arc<Policy>, ConfigError> {
		match load_config_with_file(path) {
			Ok(config) => Ok(self.replace(config.policy)),
			Err(e) => {
				self.reject(&e);
				Err(e)
			}
		}
	}

	/// Install an already validated configuration.
	pub fn replace(&self, config: PolicyConfig) -> Arc<Policy> {
		let _guard = self.reload_lock.lock();
		let version = self.current.load().version + 1;
		let policy = Arc::new(Policy::from_config(version, config));
		self.current.store(Arc::clone(&policy));
		info!(
			version,
			enabled = policy.enabled,
			topic_rules = policy.topics.rules.len(),
			"message log policy installed"
		);
		policy
	}

	fn reject(&self, error: &ConfigError) {
		warn!(
			error = %error,
			field = error.field().unwrap_or("-"),
			kept_version = self.version(),
			"message log policy reload rejected"
		);
	}
}

impl Default for PolicyStore {
	fn default() -> Self {
		Self::new(PolicyConfig::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mqlog_config::{Direction, PacketKind};
	use std::io::Write;

	#[test]
	fn test_initial_version_is_one() {
		let store = PolicyStore::default();
		assert_eq!(store.version(), 1);
		assert!(store.current().enabled);
	}

	#[test]
	fn test_reload_bumps_version() {
		let store = PolicyStore::default();
		let policy = store.reload("[policy]\nenabled = false\n").unwrap();
		assert_eq!(policy.version, 2);
		assert!(!store.current().enabled);
		store.reload("").unwrap();
		assert_eq!(store.version(), 3);
	}

	#[test]
	fn test_failed_reload_keeps_previous_policy() {
		let store = PolicyStore::default();
		store.reload("[policy.kinds]\nping = false\n").unwrap();
		let before = store.current();

		let err = store.reload("[policy.kinds]\nbogus = false\n").unwrap_err();
		assert_eq!(err.field(), Some("policy.kinds.bogus"));

		let after = store.current();
		assert_eq!(after.version, before.version);
		assert!(!after.kinds.allows(PacketKind::Ping, Direction::Inbound));
	}

	#[test]
	fn test_syntax_error_keeps_previous_policy() {
		let store = PolicyStore::default();
		let err = store.reload("[policy\nenabled = ").unwrap_err();
		assert!(matches!(err, ConfigError::DocumentParse(_)));
		assert_eq!(store.version(), 1);
	}

	#[test]
	fn test_payload_cap_clamped_to_ceiling() {
		let store = PolicyStore::default();
		let policy = store
			.reload("[policy.payload]\nmax_bytes = 1000000\n")
			.unwrap();
		assert_eq!(policy.payload_max_bytes, PAYLOAD_CAPTURE_CEILING);
	}

	#[test]
	fn test_reload_from_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[policy]\nverbose = true\nformat = \"json\"").unwrap();
		let store = PolicyStore::default();
		let policy = store.reload_from_path(file.path()).unwrap();
		assert!(policy.format.verbose);
		assert_eq!(policy.format.format, LineFormat::Json);
	}

	#[test]
	fn test_readers_keep_old_snapshot() {
		let store = PolicyStore::default();
		let held = store.current();
		store.reload("[policy]\nenabled = false\n").unwrap();
		assert!(held.enabled);
		assert_eq!(held.version, 1);
	}

	#[test]
	fn test_concurrent_reloads_produce_distinct_versions() {
		let store = Arc::new(PolicyStore::default());
		let handles: Vec<_> = (0..8)
			.map(|_| {
				let store = Arc::clone(&store);
				std::thread::spawn(move || {
					(0..25)
						.map(|_| store.replace(PolicyConfig::default()).version)
						.collect::<Vec<_>>()
				})
			})
			.collect();

		let mut versions: Vec<u64> = handles
			.into_iter()
			.flat_map(|h| h.join().unwrap())
			.collect();
		versions.sort_unstable();
		versions.dedup();
		assert_eq!(versions.len(), 200);
		assert_eq!(store.version(), 201);
	}
}
