// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reload the policy when the config document changes on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use tracing::{debug, info, warn};

use crate::error::ExtensionError;
use crate::policy::PolicyStore;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the directory holding the config document and reloads the
/// policy store after each debounced change to the document.
///
/// Watching stops when this value is dropped.
pub struct PolicyWatcher {
	path: PathBuf,
	_debouncer: Debouncer<RecommendedWatcher>,
}

impl PolicyWatcher {
	pub fn start(
		store: Arc<PolicyStore>,
		path: impl Into<PathBuf>,
		debounce: Duration,
	) -> Result<Self, ExtensionError> {
		let path: PathBuf = path.into();
		let dir = path
			.parent()
			.filter(|p| !p.as_os_str().is_empty())
			.map(Path::to_path_buf)
			.unwrap_or_else(|| PathBuf::from("."));
		let Some(file_name) = path.file_name().map(|n| n.to_os_string()) else {
			return Err(ExtensionError::Watch {
				path,
				source: notify::Error::generic("config path has no file name"),
			});
		};

		let target = path.clone();
		let mut debouncer = new_debouncer(
			debounce,
			move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
				Ok(events) => {
					let touched = events
						.iter()
						.any(|e| e.path.file_name() == Some(file_name.as_os_str()));
					if !touched {
						return;
					}
					if !target.exists() {
						debug!(path = %target.display(), "config document removed, keeping policy");
						return;
					}
					if let Ok(policy) = store.reload_from_path(&target) {
						info!(version = policy.version, "message log policy reloaded from file");
					}
				}
				Err(e) => warn!(error = %e, "config watcher error"),
			},
		)
		.map_err(|source| ExtensionError::Watch {
			path: path.clone(),
			source,
		})?;

		debouncer
			.watcher()
			.watch(&dir, RecursiveMode::NonRecursive)
			.map_err(|source| ExtensionError::Watch {
				path: dir.clone(),
				source,
			})?;

		info!(path = %path.display(), debounce_ms = debounce.as_millis() as u64, "watching message log config");
		Ok(Self {
			path,
			_debouncer: debouncer,
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}
