// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{LogSink, SinkError};
use crate::format::LogLine;

/// Appends one line per record to a file. Rotation is left to the host.
pub struct FileSink {
	path: PathBuf,
	handle: Mutex<Option<File>>,
}

impl FileSink {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			handle: Mutex::new(None),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	async fn open(&self) -> Result<File, SinkError> {
		OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.await
			.map_err(|e| {
				let message = format!("failed to open {}: {e}", self.path.display());
				if e.kind() == ErrorKind::PermissionDenied {
					SinkError::Permanent(message)
				} else {
					SinkError::Transient(message)
				}
			})
	}
}

#[async_trait]
impl LogSink for FileSink {
	fn name(&self) -> &str {
		"file"
	}

	async fn write(&self, line: &LogLine) -> Result<(), SinkError> {
		let mut guard = self.handle.lock().await;
		if guard.is_none() {
			*guard = Some(self.open().await?);
		}
		let Some(file) = guard.as_mut() else {
			return Err(SinkError::Permanent("file handle not initialized".to_string()));
		};

		let mut buf = Vec::with_capacity(line.text().len() + 1);
		buf.extend_from_slice(line.text().as_bytes());
		buf.push(b'\n');

		if let Err(e) = file.write_all(&buf).await {
			// Reopen on the next attempt.
			*guard = None;
			return Err(SinkError::Transient(format!("failed to write to file: {e}")));
		}
		Ok(())
	}

	async fn flush(&self) -> Result<(), SinkError> {
		let mut guard = self.handle.lock().await;
		if let Some(file) = guard.as_mut() {
			file
				.flush()
				.await
				.map_err(|e| SinkError::Transient(format!("failed to flush file: {e}")))?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use mqlog_config::PacketKind;

	fn line(text: &str) -> LogLine {
		LogLine::new(PacketKind::Publish, "c1", Utc::now(), text)
	}

	#[tokio::test]
	async fn test_appends_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("messages.log");
		let sink = FileSink::new(&path);

		sink.write(&line("first")).await.unwrap();
		sink.write(&line("second")).await.unwrap();
		sink.flush().await.unwrap();

		let content = tokio::fs::read_to_string(&path).await.unwrap();
		assert_eq!(content, "first\nsecond\n");
	}

	#[tokio::test]
	async fn test_appends_to_existing_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("messages.log");
		tokio::fs::write(&path, "old\n").await.unwrap();

		let sink = FileSink::new(&path);
		sink.write(&line("new")).await.unwrap();
		sink.flush().await.unwrap();

		let content = tokio::fs::read_to_string(&path).await.unwrap();
		assert_eq!(content, "old\nnew\n");
	}

	#[tokio::test]
	async fn test_missing_directory_is_transient() {
		let dir = tempfile::tempdir().unwrap();
		let sink = FileSink::new(dir.path().join("missing").join("messages.log"));
		let err = sink.write(&line("x")).await.unwrap_err();
		assert!(err.is_transient());
	}

	#[tokio::test]
	async fn test_flush_without_writes_is_ok() {
		let dir = tempfile::tempdir().unwrap();
		let sink = FileSink::new(dir.path().join("never.log"));
		sink.flush().await.unwrap();
		assert_eq!(sink.name(), "file");
	}
}
