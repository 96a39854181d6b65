// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded retry with exponential backoff for sink writes.

use std::time::Duration;

use mqlog_config::PipelineConfig;
use tracing::warn;

use crate::sink::SinkError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self::from(&PipelineConfig::default())
	}
}

impl From<&PipelineConfig> for RetryConfig {
	fn from(config: &PipelineConfig) -> Self {
		Self {
			max_attempts: config.retry_max_attempts.max(1),
			base_delay: config.retry_base_delay,
			max_delay: config.retry_max_delay,
			backoff_factor: 2.0,
			jitter: config.retry_jitter,
		}
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for SinkError {
	fn is_retryable(&self) -> bool {
		self.is_transient()
	}
}

/// Delay before retry number `attempt` (0-based), never above `max_delay`.
pub fn calculate_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential_delay = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let max = cfg.max_delay.as_secs_f64();
	let capped_delay = exponential_delay.min(max);

	let final_delay = if cfg.jitter {
		let jitter_factor = 0.5 + fastrand::f64();
		(capped_delay * jitter_factor).min(max)
	} else {
		capped_delay
	};

	Duration::from_secs_f64(final_delay)
}

pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let mut attempt = 0;

	loop {
		match f().await {
			Ok(result) => return Ok(result),
			Err(err) => {
				attempt += 1;

				if !err.is_retryable() {
					warn!(error = %err, attempt, "non-retryable sink error");
					return Err(err);
				}

				if attempt >= cfg.max_attempts {
					warn!(
						error = %err,
						attempt,
						max_attempts = cfg.max_attempts,
						"sink retry attempts exhausted"
					);
					return Err(err);
				}

				let delay = calculate_delay(cfg, attempt - 1);
				warn!(
					error = %err,
					attempt,
					max_attempts = cfg.max_attempts,
					delay_ms = delay.as_millis() as u64,
					"retrying sink write"
				);

				tokio::time::sleep(delay).await;
			}
		}
	}
}
