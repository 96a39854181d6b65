// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{PipelineConfigLayer, PolicyConfigLayer, SinkConfigLayer};

/// Whole-document layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageLogConfigLayer {
	#[serde(default)]
	pub policy: Option<PolicyConfigLayer>,
	#[serde(default)]
	pub pipeline: Option<PipelineConfigLayer>,
	#[serde(default)]
	pub sink: Option<SinkConfigLayer>,
}

impl MessageLogConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: MessageLogConfigLayer) {
		merge_option(&mut self.policy, other.policy, PolicyConfigLayer::merge);
		merge_option(
			&mut self.pipeline,
			other.pipeline,
			PipelineConfigLayer::merge,
		);
		merge_option(&mut self.sink, other.sink, SinkConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
