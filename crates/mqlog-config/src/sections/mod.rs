// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod kinds;
pub mod pipeline;
pub mod policy;
pub mod topics;

pub use kinds::{Direction, DirectionToggle, KindFlags, KindToggle, PacketKind};
pub use pipeline::{PipelineConfig, PipelineConfigLayer, SinkConfig, SinkConfigLayer, SinkKind};
pub use policy::{
	LineFormat, PayloadConfig, PayloadConfigLayer, PolicyConfig, PolicyConfigLayer, Redaction,
	DEFAULT_PAYLOAD_MAX_BYTES,
};
pub use topics::{
	PatternError, TopicPattern, TopicRule, TopicRuleLayer, TopicRules, TopicsConfigLayer, Verdict,
};
