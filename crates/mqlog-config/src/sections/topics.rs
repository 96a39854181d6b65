// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Topic filter patterns and the ordered allow/deny rule list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Outcome of a topic rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
	#[default]
	Allow,
	Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
	#[error("pattern is empty")]
	Empty,
	#[error("pattern contains a NUL character")]
	NulCharacter,
	#[error("'#' must occupy the whole last level")]
	MisplacedMultiLevel,
	#[error("'+' must occupy a whole level")]
	MixedSingleLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Level {
	Exact(String),
	Single,
	Multi,
}

/// An MQTT topic filter used to match concrete topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
	raw: String,
	levels: Vec<Level>,
}

impl TopicPattern {
	pub fn parse(raw: &str) -> Result<Self, PatternError> {
		if raw.is_empty() {
			return Err(PatternError::Empty);
		}
		if raw.contains('\0') {
			return Err(PatternError::NulCharacter);
		}

		let parts: Vec<&str> = raw.split('/').collect();
		let last = parts.len() - 1;
		let mut levels = Vec::with_capacity(parts.len());
		for (i, part) in parts.into_iter().enumerate() {
			let level = if part.contains('#') {
				if part != "#" || i != last {
					return Err(PatternError::MisplacedMultiLevel);
				}
				Level::Multi
			} else if part.contains('+') {
				if part != "+" {
					return Err(PatternError::MixedSingleLevel);
				}
				Level::Single
			} else {
				Level::Exact(part.to_string())
			};
			levels.push(level);
		}

		Ok(Self {
			raw: raw.to_string(),
			levels,
		})
	}

	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Whether `topic` is selected by this filter.
	///
	/// `a/#` also matches `a`. A pattern starting with a wildcard never
	/// matches a topic starting with `$`.
	pub fn matches(&self, topic: &str) -> bool {
		if topic.starts_with('$') && matches!(self.levels.first(), Some(Level::Single | Level::Multi))
		{
			return false;
		}

		let mut topic_levels = topic.split('/');
		for level in &self.levels {
			match level {
				Level::Multi => return true,
				Level::Single => {
					if topic_levels.next().is_none() {
						return false;
					}
				}
				Level::Exact(expected) => match topic_levels.next() {
					Some(actual) if actual == expected => {}
					_ => return false,
				},
			}
		}
		topic_levels.next().is_none()
	}
}

impl fmt::Display for TopicPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRule {
	pub pattern: TopicPattern,
	pub verdict: Verdict,
}

/// Ordered topic rules; the first matching rule decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicRules {
	pub rules: Vec<TopicRule>,
	pub default: Verdict,
}

impl TopicRules {
	pub fn evaluate(&self, topic: &str) -> Verdict {
		self
			.rules
			.iter()
			.find(|rule| rule.pattern.matches(topic))
			.map(|rule| rule.verdict)
			.unwrap_or(self.default)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicRuleLayer {
	pub pattern: String,
	pub verdict: Verdict,
}

/// `[policy.topics]` layer. A later layer's rule list replaces an earlier one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicsConfigLayer {
	#[serde(default)]
	pub default: Option<Verdict>,
	#[serde(default)]
	pub rules: Option<Vec<TopicRuleLayer>>,
}

impl TopicsConfigLayer {
	pub fn merge(&mut self, other: TopicsConfigLayer) {
		if other.default.is_some() {
			self.default = other.default;
		}
		if other.rules.is_some() {
			self.rules = other.rules;
		}
	}

	pub fn finalize(self) -> Result<TopicRules, ConfigError> {
		let rules = self
			.rules
			.unwrap_or_default()
			.into_iter()
			.enumerate()
			.map(|(i, rule)| {
				TopicPattern::parse(&rule.pattern)
					.map(|pattern| TopicRule {
						pattern,
						verdict: rule.verdict,
					})
					.map_err(|e| ConfigError::MalformedTopicPattern {
						field: format!("policy.topics.rules[{i}].pattern"),
						pattern: rule.pattern.clone(),
						reason: e.to_string(),
					})
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(TopicRules {
			rules,
			default: self.default.unwrap_or_default(),
		})
	}
}
