// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Emit/drop decision and redaction of classified records.

use mqlog_config::{Redaction, Verdict};

use crate::details::PacketDetails;
use crate::event::EventRecord;
use crate::policy::Policy;

pub const REDACTED: &str = "[REDACTED]";

/// Decide whether `record` is logged under `policy`, returning the record
/// with payload limits and redactions applied.
///
/// Pure: the same record and policy always give the same result.
pub fn should_emit(mut record: EventRecord, policy: &Policy) -> Option<EventRecord> {
	if !policy.enabled {
		return None;
	}
	if !policy.kinds.allows(record.kind, record.direction) {
		return None;
	}

	if let Some(topic) = &record.topic {
		if policy.topics.evaluate(topic) == Verdict::Deny {
			return None;
		}
	}
	if !record.subscriptions.is_empty() {
		record
			.subscriptions
			.retain(|s| policy.topics.evaluate(&s.filter) == Verdict::Allow);
		if record.subscriptions.is_empty() {
			return None;
		}
	}

	apply_payload_limits(&mut record, policy);
	apply_redactions(&mut record, policy);
	Some(record)
}

fn apply_payload_limits(record: &mut EventRecord, policy: &Policy) {
	if !policy.include_payload || policy.redacts(Redaction::Payload) {
		record.payload = None;
		record.truncated = false;
		if let Some(PacketDetails::Publish(publish)) = &mut record.details {
			publish.correlation_data = None;
		}
		return;
	}
	if let Some(payload) = &record.payload {
		if payload.len() > policy.payload_max_bytes {
			record.payload = Some(payload.slice(..policy.payload_max_bytes));
			record.truncated = true;
		}
	}
}

fn apply_redactions(record: &mut EventRecord, policy: &Policy) {
	if policy.redacts(Redaction::ClientId) {
		record.client_id = REDACTED.to_string();
		if let Some(PacketDetails::Connack(connack)) = &mut record.details {
			redact(&mut connack.assigned_client_id);
		}
	}
	if policy.redacts(Redaction::Topic) {
		if record.topic.is_some() {
			record.topic = Some(REDACTED.to_string());
		}
		for subscription in &mut record.subscriptions {
			subscription.filter = REDACTED.to_string();
		}
		match &mut record.details {
			Some(PacketDetails::Connect(connect)) => {
				if let Some(will) = &mut connect.will {
					will.topic = REDACTED.to_string();
				}
			}
			Some(PacketDetails::Publish(publish)) => redact(&mut publish.response_topic),
			_ => {}
		}
	}
	if policy.redacts(Redaction::ReasonString) {
		redact(&mut record.reason_string);
	}
	if policy.redacts(Redaction::UserProperties) {
		record.user_properties.clear();
	}
}

fn redact(value: &mut Option<String>) {
	if value.is_some() {
		*value = Some(REDACTED.to_string());
	}
}
