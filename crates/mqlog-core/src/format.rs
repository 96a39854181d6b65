// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rendering of accepted records into log lines.
//!
//! Text lines are `key=value` pairs in a fixed order:
//!
//! ```text
//! ts kind dir client topic topics qos retain reason payload_len payload truncated [details] [reason_string user_properties]
//! ```
//!
//! `details` are the packet-specific fields (see [`crate::details`]). The two
//! trailing keys only appear in verbose mode. Absent values render as `-`.
//! JSON lines carry the same keys in the same order with `null` for absent
//! values.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use mqlog_config::{LineFormat, PacketKind};
use serde::{Serialize, Serializer};

use crate::details::{detail_fields, DetailField, DetailValue};
use crate::event::EventRecord;
use crate::policy::FormatOptions;

const ABSENT: &str = "-";

/// A rendered log line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
	kind: PacketKind,
	client_id: String,
	timestamp: DateTime<Utc>,
	text: String,
}

impl LogLine {
	pub fn new(
		kind: PacketKind,
		client_id: impl Into<String>,
		timestamp: DateTime<Utc>,
		text: impl Into<String>,
	) -> Self {
		Self {
			kind,
			client_id: client_id.into(),
			timestamp,
			text: text.into(),
		}
	}

	pub fn kind(&self) -> PacketKind {
		self.kind
	}

	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	pub fn timestamp(&self) -> DateTime<Utc> {
		self.timestamp
	}

	pub fn text(&self) -> &str {
		&self.text
	}
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render `record`. Never fails.
pub fn format(record: &EventRecord, options: &FormatOptions) -> LogLine {
	let text = match options.format {
		LineFormat::Text => format_text(record, options.verbose),
		LineFormat::Json => format_json(record, options.verbose),
	};
	LogLine::new(record.kind, record.client_id.clone(), record.timestamp, text)
}

fn format_text(record: &EventRecord, verbose: bool) -> String {
	let mut out = String::with_capacity(160);
	let _ = write!(out, "ts={}", format_timestamp(&record.timestamp));
	let _ = write!(out, " kind={}", record.kind);
	let _ = write!(out, " dir={}", record.direction);
	out.push_str(" client=");
	push_quoted(&mut out, &record.client_id);

	out.push_str(" topic=");
	match &record.topic {
		Some(topic) => push_quoted(&mut out, topic),
		None => out.push_str(ABSENT),
	}

	out.push_str(" topics=");
	if record.subscriptions.is_empty() {
		out.push_str(ABSENT);
	} else {
		out.push('[');
		for (i, sub) in record.subscriptions.iter().enumerate() {
			if i > 0 {
				out.push(',');
			}
			push_quoted(&mut out, &sub.filter);
			out.push(':');
			match sub.qos {
				Some(qos) => {
					let _ = write!(out, "{qos}");
				}
				None => out.push_str(ABSENT),
			}
		}
		out.push(']');
	}

	out.push_str(" qos=");
	match record.qos {
		Some(qos) => {
			let _ = write!(out, "{qos}");
		}
		None => out.push_str(ABSENT),
	}
	let _ = write!(out, " retain={}", record.retain);

	out.push_str(" reason=");
	match record.reason_code() {
		Some(code) => {
			let _ = write!(out, "0x{code:02x}");
		}
		None => out.push_str(ABSENT),
	}

	let _ = write!(out, " payload_len={}", record.payload_len);
	out.push_str(" payload=");
	match record.payload.as_deref() {
		Some(bytes) => push_bytes(&mut out, bytes, record.truncated),
		None => out.push_str(ABSENT),
	}
	let _ = write!(out, " truncated={}", record.truncated);

	for (key, value) in details_of(record, verbose) {
		let _ = write!(out, " {key}=");
		push_detail(&mut out, &value);
	}

	if verbose {
		out.push_str(" reason_string=");
		match &record.reason_string {
			Some(reason) => push_quoted(&mut out, reason),
			None => out.push_str(ABSENT),
		}
		out.push_str(" user_properties=");
		if record.user_properties.is_empty() {
			out.push_str(ABSENT);
		} else {
			out.push('[');
			for (i, (key, value)) in record.user_properties.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				push_quoted(&mut out, key);
				out.push('=');
				push_quoted(&mut out, value);
			}
			out.push(']');
		}
	}

	out
}

#[derive(Serialize)]
struct JsonSubscription<'a> {
	filter: &'a str,
	qos: Option<u8>,
}

#[derive(Serialize)]
struct JsonProperty<'a> {
	key: &'a str,
	value: &'a str,
}

#[derive(Serialize)]
struct JsonLine<'a> {
	ts: String,
	kind: PacketKind,
	dir: &'static str,
	client: &'a str,
	topic: Option<&'a str>,
	topics: Option<Vec<JsonSubscription<'a>>>,
	qos: Option<u8>,
	retain: bool,
	reason: Option<u8>,
	payload_len: usize,
	payload: Option<String>,
	truncated: bool,
	#[serde(flatten)]
	details: JsonDetails<'a>,
	#[serde(skip_serializing_if = "Option::is_none")]
	reason_string: Option<Option<&'a str>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	user_properties: Option<Option<Vec<JsonProperty<'a>>>>,
}

fn format_json(record: &EventRecord, verbose: bool) -> String {
	let topics = (!record.subscriptions.is_empty()).then(|| {
		record
			.subscriptions
			.iter()
			.map(|s| JsonSubscription {
				filter: &s.filter,
				qos: s.qos.map(|q| q.as_u8()),
			})
			.collect()
	});

	let payload = record
		.payload
		.as_deref()
		.map(|bytes| bytes_text(bytes, record.truncated));

	let (reason_string, user_properties) = if verbose {
		let properties = (!record.user_properties.is_empty()).then(|| {
			record
				.user_properties
				.iter()
				.map(|(key, value)| JsonProperty { key, value })
				.collect()
		});
		(Some(record.reason_string.as_deref()), Some(properties))
	} else {
		(None, None)
	};

	let line = JsonLine {
		ts: format_timestamp(&record.timestamp),
		kind: record.kind,
		dir: record.direction.as_str(),
		client: &record.client_id,
		topic: record.topic.as_deref(),
		topics,
		qos: record.qos.map(|q| q.as_u8()),
		retain: record.retain,
		reason: record.reason_code(),
		payload_len: record.payload_len,
		payload,
		truncated: record.truncated,
		details: JsonDetails(details_of(record, verbose)),
		reason_string,
		user_properties,
	};

	serde_json::to_string(&line).unwrap_or_else(|e| {
		format!(
			"{{\"ts\":\"{}\",\"kind\":\"{}\",\"error\":{}}}",
			format_timestamp(&record.timestamp),
			record.kind,
			serde_json::Value::String(e.to_string())
		)
	})
}

/// Ordered key/value pairs, serialized inline into the enclosing object.
struct JsonDetails<'a>(Vec<DetailField<'a>>);

impl Serialize for JsonDetails<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_map(self.0.iter().map(|(key, value)| (key, value)))
	}
}

impl Serialize for DetailValue<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			DetailValue::Absent => serializer.serialize_none(),
			DetailValue::Bool(b) => serializer.serialize_bool(*b),
			DetailValue::Uint(n) => serializer.serialize_u64(*n),
			DetailValue::Str(s) => serializer.serialize_str(s),
			DetailValue::Bytes(bytes) => serializer.serialize_str(&bytes_text(bytes, false)),
			DetailValue::List(items) => serializer.collect_seq(items),
		}
	}
}

fn details_of(record: &EventRecord, verbose: bool) -> Vec<DetailField<'_>> {
	record
		.details
		.as_ref()
		.map(|details| detail_fields(details, &record.subscriptions, verbose))
		.unwrap_or_default()
}

fn push_detail(out: &mut String, value: &DetailValue<'_>) {
	match value {
		DetailValue::Absent => out.push_str(ABSENT),
		DetailValue::Bool(b) => {
			let _ = write!(out, "{b}");
		}
		DetailValue::Uint(n) => {
			let _ = write!(out, "{n}");
		}
		DetailValue::Str(s) => push_quoted(out, s),
		DetailValue::Bytes(bytes) => push_bytes(out, bytes, false),
		DetailValue::List(items) => {
			out.push('[');
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				push_detail(out, item);
			}
			out.push(']');
		}
	}
}

fn push_bytes(out: &mut String, bytes: &[u8], truncated: bool) {
	match printable_utf8(bytes, truncated) {
		Some(s) => push_quoted(out, s),
		None => {
			out.push_str("hex:");
			out.push_str(&hex::encode(bytes));
		}
	}
}

fn bytes_text(bytes: &[u8], truncated: bool) -> String {
	match printable_utf8(bytes, truncated) {
		Some(s) => s.to_string(),
		None => format!("hex:{}", hex::encode(bytes)),
	}
}

/// Returns the bytes as text when they are UTF-8 without control characters.
///
/// A truncated sample may end inside a multi-byte character; that incomplete
/// tail is left out rather than turning the whole sample into hex.
fn printable_utf8(bytes: &[u8], truncated: bool) -> Option<&str> {
	let text = match std::str::from_utf8(bytes) {
		Ok(text) => text,
		Err(e) if truncated && e.error_len().is_none() => {
			std::str::from_utf8(bytes.get(..e.valid_up_to())?).ok()?
		}
		Err(_) => return None,
	};
	(!text.chars().any(char::is_control)).then_some(text)
}

fn push_quoted(out: &mut String, value: &str) {
	out.push('"');
	for c in value.chars() {
		match c {
			'"' => out.push_str("\\\""),
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			c if c.is_control() => {
				let _ = write!(out, "\\u{{{:x}}}", c as u32);
			}
			c => out.push(c),
		}
	}
	out.push('"');
}
