// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw broker events and their classified form.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use mqlog_config::{Direction, PacketKind};

use crate::details::{PacketDetails, SubscriptionOptions};

/// MQTT control packet type codes from the fixed header.
pub mod packet_type {
	pub const CONNECT: u8 = 1;
	pub const CONNACK: u8 = 2;
	pub const PUBLISH: u8 = 3;
	pub const PUBACK: u8 = 4;
	pub const PUBREC: u8 = 5;
	pub const PUBREL: u8 = 6;
	pub const PUBCOMP: u8 = 7;
	pub const SUBSCRIBE: u8 = 8;
	pub const SUBACK: u8 = 9;
	pub const UNSUBSCRIBE: u8 = 10;
	pub const UNSUBACK: u8 = 11;
	pub const PINGREQ: u8 = 12;
	pub const PINGRESP: u8 = 13;
	pub const DISCONNECT: u8 = 14;
	pub const AUTH: u8 = 15;
}

/// A protocol event as the broker hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerEvent {
	pub packet_type: u8,
	pub direction: Direction,
	pub client_id: String,
	pub topic: Option<String>,
	pub subscriptions: Vec<RequestedSubscription>,
	pub qos: Option<u8>,
	pub retain: bool,
	pub payload: Option<Bytes>,
	pub reason_codes: Vec<u8>,
	pub reason_string: Option<String>,
	pub user_properties: Vec<(String, String)>,
	pub details: Option<PacketDetails>,
	pub timestamp: DateTime<Utc>,
}

/// A topic filter as requested in SUBSCRIBE or UNSUBSCRIBE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedSubscription {
	pub filter: String,
	pub qos: Option<u8>,
	pub options: Option<SubscriptionOptions>,
}

impl BrokerEvent {
	pub fn builder(packet_type: u8, direction: Direction) -> BrokerEventBuilder {
		BrokerEventBuilder::new(packet_type, direction)
	}
}

/// Builder for constructing broker events with a fluent API.
#[derive(Debug, Clone)]
pub struct BrokerEventBuilder {
	packet_type: u8,
	direction: Direction,
	client_id: String,
	topic: Option<String>,
	subscriptions: Vec<RequestedSubscription>,
	qos: Option<u8>,
	retain: bool,
	payload: Option<Bytes>,
	reason_codes: Vec<u8>,
	reason_string: Option<String>,
	user_properties: Vec<(String, String)>,
	details: Option<PacketDetails>,
	timestamp: Option<DateTime<Utc>>,
}

impl BrokerEventBuilder {
	pub fn new(packet_type: u8, direction: Direction) -> Self {
		Self {
			packet_type,
			direction,
			client_id: String::new(),
			topic: None,
			subscriptions: Vec::new(),
			qos: None,
			retain: false,
			payload: None,
			reason_codes: Vec::new(),
			reason_string: None,
			user_properties: Vec::new(),
			details: None,
			timestamp: None,
		}
	}

	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = client_id.into();
		self
	}

	pub fn topic(mut self, topic: impl Into<String>) -> Self {
		self.topic = Some(topic.into());
		self
	}

	/// Add a SUBSCRIBE / UNSUBSCRIBE topic filter.
	pub fn subscription(mut self, filter: impl Into<String>, qos: Option<u8>) -> Self {
		self.subscriptions.push(RequestedSubscription {
			filter: filter.into(),
			qos,
			options: None,
		});
		self
	}

	/// Add a SUBSCRIBE topic filter with its MQTT 5 options.
	pub fn subscription_with_options(
		mut self,
		filter: impl Into<String>,
		qos: Option<u8>,
		options: SubscriptionOptions,
	) -> Self {
		self.subscriptions.push(RequestedSubscription {
			filter: filter.into(),
			qos,
			options: Some(options),
		});
		self
	}

	pub fn qos(mut self, qos: u8) -> Self {
		self.qos = Some(qos);
		self
	}

	pub fn retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}

	pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
		self.payload = Some(payload.into());
		self
	}

	pub fn reason_code(mut self, code: u8) -> Self {
		self.reason_codes.push(code);
		self
	}

	pub fn reason_string(mut self, reason: impl Into<String>) -> Self {
		self.reason_string = Some(reason.into());
		self
	}

	pub fn user_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.user_properties.push((key.into(), value.into()));
		self
	}

	/// Attach the fields specific to this packet kind.
	pub fn details(mut self, details: impl Into<PacketDetails>) -> Self {
		self.details = Some(details.into());
		self
	}

	pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.timestamp = Some(timestamp);
		self
	}

	pub fn build(self) -> BrokerEvent {
		BrokerEvent {
			packet_type: self.packet_type,
			direction: self.direction,
			client_id: self.client_id,
			topic: self.topic,
			subscriptions: self.subscriptions,
			qos: self.qos,
			retain: self.retain,
			payload: self.payload,
			reason_codes: self.reason_codes,
			reason_string: self.reason_string,
			user_properties: self.user_properties,
			details: self.details,
			timestamp: self.timestamp.unwrap_or_else(Utc::now),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QoS {
	AtMostOnce = 0,
	AtLeastOnce = 1,
	ExactlyOnce = 2,
}

impl QoS {
	pub fn from_u8(value: u8) -> Option<Self> {
		match value {
			0 => Some(QoS::AtMostOnce),
			1 => Some(QoS::AtLeastOnce),
			2 => Some(QoS::ExactlyOnce),
			_ => None,
		}
	}

	pub fn as_u8(self) -> u8 {
		self as u8
	}
}

impl fmt::Display for QoS {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_u8())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
	pub filter: String,
	pub qos: Option<QoS>,
	pub options: Option<SubscriptionOptions>,
}

/// A classified protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
	pub kind: PacketKind,
	pub packet_type: u8,
	pub direction: Direction,
	/// Empty before CONNECT has assigned one.
	pub client_id: String,
	pub topic: Option<String>,
	pub subscriptions: Vec<Subscription>,
	pub qos: Option<QoS>,
	pub retain: bool,
	/// Length of the original payload, regardless of what was captured.
	pub payload_len: usize,
	pub payload: Option<Bytes>,
	pub truncated: bool,
	pub reason_codes: Vec<u8>,
	pub reason_string: Option<String>,
	pub user_properties: Vec<(String, String)>,
	/// Only present when they match `kind`.
	pub details: Option<PacketDetails>,
	pub timestamp: DateTime<Utc>,
}

impl EventRecord {
	/// The primary reason code; acknowledgements carrying one code per
	/// filter report the first.
	pub fn reason_code(&self) -> Option<u8> {
		self.reason_codes.first().copied()
	}
}
