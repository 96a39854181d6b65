// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Packet-specific protocol fields.
//!
//! A [`BrokerEvent`](crate::event::BrokerEvent) may carry the fields that
//! only one packet kind has. They are rendered after the common fields, in a
//! fixed order per kind. CONNECT's protocol version, clean start and session
//! expiry and CONNACK's session present are always rendered; everything else
//! only in verbose mode.

use bytes::Bytes;
use mqlog_config::PacketKind;

use crate::event::Subscription;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketDetails {
	Connect(ConnectDetails),
	Connack(ConnackDetails),
	Publish(PublishDetails),
	Subscribe(SubscribeDetails),
	Disconnect(DisconnectDetails),
}

impl PacketDetails {
	/// The packet kind these fields belong to.
	pub fn kind(&self) -> PacketKind {
		match self {
			PacketDetails::Connect(_) => PacketKind::Connect,
			PacketDetails::Connack(_) => PacketKind::Connack,
			PacketDetails::Publish(_) => PacketKind::Publish,
			PacketDetails::Subscribe(_) => PacketKind::Subscribe,
			PacketDetails::Disconnect(_) => PacketKind::Disconnect,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectDetails {
	/// Protocol level from the variable header: 3, 4 or 5.
	pub protocol_version: u8,
	pub clean_start: bool,
	pub session_expiry: u32,
	pub keep_alive: u16,
	pub receive_maximum: Option<u16>,
	pub maximum_packet_size: Option<u32>,
	pub username: Option<String>,
	pub auth_method: Option<String>,
	pub will: Option<WillDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WillDetails {
	pub topic: String,
	pub qos: u8,
	pub retain: bool,
	pub delay: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnackDetails {
	pub session_present: bool,
	pub session_expiry: Option<u32>,
	pub assigned_client_id: Option<String>,
	pub server_keep_alive: Option<u16>,
	pub maximum_qos: Option<u8>,
	pub response_information: Option<String>,
	pub server_reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishDetails {
	pub duplicate: bool,
	pub message_expiry: Option<u32>,
	pub content_type: Option<String>,
	pub response_topic: Option<String>,
	pub correlation_data: Option<Bytes>,
	pub subscription_identifiers: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeDetails {
	pub subscription_identifier: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectDetails {
	pub session_expiry: Option<u32>,
	pub server_reference: Option<String>,
}

/// MQTT 5 subscription options of one SUBSCRIBE filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionOptions {
	pub no_local: bool,
	pub retain_as_published: bool,
	pub retain_handling: u8,
}

impl From<ConnectDetails> for PacketDetails {
	fn from(details: ConnectDetails) -> Self {
		PacketDetails::Connect(details)
	}
}

impl From<ConnackDetails> for PacketDetails {
	fn from(details: ConnackDetails) -> Self {
		PacketDetails::Connack(details)
	}
}

impl From<PublishDetails> for PacketDetails {
	fn from(details: PublishDetails) -> Self {
		PacketDetails::Publish(details)
	}
}

impl From<SubscribeDetails> for PacketDetails {
	fn from(details: SubscribeDetails) -> Self {
		PacketDetails::Subscribe(details)
	}
}

impl From<DisconnectDetails> for PacketDetails {
	fn from(details: DisconnectDetails) -> Self {
		PacketDetails::Disconnect(details)
	}
}

/// A single rendered detail value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DetailValue<'a> {
	Absent,
	Bool(bool),
	Uint(u64),
	Str(&'a str),
	Bytes(&'a [u8]),
	List(Vec<DetailValue<'a>>),
}

impl<'a> DetailValue<'a> {
	fn opt_str(value: &'a Option<String>) -> Self {
		value.as_deref().map_or(DetailValue::Absent, DetailValue::Str)
	}

	fn opt_uint(value: Option<impl Into<u64>>) -> Self {
		value.map_or(DetailValue::Absent, |v| DetailValue::Uint(v.into()))
	}
}

pub(crate) type DetailField<'a> = (&'static str, DetailValue<'a>);

/// Fields to render for `details`, in output order.
pub(crate) fn detail_fields<'a>(
	details: &'a PacketDetails,
	subscriptions: &'a [Subscription],
	verbose: bool,
) -> Vec<DetailField<'a>> {
	use DetailValue as V;

	let mut fields = Vec::new();
	match details {
		PacketDetails::Connect(c) => {
			fields.push(("protocol_version", V::Uint(c.protocol_version.into())));
			fields.push(("clean_start", V::Bool(c.clean_start)));
			fields.push(("session_expiry", V::Uint(c.session_expiry.into())));
			if verbose {
				let will = c.will.as_ref();
				fields.extend([
					("keep_alive", V::Uint(c.keep_alive.into())),
					("receive_maximum", V::opt_uint(c.receive_maximum)),
					("maximum_packet_size", V::opt_uint(c.maximum_packet_size)),
					("username", V::opt_str(&c.username)),
					("auth_method", V::opt_str(&c.auth_method)),
					(
						"will_topic",
						will.map_or(V::Absent, |w| V::Str(w.topic.as_str())),
					),
					("will_qos", V::opt_uint(will.map(|w| w.qos))),
					("will_retain", will.map_or(V::Absent, |w| V::Bool(w.retain))),
					("will_delay", V::opt_uint(will.map(|w| w.delay))),
				]);
			}
		}
		PacketDetails::Connack(c) => {
			fields.push(("session_present", V::Bool(c.session_present)));
			if verbose {
				fields.extend([
					("session_expiry", V::opt_uint(c.session_expiry)),
					("assigned_client_id", V::opt_str(&c.assigned_client_id)),
					("server_keep_alive", V::opt_uint(c.server_keep_alive)),
					("maximum_qos", V::opt_uint(c.maximum_qos)),
					("response_information", V::opt_str(&c.response_information)),
					("server_reference", V::opt_str(&c.server_reference)),
				]);
			}
		}
		PacketDetails::Publish(p) if verbose => {
			let identifiers = if p.subscription_identifiers.is_empty() {
				V::Absent
			} else {
				V::List(
					p.subscription_identifiers
						.iter()
						.map(|id| V::Uint((*id).into()))
						.collect(),
				)
			};
			fields.extend([
				("duplicate", V::Bool(p.duplicate)),
				("message_expiry", V::opt_uint(p.message_expiry)),
				("content_type", V::opt_str(&p.content_type)),
				("response_topic", V::opt_str(&p.response_topic)),
				(
					"correlation_data",
					p.correlation_data.as_deref().map_or(V::Absent, V::Bytes),
				),
				("subscription_ids", identifiers),
			]);
		}
		PacketDetails::Subscribe(s) if verbose => {
			let per_filter = |f: fn(&SubscriptionOptions) -> DetailValue<'a>| {
				V::List(
					subscriptions
						.iter()
						.map(|sub| sub.options.as_ref().map_or(V::Absent, f))
						.collect(),
				)
			};
			fields.extend([
				("subscription_id", V::opt_uint(s.subscription_identifier)),
				("no_local", per_filter(|o| V::Bool(o.no_local))),
				(
					"retain_as_published",
					per_filter(|o| V::Bool(o.retain_as_published)),
				),
				(
					"retain_handling",
					per_filter(|o| V::Uint(o.retain_handling.into())),
				),
			]);
		}
		PacketDetails::Disconnect(d) if verbose => {
			fields.extend([
				("session_expiry", V::opt_uint(d.session_expiry)),
				("server_reference", V::opt_str(&d.server_reference)),
			]);
		}
		_ => {}
	}
	fields
}
