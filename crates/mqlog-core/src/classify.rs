// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw broker event to [`EventRecord`].

use mqlog_config::PacketKind;

use crate::event::{packet_type, BrokerEvent, EventRecord, QoS, Subscription};

/// Most payload bytes ever captured, whatever the policy allows.
pub const PAYLOAD_CAPTURE_CEILING: usize = 64 * 1024;

pub fn kind_for(code: u8) -> PacketKind {
	match code {
		packet_type::CONNECT => PacketKind::Connect,
		packet_type::CONNACK => PacketKind::Connack,
		packet_type::PUBLISH => PacketKind::Publish,
		packet_type::PUBACK => PacketKind::Puback,
		packet_type::PUBREC => PacketKind::Pubrec,
		packet_type::PUBREL => PacketKind::Pubrel,
		packet_type::PUBCOMP => PacketKind::Pubcomp,
		packet_type::SUBSCRIBE => PacketKind::Subscribe,
		packet_type::SUBACK => PacketKind::Suback,
		packet_type::UNSUBSCRIBE => PacketKind::Unsubscribe,
		packet_type::UNSUBACK => PacketKind::Unsuback,
		packet_type::PINGREQ | packet_type::PINGRESP => PacketKind::Ping,
		packet_type::DISCONNECT => PacketKind::Disconnect,
		_ => PacketKind::Other,
	}
}

/// Classify a broker event. Never fails; unknown packet types become
/// [`PacketKind::Other`] with the raw code kept.
pub fn classify(event: &BrokerEvent) -> EventRecord {
	let (payload_len, payload, truncated) = match &event.payload {
		Some(bytes) => {
			let len = bytes.len();
			let captured = len.min(PAYLOAD_CAPTURE_CEILING);
			(len, Some(bytes.slice(..captured)), captured < len)
		}
		None => (0, None, false),
	};

	let kind = kind_for(event.packet_type);
	EventRecord {
		kind,
		packet_type: event.packet_type,
		direction: event.direction,
		client_id: event.client_id.clone(),
		topic: event.topic.clone(),
		subscriptions: event
			.subscriptions
			.iter()
			.map(|requested| Subscription {
				filter: requested.filter.clone(),
				qos: requested.qos.and_then(QoS::from_u8),
				options: requested.options,
			})
			.collect(),
		qos: event.qos.and_then(QoS::from_u8),
		retain: event.retain,
		payload_len,
		payload,
		truncated,
		reason_codes: event.reason_codes.clone(),
		reason_string: event.reason_string.clone(),
		user_properties: event.user_properties.clone(),
		details: event
			.details
			.as_ref()
			.filter(|details| details.kind() == kind)
			.cloned(),
		timestamp: event.timestamp,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::details::{ConnectDetails, PacketDetails, SubscriptionOptions};
	use bytes::Bytes;
	use mqlog_config::Direction;

	#[test]
	fn test_known_codes_map_to_kinds() {
		assert_eq!(kind_for(1), PacketKind::Connect);
		assert_eq!(kind_for(3), PacketKind::Publish);
		assert_eq!(kind_for(9), PacketKind::Suback);
		assert_eq!(kind_for(14), PacketKind::Disconnect);
	}

	#[test]
	fn test_ping_codes_share_kind() {
		assert_eq!(kind_for(packet_type::PINGREQ), PacketKind::Ping);
		assert_eq!(kind_for(packet_type::PINGRESP), PacketKind::Ping);
	}

	#[test]
	fn test_auth_and_unknown_are_other() {
		let record = classify(&BrokerEvent::builder(packet_type::AUTH, Direction::Inbound).build());
		assert_eq!(record.kind, PacketKind::Other);
		assert_eq!(record.packet_type, 15);

		let record = classify(&BrokerEvent::builder(0, Direction::Outbound).build());
		assert_eq!(record.kind, PacketKind::Other);
		assert_eq!(record.packet_type, 0);

		assert_eq!(kind_for(200), PacketKind::Other);
	}

	#[test]
	fn test_invalid_qos_is_absent() {
		let record = classify(
			&BrokerEvent::builder(packet_type::PUBLISH, Direction::Inbound)
				.qos(3)
				.subscription("a", Some(7))
				.build(),
		);
		assert_eq!(record.qos, None);
		assert_eq!(record.subscriptions[0].qos, None);
	}

	#[test]
	fn test_payload_capture_is_capped() {
		let big = Bytes::from(vec![b'x'; PAYLOAD_CAPTURE_CEILING + 10]);
		let record = classify(
			&BrokerEvent::builder(packet_type::PUBLISH, Direction::Inbound)
				.payload(big.clone())
				.build(),
		);
		assert_eq!(record.payload_len, PAYLOAD_CAPTURE_CEILING + 10);
		assert_eq!(
			record.payload.as_ref().map(Bytes::len),
			Some(PAYLOAD_CAPTURE_CEILING)
		);
		assert!(record.truncated);
		// zero-copy: the capture points into the original buffer
		assert_eq!(
			record.payload.as_ref().map(|b| b.as_ptr()),
			Some(big.as_ptr())
		);
	}

	#[test]
	fn test_small_payload_kept_whole() {
		let record = classify(
			&BrokerEvent::builder(packet_type::PUBLISH, Direction::Inbound)
				.payload(Bytes::from_static(b"hello"))
				.build(),
		);
		assert_eq!(record.payload_len, 5);
		assert_eq!(record.payload, Some(Bytes::from_static(b"hello")));
		assert!(!record.truncated);
	}

	#[test]
	fn test_details_kept_only_for_matching_kind() {
		let connect = ConnectDetails {
			protocol_version: 4,
			..Default::default()
		};
		let record = classify(
			&BrokerEvent::builder(packet_type::CONNECT, Direction::Inbound)
				.details(connect.clone())
				.build(),
		);
		assert_eq!(record.details, Some(PacketDetails::Connect(connect.clone())));

		let record = classify(
			&BrokerEvent::builder(packet_type::PUBLISH, Direction::Inbound)
				.details(connect)
				.build(),
		);
		assert!(record.details.is_none());
	}

	#[test]
	fn test_subscription_options_carried() {
		let options = SubscriptionOptions {
			retain_handling: 1,
			..Default::default()
		};
		let record = classify(
			&BrokerEvent::builder(packet_type::SUBSCRIBE, Direction::Inbound)
				.subscription_with_options("a/+", Some(1), options)
				.build(),
		);
		assert_eq!(record.subscriptions[0].options, Some(options));
	}

	#[test]
	fn test_empty_client_id_accepted() {
		let record = classify(&BrokerEvent::builder(packet_type::CONNECT, Direction::Inbound).build());
		assert_eq!(record.client_id, "");
		assert_eq!(record.payload_len, 0);
	}
}
