// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Packet kinds, directions and the per-kind enable flags.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// MQTT packet families the log distinguishes.
///
/// PINGREQ and PINGRESP share [`PacketKind::Ping`] and are told apart by
/// [`Direction`]. AUTH and any packet type code the broker may add later are
/// classified as [`PacketKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PacketKind {
	Connect,
	Connack,
	Disconnect,
	Publish,
	Puback,
	Pubrec,
	Pubrel,
	Pubcomp,
	Subscribe,
	Suback,
	Unsubscribe,
	Unsuback,
	Ping,
	Other,
}

impl PacketKind {
	pub const ALL: [PacketKind; 14] = [
		PacketKind::Connect,
		PacketKind::Connack,
		PacketKind::Disconnect,
		PacketKind::Publish,
		PacketKind::Puback,
		PacketKind::Pubrec,
		PacketKind::Pubrel,
		PacketKind::Pubcomp,
		PacketKind::Subscribe,
		PacketKind::Suback,
		PacketKind::Unsubscribe,
		PacketKind::Unsuback,
		PacketKind::Ping,
		PacketKind::Other,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			PacketKind::Connect => "CONNECT",
			PacketKind::Connack => "CONNACK",
			PacketKind::Disconnect => "DISCONNECT",
			PacketKind::Publish => "PUBLISH",
			PacketKind::Puback => "PUBACK",
			PacketKind::Pubrec => "PUBREC",
			PacketKind::Pubrel => "PUBREL",
			PacketKind::Pubcomp => "PUBCOMP",
			PacketKind::Subscribe => "SUBSCRIBE",
			PacketKind::Suback => "SUBACK",
			PacketKind::Unsubscribe => "UNSUBSCRIBE",
			PacketKind::Unsuback => "UNSUBACK",
			PacketKind::Ping => "PING",
			PacketKind::Other => "OTHER",
		}
	}

	fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for PacketKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PacketKind {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		PacketKind::ALL
			.iter()
			.copied()
			.find(|k| k.as_str().eq_ignore_ascii_case(s))
			.ok_or(())
	}
}

/// Which way a packet travelled relative to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	/// Client to broker.
	Inbound,
	/// Broker to client.
	Outbound,
}

impl Direction {
	pub fn as_str(&self) -> &'static str {
		match self {
			Direction::Inbound => "in",
			Direction::Outbound => "out",
		}
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectionToggle {
	pub inbound: Option<bool>,
	pub outbound: Option<bool>,
}

/// Value of a `[policy.kinds]` entry: either one flag for both directions or
/// a table with `inbound` / `outbound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindToggle {
	Both(bool),
	PerDirection(DirectionToggle),
}

/// Resolved enable flags for every (kind, direction) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindFlags {
	inbound: [bool; PacketKind::ALL.len()],
	outbound: [bool; PacketKind::ALL.len()],
}

impl Default for KindFlags {
	fn default() -> Self {
		Self::all_enabled()
	}
}

impl KindFlags {
	pub fn all_enabled() -> Self {
		Self {
			inbound: [true; PacketKind::ALL.len()],
			outbound: [true; PacketKind::ALL.len()],
		}
	}

	pub fn all_disabled() -> Self {
		Self {
			inbound: [false; PacketKind::ALL.len()],
			outbound: [false; PacketKind::ALL.len()],
		}
	}

	pub fn allows(&self, kind: PacketKind, direction: Direction) -> bool {
		match direction {
			Direction::Inbound => self.inbound[kind.index()],
			Direction::Outbound => self.outbound[kind.index()],
		}
	}

	pub fn set(&mut self, kind: PacketKind, direction: Direction, enabled: bool) {
		match direction {
			Direction::Inbound => self.inbound[kind.index()] = enabled,
			Direction::Outbound => self.outbound[kind.index()] = enabled,
		}
	}

	pub fn apply(&mut self, kind: PacketKind, toggle: KindToggle) {
		match toggle {
			KindToggle::Both(enabled) => {
				self.set(kind, Direction::Inbound, enabled);
				self.set(kind, Direction::Outbound, enabled);
			}
			KindToggle::PerDirection(dirs) => {
				if let Some(enabled) = dirs.inbound {
					self.set(kind, Direction::Inbound, enabled);
				}
				if let Some(enabled) = dirs.outbound {
					self.set(kind, Direction::Outbound, enabled);
				}
			}
		}
	}

	/// True when no (kind, direction) pair is enabled.
	pub fn none_enabled(&self) -> bool {
		!self.inbound.iter().chain(self.outbound.iter()).any(|f| *f)
	}

	/// Builds flags from the `[policy.kinds]` table, rejecting unknown names.
	pub fn from_table(table: &BTreeMap<String, KindToggle>) -> Result<Self, ConfigError> {
		let mut flags = Self::all_enabled();
		for (name, toggle) in table {
			let kind = name
				.parse::<PacketKind>()
				.map_err(|_| ConfigError::UnknownPacketKind {
					field: format!("policy.kinds.{name}"),
					name: name.clone(),
				})?;
			flags.apply(kind, *toggle);
		}
		Ok(flags)
	}
}
