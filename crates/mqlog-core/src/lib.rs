// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Broker-side MQTT message log.
//!
//! Every protocol event the broker hands to [`MessageLogPipeline::on_event`]
//! is classified, filtered against the current [`Policy`], rendered into a
//! [`LogLine`] and offered to a bounded [`DispatchQueue`], all on the calling
//! thread. A [`SinkWriter`] task drains the queue into a [`LogSink`].
//!
//! ```ignore
//! let extension = MessageLogExtension::start(Path::new("/opt/broker/extensions/mqtt-message-log"))?;
//! let pipeline = extension.pipeline().clone();
//! pipeline.on_event(&BrokerEvent::builder(packet_type::CONNECT, Direction::Inbound).client_id("c1").build());
//! extension.stop().await;
//! ```

pub mod classify;
pub mod details;
pub mod error;
pub mod event;
pub mod extension;
pub mod filter;
pub mod format;
pub mod pipeline;
pub mod policy;
pub mod queue;
pub mod retry;
pub mod sink;
pub mod stats;
pub mod watch;
pub mod writer;

pub use classify::{classify, PAYLOAD_CAPTURE_CEILING};
pub use details::{
	ConnackDetails, ConnectDetails, DisconnectDetails, PacketDetails, PublishDetails,
	SubscribeDetails, SubscriptionOptions, WillDetails,
};
pub use error::{ExtensionError, ExtensionResult};
pub use event::{
	packet_type, BrokerEvent, BrokerEventBuilder, EventRecord, QoS, RequestedSubscription,
	Subscription,
};
pub use extension::MessageLogExtension;
pub use filter::{should_emit, REDACTED};
pub use format::{format, LogLine};
pub use pipeline::{Disposition, MessageLogPipeline};
pub use policy::{FormatOptions, Policy, PolicyStore};
pub use queue::DispatchQueue;
pub use retry::RetryConfig;
pub use sink::{FileSink, LogSink, SinkError, TracingSink};
pub use stats::{PipelineStats, StatsSnapshot};
pub use watch::PolicyWatcher;
pub use writer::{SinkWriter, SinkWriterHandle};

pub use mqlog_config::{ConfigError, Direction, LineFormat, PacketKind};
