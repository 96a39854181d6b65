// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end behaviour of the message log pipeline.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mqlog_config::parse_document;
use mqlog_core::{
	packet_type, BrokerEvent, ConnackDetails, ConnectDetails, Direction, DisconnectDetails,
	Disposition, DispatchQueue, LogLine, LogSink, MessageLogExtension, MessageLogPipeline,
	PipelineStats, PolicyStore, RetryConfig, SinkError, SinkWriter,
};
use parking_lot::Mutex;

#[derive(Default)]
struct RecordingSink {
	lines: Mutex<Vec<LogLine>>,
}

impl RecordingSink {
	fn texts(&self) -> Vec<String> {
		self.lines.lock().iter().map(|l| l.text().to_string()).collect()
	}
}

#[async_trait]
impl LogSink for RecordingSink {
	fn name(&self) -> &str {
		"recording"
	}

	async fn write(&self, line: &LogLine) -> Result<(), SinkError> {
		self.lines.lock().push(line.clone());
		Ok(())
	}
}

/// Fails the first `failures` writes with a transient error.
struct FlakySink {
	failures: u32,
	calls: AtomicU32,
	inner: RecordingSink,
}

#[async_trait]
impl LogSink for FlakySink {
	fn name(&self) -> &str {
		"flaky"
	}

	async fn write(&self, line: &LogLine) -> Result<(), SinkError> {
		if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
			return Err(SinkError::Transient("temporarily unavailable".to_string()));
		}
		self.inner.write(line).await
	}
}

fn pipeline_with(doc: &str, capacity: usize) -> MessageLogPipeline {
	let config = parse_document(doc).unwrap();
	MessageLogPipeline::new(
		Arc::new(PolicyStore::new(config.policy)),
		Arc::new(DispatchQueue::new(capacity)),
		Arc::new(PipelineStats::new()),
	)
}

fn publish(client: &str, topic: &str, payload: &'static [u8]) -> BrokerEvent {
	BrokerEvent::builder(packet_type::PUBLISH, Direction::Inbound)
		.client_id(client)
		.topic(topic)
		.qos(0)
		.payload(Bytes::from_static(payload))
		.build()
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
	RetryConfig {
		max_attempts,
		base_delay: Duration::from_millis(1),
		max_delay: Duration::from_millis(5),
		backoff_factor: 2.0,
		jitter: true,
	}
}

const PUBLISH_ONLY: &str = r#"
[policy.payload]
include = true
max_bytes = 64
"#;

#[test]
fn publish_with_payload_is_logged_in_full() {
	let pipeline = pipeline_with(PUBLISH_ONLY, 16);
	let disposition = pipeline.on_event(&publish("c1", "sensors/temp", b"0123456789"));
	assert_eq!(disposition, Disposition::Queued);

	let lines = pipeline.queue().drain();
	assert_eq!(lines.len(), 1);
	let text = lines[0].text();
	assert!(text.contains("kind=PUBLISH"));
	assert!(text.contains("topic=\"sensors/temp\""));
	assert!(text.contains("payload_len=10"));
	assert!(text.contains("payload=\"0123456789\""));
	assert!(text.contains("truncated=false"));
}

#[test]
fn payload_exclusion_keeps_length_and_marks_absent() {
	let pipeline = pipeline_with(
		"[policy.payload]\ninclude = false\nmax_bytes = 64\n",
		16,
	);
	pipeline.on_event(&publish("c1", "sensors/temp", b"0123456789"));

	let lines = pipeline.queue().drain();
	assert_eq!(lines.len(), 1);
	assert!(lines[0].text().contains("payload_len=10 payload=- "));
}

#[test]
fn denied_topic_pattern_yields_no_line() {
	let pipeline = pipeline_with(
		"[[policy.topics.rules]]\npattern = \"internal/#\"\nverdict = \"deny\"\n",
		16,
	);
	assert_eq!(
		pipeline.on_event(&publish("c1", "internal/metrics", b"x")),
		Disposition::Filtered
	);
	assert_eq!(
		pipeline.on_event(&publish("c1", "public/metrics", b"x")),
		Disposition::Queued
	);

	let lines = pipeline.queue().drain();
	assert_eq!(lines.len(), 1);
	assert!(lines[0].text().contains("topic=\"public/metrics\""));
}

#[tokio::test]
async fn full_queue_drops_exactly_the_overflow() {
	let pipeline = pipeline_with("", 2);
	let results: Vec<_> = ["a", "b", "c"]
		.iter()
		.map(|client| pipeline.on_event(&publish(client, "t", b"x")))
		.collect();
	assert_eq!(
		results,
		vec![
			Disposition::Queued,
			Disposition::Queued,
			Disposition::Dropped
		]
	);

	let sink = Arc::new(RecordingSink::default());
	let handle = SinkWriter::new(
		Arc::clone(pipeline.queue()),
		sink.clone(),
		Arc::clone(pipeline.stats()),
		fast_retry(3),
		16,
	)
	.spawn();
	let snapshot = handle.shutdown(Duration::from_secs(5)).await;

	assert_eq!(pipeline.queue().dropped(), 1);
	assert_eq!(snapshot.lines_dropped, 1);
	assert_eq!(sink.texts().len(), 2);
	assert_eq!(snapshot.lines_written, 2);
}

#[tokio::test]
async fn per_client_order_survives_concurrent_producers() {
	let pipeline = pipeline_with("", 10_000);
	let sink = Arc::new(RecordingSink::default());
	let handle = SinkWriter::new(
		Arc::clone(pipeline.queue()),
		sink.clone(),
		Arc::clone(pipeline.stats()),
		fast_retry(3),
		32,
	)
	.spawn();

	let producers: Vec<_> = (0..4)
		.map(|n| {
			let pipeline = pipeline.clone();
			std::thread::spawn(move || {
				let client = format!("client-{n}");
				for seq in 0..200 {
					let event = BrokerEvent::builder(packet_type::PUBLISH, Direction::Inbound)
						.client_id(client.clone())
						.topic(format!("seq/{seq}"))
						.build();
					assert_eq!(pipeline.on_event(&event), Disposition::Queued);
				}
			})
		})
		.collect();
	for p in producers {
		p.join().unwrap();
	}

	let snapshot = handle.shutdown(Duration::from_secs(10)).await;
	assert_eq!(snapshot.lines_written, 800);

	let lines = sink.lines.lock();
	for n in 0..4 {
		let client = format!("client-{n}");
		let topics: Vec<&str> = lines
			.iter()
			.filter(|l| l.client_id() == client)
			.map(|l| l.text())
			.collect();
		assert_eq!(topics.len(), 200);
		for (seq, text) in topics.iter().enumerate() {
			let expected = format!("topic=\"seq/{seq}\"");
			assert!(text.contains(&expected), "{client} out of order at {seq}");
		}
	}
}

#[test]
fn session_fields_follow_verbosity() {
	let pipeline = pipeline_with("", 16);
	let connect = BrokerEvent::builder(packet_type::CONNECT, Direction::Inbound)
		.client_id("c1")
		.details(ConnectDetails {
			protocol_version: 4,
			clean_start: false,
			session_expiry: 3600,
			keep_alive: 45,
			username: Some("meter".to_string()),
			..Default::default()
		})
		.build();
	let connack = BrokerEvent::builder(packet_type::CONNACK, Direction::Outbound)
		.client_id("c1")
		.reason_code(0)
		.details(ConnackDetails {
			session_present: true,
			server_reference: Some("broker-2".to_string()),
			..Default::default()
		})
		.build();
	let disconnect = BrokerEvent::builder(packet_type::DISCONNECT, Direction::Outbound)
		.client_id("c1")
		.details(DisconnectDetails {
			session_expiry: None,
			server_reference: Some("broker-2".to_string()),
		})
		.build();
	for event in [&connect, &connack, &disconnect] {
		pipeline.on_event(event);
	}

	let terse: Vec<String> = pipeline
		.queue()
		.drain()
		.iter()
		.map(|l| l.text().to_string())
		.collect();
	assert!(terse[0].ends_with("protocol_version=4 clean_start=false session_expiry=3600"));
	assert!(terse[1].ends_with("session_present=true"));
	assert!(terse[2].ends_with("truncated=false"));

	pipeline
		.policy()
		.reload("[policy]\nverbose = true\n")
		.unwrap();
	for event in [&connect, &connack, &disconnect] {
		pipeline.on_event(event);
	}
	let verbose = pipeline.queue().drain();
	assert!(verbose[0].text().contains("keep_alive=45"));
	assert!(verbose[0].text().contains("username=\"meter\""));
	assert!(verbose[1].text().contains("server_reference=\"broker-2\""));
	assert!(verbose[2]
		.text()
		.contains("session_expiry=- server_reference=\"broker-2\" reason_string=-"));
}

#[test]
fn failed_reload_keeps_filtering_with_prior_policy() {
	let pipeline = pipeline_with(
		"[[policy.topics.rules]]\npattern = \"internal/#\"\nverdict = \"deny\"\n",
		16,
	);
	let err = pipeline
		.policy()
		.reload("[[policy.topics.rules]]\npattern = \"a/#/b\"\nverdict = \"deny\"\n")
		.unwrap_err();
	assert_eq!(err.field(), Some("policy.topics.rules[0].pattern"));

	assert_eq!(
		pipeline.on_event(&publish("c1", "internal/x", b"")),
		Disposition::Filtered
	);
	assert_eq!(pipeline.policy().version(), 1);
}

#[tokio::test]
async fn transient_sink_failures_recover_within_retry_ceiling() {
	let pipeline = pipeline_with("", 16);
	pipeline.on_event(&publish("c1", "t", b"x"));

	let sink = Arc::new(FlakySink {
		failures: 2,
		calls: AtomicU32::new(0),
		inner: RecordingSink::default(),
	});
	let handle = SinkWriter::new(
		Arc::clone(pipeline.queue()),
		sink.clone(),
		Arc::clone(pipeline.stats()),
		fast_retry(3),
		16,
	)
	.spawn();
	let snapshot = handle.shutdown(Duration::from_secs(5)).await;

	assert_eq!(snapshot.lines_written, 1);
	assert_eq!(snapshot.sink_errors, 0);
	assert_eq!(sink.inner.texts().len(), 1);
}

#[tokio::test]
async fn extension_lifecycle_with_json_lines() {
	let config = parse_document(
		"[policy]\nformat = \"json\"\nverbose = true\nredact = [\"client_id\"]\n",
	)
	.unwrap();
	let sink = Arc::new(RecordingSink::default());
	let extension = MessageLogExtension::start_with_sink(config, sink.clone(), None).unwrap();

	let suback = BrokerEvent::builder(packet_type::SUBACK, Direction::Outbound)
		.client_id("secret-client")
		.reason_code(0x01)
		.reason_code(0x80)
		.build();
	assert_eq!(extension.on_event(&suback), Disposition::Queued);

	extension.reload("[policy]\nenabled = false\n").unwrap();
	assert_eq!(extension.on_event(&suback), Disposition::Filtered);

	let snapshot = extension.stop().await;
	assert_eq!(snapshot.events_seen, 2);
	assert_eq!(snapshot.events_filtered, 1);
	assert_eq!(snapshot.lines_written, 1);

	let texts = sink.texts();
	let value: serde_json::Value = serde_json::from_str(&texts[0]).unwrap();
	assert_eq!(value["kind"], "SUBACK");
	assert_eq!(value["dir"], "out");
	assert_eq!(value["client"], "[REDACTED]");
	assert_eq!(value["reason"], 1);
	assert!(value["reason_string"].is_null());
}
