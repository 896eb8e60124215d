//! Integration tests for the acquisition-buffering-delivery pipeline
//!
//! Drives the scheduler end to end with scripted buses, link, and transport,
//! checking the behaviors that only show up across ticks: sealing cadence,
//! queue bounds under outage, head-of-line retry, and calibration flow.

mod common;

use common::{
    endpoints, fast_policy, RecordingTransport, ScriptedLink, SimBme280, SimPm25, SimSgp40,
};

use airlift_core::adapters::{Bme280Adapter, Pm25Adapter, Sgp40Adapter};
use airlift_core::time::MonotonicTime;
use airlift_core::{
    CollectorState, DeliveryChannel, LinkState, LinkError, OutboundQueue, Packet, Reading,
    Scheduler, SchedulerConfig, SensorRegistry, TransportError,
};

fn full_registry() -> SensorRegistry {
    let mut registry = SensorRegistry::new();
    registry.register(Box::new(Bme280Adapter::new(Ok(SimBme280::steady()))));
    registry.register(Box::new(Sgp40Adapter::new(Ok(SimSgp40))));
    registry.register(Box::new(Pm25Adapter::new(Ok(SimPm25))));
    registry
}

fn scheduler<const Q: usize>(
    registry: SensorRegistry,
    link: ScriptedLink,
    transport: RecordingTransport,
    config: SchedulerConfig,
) -> Scheduler<ScriptedLink, RecordingTransport, MonotonicTime, Q> {
    let delivery = DeliveryChannel::new(link, transport, MonotonicTime::new(), endpoints())
        .with_policy(fast_policy());
    Scheduler::new(registry, delivery, MonotonicTime::new(), config)
}

fn quiet_config(seal_threshold: usize) -> SchedulerConfig {
    SchedulerConfig {
        tick_period_ms: 1_000,
        seal_threshold,
        calibration_interval_ticks: 0,
        status_interval_ticks: 0,
    }
}

/// Three readings at threshold three: one sealed packet, rectangular
/// columns, fresh accumulator afterwards.
#[test]
fn seal_scenario_at_threshold_three() {
    let mut packet = Packet::new(3);
    let mut queue = OutboundQueue::<4>::new();

    for i in 1..=3 {
        let mut reading = Reading::new();
        reading.insert("t", i as f64);
        reading.insert("a", i as f64);
        packet.append(&reading).unwrap();
    }

    assert!(packet.is_sealed());
    let fresh = Packet::new(3);
    let sealed = std::mem::replace(&mut packet, fresh).seal();
    queue.enqueue(sealed);

    assert_eq!(queue.len(), 1);
    assert_eq!(packet.size(), 0);

    let head = queue.peek_oldest().unwrap();
    assert_eq!(head.column("t"), Some(&[1.0, 2.0, 3.0][..]));
    assert_eq!(head.column("a"), Some(&[1.0, 2.0, 3.0][..]));
}

#[test]
fn delivered_packets_are_acked_in_order() {
    let mut agent = scheduler::<4>(
        full_registry(),
        ScriptedLink::up(),
        RecordingTransport::delivering(),
        quiet_config(4),
    );

    for _ in 0..8 {
        agent.tick();
    }

    assert_eq!(agent.queue_len(), 0);
    assert_eq!(agent.queue_stats().delivered, 2);
    assert_eq!(agent.collector_state(), CollectorState::Online);

    let posted = &agent.delivery().transport().posted;
    assert_eq!(posted.len(), 2);

    // Stable wire schema: timestamp leads, every column is threshold-long
    let body = String::from_utf8(posted[0].clone()).unwrap();
    assert!(body.starts_with("{\"timestamp\":"), "body was {body}");

    let parsed: serde_json::Value = serde_json::from_slice(&posted[0]).unwrap();
    let object = parsed.as_object().unwrap();
    assert_eq!(object.len(), 19); // timestamp + 4 bme280 + 2 sgp40 + 12 pm25
    for key in ["timestamp", "temp_c", "voc_index", "particles 03um"] {
        let column = object[key].as_array().unwrap();
        assert_eq!(column.len(), 4, "column {key}");
    }
}

/// Queue capacity 2, collector down while three packets seal: the two
/// newest survive, one loss event for the oldest, then recovery drains.
#[test]
fn queue_bounds_survive_collector_outage() {
    let outage = [Err(TransportError::Status(503)); 9]; // 3 ticks x 3 attempts
    let mut agent = scheduler::<2>(
        full_registry(),
        ScriptedLink::up(),
        RecordingTransport::delivering().failing_posts(&outage),
        quiet_config(1),
    );

    for _ in 0..3 {
        agent.tick();
    }

    assert_eq!(agent.queue_len(), 2);
    assert_eq!(agent.queue_stats().evicted, 1);
    assert_eq!(agent.queue_stats().readings_lost, 1);
    assert_eq!(agent.collector_state(), CollectorState::Offline);

    // Collector back: each tick enqueues one and delivers one
    for _ in 0..2 {
        agent.tick();
    }

    assert_eq!(agent.queue_stats().delivered, 2);
    assert_eq!(agent.collector_state(), CollectorState::Online);
}

#[test]
fn permanent_failure_never_grows_the_queue() {
    let mut agent = scheduler::<2>(
        full_registry(),
        ScriptedLink::up(),
        RecordingTransport::always_failing(TransportError::Status(500)),
        quiet_config(1),
    );

    for _ in 0..20 {
        agent.tick();
        assert!(agent.queue_len() <= 2);
    }
    assert_eq!(agent.queue_stats().evicted, 18);
    assert_eq!(agent.queue_stats().readings_lost, 18);
}

/// A disconnected device contributes no columns at all; a downstream
/// adapter that needed its outputs degrades to fallback values.
#[test]
fn disconnected_adapter_never_contributes() {
    let mut registry = SensorRegistry::new();
    registry.register(Box::new(Bme280Adapter::<SimBme280>::new(Err(
        airlift_core::DriverError::NotFound,
    ))));
    registry.register(Box::new(Sgp40Adapter::new(Ok(SimSgp40))));
    registry.register(Box::new(Pm25Adapter::new(Ok(SimPm25))));

    let mut agent = scheduler::<4>(
        registry,
        ScriptedLink::up(),
        RecordingTransport::delivering(),
        quiet_config(3),
    );

    for _ in 0..3 {
        agent.tick();
    }

    let posted = &agent.delivery().transport().posted;
    assert_eq!(posted.len(), 1);
    let parsed: serde_json::Value = serde_json::from_slice(&posted[0]).unwrap();
    let object = parsed.as_object().unwrap();

    // timestamp + 2 sgp40 + 12 pm25; no bme280 columns anywhere
    assert_eq!(object.len(), 15);
    for key in ["temp_c", "humidity", "pressure", "altitude_m"] {
        assert!(!object.contains_key(key), "unexpected column {key}");
    }

    // sgp40 never saw its declared inputs, so its columns are pure fallback
    for key in ["sgp40_raw", "voc_index"] {
        let column = object[key].as_array().unwrap();
        assert!(column.iter().all(|v| v.as_f64() == Some(-1.0)), "column {key}");
    }
}

#[test]
fn flaky_sensor_interleaves_fallback_values() {
    let mut registry = SensorRegistry::new();
    let flaky = SimBme280 { reads: 0, fail_every: 2 };
    registry.register(Box::new(Bme280Adapter::new(Ok(flaky))));

    let mut agent = scheduler::<4>(
        registry,
        ScriptedLink::up(),
        RecordingTransport::delivering(),
        quiet_config(4),
    );

    for _ in 0..4 {
        agent.tick();
    }

    let posted = &agent.delivery().transport().posted;
    let parsed: serde_json::Value = serde_json::from_slice(&posted[0]).unwrap();
    let temp: Vec<f64> = parsed["temp_c"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();

    assert_eq!(temp, vec![21.5, -40.0, 21.5, -40.0]);
}

/// A dead link defers delivery without blocking acquisition, and leaves
/// the collector's health unknown; reassociation resumes head-of-line.
#[test]
fn link_outage_defers_delivery_without_blocking() {
    let down_twice = [Err(LinkError::AssociationFailed); 6]; // 2 ticks x 3 attempts
    let mut agent = scheduler::<4>(
        full_registry(),
        ScriptedLink::script(&down_twice),
        RecordingTransport::delivering(),
        quiet_config(1),
    );

    agent.tick();
    agent.tick();

    // Acquisition continued, nothing was delivered, collector never judged
    assert_eq!(agent.ticks(), 2);
    assert_eq!(agent.queue_len(), 2);
    assert_eq!(agent.link_state(), LinkState::Disconnected);
    assert_eq!(agent.collector_state(), CollectorState::Unknown);

    agent.tick();

    // Link back: oldest packet went out first
    assert_eq!(agent.link_state(), LinkState::Connected);
    assert_eq!(agent.queue_stats().delivered, 1);
    assert_eq!(agent.queue_len(), 2);
}

#[test]
fn reference_value_recalibrates_derived_altitude() {
    let transport =
        RecordingTransport::delivering().with_reference_body(r#"{"sea level": 1013.25}"#);
    let mut agent = scheduler::<4>(
        full_registry(),
        ScriptedLink::up(),
        transport,
        quiet_config(1),
    );

    agent.refresh_reference();
    agent.tick();

    let posted = &agent.delivery().transport().posted;
    let parsed: serde_json::Value = serde_json::from_slice(&posted[0]).unwrap();
    let altitude = parsed["altitude_m"].as_array().unwrap()[0].as_f64().unwrap();

    // 970 hPa against 1013.25 is ~366 m; against the 1001.7 default, ~270 m
    assert!(altitude > 300.0, "altitude {altitude}");
}

#[test]
fn failed_reference_fetch_keeps_prior_calibration() {
    // No GET body scripted: the fetch exhausts and returns nothing
    let mut agent = scheduler::<4>(
        full_registry(),
        ScriptedLink::up(),
        RecordingTransport::delivering(),
        quiet_config(1),
    );

    agent.refresh_reference();
    assert_eq!(agent.collector_state(), CollectorState::Offline);

    agent.tick();

    let posted = &agent.delivery().transport().posted;
    let parsed: serde_json::Value = serde_json::from_slice(&posted[0]).unwrap();
    let altitude = parsed["altitude_m"].as_array().unwrap()[0].as_f64().unwrap();

    assert!(altitude < 300.0, "altitude {altitude}");
}
