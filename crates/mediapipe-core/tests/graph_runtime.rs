use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use mediapipe_core::calculators::{
    register_calculator, Calculator, CalculatorContext, CalculatorRegistration,
};
use mediapipe_core::{
    Error, GraphConfig, ImageFormat, ImageFrame, InstanceBuilder, Packet, Result,
};
use pretty_assertions::assert_eq;

const FLIP_GRAPH: &str = r#"{
    "input_stream": ["input_video"],
    "output_stream": ["output_video"],
    "node": [
        { "calculator": "ImageTransformationCalculator", "name": "flip",
          "input_stream": ["IMAGE:input_video"], "output_stream": ["IMAGE:output_video"],
          "options": { "flip_vertically": true } }
    ]
}"#;

const GATE_GRAPH: &str = r#"{
    "input_stream": ["score"],
    "output_stream": ["passed"],
    "node": [
        { "calculator": "PassThroughCalculator", "name": "copy",
          "input_stream": ["score"], "output_stream": ["score_copy"] },
        { "calculator": "ThresholdingCalculator", "name": "gate",
          "input_stream": ["FLOAT:score_copy"], "output_stream": ["FLAG:passed"],
          "options": { "threshold": 0.9 } }
    ]
}"#;

fn builder(json: &str, input: &str) -> InstanceBuilder {
    InstanceBuilder::from_config(GraphConfig::from_json(json).unwrap(), input)
}

#[test]
fn test_image_flows_through_graph() {
    let mut instance = builder(FLIP_GRAPH, "input_video").build().unwrap();
    let poller = instance.create_poller("output_video").unwrap();
    instance.start().unwrap();
    assert_eq!(poller.queue_size(), 0);

    // two rows of one gray pixel each
    let frame = ImageFrame::new(ImageFormat::Gray8, 1, 2, vec![10, 20]).unwrap();
    let timestamp = instance.process(frame).unwrap();
    assert_eq!(timestamp.value(), 0);
    instance.wait_until_idle().unwrap();
    assert!(poller.queue_size() >= 1);

    let packet = poller.poll().unwrap();
    assert_eq!(packet.timestamp().value(), 0);
    let flipped = packet.get_image().unwrap();
    assert_eq!(flipped.pixels(), &[20, 10]);

    instance.close().unwrap();
}

#[test]
fn test_overrides_and_timestamps() {
    let mut builder = builder(GATE_GRAPH, "score");
    builder.add_option_float("gate", "threshold", 0.5);
    let mut instance = builder.build().unwrap();
    let passed = instance.create_poller("passed").unwrap();
    let copies = instance.create_poller("score_copy").unwrap();
    instance.start().unwrap();

    for score in [0.2f32, 0.7, 0.5] {
        instance.process(Packet::float(score)).unwrap();
    }
    instance.wait_until_idle().unwrap();
    assert_eq!(passed.queue_size(), 3);
    assert_eq!(copies.queue_size(), 3);

    let results: Vec<(i64, bool)> = (0..3)
        .map(|_| {
            let packet = passed.poll().unwrap();
            (packet.timestamp().value(), packet.get_bool().unwrap())
        })
        .collect();
    assert_eq!(results, vec![(0, false), (1, true), (2, false)]);
}

#[test]
fn test_side_packets_bound_at_start() {
    let json = r#"{
        "input_stream": ["tick"],
        "input_side_packet": ["hands"],
        "node": [
            { "calculator": "SidePacketToStreamCalculator",
              "input_stream": ["TICK:tick"], "output_stream": ["PACKET:num_hands"],
              "input_side_packet": ["PACKET:hands"] }
        ]
    }"#;

    let mut missing = builder(json, "tick").build().unwrap();
    assert!(matches!(missing.start(), Err(Error::MissingSidePacket(name)) if name == "hands"));

    let mut with_packet = builder(json, "tick");
    with_packet.add_side_packet("hands", Packet::int(2));
    let mut instance = with_packet.build().unwrap();
    let poller = instance.create_poller("num_hands").unwrap();
    instance.start().unwrap();
    instance.process(Packet::bool(true)).unwrap();
    instance.wait_until_idle().unwrap();
    assert_eq!(poller.poll().unwrap().get_int().unwrap(), 2);
}

#[test]
fn test_lifecycle_errors() {
    let mut instance = builder(FLIP_GRAPH, "input_video").build().unwrap();
    assert!(matches!(instance.process(Packet::int(1)), Err(Error::State(_))));
    assert!(matches!(instance.wait_until_idle(), Err(Error::State(_))));
    assert!(matches!(
        instance.create_poller("nowhere"),
        Err(Error::UnknownStream(_))
    ));

    instance.start().unwrap();
    assert!(matches!(instance.start(), Err(Error::State(_))));
    assert!(matches!(
        instance.create_poller("output_video"),
        Err(Error::State(_))
    ));
}

#[test]
fn test_calculator_failure_stops_graph() {
    let mut instance = builder(GATE_GRAPH, "score").build().unwrap();
    let poller = instance.create_poller("passed").unwrap();
    instance.start().unwrap();

    // the gate reads floats, so an int fails the graph
    instance.process(Packet::int(3)).unwrap();
    let err = instance.wait_until_idle().unwrap_err();
    assert!(matches!(&err, Error::Calculator { node, .. } if node == "gate"), "{}", err);

    assert!(instance.process(Packet::float(1.0)).is_err());
    assert!(matches!(poller.poll(), Err(Error::PollerClosed(_))));
    assert!(instance.close().is_err());
}

struct Counter {
    seen: i32,
}

impl Calculator for Counter {
    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        self.seen += 1;
        cx.output("COUNT", Packet::int(self.seen))
    }
}

#[test]
fn test_custom_calculator_in_graph() {
    register_calculator(CalculatorRegistration {
        name: "CounterCalculator",
        options: &[],
        create: || -> Box<dyn Calculator> { Box::new(Counter { seen: 0 }) },
    });
    let json = r#"{
        "input_stream": ["in"],
        "node": [
            { "calculator": "CounterCalculator", "input_stream": ["in"], "output_stream": ["COUNT:count"] }
        ]
    }"#;
    let mut instance = builder(json, "in").build().unwrap();
    let poller = instance.create_poller("count").unwrap();
    instance.start().unwrap();
    for _ in 0..4 {
        instance.process(Packet::bool(false)).unwrap();
    }
    // close drains whatever is still queued
    instance.close().unwrap();

    let counts: Vec<i32> = (0..4).map(|_| poller.poll().unwrap().get_int().unwrap()).collect();
    assert_eq!(counts, vec![1, 2, 3, 4]);
    assert!(poller.poll().is_err());
}

#[test]
fn test_poll_timeout_and_dropped_poller() {
    let mut instance = builder(GATE_GRAPH, "score").build().unwrap();
    let kept = instance.create_poller("passed").unwrap();
    let dropped = instance.create_poller("passed").unwrap();
    instance.start().unwrap();

    assert!(kept.poll_timeout(Duration::from_millis(20)).unwrap().is_none());
    drop(dropped);

    instance.process(Packet::float(0.95)).unwrap();
    let packet = kept.poll_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(packet.get_bool().unwrap());
}

#[test]
fn test_concurrent_process_keeps_timestamps_contiguous() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;
    let total = THREADS * PER_THREAD;

    let mut instance = builder(GATE_GRAPH, "score").build().unwrap();
    let poller = instance.create_poller("score_copy").unwrap();
    instance.start().unwrap();

    let mut stamps: Vec<i64> = thread::scope(|scope| {
        let feeders: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    (0..PER_THREAD)
                        .map(|_| instance.process(Packet::float(0.5)).unwrap().value())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        feeders
            .into_iter()
            .flat_map(|feeder| feeder.join().unwrap())
            .collect()
    });
    stamps.sort_unstable();
    let expected: Vec<i64> = (0..total as i64).collect();
    assert_eq!(stamps, expected);

    instance.wait_until_idle().unwrap();
    assert_eq!(poller.queue_size(), total);
    let seen: Vec<i64> = (0..total)
        .map(|_| poller.poll().unwrap().timestamp().value())
        .collect();
    assert_eq!(seen, expected);
}

static TRACKED_CLOSES: AtomicUsize = AtomicUsize::new(0);

/// Forwards its input and counts how often it is closed.
struct Tracked;

impl Calculator for Tracked {
    fn process(&mut self, cx: &mut CalculatorContext<'_>) -> Result<()> {
        match cx.input_by_position(0).cloned() {
            Some(packet) => cx.output_by_position(0, packet),
            None => Ok(()),
        }
    }

    fn close(&mut self, _cx: &mut CalculatorContext<'_>) -> Result<()> {
        TRACKED_CLOSES.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_start_can_be_retried_after_open_fails() {
    register_calculator(CalculatorRegistration {
        name: "TrackedCalculator",
        options: &[],
        create: || -> Box<dyn Calculator> { Box::new(Tracked) },
    });
    let dir = tempfile::tempdir().unwrap();
    let picture = dir.path().join("marker.png");
    let json = format!(
        r#"{{
        "input_stream": ["tick"],
        "output_stream": ["picture"],
        "node": [
            {{ "calculator": "TrackedCalculator", "name": "tracked",
               "input_stream": ["tick"], "output_stream": ["ticked"] }},
            {{ "calculator": "ImageFileCalculator", "name": "loader",
               "input_stream": ["TICK:ticked"], "output_stream": ["IMAGE:picture"],
               "options": {{ "file": {}, "format": "gray8" }} }}
        ]
    }}"#,
        serde_json::to_string(picture.to_str().unwrap()).unwrap()
    );

    let mut instance = builder(&json, "tick").build().unwrap();
    let poller = instance.create_poller("picture").unwrap();

    let err = match instance.start() {
        Err(err) => err,
        Ok(()) => panic!("started without the image file"),
    };
    assert!(matches!(&err, Error::Calculator { node, .. } if node == "loader"), "{}", err);
    assert!(!instance.is_running());
    // the node opened before the failing one is closed again
    assert_eq!(TRACKED_CLOSES.load(Ordering::SeqCst), 1);

    image::GrayImage::from_raw(2, 1, vec![5, 9])
        .unwrap()
        .save(&picture)
        .unwrap();
    instance.start().unwrap();
    assert_eq!(instance.process(Packet::bool(true)).unwrap().value(), 0);
    instance.wait_until_idle().unwrap();

    let packet = poller.poll_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert_eq!(packet.get_image().unwrap().pixels(), &[5, 9]);
    instance.close().unwrap();
    assert_eq!(TRACKED_CLOSES.load(Ordering::SeqCst), 2);
}
