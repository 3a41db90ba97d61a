use std::cell::RefCell;
use std::rc::Rc;

use crate::config::ViewerConfig;
use crate::ion::Element;
use crate::log::{DecodedValue, LogError, decode};
use crate::payload::PayloadError;
use crate::timeline::{
    ClockSnapshot, FramePayloads, LoadOutcome, ManualTimeSource, PlaybackCommand,
    PlaybackObserver, PlaybackSession,
};

use super::{log_bytes, topic};

fn session() -> (PlaybackSession<ManualTimeSource>, ManualTimeSource) {
    let source = ManualTimeSource::new(10_000);
    let session = PlaybackSession::new(source.clone(), ViewerConfig::default());
    (session, source)
}

fn sample_log() -> Vec<u8> {
    log_bytes(vec![
        topic("/odom", "nav_msgs/Odometry", &[1_000, 1_100, 1_200]),
        topic("/camera/image_raw/compressed_throttle", "sensor_msgs/CompressedImage", &[1_050, 1_250]),
        topic("/empty", "std_msgs/Empty", &[]),
    ])
}

fn seq(msg: Option<&crate::timeline::TopicMessage>) -> Option<i64> {
    msg.and_then(|m| m.data.get("seq")).and_then(DecodedValue::as_i64)
}

#[test]
fn load_derives_topics_range_and_image_topic() {
    let (mut s, _clock) = session();
    s.load_bytes(&sample_log()).expect("load");
    let log = s.log().expect("loaded");
    assert_eq!(log.topics.len(), 3);
    assert_eq!(log.indexes.len(), 3);
    assert_eq!(
        log.image_topic.as_deref(),
        Some("/camera/image_raw/compressed_throttle")
    );
    assert_eq!(s.clock().duration(), 250);
    assert_eq!(s.snapshot().absolute_time, Some(1_000));
    assert_eq!(
        log.parsed.session.as_ref().and_then(|x| x.id()),
        Some("session-1")
    );
}

#[test]
fn current_message_follows_shared_virtual_time() {
    let (mut s, clock) = session();
    s.load_bytes(&sample_log()).expect("load");
    assert!(s.play());
    clock.advance(140);
    let snap = s.tick();
    assert_eq!(snap.virtual_time, 140);
    assert_eq!(s.current_index("/odom"), 1);
    assert_eq!(seq(s.current_message("/odom")), Some(1));
    assert_eq!(s.current_index("/missing"), 0);
    assert!(s.current_message("/missing").is_none());

    let frame = s.current_frame();
    let names: Vec<_> = frame.iter().map(|e| e.topic.topic_name.as_str()).collect();
    assert_eq!(names, vec!["/odom", "/camera/image_raw/compressed_throttle"]);
    assert_eq!(frame[1].index, 0);
}

#[test]
fn failed_load_keeps_previous_log_and_clock() {
    let (mut s, clock) = session();
    s.load_bytes(&sample_log()).expect("load");
    s.play();
    clock.advance(100);
    s.tick();
    let before = s.snapshot();

    let err = s.load_bytes(&[]).expect_err("empty");
    assert!(matches!(err, LogError::EmptyInput));
    assert_eq!(s.last_error(), Some(err.to_string().as_str()));
    assert!(s.log().is_some());
    assert_eq!(s.snapshot(), before);

    let err = s.load_bytes(&[0x01, 0x02]).expect_err("not ion");
    assert!(matches!(err, LogError::Decode(_)));
    assert_eq!(s.topics().len(), 3);
}

#[test]
fn successful_load_clears_error_and_resets_clock() {
    let (mut s, clock) = session();
    s.load_bytes(&sample_log()).expect("load");
    s.play();
    clock.advance(100);
    s.tick();
    let _ = s.load_bytes(&[]);
    s.load_bytes(&log_bytes(vec![topic("/b", "t", &[5, 10])]))
        .expect("load");
    assert_eq!(s.last_error(), None);
    assert!(!s.clock().is_playing());
    assert_eq!(s.clock().virtual_time(), 0);
    assert_eq!(s.clock().duration(), 5);
}

#[test]
fn stale_load_results_are_discarded() {
    let (mut s, _clock) = session();
    let first = s.begin_load();
    let second = s.begin_load();

    let parsed_first = decode(&log_bytes(vec![topic("/first", "t", &[1])])).expect("decode");
    let parsed_second = decode(&log_bytes(vec![topic("/second", "t", &[1])])).expect("decode");

    assert_eq!(
        s.complete_load(second, Ok(parsed_second)).expect("apply"),
        LoadOutcome::Applied
    );
    assert_eq!(
        s.complete_load(first, Ok(parsed_first)).expect("stale"),
        LoadOutcome::Stale
    );
    assert_eq!(s.topics()[0].topic_name, "/second");

    // 过期的失败同样被忽略
    assert_eq!(
        s.complete_load(first, Err(LogError::EmptyInput)).expect("stale"),
        LoadOutcome::Stale
    );
    assert_eq!(s.last_error(), None);
}

#[test]
fn unload_invalidates_in_flight_loads() {
    let (mut s, _clock) = session();
    let ticket = s.begin_load();
    s.unload();
    let parsed = decode(&sample_log()).expect("decode");
    assert_eq!(
        s.complete_load(ticket, Ok(parsed)).expect("stale"),
        LoadOutcome::Stale
    );
    assert!(s.log().is_none());
    assert!(!s.play());
}

#[test]
fn faster_and_slower_clamp_to_configured_bounds() {
    let (mut s, _clock) = session();
    s.load_bytes(&sample_log()).expect("load");
    s.faster();
    assert_eq!(s.clock().speed(), 2.0);
    s.faster();
    s.faster();
    assert_eq!(s.clock().speed(), 4.0);
    s.set_speed(1.0);
    s.slower();
    s.slower();
    s.slower();
    assert_eq!(s.clock().speed(), 0.25);
}

struct Recorder {
    seen: Rc<RefCell<Vec<i64>>>,
}

impl PlaybackObserver for Recorder {
    fn on_tick(&mut self, snapshot: &ClockSnapshot, _commands: &mut Vec<PlaybackCommand>) {
        self.seen.borrow_mut().push(snapshot.virtual_time);
    }
}

/// 第一次 tick 时跳到一半
struct SeekOnce {
    done: bool,
}

impl PlaybackObserver for SeekOnce {
    fn on_tick(&mut self, _snapshot: &ClockSnapshot, commands: &mut Vec<PlaybackCommand>) {
        if !self.done {
            self.done = true;
            commands.push(PlaybackCommand::Seek(0.5));
        }
    }
}

#[test]
fn observer_commands_apply_after_all_observers_ran() {
    let (mut s, clock) = session();
    s.load_bytes(&sample_log()).expect("load");
    let seen = Rc::new(RefCell::new(Vec::new()));
    s.subscribe(Box::new(SeekOnce { done: false }));
    s.subscribe(Box::new(Recorder { seen: seen.clone() }));

    s.play();
    clock.advance(10);
    let snap = s.tick();
    // 两个观察者都看到了 seek 之前的时间
    assert_eq!(*seen.borrow(), vec![10]);
    assert_eq!(snap.virtual_time, 125);

    clock.advance(10);
    assert_eq!(s.tick().virtual_time, 135);
    assert_eq!(*seen.borrow(), vec![10, 135]);
}

#[test]
fn stopped_session_does_not_notify_observers() {
    let (mut s, clock) = session();
    s.load_bytes(&sample_log()).expect("load");
    let seen = Rc::new(RefCell::new(Vec::new()));
    s.subscribe(Box::new(Recorder { seen: seen.clone() }));
    clock.advance(50);
    s.tick();
    assert!(seen.borrow().is_empty());

    s.apply_command(PlaybackCommand::Toggle);
    assert!(s.clock().is_playing());
    s.apply_command(PlaybackCommand::Pause);
    assert!(!s.clock().is_playing());
}

#[test]
fn select_topic_requires_a_known_name() {
    let (mut s, _clock) = session();
    s.load_bytes(&sample_log()).expect("load");
    assert!(s.select_topic(Some("/odom")));
    assert_eq!(s.selected_topic(), Some("/odom"));
    assert_eq!(seq(s.selected_message()), Some(0));
    assert!(!s.select_topic(Some("/nope")));
    assert_eq!(s.selected_topic(), Some("/odom"));
    assert!(s.select_topic(None));
    assert!(s.selected_message().is_none());
}

#[test]
fn far_apart_timestamps_keep_a_forward_clock() {
    let (mut s, clock) = session();
    s.load_bytes(&log_bytes(vec![topic("/a", "t", &[i64::MIN + 1, i64::MAX])]))
        .expect("load");
    assert_eq!(s.clock().duration(), i64::MAX);
    assert!(s.play());
    clock.advance(100);
    assert_eq!(s.tick().virtual_time, 100);
    assert_eq!(s.current_index("/a"), 0);

    assert!(s.seek(1.0));
    let snap = s.snapshot();
    assert_eq!(snap.virtual_time, i64::MAX);
    assert_eq!(snap.absolute_time, Some(0));
    assert_eq!(snap.progress, 1.0);
    // 两端等距，取较小下标
    assert_eq!(s.current_index("/a"), 0);
}

fn odom_message(ts: i64, x: f64) -> Element {
    Element::structure([
        ("timestamp", Element::Int(ts)),
        (
            "data",
            Element::structure([
                ("header", Element::structure([("frame_id", Element::string("odom"))])),
                (
                    "pose",
                    Element::structure([(
                        "pose",
                        Element::structure([(
                            "position",
                            Element::structure([
                                ("x", Element::Float(x)),
                                ("y", Element::Float(2.0)),
                                ("z", Element::Float(0.5)),
                            ]),
                        )]),
                    )]),
                ),
            ]),
        ),
    ])
}

fn image_message(ts: i64, data: Element) -> Element {
    Element::structure([
        ("timestamp", Element::Int(ts)),
        (
            "data",
            Element::structure([("format", Element::string("jpeg")), ("data", data)]),
        ),
    ])
}

fn bytes_list(bytes: &[u8]) -> Element {
    Element::list(bytes.iter().map(|b| Element::Int(i64::from(*b))))
}

fn raw_topic(name: &str, topic_type: &str, messages: Vec<Element>) -> Element {
    Element::structure([
        ("topicName", Element::string(name)),
        ("topicType", Element::string(topic_type)),
        ("messages", Element::List(messages)),
    ])
}

fn tf_static_topic() -> Element {
    let transform = Element::structure([
        ("header", Element::structure([("frame_id", Element::string("base_link"))])),
        ("child_frame_id", Element::string("camera")),
        (
            "transform",
            Element::structure([
                (
                    "translation",
                    Element::structure([("x", Element::Float(0.1)), ("z", Element::Float(0.3))]),
                ),
                ("rotation", Element::structure([("w", Element::Float(1.0))])),
            ]),
        ),
    ]);
    raw_topic(
        "/tf_static",
        "tf2_msgs/TFMessage",
        vec![Element::structure([
            ("timestamp", Element::Int(1_000)),
            ("data", Element::structure([("transforms", Element::list([transform]))])),
        ])],
    )
}

fn sensor_log() -> Vec<u8> {
    log_bytes(vec![
        raw_topic(
            "/tb_control/wheel_odom",
            "nav_msgs/Odometry",
            vec![odom_message(1_000, 1.0), odom_message(1_200, 3.0)],
        ),
        raw_topic(
            "/camera/image_raw/compressed_throttle",
            "sensor_msgs/CompressedImage",
            vec![
                image_message(1_100, bytes_list(&[0xFF, 0xD8])),
                image_message(1_300, bytes_list(&[0xFF, 0xD9])),
            ],
        ),
        tf_static_topic(),
    ])
}

#[test]
fn pose_and_image_share_the_playback_clock() {
    let (mut s, clock) = session();
    assert_eq!(s.current_pose(), Ok(None));
    assert_eq!(s.current_image(), Ok(None));

    s.load_bytes(&sensor_log()).expect("load");
    let pose = s.current_pose().expect("pose").expect("odom topic");
    assert_eq!(pose.position.x, 1.0);
    assert_eq!(pose.frame_id.as_deref(), Some("odom"));
    let image = s.current_image().expect("image").expect("image topic");
    assert_eq!(image.bytes, vec![0xFF, 0xD8]);

    assert!(s.play());
    clock.advance(210);
    s.tick();
    let pose = s.current_pose().expect("pose").expect("odom topic");
    assert_eq!(pose.position.x, 3.0);
    assert_eq!(pose.to_scene().position.y, 0.5);
    let image = s.current_image().expect("image").expect("image topic");
    assert_eq!(image.bytes, vec![0xFF, 0xD9]);

    let payloads = FramePayloads::capture(&s, true);
    assert_eq!(payloads.pose.map(|p| p.position.x), Some(3.0));
    let info = payloads.image.expect("image info");
    assert_eq!(info.topic, "/camera/image_raw/compressed_throttle");
    assert_eq!(info.bytes, 2);
    assert_eq!(info.data_uri.as_deref(), Some("data:image/jpeg;base64,/9k="));
}

#[test]
fn static_transform_uses_the_first_message() {
    let (mut s, clock) = session();
    s.load_bytes(&sensor_log()).expect("load");
    assert!(s.play());
    clock.advance(300);
    s.tick();
    let tf = s.static_transform().expect("transform").expect("tf_static topic");
    assert_eq!(tf.translation.x, 0.1);
    assert_eq!(tf.translation.z, 0.3);
    assert_eq!(tf.rotation.w, 1.0);
    assert_eq!(tf.frame_id.as_deref(), Some("base_link"));
    assert_eq!(tf.child_frame_id.as_deref(), Some("camera"));
}

#[test]
fn payload_topics_follow_config_and_report_bad_messages() {
    let source = ManualTimeSource::new(0);
    let config = ViewerConfig {
        odom_topic: "/odom".to_string(),
        ..ViewerConfig::default()
    };
    let mut s = PlaybackSession::new(source, config);
    s.load_bytes(&sensor_log()).expect("load");
    assert_eq!(s.current_pose(), Ok(None));

    s.load_bytes(&log_bytes(vec![raw_topic(
        "/camera/image_raw/compressed_throttle",
        "sensor_msgs/CompressedImage",
        vec![image_message(1_000, Element::Bool(false))],
    )]))
    .expect("load");
    assert_eq!(s.current_image(), Err(PayloadError::MissingField("data")));
    assert_eq!(FramePayloads::capture(&s, false), FramePayloads::default());
}
