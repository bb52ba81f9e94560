//! Tests feeding an appsrc on demand from the library's buffer sources.
//!
//! Each test runs `appsrc ! appsink` on the default main context, which is
//! where the feeding task lives.

use std::io::Write;
use std::time::{Duration, Instant};

use gst::glib;
use gst::prelude::*;
use gsth265rtp::{AlternatingFrames, Feeder, MappedFile, VideoSettings, bus};
use serial_test::serial;

mod common;
use common::{appsrc_to_appsink, has_elements, init};

fn small_video() -> VideoSettings {
    VideoSettings {
        width: 16,
        height: 16,
        framerate: gst::Fraction::new(30, 1),
        ..Default::default()
    }
}

fn run_to_eos(pipeline: &gst::Pipeline) {
    pipeline.set_state(gst::State::Playing).unwrap();
    bus::run_main_loop(pipeline).expect("pipeline should reach end-of-stream");
    pipeline.set_state(gst::State::Null).unwrap();
}

// Dispatch whatever is ready on the default context for `duration`.
fn iterate_for(duration: Duration) {
    let context = glib::MainContext::default();
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if !context.iteration(false) {
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

#[test]
#[serial]
fn test_mapped_file_fed_in_whole_frames() {
    init();
    if !has_elements(&["appsrc", "appsink"]) {
        return;
    }

    let info = small_video().info().unwrap();
    let frame_size = info.size();

    // Three and a half frames of recognizable bytes
    let data: Vec<u8> = (0..frame_size * 7 / 2).map(|i| (i % 251) as u8).collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    let source = MappedFile::open(file.path(), frame_size)
        .unwrap()
        .whole_chunks()
        .with_framerate(info.fps());
    assert_eq!(source.len(), 3 * frame_size);

    // A one-frame queue bound makes appsrc ask for data again after each push
    let (pipeline, appsrc, received) =
        appsrc_to_appsink(&info.to_caps().unwrap(), frame_size as u64);
    let feeder = Feeder::attach(&appsrc, source);

    run_to_eos(&pipeline);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 3);
    for (index, (bytes, pts)) in received.iter().enumerate() {
        assert_eq!(bytes.as_slice(), &data[index * frame_size..(index + 1) * frame_size]);
        assert_eq!(
            *pts,
            gst::ClockTime::SECOND.mul_div_floor(index as u64, 30)
        );
    }

    assert_eq!(feeder.pushed(), 3);
    assert!(feeder.is_finished());
    assert!(!feeder.is_feeding());
}

#[test]
#[serial]
fn test_mapped_file_chunks_keep_partial_tail() {
    init();
    if !has_elements(&["appsrc", "appsink"]) {
        return;
    }

    let data: Vec<u8> = (0..10u8).collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    let source = MappedFile::open(file.path(), 4).unwrap();
    let caps = gst::Caps::new_empty_simple("application/octet-stream");
    let (pipeline, appsrc, received) = appsrc_to_appsink(&caps, 4);
    let feeder = Feeder::attach(&appsrc, source);

    run_to_eos(&pipeline);

    let received = received.lock().unwrap();
    let sizes: Vec<_> = received.iter().map(|(bytes, _)| bytes.len()).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    let joined: Vec<u8> = received.iter().flat_map(|(bytes, _)| bytes.clone()).collect();
    assert_eq!(joined, data);
    // Untimed source
    assert!(received.iter().all(|(_, pts)| pts.is_none()));
    assert_eq!(feeder.pushed(), 3);
}

#[test]
#[serial]
fn test_empty_file_ends_immediately() {
    init();
    if !has_elements(&["appsrc", "appsink"]) {
        return;
    }

    let file = tempfile::NamedTempFile::new().unwrap();
    let source = MappedFile::open(file.path(), 64).unwrap();
    assert!(source.is_empty());

    let caps = gst::Caps::new_empty_simple("application/octet-stream");
    let (pipeline, appsrc, received) = appsrc_to_appsink(&caps, 64);
    let feeder = Feeder::attach(&appsrc, source);

    run_to_eos(&pipeline);

    assert!(received.lock().unwrap().is_empty());
    assert_eq!(feeder.pushed(), 0);
    assert!(feeder.is_finished());
}

#[test]
#[serial]
fn test_alternating_frames_fed_until_limit() {
    init();
    if !has_elements(&["appsrc", "appsink"]) {
        return;
    }

    let info = small_video().info().unwrap();
    let frames = AlternatingFrames::new(&info).unwrap().with_limit(Some(4));

    let (pipeline, appsrc, received) =
        appsrc_to_appsink(&info.to_caps().unwrap(), info.size() as u64);
    let feeder = Feeder::attach(&appsrc, frames);

    run_to_eos(&pipeline);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 4);
    assert_ne!(received[0].0, received[1].0);
    assert_eq!(received[0].0, received[2].0);
    assert_eq!(received[1].0, received[3].0);

    let pts: Vec<_> = received.iter().map(|(_, pts)| pts.unwrap()).collect();
    assert!(pts.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(feeder.pushed(), 4);
}

#[test]
#[serial]
fn test_stop_without_feeding_is_noop() {
    init();
    if !has_elements(&["appsrc"]) {
        return;
    }

    let info = small_video().info().unwrap();
    let appsrc = gst_app::AppSrc::builder().build();
    let feeder = Feeder::attach(&appsrc, AlternatingFrames::new(&info).unwrap());

    assert!(!feeder.is_feeding());
    feeder.stop();
    assert!(!feeder.is_feeding());
    assert!(!feeder.is_finished());
    assert_eq!(feeder.pushed(), 0);
}

#[test]
#[serial]
fn test_feeding_follows_queue_demand() {
    init();
    if !has_elements(&["appsrc", "appsink"]) {
        return;
    }

    let info = small_video().info().unwrap();
    let frames = AlternatingFrames::new(&info).unwrap();

    let (pipeline, appsrc, received) =
        appsrc_to_appsink(&info.to_caps().unwrap(), info.size() as u64);
    let feeder = Feeder::attach(&appsrc, frames);

    // In PAUSED the sink blocks on its preroll buffer and nothing drains the
    // one-frame queue, so enough-data must remove the task
    pipeline.set_state(gst::State::Paused).unwrap();
    iterate_for(Duration::from_millis(300));
    let paused_pushed = feeder.pushed();
    let paused_registrations = feeder.registrations();
    assert!(paused_pushed >= 1);
    assert!(!feeder.is_feeding());

    iterate_for(Duration::from_millis(200));
    assert_eq!(feeder.pushed(), paused_pushed);
    assert!(paused_pushed <= 3, "pushed {paused_pushed} buffers into a full queue");

    // Draining again emits need-data, which registers a new task
    pipeline.set_state(gst::State::Playing).unwrap();
    let context = glib::MainContext::default();
    let deadline = Instant::now() + Duration::from_secs(5);
    while feeder.pushed() < paused_pushed + 10 && Instant::now() < deadline {
        let before = feeder.pushed();
        if !context.iteration(false) {
            std::thread::sleep(Duration::from_millis(2));
        }
        // A single task pushes one buffer per dispatch
        assert!(feeder.pushed() - before <= 1);
    }

    assert!(feeder.pushed() >= paused_pushed + 10);
    assert!(feeder.registrations() > paused_registrations);
    assert!(!received.lock().unwrap().is_empty());

    pipeline.set_state(gst::State::Null).unwrap();
    feeder.stop();
    assert!(!feeder.is_feeding());
    assert!(!feeder.is_finished());
}
