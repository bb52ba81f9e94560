// Common test utilities for gst-h265-rtp tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use gst::prelude::*;

static INIT: Once = Once::new();

/// Initialize GStreamer for tests.
///
/// This function is idempotent and can be called multiple times safely.
pub fn init() {
    INIT.call_once(|| {
        gst::init().unwrap();
    });
}

/// Whether every element factory in `factories` is installed.
///
/// Tests needing optional plugins return early when this is false.
pub fn has_elements(factories: &[&str]) -> bool {
    let missing: Vec<_> = factories
        .iter()
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .collect();
    if !missing.is_empty() {
        eprintln!("Skipping test, missing elements: {:?}", missing);
        return false;
    }
    true
}

/// Received buffer contents and timestamps.
pub type Received = Arc<Mutex<Vec<(Vec<u8>, Option<gst::ClockTime>)>>>;

/// Build `appsrc ! appsink`, the appsink recording everything it receives.
pub fn appsrc_to_appsink(caps: &gst::Caps, max_bytes: u64) -> (gst::Pipeline, gst_app::AppSrc, Received) {
    let pipeline = gst::Pipeline::new();

    let appsrc = gst_app::AppSrc::builder()
        .caps(caps)
        .format(gst::Format::Time)
        .max_bytes(max_bytes)
        .build();

    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = received.clone();
    let appsink = gst_app::AppSink::builder()
        .sync(false)
        .callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    received_clone
                        .lock()
                        .unwrap()
                        .push((map.as_slice().to_vec(), buffer.pts()));
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        )
        .build();

    pipeline
        .add_many([appsrc.upcast_ref::<gst::Element>(), appsink.upcast_ref()])
        .unwrap();
    appsrc.link(&appsink).unwrap();

    (pipeline, appsrc, received)
}
