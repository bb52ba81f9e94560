// SPDX-License-Identifier: MPL-2.0

//! Pipeline bus handling
//!
//! Both loops stop on the first end-of-stream or error message. Only the
//! pipeline's own state changes are reported.

use std::sync::{Arc, Mutex};

use gst::glib;
use gst::prelude::*;

use crate::CAT;
use crate::error::PipelineError;

const WATCHED: [gst::MessageType; 4] = [
    gst::MessageType::Eos,
    gst::MessageType::Error,
    gst::MessageType::StateChanged,
    gst::MessageType::Warning,
];

/// Block on the bus until end-of-stream or an error.
///
/// Nothing else iterates the default main context meanwhile, so this is for
/// pipelines without a [`crate::Feeder`].
pub fn run_blocking(pipeline: &gst::Pipeline) -> Result<(), PipelineError> {
    let bus = pipeline.bus().ok_or(PipelineError::NoBus)?;

    for msg in bus.iter_timed_filtered(gst::ClockTime::NONE, &WATCHED) {
        if let Some(outcome) = handle_message(pipeline, &msg) {
            return outcome;
        }
    }

    Ok(())
}

/// Run a [`glib::MainLoop`] on the default context until end-of-stream or an
/// error is posted on the bus.
pub fn run_main_loop(pipeline: &gst::Pipeline) -> Result<(), PipelineError> {
    let bus = pipeline.bus().ok_or(PipelineError::NoBus)?;
    let main_loop = glib::MainLoop::new(None, false);
    let outcome = Arc::new(Mutex::new(None));

    let _watch = bus
        .add_watch({
            let main_loop = main_loop.clone();
            let outcome = Arc::clone(&outcome);
            let pipeline_weak = pipeline.downgrade();
            move |_, msg| {
                let Some(pipeline) = pipeline_weak.upgrade() else {
                    main_loop.quit();
                    return glib::ControlFlow::Continue;
                };
                if let Some(result) = handle_message(&pipeline, msg) {
                    // Keep the first outcome, later messages may still be queued
                    outcome.lock().unwrap().get_or_insert(result);
                    main_loop.quit();
                }
                glib::ControlFlow::Continue
            }
        })
        .map_err(PipelineError::BusWatch)?;

    main_loop.run();

    let result = outcome.lock().unwrap().take();
    result.unwrap_or(Ok(()))
}

/// Handle one bus message. `Some` means the pipeline is done.
pub fn handle_message(
    pipeline: &gst::Pipeline,
    msg: &gst::Message,
) -> Option<Result<(), PipelineError>> {
    use gst::MessageView;

    match msg.view() {
        MessageView::Eos(..) => {
            gst::info!(CAT, obj = pipeline, "End-Of-Stream reached");
            println!("End-Of-Stream reached.");
            Some(Ok(()))
        }
        MessageView::Error(err) => {
            let error = PipelineError::from_error_message(msg, err);
            gst::error!(CAT, obj = pipeline, "{}", error);
            Some(Err(error))
        }
        MessageView::Warning(warn) => {
            gst::warning!(
                CAT,
                obj = pipeline,
                "Warning from {}: {} ({})",
                msg.src()
                    .map(|s| String::from(s.path_string()))
                    .unwrap_or_else(|| "None".into()),
                warn.error(),
                warn.debug().unwrap_or_else(|| "".into()),
            );
            None
        }
        MessageView::StateChanged(state_changed) => {
            if msg.src() == Some(pipeline.upcast_ref::<gst::Object>()) {
                println!(
                    "Pipeline state changed from {} to {}:",
                    state_name(state_changed.old()),
                    state_name(state_changed.current())
                );
            }
            None
        }
        _ => None,
    }
}

/// The name GStreamer itself uses for `state`.
fn state_name(state: gst::State) -> &'static str {
    match state {
        gst::State::VoidPending => "VOID_PENDING",
        gst::State::Null => "NULL",
        gst::State::Ready => "READY",
        gst::State::Paused => "PAUSED",
        gst::State::Playing => "PLAYING",
        _ => "UNKNOWN",
    }
}
