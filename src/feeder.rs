// SPDX-License-Identifier: MPL-2.0

//! Demand-driven feeding of an `appsrc`
//!
//! `appsrc` signals `need-data` when its internal queue runs low and
//! `enough-data` when it is full. On `need-data` a [`Feeder`] registers an
//! idle task on the default main context which pushes one buffer per
//! dispatch. On `enough-data` the task is removed again. When the
//! [`BufferSource`] runs dry the task signals end-of-stream and stops.
//!
//! The idle task only runs while the default main context is iterated, so
//! pipelines using a feeder are driven with [`crate::bus::run_main_loop`].

use std::sync::{Arc, Mutex};

use gst::glib;
use gst::prelude::*;

use crate::CAT;

/// Something that hands out the buffers pushed into an `appsrc`.
pub trait BufferSource: Send {
    /// The next buffer to push, or `None` once the stream is over.
    fn next_buffer(&mut self) -> Option<gst::Buffer>;
}

/// Timestamps consecutive buffers of a fixed-rate stream.
///
/// Timestamps are computed from the buffer index rather than accumulated so
/// a framerate that does not divide a second evenly does not drift.
#[derive(Debug, Clone)]
pub struct FrameClock {
    framerate: gst::Fraction,
    index: u64,
}

impl FrameClock {
    pub fn new(framerate: gst::Fraction) -> Self {
        Self { framerate, index: 0 }
    }

    fn running_time(&self, index: u64) -> Option<gst::ClockTime> {
        let (numer, denom) = (self.framerate.numer(), self.framerate.denom());
        if numer <= 0 || denom <= 0 {
            return None;
        }
        gst::ClockTime::SECOND.mul_div_floor(index * denom as u64, numer as u64)
    }

    /// Number of buffers stamped so far.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Set pts and duration of the next buffer in the stream.
    pub fn stamp(&mut self, buffer: &mut gst::BufferRef) {
        let pts = self.running_time(self.index);
        let next = self.running_time(self.index + 1);
        buffer.set_pts(pts);
        buffer.set_duration(next.zip(pts).map(|(next, pts)| next - pts));
        self.index += 1;
    }
}

struct State {
    source: Box<dyn BufferSource>,
    // Some while the idle task is registered and alive
    idle: Option<glib::SourceId>,
    // Bumped on every registration, identifies the task owning `idle`
    generation: u64,
    pushed: u64,
    finished: bool,
}

/// Feeds an `appsrc` from a [`BufferSource`] whenever it asks for data.
pub struct Feeder {
    appsrc: gst_app::AppSrc,
    state: Arc<Mutex<State>>,
}

impl Feeder {
    /// Install the `need-data`/`enough-data` callbacks on `appsrc`.
    ///
    /// This replaces any callbacks previously set on the element.
    pub fn attach(appsrc: &gst_app::AppSrc, source: impl BufferSource + 'static) -> Self {
        let state = Arc::new(Mutex::new(State {
            source: Box::new(source),
            idle: None,
            generation: 0,
            pushed: 0,
            finished: false,
        }));

        let need = Arc::downgrade(&state);
        let enough = Arc::downgrade(&state);
        appsrc.set_callbacks(
            gst_app::AppSrcCallbacks::builder()
                .need_data(move |appsrc, _length| {
                    if let Some(state) = need.upgrade() {
                        start_feeding(&state, appsrc);
                    }
                })
                .enough_data(move |appsrc| {
                    if let Some(state) = enough.upgrade() {
                        stop_feeding(&state, appsrc);
                    }
                })
                .build(),
        );

        Self {
            appsrc: appsrc.clone(),
            state,
        }
    }

    /// Remove the feeding task, if any. `need-data` registers it again.
    pub fn stop(&self) {
        stop_feeding(&self.state, &self.appsrc);
    }

    /// Number of buffers accepted by the `appsrc` so far.
    pub fn pushed(&self) -> u64 {
        self.state.lock().unwrap().pushed
    }

    pub fn is_feeding(&self) -> bool {
        self.state.lock().unwrap().idle.is_some()
    }

    /// How many times a feeding task has been registered.
    pub fn registrations(&self) -> u64 {
        self.state.lock().unwrap().generation
    }

    /// Whether end-of-stream has been signalled.
    pub fn is_finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }
}

impl Drop for Feeder {
    fn drop(&mut self) {
        self.stop();
    }
}

fn start_feeding(state: &Arc<Mutex<State>>, appsrc: &gst_app::AppSrc) {
    // Held across idle_add so the task cannot observe `idle` before it is set
    let mut guard = state.lock().unwrap();
    if guard.idle.is_some() || guard.finished {
        return;
    }

    guard.generation += 1;
    let generation = guard.generation;
    gst::debug!(CAT, obj = appsrc, "Start feeding (task {})", generation);
    let weak = Arc::downgrade(state);
    let appsrc = appsrc.clone();
    guard.idle = Some(glib::idle_add(move || {
        let Some(state) = weak.upgrade() else {
            return glib::ControlFlow::Break;
        };
        push_next(&state, &appsrc, generation)
    }));
}

fn stop_feeding(state: &Mutex<State>, appsrc: &gst_app::AppSrc) {
    let idle = state.lock().unwrap().idle.take();
    if let Some(idle) = idle {
        gst::debug!(CAT, obj = appsrc, "Stop feeding");
        idle.remove();
    }
}

/// Forget `idle` if it still belongs to the task `generation`.
///
/// Called before returning Break, which destroys that task's source. A newer
/// registration must keep its id.
fn release(state: &mut State, generation: u64) {
    if state.generation == generation {
        state.idle = None;
    }
}

fn push_next(
    state: &Mutex<State>,
    appsrc: &gst_app::AppSrc,
    generation: u64,
) -> glib::ControlFlow {
    let next = {
        let mut guard = state.lock().unwrap();
        let next = guard.source.next_buffer();
        if next.is_none() {
            release(&mut guard, generation);
            guard.finished = true;
        }
        next
    };

    let Some(buffer) = next else {
        gst::info!(CAT, obj = appsrc, "Source exhausted, signalling end-of-stream");
        if let Err(err) = appsrc.end_of_stream() {
            gst::debug!(CAT, obj = appsrc, "Failed to signal end-of-stream: {:?}", err);
        }
        return glib::ControlFlow::Break;
    };

    // Not locked: pushing may emit enough-data synchronously
    match appsrc.push_buffer(buffer) {
        Ok(_) => {
            state.lock().unwrap().pushed += 1;
            glib::ControlFlow::Continue
        }
        Err(err) => {
            gst::debug!(CAT, obj = appsrc, "Push failed: {:?}, stop feeding", err);
            release(&mut state.lock().unwrap(), generation);
            glib::ControlFlow::Break
        }
    }
}
