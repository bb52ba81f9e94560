// SPDX-License-Identifier: MPL-2.0

//! Two static test frames, pushed alternately

use gst_video::prelude::*;

use crate::error::PipelineError;
use crate::feeder::{BufferSource, FrameClock};

const WHITE_LUMA: u8 = 235;
const BLACK_LUMA: u8 = 16;
const NEUTRAL_CHROMA: u8 = 128;

/// A [`BufferSource`] alternating between a white and a black frame.
///
/// Both frames are rendered once. Every buffer handed out shares the memory
/// of one of them and only carries its own timestamps.
pub struct AlternatingFrames {
    frames: [gst::Buffer; 2],
    clock: FrameClock,
    limit: Option<u64>,
    produced: u64,
}

impl AlternatingFrames {
    pub fn new(info: &gst_video::VideoInfo) -> Result<Self, PipelineError> {
        // Planes are filled byte by byte
        let eight_bit = info.format_info().depth().iter().all(|&depth| depth == 8);
        if !info.is_yuv() || info.n_planes() < 2 || !eight_bit {
            return Err(PipelineError::UnsupportedFormat(info.format()));
        }

        Ok(Self {
            frames: [solid_frame(info, WHITE_LUMA)?, solid_frame(info, BLACK_LUMA)?],
            clock: FrameClock::new(info.fps()),
            limit: None,
            produced: 0,
        })
    }

    /// Stop after `frames` buffers. `None` streams forever.
    pub fn with_limit(mut self, frames: Option<u64>) -> Self {
        self.limit = frames;
        self
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }
}

impl BufferSource for AlternatingFrames {
    fn next_buffer(&mut self) -> Option<gst::Buffer> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return None;
        }

        let mut buffer = self.frames[(self.produced % 2) as usize].copy();
        if let Some(buffer) = buffer.get_mut() {
            self.clock.stamp(buffer);
        }
        self.produced += 1;
        Some(buffer)
    }
}

// Luma plane set to `luma`, every chroma plane neutral
fn solid_frame(info: &gst_video::VideoInfo, luma: u8) -> Result<gst::Buffer, PipelineError> {
    let buffer =
        gst::Buffer::with_size(info.size()).map_err(|err| PipelineError::Buffer(err.to_string()))?;
    let mut frame = gst_video::VideoFrame::from_buffer_writable(buffer, info)
        .map_err(|_| PipelineError::Buffer("cannot map frame writable".into()))?;

    for plane in 0..frame.n_planes() {
        let value = if plane == 0 { luma } else { NEUTRAL_CHROMA };
        frame
            .plane_data_mut(plane)
            .map_err(|err| PipelineError::Buffer(err.to_string()))?
            .fill(value);
    }

    Ok(frame.into_buffer())
}
