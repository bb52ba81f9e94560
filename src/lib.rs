// SPDX-License-Identifier: MPL-2.0

//! Example pipelines streaming raw video as H.265 over RTP.
//!
//! Every program built on this crate runs the same chain:
//!
//! ```text
//! source ! video/x-raw ! videoconvert ! x265enc ! rtph265pay ! udpsink|filesink
//! ```
//!
//! The source is `videotestsrc`, or an `appsrc` fed on demand either from a
//! memory-mapped file ([`MappedFile`]) or with two alternating static frames
//! ([`AlternatingFrames`]).
//!
//! ```ignore
//! use gsth265rtp::{Input, Output, Settings, StreamPipeline};
//!
//! gst::init()?;
//! let pipeline = StreamPipeline::build(
//!     &Settings::default(),
//!     &Input::TestPattern,
//!     &Output::udp(gsth265rtp::DEFAULT_UDP_CLIENTS),
//! )?;
//! pipeline.run()?;
//! ```

use std::sync::LazyLock;

pub mod bus;
pub mod cli;
pub mod error;
pub mod feeder;
pub mod frames;
pub mod mapped;
pub mod pipeline;
pub mod settings;

pub use error::PipelineError;
pub use feeder::{BufferSource, Feeder, FrameClock};
pub use frames::AlternatingFrames;
pub use mapped::{ChunkCursor, MappedFile};
pub use pipeline::{Input, Output, StreamPipeline};
pub use settings::{
    DEFAULT_OUTPUT_LOCATION, DEFAULT_UDP_CLIENTS, EncoderSettings, Settings, VideoSettings,
};

pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "h265rtp",
        gst::DebugColorFlags::empty(),
        Some("H.265 RTP example pipelines"),
    )
});
