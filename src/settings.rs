// SPDX-License-Identifier: MPL-2.0

//! Pipeline configuration
//!
//! The defaults reproduce the fixed pipeline every example program streams:
//! 1920x1080 I420 at 60 fps, the `ball` test pattern, parameter sets repeated
//! every 3 seconds by the payloader, and RTP sent to `127.0.0.1:5200`.

use gst_video::VideoFormat;

use crate::error::PipelineError;

/// Default `udpsink` destination.
pub const DEFAULT_UDP_CLIENTS: &str = "127.0.0.1:5200";

/// Default `filesink` location.
pub const DEFAULT_OUTPUT_LOCATION: &str = "stream.rtp";

/// Raw video negotiated between the source and the converter.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    pub format: VideoFormat,
    pub width: u32,
    pub height: u32,
    pub framerate: gst::Fraction,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            format: VideoFormat::I420,
            width: 1920,
            height: 1080,
            framerate: gst::Fraction::new(60, 1),
        }
    }
}

impl VideoSettings {
    pub fn info(&self) -> Result<gst_video::VideoInfo, PipelineError> {
        gst_video::VideoInfo::builder(self.format, self.width, self.height)
            .fps(self.framerate)
            .build()
            .map_err(PipelineError::VideoInfo)
    }

    pub fn caps(&self) -> Result<gst::Caps, PipelineError> {
        self.info()?.to_caps().map_err(PipelineError::VideoInfo)
    }
}

/// Optional x265enc tuning. Unset fields keep the encoder defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderSettings {
    /// Target bitrate in kbit/s
    pub bitrate: Option<u32>,
    /// `speed-preset` nick, e.g. "ultrafast"
    pub speed_preset: Option<String>,
    /// `tune` nick, e.g. "zerolatency"
    pub tune: Option<String>,
    /// Maximum distance between keyframes
    pub key_int_max: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub video: VideoSettings,
    /// `videotestsrc` pattern, as nick, name or numeric value
    pub pattern: String,
    /// `rtph265pay` config-interval in seconds
    pub config_interval: i32,
    pub encoder: EncoderSettings,
    /// Stop every source after this many buffers
    pub num_buffers: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            video: VideoSettings::default(),
            pattern: "ball".into(),
            config_interval: 3,
            encoder: EncoderSettings::default(),
            num_buffers: None,
        }
    }
}
