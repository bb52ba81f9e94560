// SPDX-License-Identifier: MPL-2.0

//! Command-line arguments shared by the example programs
//!
//! Each binary flattens [`StreamArgs`] into its own `clap` parser and adds
//! its source-specific arguments.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use gst_video::VideoFormat;

use crate::pipeline::Output;
use crate::settings::{
    DEFAULT_OUTPUT_LOCATION, DEFAULT_UDP_CLIENTS, EncoderSettings, Settings, VideoSettings,
};

/// Raw video negotiated between the source and the converter
#[derive(Args, Debug, Clone)]
pub struct VideoArgs {
    /// Frame width in pixels
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Frames per second, as "60" or "30000/1001"
    #[arg(long, value_name = "FPS", default_value = "60/1", value_parser = parse_framerate)]
    pub framerate: gst::Fraction,

    /// Raw video format, e.g. I420 or NV12
    #[arg(long, default_value = "I420", value_parser = parse_format)]
    pub format: VideoFormat,
}

impl From<&VideoArgs> for VideoSettings {
    fn from(args: &VideoArgs) -> Self {
        VideoSettings {
            format: args.format,
            width: args.width,
            height: args.height,
            framerate: args.framerate,
        }
    }
}

/// x265enc and rtph265pay tuning
#[derive(Args, Debug, Clone)]
pub struct EncoderArgs {
    /// Encoder bitrate in kbit/s
    #[arg(long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// x265 speed preset (ultrafast, superfast, ..., placebo)
    #[arg(long, value_name = "PRESET")]
    pub speed_preset: Option<String>,

    /// x265 tuning (psnr, ssim, grain, zerolatency, fastdecode)
    #[arg(long)]
    pub tune: Option<String>,

    /// Maximum number of frames between keyframes
    #[arg(long, value_name = "FRAMES")]
    pub key_int_max: Option<i32>,

    /// Seconds between VPS/SPS/PPS insertion by the payloader
    #[arg(long, value_name = "SECONDS", default_value_t = 3, allow_negative_numbers = true)]
    pub config_interval: i32,
}

impl From<&EncoderArgs> for EncoderSettings {
    fn from(args: &EncoderArgs) -> Self {
        EncoderSettings {
            bitrate: args.bitrate,
            speed_preset: args.speed_preset.clone(),
            tune: args.tune.clone(),
            key_int_max: args.key_int_max,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Send RTP over UDP
    Udp,
    /// Write RTP packets to a file
    File,
}

/// Where the RTP stream goes
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output kind (default depends on the program)
    #[arg(long, value_enum)]
    pub output: Option<OutputKind>,

    /// UDP destinations as comma separated host:port
    #[arg(long, default_value = DEFAULT_UDP_CLIENTS)]
    pub clients: String,

    /// Output file for --output file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUTPUT_LOCATION)]
    pub location: PathBuf,
}

impl OutputArgs {
    pub fn output_or(&self, default: OutputKind) -> Output {
        match self.output.unwrap_or(default) {
            OutputKind::Udp => Output::udp(self.clients.clone()),
            OutputKind::File => Output::file(self.location.clone()),
        }
    }
}

/// Arguments common to every example program
#[derive(Args, Debug, Clone)]
pub struct StreamArgs {
    #[command(flatten)]
    pub video: VideoArgs,

    #[command(flatten)]
    pub encoder: EncoderArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    pub num_buffers: Option<u32>,
}

impl StreamArgs {
    pub fn settings(&self) -> Settings {
        Settings {
            video: (&self.video).into(),
            config_interval: self.encoder.config_interval,
            encoder: (&self.encoder).into(),
            num_buffers: self.num_buffers,
            ..Settings::default()
        }
    }
}

fn parse_framerate(s: &str) -> Result<gst::Fraction, String> {
    let s = s.trim();
    let (numer, denom) = s.split_once('/').unwrap_or((s, "1"));
    let numer = numer
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid numerator: {e}"))?;
    let denom = denom
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid denominator: {e}"))?;
    if numer <= 0 || denom <= 0 {
        return Err("framerate must be positive".into());
    }
    Ok(gst::Fraction::new(numer, denom))
}

fn parse_format(s: &str) -> Result<VideoFormat, String> {
    match VideoFormat::from_string(s.trim()) {
        VideoFormat::Unknown => Err(format!("unknown raw video format '{s}'")),
        format => Ok(format),
    }
}
