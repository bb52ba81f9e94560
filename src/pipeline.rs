// SPDX-License-Identifier: MPL-2.0

//! # Stream pipeline
//!
//! Builds and runs
//!
//! ```text
//! source ! video/x-raw,... ! videoconvert ! x265enc ! rtph265pay ! sink
//! ```
//!
//! with one of three sources:
//!
//! * [`Input::TestPattern`]: `videotestsrc`
//! * [`Input::MappedFile`]: `appsrc` fed with raw frames from a memory-mapped file
//! * [`Input::AlternatingFrames`]: `appsrc` fed with two static frames in turn
//!
//! and either a `udpsink` or a `filesink`.

use std::path::PathBuf;

use gst::glib;
use gst::prelude::*;

use crate::CAT;
use crate::bus;
use crate::error::PipelineError;
use crate::feeder::Feeder;
use crate::frames::AlternatingFrames;
use crate::mapped::MappedFile;
use crate::settings::{EncoderSettings, Settings};

pub const PIPELINE_NAME: &str = "h265-rtp-pipeline";

/// Where raw video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    TestPattern,
    /// File of raw frames matching the configured video settings
    MappedFile(PathBuf),
    AlternatingFrames,
}

/// Where RTP packets go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// `udpsink clients`, a comma separated list of `host:port`
    Udp { clients: String },
    File { location: PathBuf },
}

impl Output {
    pub fn udp(clients: impl Into<String>) -> Self {
        Output::Udp {
            clients: clients.into(),
        }
    }

    pub fn file(location: impl Into<PathBuf>) -> Self {
        Output::File {
            location: location.into(),
        }
    }
}

/// The pipeline together with handles to each of its elements.
pub struct StreamPipeline {
    pipeline: gst::Pipeline,
    source: gst::Element,
    converter: gst::Element,
    encoder: gst::Element,
    packager: gst::Element,
    sink: gst::Element,
    feeder: Option<Feeder>,
}

fn make(factory: &'static str, name: &str) -> Result<gst::Element, PipelineError> {
    gst::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|source| PipelineError::ElementCreation { factory, source })
}

/// Set an enum property from a nick, a name or its numeric value.
fn set_enum_property(
    element: &gst::Element,
    property: &'static str,
    value: &str,
) -> Result<(), PipelineError> {
    let invalid = || PipelineError::Property {
        element: element.name().to_string(),
        property,
        value: value.to_owned(),
    };

    let pspec = element.find_property(property).ok_or_else(invalid)?;
    let class = glib::EnumClass::with_type(pspec.value_type()).ok_or_else(invalid)?;
    let enum_value = match value.parse::<i32>() {
        Ok(number) => class.to_value(number),
        Err(_) => class
            .to_value_by_nick(value)
            .or_else(|| class.to_value_by_name(value)),
    }
    .ok_or_else(invalid)?;

    element.set_property_from_value(property, &enum_value);
    Ok(())
}

/// Integer property types whose range can be read from their `ParamSpec`.
trait RangedValue: Copy + PartialOrd + ToValue + ToString {
    fn range(pspec: &glib::ParamSpec) -> Option<(Self, Self)>;
}

impl RangedValue for u32 {
    fn range(pspec: &glib::ParamSpec) -> Option<(Self, Self)> {
        pspec
            .downcast_ref::<glib::ParamSpecUInt>()
            .map(|pspec| (pspec.minimum(), pspec.maximum()))
    }
}

impl RangedValue for i32 {
    fn range(pspec: &glib::ParamSpec) -> Option<(Self, Self)> {
        pspec
            .downcast_ref::<glib::ParamSpecInt>()
            .map(|pspec| (pspec.minimum(), pspec.maximum()))
    }
}

/// Set an integer property, rejecting values outside the range it declares.
///
/// GObject only logs a critical warning and ignores such values.
fn set_checked_property<V: RangedValue>(
    element: &gst::Element,
    property: &'static str,
    value: V,
) -> Result<(), PipelineError> {
    let in_range = element
        .find_property(property)
        .and_then(|pspec| V::range(&pspec))
        .is_some_and(|(min, max)| min <= value && value <= max);
    if !in_range {
        return Err(PipelineError::Property {
            element: element.name().to_string(),
            property,
            value: value.to_string(),
        });
    }

    element.set_property_from_value(property, &value.to_value());
    Ok(())
}

fn make_encoder(settings: &EncoderSettings) -> Result<gst::Element, PipelineError> {
    let encoder = make("x265enc", "encoder")?;

    if let Some(bitrate) = settings.bitrate {
        set_checked_property(&encoder, "bitrate", bitrate)?;
    }
    if let Some(key_int_max) = settings.key_int_max {
        set_checked_property(&encoder, "key-int-max", key_int_max)?;
    }
    if let Some(ref preset) = settings.speed_preset {
        set_enum_property(&encoder, "speed-preset", preset)?;
    }
    if let Some(ref tune) = settings.tune {
        set_enum_property(&encoder, "tune", tune)?;
    }

    Ok(encoder)
}

fn make_sink(output: &Output) -> Result<gst::Element, PipelineError> {
    match output {
        Output::Udp { clients } => {
            let sink = make("udpsink", "sink")?;
            sink.set_property("clients", clients.as_str());
            Ok(sink)
        }
        Output::File { location } => {
            let sink = make("filesink", "sink")?;
            sink.set_property("location", &*location.to_string_lossy());
            Ok(sink)
        }
    }
}

fn make_appsrc(info: &gst_video::VideoInfo, caps: &gst::Caps) -> gst_app::AppSrc {
    gst_app::AppSrc::builder()
        .name("source")
        .caps(caps)
        .format(gst::Format::Time)
        .stream_type(gst_app::AppStreamType::Stream)
        .max_bytes(2 * info.size() as u64)
        .build()
}

impl StreamPipeline {
    pub fn build(settings: &Settings, input: &Input, output: &Output) -> Result<Self, PipelineError> {
        let info = settings.video.info()?;
        let caps = info.to_caps().map_err(PipelineError::VideoInfo)?;
        let limit = settings.num_buffers.map(u64::from);

        let pipeline = gst::Pipeline::builder().name(PIPELINE_NAME).build();

        let (source, feeder) = match input {
            Input::TestPattern => {
                let source = make("videotestsrc", "source")?;
                set_enum_property(&source, "pattern", &settings.pattern)?;
                if let Some(num_buffers) = settings.num_buffers {
                    let num_buffers = i32::try_from(num_buffers).unwrap_or(i32::MAX);
                    set_checked_property(&source, "num-buffers", num_buffers)?;
                }
                (source, None)
            }
            Input::MappedFile(path) => {
                let file = MappedFile::open(path, info.size())?
                    .whole_chunks()
                    .with_limit(limit)
                    .with_framerate(info.fps());
                let appsrc = make_appsrc(&info, &caps);
                let feeder = Feeder::attach(&appsrc, file);
                (appsrc.upcast::<gst::Element>(), Some(feeder))
            }
            Input::AlternatingFrames => {
                let frames = AlternatingFrames::new(&info)?.with_limit(limit);
                let appsrc = make_appsrc(&info, &caps);
                let feeder = Feeder::attach(&appsrc, frames);
                (appsrc.upcast::<gst::Element>(), Some(feeder))
            }
        };

        let converter = make("videoconvert", "converter")?;
        let encoder = make_encoder(&settings.encoder)?;
        let packager = make("rtph265pay", "packager")?;
        set_checked_property(&packager, "config-interval", settings.config_interval)?;
        let sink = make_sink(output)?;

        pipeline
            .add_many([&source, &converter, &encoder, &packager, &sink])
            .map_err(PipelineError::Link)?;
        gst::Element::link_many([&converter, &encoder, &packager, &sink])
            .map_err(PipelineError::Link)?;
        source
            .link_filtered(&converter, &caps)
            .map_err(|source| PipelineError::FilteredLink {
                upstream: "source".into(),
                downstream: "converter".into(),
                caps: caps.to_string(),
                source,
            })?;

        gst::debug!(
            CAT,
            obj = &pipeline,
            "Built pipeline for {:?} -> {:?} with caps {}",
            input,
            output,
            caps
        );

        Ok(Self {
            pipeline,
            source,
            converter,
            encoder,
            packager,
            sink,
            feeder,
        })
    }

    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }

    pub fn source(&self) -> &gst::Element {
        &self.source
    }

    pub fn converter(&self) -> &gst::Element {
        &self.converter
    }

    pub fn encoder(&self) -> &gst::Element {
        &self.encoder
    }

    pub fn packager(&self) -> &gst::Element {
        &self.packager
    }

    pub fn sink(&self) -> &gst::Element {
        &self.sink
    }

    /// The feeder driving an application source.
    pub fn feeder(&self) -> Option<&Feeder> {
        self.feeder.as_ref()
    }

    fn set_state(&self, state: gst::State) -> Result<gst::StateChangeSuccess, PipelineError> {
        self.pipeline
            .set_state(state)
            .map_err(|source| PipelineError::StateChange { state, source })
    }

    pub fn play(&self) -> Result<(), PipelineError> {
        self.set_state(gst::State::Playing)?;
        Ok(())
    }

    pub fn stop(&self) -> Result<(), PipelineError> {
        if let Some(feeder) = &self.feeder {
            feeder.stop();
        }
        self.set_state(gst::State::Null)?;
        Ok(())
    }

    /// Play until end-of-stream or an error, then shut down.
    ///
    /// Application sources are fed from idle tasks, so their pipelines are
    /// driven by a main loop; the test pattern just blocks on the bus.
    pub fn run(&self) -> Result<(), PipelineError> {
        if let Err(err) = self.play() {
            if let Err(teardown) = self.stop() {
                gst::warning!(
                    CAT,
                    obj = &self.pipeline,
                    "Teardown after failed start also failed: {}",
                    teardown
                );
            }
            return Err(err);
        }

        let result = if self.feeder.is_some() {
            bus::run_main_loop(&self.pipeline)
        } else {
            bus::run_blocking(&self.pipeline)
        };

        self.stop()?;
        result
    }
}

impl Drop for StreamPipeline {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
