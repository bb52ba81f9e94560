// SPDX-License-Identifier: MPL-2.0

//! Error handling for the H.265 RTP pipelines

use std::path::PathBuf;

use gst::glib;
use gst::prelude::*;
use thiserror::Error;

/// Everything that can stop one of the pipelines.
///
/// None of these are retried: callers report the error, tear the pipeline
/// down and exit with a nonzero status.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An element factory is missing or refused to build
    #[error("Failed to create element '{factory}': {source}. Is the plugin providing it installed?")]
    ElementCreation {
        factory: &'static str,
        #[source]
        source: glib::BoolError,
    },

    /// Adding elements to the pipeline or linking them failed
    #[error("Elements could not be linked: {0}")]
    Link(#[source] glib::BoolError),

    /// The source could not be linked to the converter with the raw video caps
    #[error("Failed to link {upstream} to {downstream} with caps {caps}: {source}")]
    FilteredLink {
        upstream: String,
        downstream: String,
        caps: String,
        #[source]
        source: glib::BoolError,
    },

    /// The pipeline refused a state change
    #[error("Unable to set the pipeline to the {state:?} state")]
    StateChange {
        state: gst::State,
        #[source]
        source: gst::StateChangeError,
    },

    /// Width, height, format or framerate do not describe a valid raw video
    #[error("Invalid video settings: {0}")]
    VideoInfo(#[source] glib::BoolError),

    /// Generated frames only support 8-bit planar YUV layouts
    #[error("Unsupported raw video format {0:?} for generated frames")]
    UnsupportedFormat(gst_video::VideoFormat),

    /// A frame buffer could not be allocated or mapped
    #[error("Failed to prepare frame buffer: {0}")]
    Buffer(String),

    /// The input file given to the mapped source could not be opened or mapped
    #[error("Failed to open input '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A chunked source was configured with a chunk size of zero
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,

    /// The pipeline has no bus to poll
    #[error("Pipeline has no bus")]
    NoBus,

    /// A bus watch could not be installed
    #[error("Failed to watch the pipeline bus: {0}")]
    BusWatch(#[source] glib::BoolError),

    /// A property value was rejected by the element
    #[error("Invalid value '{value}' for property '{property}' of {element}")]
    Property {
        element: String,
        property: &'static str,
        value: String,
    },

    /// An element posted an error message on the bus
    #[error(
        "Error received from element {element}: {message}\nDebugging information: {}",
        debug.as_deref().unwrap_or("none")
    )]
    Stream {
        element: String,
        message: String,
        debug: Option<String>,
    },
}

impl PipelineError {
    /// Build a [`PipelineError::Stream`] from an error message popped off the bus.
    pub fn from_error_message(msg: &gst::Message, err: &gst::message::Error) -> Self {
        PipelineError::Stream {
            element: msg
                .src()
                .map(|s| String::from(s.path_string()))
                .unwrap_or_else(|| "None".into()),
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        }
    }
}
