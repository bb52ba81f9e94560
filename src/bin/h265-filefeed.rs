// SPDX-License-Identifier: MPL-2.0

//! Feed raw frames from a memory-mapped file through an `appsrc` and
//! stream them as H.265 over RTP.
//!
//! The input must hold raw frames matching `--format`, `--width` and
//! `--height` back to back, for example one made with
//!
//! ```bash
//! gst-launch-1.0 videotestsrc num-buffers=120 \
//!     ! video/x-raw,format=I420,width=1920,height=1080 ! filesink location=input.yuv
//! cargo run --bin h265-filefeed -- input.yuv
//! ```
//!
//! RTP packets are written to `stream.rtp` unless `--output udp` is given.

use std::path::PathBuf;

use anyhow::Error;
use clap::Parser;
use gsth265rtp::cli::{OutputKind, StreamArgs};
use gsth265rtp::{Input, StreamPipeline};

#[derive(Parser, Debug)]
#[command(version, about = "Stream raw frames from a file as H.265 over RTP")]
struct Cli {
    /// File of raw video frames
    input: PathBuf,

    #[command(flatten)]
    stream: StreamArgs,
}

fn main() -> Result<(), Error> {
    gst::init()?;
    let cli = Cli::parse();

    let settings = cli.stream.settings();
    let output = cli.stream.output.output_or(OutputKind::File);

    println!("Streaming '{}' to {:?}", cli.input.display(), output);
    let pipeline = StreamPipeline::build(&settings, &Input::MappedFile(cli.input), &output)?;
    pipeline.run()?;

    if let Some(feeder) = pipeline.feeder() {
        println!("Pushed {} frames", feeder.pushed());
    }

    Ok(())
}
