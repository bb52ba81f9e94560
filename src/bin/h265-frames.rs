// SPDX-License-Identifier: MPL-2.0

//! Stream two alternating static frames as H.265 over RTP.
//!
//! Frames are pushed into an `appsrc` on demand until `--num-buffers` is
//! reached, or forever when it is not given.

use anyhow::Error;
use clap::Parser;
use gsth265rtp::cli::{OutputKind, StreamArgs};
use gsth265rtp::{Input, StreamPipeline};

#[derive(Parser, Debug)]
#[command(version, about = "Stream alternating test frames as H.265 over RTP")]
struct Cli {
    #[command(flatten)]
    stream: StreamArgs,
}

fn main() -> Result<(), Error> {
    gst::init()?;
    let cli = Cli::parse();

    let settings = cli.stream.settings();
    let output = cli.stream.output.output_or(OutputKind::Udp);

    println!("Streaming alternating frames to {:?}", output);
    let pipeline = StreamPipeline::build(&settings, &Input::AlternatingFrames, &output)?;
    pipeline.run()?;

    Ok(())
}
