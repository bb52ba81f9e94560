// SPDX-License-Identifier: MPL-2.0

//! Stream the `videotestsrc` pattern as H.265 over RTP.
//!
//! ```bash
//! cargo run --bin h265-testsrc
//! # receive with
//! gst-launch-1.0 udpsrc port=5200 \
//!     caps="application/x-rtp,media=video,clock-rate=90000,encoding-name=H265" \
//!     ! rtph265depay ! h265parse ! avdec_h265 ! videoconvert ! autovideosink
//! ```

use anyhow::Error;
use clap::Parser;
use gsth265rtp::cli::{OutputKind, StreamArgs};
use gsth265rtp::{Input, StreamPipeline};

#[derive(Parser, Debug)]
#[command(version, about = "Stream a test pattern as H.265 over RTP")]
struct Cli {
    /// videotestsrc pattern, as nick (ball, smpte, snow, ...) or number
    #[arg(long, default_value = "ball")]
    pattern: String,

    #[command(flatten)]
    stream: StreamArgs,
}

fn main() -> Result<(), Error> {
    gst::init()?;
    let cli = Cli::parse();

    let mut settings = cli.stream.settings();
    settings.pattern = cli.pattern;
    let output = cli.stream.output.output_or(OutputKind::Udp);

    println!("Streaming test pattern '{}' to {:?}", settings.pattern, output);
    let pipeline = StreamPipeline::build(&settings, &Input::TestPattern, &output)?;
    pipeline.run()?;

    Ok(())
}
