//! Streams one AD7606B channel, printing the samples in decimal.

use std::process::ExitCode;

use clap::Parser;

use iio_stream_cli::{config_failure, init_logging, prepare, run_board, CommonArgs};
use iio_stream_core::boards::adc::{AdcConfig, AdcProfile};

#[derive(Parser, Debug)]
#[command(version, about = "Stream samples from an AD7606B")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Channel to stream (0 to 7).
    #[arg(long)]
    channel: Option<u32>,

    /// Samples per refill.
    #[arg(long)]
    buffer_length: Option<usize>,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let config = prepare(&args.common, AdcConfig::ad7606b(), |c| {
        if let Some(channel) = args.channel {
            c.channel = channel;
        }
        if let Some(length) = args.buffer_length {
            c.buffer_length = length;
        }
    });

    match config {
        Ok(config) => run_board(&args.common, AdcProfile::new(config)),
        Err(e) => config_failure(e),
    }
}
