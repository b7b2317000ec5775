//! Streams one AD4696 channel after programming the sequencer.

use std::process::ExitCode;

use clap::Parser;

use iio_stream_cli::{config_failure, init_logging, parse_variant, prepare, run_board, CommonArgs};
use iio_stream_core::boards::adc::{AdcConfig, AdcProfile, SequencerMode};

#[derive(Parser, Debug)]
#[command(version, about = "Stream samples from an AD4696")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Channel to stream (0 to 15).
    #[arg(long)]
    channel: Option<u32>,

    /// Sequencer mode: staggered or continuous.
    #[arg(long, value_parser = parse_variant::<SequencerMode>)]
    sequencer: Option<SequencerMode>,

    /// Samples per refill.
    #[arg(long)]
    buffer_length: Option<usize>,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let config = prepare(&args.common, AdcConfig::ad4696(), |c| {
        if let Some(channel) = args.channel {
            c.channel = channel;
        }
        if let Some(mode) = args.sequencer {
            c.sequencer = Some(mode);
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
