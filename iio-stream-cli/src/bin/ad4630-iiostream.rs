//! Streams one AD4630-24 channel, printing the unpacked samples.

use std::process::ExitCode;

use clap::Parser;

use iio_stream_cli::{config_failure, init_logging, parse_variant, prepare, run_board, CommonArgs};
use iio_stream_core::boards::ad4630::{Ad4630Config, Ad4630Profile};
use iio_stream_core::processing::modes_register::{ClockMode, LaneMode};
use iio_stream_core::processing::sample_unpack::OutDataMode;

#[derive(Parser, Debug)]
#[command(version, about = "Stream samples from an AD4630-24")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Channel to stream (0 or 1).
    #[arg(long)]
    channel: Option<u32>,

    /// Output data mode: data24, data16_cm8, data24_cm8, avg30_or_sync or
    /// test_pattern32.
    #[arg(long, value_parser = parse_variant::<OutDataMode>)]
    out_data_mode: Option<OutDataMode>,

    /// Clock mode: spi, echo or host.
    #[arg(long, value_parser = parse_variant::<ClockMode>)]
    clock_mode: Option<ClockMode>,

    /// Lane mode: one, two or four.
    #[arg(long, value_parser = parse_variant::<LaneMode>)]
    lane_mode: Option<LaneMode>,

    /// Double data rate; `--ddr false` turns it off.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    ddr: Option<bool>,

    /// Leave the modes register as configured on exit.
    #[arg(long)]
    no_restore: bool,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let config = prepare(&args.common, Ad4630Config::default(), |c| {
        if let Some(channel) = args.channel {
            c.channel = channel;
        }
        if let Some(mode) = args.out_data_mode {
            c.modes.out_data_mode = mode;
        }
        if let Some(mode) = args.clock_mode {
            c.modes.clock_mode = mode;
        }
        if let Some(mode) = args.lane_mode {
            c.modes.lane_mode = mode;
        }
        if let Some(ddr) = args.ddr {
            c.modes.ddr = ddr;
        }
        if args.no_restore {
            c.restore_modes = None;
        }
    });

    match config {
        Ok(config) => run_board(&args.common, Ad4630Profile::new(config)),
        Err(e) => config_failure(e),
    }
}
