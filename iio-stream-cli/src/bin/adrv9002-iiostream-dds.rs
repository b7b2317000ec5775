//! ADRV9002 DDS tone on TX with RX-only streaming.

use std::process::ExitCode;

use clap::Parser;

use iio_stream_cli::{config_failure, init_logging, prepare, run_board, secs_to_ms, CommonArgs};
use iio_stream_core::boards::adrv9002::{Adrv9002Config, Adrv9002Profile};

#[derive(Parser, Debug)]
#[command(version, about = "ADRV9002 DDS tone generation with RX streaming")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Tone frequency in Hz.
    #[arg(long)]
    tone_frequency: Option<i64>,

    /// Tone scale, 0 to 1.
    #[arg(long)]
    tone_scale: Option<f64>,

    /// TX channel of the tone (0 or 1).
    #[arg(long)]
    tx_channel: Option<u32>,

    /// TX and RX LO frequency in Hz.
    #[arg(long)]
    lo_frequency: Option<i64>,

    /// Seconds to wait before the first refill.
    #[arg(long)]
    warmup: Option<u64>,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let config = prepare(&args.common, Adrv9002Config::dds(), |c| {
        if let Some(frequency) = args.tone_frequency {
            c.dds.tone.frequency_hz = frequency;
        }
        if let Some(scale) = args.tone_scale {
            c.dds.tone.scale = scale;
        }
        if let Some(channel) = args.tx_channel {
            c.dds.channel = channel;
        }
        if let Some(lo) = args.lo_frequency {
            c.lo_frequency_hz = lo;
        }
        if let Some(secs) = args.warmup {
            c.warmup_ms = secs_to_ms(secs);
        }
    });

    match config {
        Ok(config) => run_board(&args.common, Adrv9002Profile::new(config)),
        Err(e) => config_failure(e),
    }
}
