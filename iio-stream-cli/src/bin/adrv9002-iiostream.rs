//! ADRV9002 SSI loopback: drives TX from the DDS (or a DMA sine table) and
//! prints the IQ samples received on RX every few seconds.

use std::process::ExitCode;

use clap::Parser;

use iio_stream_cli::{config_failure, init_logging, parse_variant, prepare, run_board, secs_to_ms, CommonArgs};
use iio_stream_core::boards::adrv9002::{Adrv9002Config, Adrv9002Profile, Tone, TxDacMode};

#[derive(Parser, Debug)]
#[command(version, about = "ADRV9002 TX to RX digital loopback streaming")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// TX DAC source: dds, dma, zero, pn7, pn15, nibble_ramp or ramp16.
    #[arg(long, value_parser = parse_variant::<TxDacMode>)]
    dac_mode: Option<TxDacMode>,

    /// DDS tone frequency in Hz.
    #[arg(long)]
    tone_frequency: Option<i64>,

    /// DDS tone scale, 0 to 1.
    #[arg(long)]
    tone_scale: Option<f64>,

    /// Second DDS tone, as FREQUENCY:SCALE.
    #[arg(long, value_parser = parse_tone)]
    second_tone: Option<Tone>,

    /// TX channel of the DDS (0 or 1).
    #[arg(long)]
    tx_channel: Option<u32>,

    /// TX and RX LO frequency in Hz.
    #[arg(long)]
    lo_frequency: Option<i64>,

    /// Seconds between refills.
    #[arg(long)]
    interval: Option<u64>,
}

fn parse_tone(s: &str) -> Result<Tone, String> {
    let (frequency, scale) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FREQUENCY:SCALE, got {:?}", s))?;
    Ok(Tone {
        frequency_hz: frequency.trim().parse().map_err(|e| format!("frequency: {}", e))?,
        scale: scale.trim().parse().map_err(|e| format!("scale: {}", e))?,
    })
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let config = prepare(&args.common, Adrv9002Config::loopback(), |c| {
        if let Some(mode) = args.dac_mode {
            c.dac_mode = Some(mode);
        }
        if let Some(frequency) = args.tone_frequency {
            c.dds.tone.frequency_hz = frequency;
        }
        if let Some(scale) = args.tone_scale {
            c.dds.tone.scale = scale;
        }
        if let Some(tone) = args.second_tone {
            c.dds.second_tone = Some(tone);
        }
        if let Some(channel) = args.tx_channel {
            c.dds.channel = channel;
        }
        if let Some(lo) = args.lo_frequency {
            c.lo_frequency_hz = lo;
        }
        if let Some(secs) = args.interval {
            c.refill_interval_ms = secs_to_ms(secs);
        }
    });

    match config {
        Ok(config) => run_board(&args.common, Adrv9002Profile::new(config)),
        Err(e) => config_failure(e),
    }
}
