//! ADRV9002 transceiver: LO setup, DDS tones or DMA waveform on TX, IQ
//! capture on RX.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::capture_block::{BlockData, CaptureBlock, IqSample};
use crate::models::config::BoardConfig;
use crate::models::data_format::Direction;
use crate::models::error::StreamError;
use crate::processing::sample_unpack::decode_i16;
use crate::processing::tx_waveform::{fill_iq, i16_bytes};
use crate::session::io::StreamIo;
use crate::traits::board_profile::BoardProfile;
use crate::traits::stream_backend::{BufferHandle, ChannelHandle, DeviceHandle, StreamBackend};

/// TX DAC data source selector register.
pub const DAC_MODE_REGISTER: u32 = 0x0418;

/// Debug attributes of the SSI digital loopback, one per TX port.
pub const LOOPBACK_ATTRS: [&str; 2] = ["tx0_ssi_test_mode_loopback_en", "tx1_ssi_test_mode_loopback_en"];

/// 1 MiS, the RX (and DMA TX) buffer size.
pub const IQ_BUFFER_SAMPLES: usize = 1024 * 1024;

const RX_CHANNELS: [&str; 2] = ["voltage0_i", "voltage0_q"];
const TX_CHANNELS: [&str; 2] = ["voltage0", "voltage1"];

/// Phase written to the I DDS of a tone, in millidegrees.
pub const DDS_I_PHASE: i64 = 90_000;

/// Upper bound for the warm-up and refill intervals.
pub const MAX_INTERVAL_MS: u64 = 3_600_000;

/// TX DAC output data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxDacMode {
    /// Internal tone generator.
    Dds,
    /// DMA buffer data.
    Dma,
    /// Constant zero (standby).
    Zero,
    Pn7,
    Pn15,
    NibbleRamp,
    Ramp16,
}

impl TxDacMode {
    pub fn register_value(self) -> u32 {
        match self {
            Self::Dds => 0,
            Self::Dma => 2,
            Self::Zero => 3,
            Self::Pn7 => 6,
            Self::Pn15 => 7,
            Self::NibbleRamp => 10,
            Self::Ramp16 => 11,
        }
    }

    /// Whether the looped-back signal has a meaningful Q component.
    pub fn shows_q(self) -> bool {
        matches!(self, Self::Dds | Self::Dma)
    }
}

impl TryFrom<u32> for TxDacMode {
    type Error = StreamError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Dds),
            2 => Ok(Self::Dma),
            3 => Ok(Self::Zero),
            6 => Ok(Self::Pn7),
            7 => Ok(Self::Pn15),
            10 => Ok(Self::NibbleRamp),
            11 => Ok(Self::Ramp16),
            other => Err(StreamError::ConfigurationFailed(format!(
                "unsupported TX DAC mode: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: i64,
    /// Amplitude in [0, 1], 1 being full scale.
    pub scale: f64,
}

/// DDS tone setup on one TX channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdsConfig {
    /// TX channel, 0 or 1.
    pub channel: u32,
    pub tone: Tone,
    /// Second tone on the same channel, using the F2 DDS pair.
    pub second_tone: Option<Tone>,
    /// Phase written to the I DDS of each tone.
    pub i_phase: Option<i64>,
    /// Read back and log each written frequency and scale.
    pub read_back: bool,
}

impl Default for DdsConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            tone: Tone { frequency_hz: 10_000, scale: 0.5 },
            second_tone: None,
            i_phase: Some(DDS_I_PHASE),
            read_back: false,
        }
    }
}

/// Names of the I and Q DDS channels of a tone.
///
/// TX channel `c`, tone `t`: I is `altvoltage{4c + t}`, Q is
/// `altvoltage{4c + 2 + t}`.
pub fn dds_pair(channel: u32, tone: u32) -> (String, String) {
    (
        format!("altvoltage{}", 4 * channel + tone),
        format!("altvoltage{}", 4 * channel + 2 + tone),
    )
}

/// ADRV9002 streaming configuration. `Default` is the loopback preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adrv9002Config {
    pub phy_device: String,
    pub tx_device: String,
    pub rx_device: String,
    /// Phy output channel the link info is read from.
    pub link_channel: String,
    /// TX attenuation written before the LO. A failed write is skipped.
    pub tx_hardware_gain: Option<i64>,
    /// Frequency of both the TX1 and RX1 LOs.
    pub lo_frequency_hz: i64,
    /// SSI digital loopback of TX into RX, disabled again on exit.
    pub digital_loopback: bool,
    /// TX DAC source to program. `None` leaves the register alone and uses
    /// the DDS.
    pub dac_mode: Option<TxDacMode>,
    pub dds: DdsConfig,
    /// Enable the TX data channels next to the RX ones.
    pub tx_streaming: bool,
    pub buffer_samples: usize,
    pub refill_interval_ms: u64,
    pub warmup_ms: u64,
}

impl Adrv9002Config {
    /// RX capture of a TX signal looped back through the SSI interface.
    pub fn loopback() -> Self {
        Self {
            phy_device: "adrv9002-phy".into(),
            tx_device: "axi-adrv9002-tx-lpc".into(),
            rx_device: "axi-adrv9002-rx-lpc".into(),
            link_channel: "voltage0".into(),
            tx_hardware_gain: Some(-24),
            lo_frequency_hz: 2_500_000_000,
            digital_loopback: true,
            dac_mode: Some(TxDacMode::Dds),
            dds: DdsConfig::default(),
            tx_streaming: true,
            buffer_samples: IQ_BUFFER_SAMPLES,
            refill_interval_ms: 5000,
            warmup_ms: 0,
        }
    }

    /// DDS tone on TX, RX capture only.
    pub fn dds() -> Self {
        Self {
            link_channel: "voltage1".into(),
            tx_hardware_gain: None,
            lo_frequency_hz: 2_400_000_000,
            digital_loopback: false,
            dac_mode: None,
            dds: DdsConfig {
                channel: 0,
                tone: Tone { frequency_hz: 5000, scale: 0.4 },
                second_tone: None,
                i_phase: None,
                read_back: true,
            },
            tx_streaming: false,
            warmup_ms: 5000,
            ..Self::loopback()
        }
    }

    /// Whether the DDS drives the TX path.
    pub fn dds_active(&self) -> bool {
        matches!(self.dac_mode, None | Some(TxDacMode::Dds))
    }

    pub fn dma_active(&self) -> bool {
        self.dac_mode == Some(TxDacMode::Dma)
    }
}

impl Default for Adrv9002Config {
    fn default() -> Self {
        Self::loopback()
    }
}

fn validate_tone(tone: &Tone) -> Result<(), String> {
    if tone.frequency_hz <= 0 {
        return Err(format!("tone frequency must be positive, got {}", tone.frequency_hz));
    }
    if !(0.0..=1.0).contains(&tone.scale) {
        return Err(format!("tone scale must be in [0, 1], got {}", tone.scale));
    }
    Ok(())
}

impl BoardConfig for Adrv9002Config {
    fn validate(&self) -> Result<(), String> {
        if self.lo_frequency_hz <= 0 {
            return Err("LO frequency must be positive".into());
        }
        if self.buffer_samples == 0 {
            return Err("buffer length must be positive".into());
        }
        for (name, ms) in [("refill interval", self.refill_interval_ms), ("warm-up", self.warmup_ms)] {
            if ms > MAX_INTERVAL_MS {
                return Err(format!("{} must be at most {} s, got {} ms", name, MAX_INTERVAL_MS / 1000, ms));
            }
        }
        if self.dma_active() && !self.tx_streaming {
            return Err("DMA mode needs the TX data channels".into());
        }
        if self.dds_active() {
            if self.dds.channel > 1 {
                return Err(format!("DDS channel must be 0 or 1, got {}", self.dds.channel));
            }
            validate_tone(&self.dds.tone)?;
            if let Some(second) = &self.dds.second_tone {
                validate_tone(second)?;
            }
        }
        Ok(())
    }
}

/// Handles of the streaming channels and buffers.
#[derive(Debug, Clone, Copy)]
struct Streams {
    rx: [ChannelHandle; 2],
    rx_buf: BufferHandle,
    tx: Option<([ChannelHandle; 2], BufferHandle)>,
}

pub struct Adrv9002Profile {
    config: Adrv9002Config,
    part: &'static str,
    phy: Option<DeviceHandle>,
    loopback_enabled: bool,
    streams: Option<Streams>,
}

impl Adrv9002Profile {
    pub fn new(config: Adrv9002Config) -> Self {
        Self {
            config,
            part: "ADRV9002",
            phy: None,
            loopback_enabled: false,
            streams: None,
        }
    }

    /// Reads link info, sets TX attenuation and both LOs. Returns the
    /// sampling frequency.
    fn configure_lo<B: StreamBackend>(&self, io: &mut StreamIo<'_, B>, phy: DeviceHandle) -> Result<i64, StreamError> {
        // voltage0 is required even when the link is another channel.
        let tx0 = io.channel(phy, TX_CHANNELS[0], Direction::Output)?;
        let link = if self.config.link_channel == TX_CHANNELS[0] {
            tx0
        } else {
            io.channel(phy, &self.config.link_channel, Direction::Output)?
        };

        let bandwidth = io.backend().channel_attr_read_i64(link, "rf_bandwidth")?;
        log::info!("adrv9002 bandwidth: {}", bandwidth);
        let sampling_frequency = io.backend().channel_attr_read_i64(link, "sampling_frequency")?;
        log::info!("adrv9002 sampling_frequency: {}", sampling_frequency);

        if let Some(gain) = self.config.tx_hardware_gain {
            if let Err(e) = io.backend_mut().channel_attr_write_i64(link, "hardwaregain", gain) {
                log::warn!("could not set TX hardwaregain to {}: {}", gain, e);
            }
        }

        let lo = self.config.lo_frequency_hz;
        let tx_lo = io.channel(phy, "altvoltage2", Direction::Output)?;
        io.backend_mut().channel_attr_write_i64(tx_lo, "TX1_LO_frequency", lo)?;
        let rx_lo = io.channel(phy, "altvoltage0", Direction::Output)?;
        io.backend_mut().channel_attr_write_i64(rx_lo, "RX1_LO_frequency", lo)?;
        log::info!("* LO set to {} Hz", lo);

        Ok(sampling_frequency)
    }

    fn configure_tone<B: StreamBackend>(
        &self,
        io: &mut StreamIo<'_, B>,
        tx: DeviceHandle,
        index: u32,
        tone: &Tone,
        sampling_frequency: i64,
    ) -> Result<(), StreamError> {
        if sampling_frequency > 0 && tone.frequency_hz >= sampling_frequency / 2 {
            return Err(StreamError::ConfigurationFailed(format!(
                "tone frequency {} Hz must be below half the sample rate ({} Hz)",
                tone.frequency_hz, sampling_frequency
            )));
        }

        let (i_name, q_name) = dds_pair(self.config.dds.channel, index);
        for (name, phase) in [(&i_name, self.config.dds.i_phase), (&q_name, None)] {
            let chn = io.channel(tx, name, Direction::Output)?;
            let backend = io.backend_mut();
            backend.channel_attr_write_i64(chn, "frequency", tone.frequency_hz)?;
            backend.channel_attr_write_f64(chn, "scale", tone.scale)?;
            if let Some(phase) = phase {
                backend.channel_attr_write_i64(chn, "phase", phase)?;
            }

            if self.config.dds.read_back {
                let frequency = io.backend().channel_attr_read_i64(chn, "frequency")?;
                log::info!("adrv9002 {} frequency: {}", name, frequency);
                let scale = io.backend().channel_attr_read_f64(chn, "scale")?;
                log::info!("adrv9002 {} scale: {:.6}", name, scale);
            }
            io.enable(chn);
        }
        Ok(())
    }

    fn enable_pair<B: StreamBackend>(
        io: &mut StreamIo<'_, B>,
        dev: DeviceHandle,
        names: [&str; 2],
        direction: Direction,
    ) -> Result<[ChannelHandle; 2], StreamError> {
        let i = io.channel(dev, names[0], direction)?;
        io.enable(i);
        let q = io.channel(dev, names[1], direction)?;
        io.enable(q);
        Ok([i, q])
    }

    /// Writes the sine table into the TX buffer, cycling it to fill.
    fn fill_tx<B: StreamBackend>(&self, io: &mut StreamIo<'_, B>, chans: [ChannelHandle; 2], buf: BufferHandle) {
        let (i, q) = fill_iq(self.config.buffer_samples);
        io.write_samples(chans[0], buf, &i16_bytes(&i));
        io.write_samples(chans[1], buf, &i16_bytes(&q));
    }
}

impl BoardProfile for Adrv9002Profile {
    fn part_name(&self) -> &str {
        self.part
    }

    fn device_name(&self) -> &str {
        &self.config.rx_device
    }

    fn configure<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
        let phy = io.device(&self.config.phy_device)?;
        self.phy = Some(phy);
        let sampling_frequency = self.configure_lo(io, phy)?;

        if self.config.digital_loopback {
            self.loopback_enabled = true;
            for attr in LOOPBACK_ATTRS {
                io.backend_mut().debug_attr_write(phy, attr, "1")?;
            }
            log::info!("* Digital loopback enabled");
        }

        let tx = io.device(&self.config.tx_device)?;
        if let Some(mode) = self.config.dac_mode {
            io.backend_mut().reg_write(tx, DAC_MODE_REGISTER, mode.register_value())?;
            let value = io.backend().reg_read(tx, DAC_MODE_REGISTER)?;
            log::info!("Register 0x{:x} = 0x{:x}", DAC_MODE_REGISTER, value);
        }

        if self.config.dds_active() {
            let tone = self.config.dds.tone;
            self.configure_tone(io, tx, 0, &tone, sampling_frequency)?;
            if let Some(second) = self.config.dds.second_tone {
                self.configure_tone(io, tx, 1, &second, sampling_frequency)?;
            }
        }

        let rx = io.device(&self.config.rx_device)?;
        let rx_chans = Self::enable_pair(io, rx, RX_CHANNELS, Direction::Input)?;
        let tx_chans = if self.config.tx_streaming {
            Some(Self::enable_pair(io, tx, TX_CHANNELS, Direction::Output)?)
        } else {
            None
        };

        let tx_stream = match tx_chans {
            Some(chans) if self.config.dma_active() => {
                let buf = io.create_buffer(tx, self.config.buffer_samples, false)?;
                Some((chans, buf))
            }
            _ => None,
        };

        log::info!(
            "* Creating non-cyclic IIO buffers with {} samples",
            self.config.buffer_samples
        );
        let rx_buf = io.create_buffer(rx, self.config.buffer_samples, false)?;

        if let Some((chans, tx_buf)) = tx_stream {
            // Prime the DMA path and drop the first capture.
            io.backend_mut().push(tx_buf)?;
            io.backend_mut().refill(rx_buf)?;
            self.fill_tx(io, chans, tx_buf);
        }

        self.streams = Some(Streams {
            rx: rx_chans,
            rx_buf,
            tx: tx_stream,
        });
        Ok(())
    }

    fn capture<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<CaptureBlock, StreamError> {
        let streams = self
            .streams
            .ok_or_else(|| StreamError::ConfigurationFailed("ADRV9002 not configured".into()))?;

        if let Some((_, tx_buf)) = streams.tx {
            io.backend_mut().push(tx_buf)?;
        }
        io.backend_mut().refill(streams.rx_buf)?;

        let (format, raw_i) = io.read_samples(streams.rx[0], streams.rx_buf, self.config.buffer_samples)?;
        let (_, raw_q) = io.read_samples(streams.rx[1], streams.rx_buf, self.config.buffer_samples)?;
        let size = format.sample_size();
        let samples: Vec<IqSample> = decode_i16(&raw_i, size)
            .into_iter()
            .zip(decode_i16(&raw_q, size))
            .map(|(i, q)| IqSample { i, q })
            .collect();

        if let Some((chans, tx_buf)) = streams.tx {
            self.fill_tx(io, chans, tx_buf);
        }

        if self.config.refill_interval_ms > 0 {
            log::info!(
                "Refilling buffers in {} seconds. Press Ctrl+C to exit...",
                self.config.refill_interval_ms as f64 / 1000.0
            );
        }

        Ok(CaptureBlock {
            channel_id: io.backend().channel_id(streams.rx[0]),
            format: None,
            common_mode_voltage: None,
            data: BlockData::Iq {
                samples,
                show_q: self.config.dac_mode.map_or(true, TxDacMode::shows_q),
            },
        })
    }

    fn finish<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
        let Some(phy) = self.phy.filter(|_| self.loopback_enabled) else {
            return Ok(());
        };
        for attr in LOOPBACK_ATTRS {
            io.backend_mut().debug_attr_write(phy, attr, "0")?;
        }
        self.loopback_enabled = false;
        log::info!("* Digital loopback disabled");
        Ok(())
    }

    fn refill_interval(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.config.refill_interval_ms)).filter(|d| !d.is_zero())
    }

    fn warmup_delay(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.config.warmup_ms)).filter(|d| !d.is_zero())
    }
}
