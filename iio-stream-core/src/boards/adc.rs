//! Single-channel precision ADCs streamed without bit-packed fields:
//! AD4696, AD7606B and AD7768.

use serde::{Deserialize, Serialize};

use crate::models::capture_block::{BlockData, CaptureBlock};
use crate::models::config::{validate_buffer_length, validate_channel, voltage_channel, BoardConfig};
use crate::models::data_format::Direction;
use crate::models::error::StreamError;
use crate::processing::sample_unpack::{ad7768_scale, decode_i16, decode_i32};
use crate::session::io::StreamIo;
use crate::traits::board_profile::BoardProfile;
use crate::traits::stream_backend::{BufferHandle, ChannelHandle, StreamBackend};

/// AD4696 sequencer configuration register.
pub const AD4696_SEQUENCER_REG: u32 = 0x400;

/// How raw samples become printed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleCodec {
    /// 16-bit signed samples.
    I16,
    /// 32-bit samples shifted left by 8.
    I32Shifted8,
}

/// How a capture block is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleLayout {
    /// One hex line per sample.
    Indexed,
    /// All samples in decimal on the channel line.
    Inline,
}

/// AD4696 sequencer mode, written to register 0x400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerMode {
    Staggered,
    Continuous,
}

impl SequencerMode {
    pub fn register_value(self) -> u32 {
        match self {
            Self::Staggered => 0,
            Self::Continuous => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Staggered => "Staggered Mode",
            Self::Continuous => "Continuous Mode",
        }
    }
}

/// Streaming configuration for one of the presets below.
///
/// `Default` is the AD7606B preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    pub part: String,
    pub device: String,
    pub channel_count: u32,
    pub channel: u32,
    /// Samples per refill.
    pub buffer_length: usize,
    pub codec: SampleCodec,
    pub layout: SampleLayout,
    /// Sequencer mode to program before streaming, on parts that have one.
    pub sequencer: Option<SequencerMode>,
}

impl AdcConfig {
    pub fn ad4696() -> Self {
        Self {
            part: "AD4696".into(),
            device: "axi-ad469x-adc".into(),
            channel_count: 16,
            channel: 0,
            buffer_length: 400,
            codec: SampleCodec::I16,
            layout: SampleLayout::Indexed,
            sequencer: Some(SequencerMode::Continuous),
        }
    }

    pub fn ad7606b() -> Self {
        Self {
            part: "AD7606B".into(),
            device: "axi-ad7606-adc".into(),
            channel_count: 8,
            channel: 0,
            buffer_length: 400,
            codec: SampleCodec::I16,
            layout: SampleLayout::Inline,
            sequencer: None,
        }
    }

    pub fn ad7768() -> Self {
        Self {
            part: "AD7768".into(),
            device: "axi-ad7768-adc".into(),
            channel_count: 8,
            channel: 4,
            buffer_length: 400,
            codec: SampleCodec::I32Shifted8,
            layout: SampleLayout::Inline,
            sequencer: None,
        }
    }
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self::ad7606b()
    }
}

impl BoardConfig for AdcConfig {
    fn validate(&self) -> Result<(), String> {
        if self.part.is_empty() || self.device.is_empty() {
            return Err("part and device names must not be empty".into());
        }
        if self.channel_count == 0 {
            return Err("channel count must be positive".into());
        }
        validate_channel(self.channel, self.channel_count)?;
        validate_buffer_length(self.buffer_length)
    }
}

pub struct AdcProfile {
    config: AdcConfig,
    chn: Option<ChannelHandle>,
    buf: Option<BufferHandle>,
}

impl AdcProfile {
    pub fn new(config: AdcConfig) -> Self {
        Self {
            config,
            chn: None,
            buf: None,
        }
    }

    fn decode(&self, raw: &[u8], sample_size: usize) -> Vec<i32> {
        match self.config.codec {
            SampleCodec::I16 => decode_i16(raw, sample_size).into_iter().map(i32::from).collect(),
            SampleCodec::I32Shifted8 => decode_i32(raw, sample_size).into_iter().map(ad7768_scale).collect(),
        }
    }
}

impl BoardProfile for AdcProfile {
    fn part_name(&self) -> &str {
        &self.config.part
    }

    fn device_name(&self) -> &str {
        &self.config.device
    }

    fn configure<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
        let part = &self.config.part;

        log::info!("* Acquiring {} streaming devices", part);
        let dev = io.device(&self.config.device)?;

        log::info!("* Acquiring {} channel {}", part, self.config.channel);
        let chn = io.channel(dev, &voltage_channel(self.config.channel), Direction::Input)?;
        self.chn = Some(chn);

        if let Some(mode) = self.config.sequencer {
            io.backend_mut()
                .reg_write(dev, AD4696_SEQUENCER_REG, mode.register_value())?;
            let value = io.backend().reg_read(dev, AD4696_SEQUENCER_REG)?;
            log::info!("In {}", mode.label());
            log::info!("Register 0x{:x} = 0x{:x}", AD4696_SEQUENCER_REG, value);
        }

        log::info!("* Enabling IIO streaming channels");
        io.enable(chn);

        log::info!(
            "* Creating non-cyclic IIO buffers with {} samples",
            self.config.buffer_length
        );
        self.buf = Some(io.create_buffer(dev, self.config.buffer_length, false)?);
        Ok(())
    }

    fn capture<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<CaptureBlock, StreamError> {
        let (Some(chn), Some(buf)) = (self.chn, self.buf) else {
            return Err(StreamError::ConfigurationFailed(format!(
                "{} not configured",
                self.config.part
            )));
        };

        io.backend_mut().refill(buf)?;
        let (format, raw) = io.read_samples(chn, buf, self.config.buffer_length)?;
        let values = self.decode(&raw, format.sample_size());

        let data = match self.config.layout {
            SampleLayout::Indexed => BlockData::Indexed {
                label: format!("CH{} Data", self.config.channel),
                values,
                or_sync: None,
            },
            SampleLayout::Inline => BlockData::Inline { values },
        };

        Ok(CaptureBlock {
            channel_id: io.backend().channel_id(chn),
            format: Some(format),
            common_mode_voltage: None,
            data,
        })
    }
}
