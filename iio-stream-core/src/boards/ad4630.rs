use serde::{Deserialize, Serialize};

use crate::models::capture_block::{BlockData, CaptureBlock};
use crate::models::config::{validate_buffer_length, validate_channel, voltage_channel, BoardConfig};
use crate::models::data_format::Direction;
use crate::models::error::StreamError;
use crate::processing::modes_register::{ModesRegister, DRIVER_DEFAULT_MODES, MODES_REG};
use crate::processing::sample_unpack::unpack_ad4630;
use crate::session::io::StreamIo;
use crate::traits::board_profile::BoardProfile;
use crate::traits::stream_backend::{BufferHandle, ChannelHandle, DeviceHandle, StreamBackend};

pub const AD4630_CHANNELS: u32 = 2;

const VCOM_ATTR: &str = "common_mode_voltage";

/// AD4630-24 streaming configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ad4630Config {
    pub device: String,
    pub channel: u32,
    /// Samples per refill.
    pub buffer_length: usize,
    pub modes: ModesRegister,
    /// Read `common_mode_voltage` each refill when the output mode embeds it.
    pub capture_vcom: bool,
    /// Print the OR/SYNC bits when the output mode carries them.
    pub capture_or_sync: bool,
    /// Modes register value written back on exit. `None` leaves the
    /// configured value in place.
    pub restore_modes: Option<u32>,
}

impl Default for Ad4630Config {
    fn default() -> Self {
        Self {
            device: "ad4630".into(),
            channel: 0,
            buffer_length: 400,
            modes: ModesRegister::default(),
            capture_vcom: true,
            capture_or_sync: true,
            restore_modes: Some(DRIVER_DEFAULT_MODES),
        }
    }
}

impl BoardConfig for Ad4630Config {
    fn validate(&self) -> Result<(), String> {
        if self.device.is_empty() {
            return Err("device name must not be empty".into());
        }
        validate_channel(self.channel, AD4630_CHANNELS)?;
        validate_buffer_length(self.buffer_length)?;
        if let Some(value) = self.restore_modes {
            ModesRegister::decode(value).map_err(|e| format!("restore value 0x{:x}: {}", value, e))?;
        }
        Ok(())
    }
}

/// AD4630-24: modes register setup, one channel, bit-packed 64-bit scans.
pub struct Ad4630Profile {
    config: Ad4630Config,
    dev: Option<DeviceHandle>,
    chn: Option<ChannelHandle>,
    buf: Option<BufferHandle>,
}

impl Ad4630Profile {
    pub fn new(config: Ad4630Config) -> Self {
        Self {
            config,
            dev: None,
            chn: None,
            buf: None,
        }
    }

    fn stream_handles(&self) -> Result<(ChannelHandle, BufferHandle), StreamError> {
        match (self.chn, self.buf) {
            (Some(chn), Some(buf)) => Ok((chn, buf)),
            _ => Err(StreamError::ConfigurationFailed("AD4630 not configured".into())),
        }
    }
}

impl BoardProfile for Ad4630Profile {
    fn part_name(&self) -> &str {
        "AD4630-24"
    }

    fn device_name(&self) -> &str {
        &self.config.device
    }

    fn configure<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
        log::info!("* Acquiring AD4630-24 streaming devices");
        let dev = io.device(&self.config.device)?;
        self.dev = Some(dev);

        io.backend_mut().reg_write(dev, MODES_REG, self.config.modes.encode())?;
        let modes = io.backend().reg_read(dev, MODES_REG)?;
        log::info!("* Modes Register 0x20  = 0x{:x}", modes);

        log::info!("* Acquiring AD4630 channel {}", self.config.channel);
        let chn = io.channel(dev, &voltage_channel(self.config.channel), Direction::Input)?;
        self.chn = Some(chn);

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
        let (chn, buf) = self.stream_handles()?;
        let mode = self.config.modes.out_data_mode;

        io.backend_mut().refill(buf)?;

        let common_mode_voltage = if self.config.capture_vcom && mode.has_common_mode() {
            Some(io.backend().channel_attr_read_i64(chn, VCOM_ATTR)?)
        } else {
            None
        };

        let (format, raw) = io.read_samples(chn, buf, self.config.buffer_length)?;
        let samples = unpack_ad4630(&raw, format.sample_size(), self.config.channel, mode);
        let or_sync = if self.config.capture_or_sync && mode.has_or_sync() {
            Some(samples.iter().map(|s| s.or_sync).collect())
        } else {
            None
        };

        Ok(CaptureBlock {
            channel_id: io.backend().channel_id(chn),
            format: Some(format),
            common_mode_voltage,
            data: BlockData::Indexed {
                label: format!("CH{}", self.config.channel),
                values: samples.iter().map(|s| s.value).collect(),
                or_sync,
            },
        })
    }

    fn finish<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
        let (Some(dev), Some(value)) = (self.dev, self.config.restore_modes) else {
            return Ok(());
        };
        io.backend_mut().reg_write(dev, MODES_REG, value)?;
        let modes = io.backend().reg_read(dev, MODES_REG)?;
        log::info!("* Modes Register 0x20  = 0x{:x}", modes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BackendEvent, MockBackend, RecordingDelegate};
    use crate::models::data_format::DataFormat;
    use crate::processing::sample_unpack::OutDataMode;
    use crate::session::stop_signal::StopSignal;
    use crate::session::stream::StreamSession;
    use std::sync::Arc;

    fn scans(words: &[u64]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn backend(stop: Arc<StopSignal>, data: Vec<u8>) -> MockBackend {
        MockBackend::new()
            .with_device("ad4630")
            .with_channel("ad4630", "voltage0", Direction::Input, DataFormat::signed(64))
            .with_channel("ad4630", "voltage1", Direction::Input, DataFormat::signed(64))
            .with_channel_data("ad4630", "voltage0", data.clone())
            .with_channel_data("ad4630", "voltage1", data)
            .with_attr_i64("ad4630", "voltage0", VCOM_ATTR, 7)
            .with_attr_i64("ad4630", "voltage1", VCOM_ATTR, 9)
            .stop_after_refills(1, stop)
    }

    fn run(config: Ad4630Config, data: Vec<u8>) -> (StreamSession<MockBackend>, Vec<CaptureBlock>) {
        let stop = Arc::new(StopSignal::new());
        let mut session = StreamSession::with_stop_signal(backend(Arc::clone(&stop), data), stop);
        let delegate = RecordingDelegate::new();
        session.set_delegate(delegate.clone());
        session.run(&mut Ad4630Profile::new(config)).unwrap();
        let blocks = delegate.blocks.lock().clone();
        (session, blocks)
    }

    #[test]
    fn default_config_is_valid() {
        let config = Ad4630Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.modes.encode(), 0x81);
    }

    #[test]
    fn rejects_third_channel_and_bad_restore_value() {
        let mut config = Ad4630Config { channel: 2, ..Default::default() };
        assert!(config.validate().is_err());

        config.channel = 1;
        config.restore_modes = Some(0x30);
        assert!(config.validate().is_err());
    }

    #[test]
    fn writes_modes_and_restores_driver_default() {
        let (session, _) = run(Ad4630Config::default(), scans(&[0]));
        let backend = session.backend();

        let writes: Vec<u32> = backend
            .events()
            .iter()
            .filter_map(|e| match e {
                BackendEvent::RegWrite { address: MODES_REG, value, .. } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![0x81, 0x82]);
        assert_eq!(backend.register("ad4630", MODES_REG), Some(0x82));
    }

    #[test]
    fn restore_happens_before_teardown() {
        let (session, _) = run(Ad4630Config::default(), scans(&[0]));
        let backend = session.backend();

        let restore = backend
            .last_position(|e| matches!(e, BackendEvent::RegWrite { value: 0x82, .. }))
            .unwrap();
        let destroy = backend.position(BackendEvent::is_destroy_buffer).unwrap();
        let disable = backend.position(BackendEvent::is_disable).unwrap();
        let close = backend.position(|e| *e == BackendEvent::Close).unwrap();

        assert!(restore < destroy);
        assert!(destroy < disable);
        assert!(disable < close);
    }

    #[test]
    fn default_mode_captures_vcom_and_16_bit_data() {
        let (_, blocks) = run(Ad4630Config::default(), scans(&[0x1234_5678, 0xFFFF_0000]));
        let block = &blocks[0];

        assert_eq!(block.common_mode_voltage, Some(7));
        assert_eq!(block.channel_id, "voltage0");
        assert_eq!(
            block.data,
            BlockData::Indexed {
                label: "CH0".into(),
                values: vec![0x1234, -1],
                or_sync: None,
            }
        );
    }

    #[test]
    fn averaged_mode_on_channel_one() {
        let config = Ad4630Config {
            channel: 1,
            modes: ModesRegister {
                out_data_mode: OutDataMode::Avg30OrSync,
                ..Default::default()
            },
            ..Default::default()
        };
        let (_, blocks) = run(config, scans(&[0x0000_0006_0000_0000]));
        let block = &blocks[0];

        assert_eq!(block.common_mode_voltage, None);
        assert_eq!(
            block.data,
            BlockData::Indexed {
                label: "CH1".into(),
                values: vec![1],
                or_sync: Some(vec![2]),
            }
        );
    }

    #[test]
    fn missing_vcom_attribute_fails_the_run() {
        let stop = Arc::new(StopSignal::new());
        let backend = MockBackend::new()
            .with_device("ad4630")
            .with_channel("ad4630", "voltage0", Direction::Input, DataFormat::signed(64))
            .stop_after_refills(3, Arc::clone(&stop));
        let mut session = StreamSession::with_stop_signal(backend, stop);

        let err = session.run(&mut Ad4630Profile::new(Ad4630Config::default())).unwrap_err();

        assert_eq!(err, StreamError::AttributeRead { attr: VCOM_ATTR.into(), code: -2 });
        let backend = session.backend();
        assert_eq!(backend.register("ad4630", MODES_REG), Some(0x82));
        assert_eq!(
            &backend.events()[backend.events().len() - 4..],
            &[
                BackendEvent::RegWrite { device: "ad4630".into(), address: MODES_REG, value: 0x82 },
                BackendEvent::DestroyBuffer(0),
                BackendEvent::Disable("ad4630/voltage0".into()),
                BackendEvent::Close,
            ]
        );
    }
}
