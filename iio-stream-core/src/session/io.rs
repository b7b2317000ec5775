use crate::models::data_format::{DataFormat, Direction};
use crate::models::error::StreamError;
use crate::traits::stream_backend::{BufferHandle, ChannelHandle, DeviceHandle, StreamBackend};

/// The backend as seen by a board profile.
///
/// Records every channel it enables and every buffer it creates, so the
/// session can release them in order however the run ends.
pub struct StreamIo<'a, B: StreamBackend> {
    backend: &'a mut B,
    enabled: Vec<ChannelHandle>,
    buffers: Vec<BufferHandle>,
}

impl<'a, B: StreamBackend> StreamIo<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self {
            backend,
            enabled: Vec::new(),
            buffers: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        self.backend
    }

    /// Direct backend access for register and attribute work. Channels and
    /// buffers should go through `enable` and `create_buffer` instead.
    pub fn backend_mut(&mut self) -> &mut B {
        self.backend
    }

    pub fn device(&self, name: &str) -> Result<DeviceHandle, StreamError> {
        self.backend
            .find_device(name)
            .ok_or_else(|| StreamError::DeviceNotFound(name.to_string()))
    }

    pub fn channel(&self, dev: DeviceHandle, name: &str, direction: Direction) -> Result<ChannelHandle, StreamError> {
        self.backend
            .find_channel(dev, name, direction)
            .ok_or_else(|| StreamError::ChannelNotFound {
                device: self.backend.device_name(dev),
                channel: name.to_string(),
            })
    }

    /// Enables a channel for streaming. Enabling twice is a no-op.
    pub fn enable(&mut self, chn: ChannelHandle) {
        if self.enabled.contains(&chn) {
            return;
        }
        self.backend.enable_channel(chn);
        self.enabled.push(chn);
    }

    pub fn create_buffer(&mut self, dev: DeviceHandle, samples: usize, cyclic: bool) -> Result<BufferHandle, StreamError> {
        let buf = self.backend.create_buffer(dev, samples, cyclic)?;
        self.buffers.push(buf);
        Ok(buf)
    }

    /// Reads up to `samples` samples of a channel from a refilled buffer.
    ///
    /// Returns the channel's data format and the raw bytes, `sample_size`
    /// bytes per sample.
    pub fn read_samples(
        &self,
        chn: ChannelHandle,
        buf: BufferHandle,
        samples: usize,
    ) -> Result<(DataFormat, Vec<u8>), StreamError> {
        let format = self.backend.data_format(chn);
        let sample_size = format.sample_size();
        if sample_size == 0 {
            return Err(StreamError::ConfigurationFailed(format!(
                "channel {} reports a zero sample size (length {}, repeat {})",
                self.backend.channel_id(chn),
                format.length,
                format.repeat
            )));
        }

        let len = sample_size.checked_mul(samples).ok_or_else(|| {
            StreamError::ConfigurationFailed(format!(
                "{} samples of {} bytes do not fit in memory",
                samples, sample_size
            ))
        })?;
        let mut raw = vec![0u8; len];
        let copied = self.backend.read_raw(chn, buf, &mut raw);
        raw.truncate(copied);
        Ok((format, raw))
    }

    /// Copies samples of one channel into a buffer before a push.
    pub fn write_samples(&mut self, chn: ChannelHandle, buf: BufferHandle, raw: &[u8]) -> usize {
        self.backend.write_raw(chn, buf, raw)
    }

    /// Releases everything in order: buffers newest first, then channels in
    /// the order they were enabled, then the context.
    pub fn release(&mut self) {
        if !self.buffers.is_empty() {
            log::info!("* Destroying buffers");
        }
        while let Some(buf) = self.buffers.pop() {
            self.backend.destroy_buffer(buf);
        }

        if !self.enabled.is_empty() {
            log::info!("* Disabling streaming channels");
        }
        for chn in self.enabled.drain(..) {
            self.backend.disable_channel(chn);
        }

        log::info!("* Destroying context");
        self.backend.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BackendEvent, MockBackend};

    fn backend() -> MockBackend {
        MockBackend::new()
            .with_device("adc")
            .with_channel("adc", "voltage0", Direction::Input, DataFormat::signed(16))
            .with_channel("adc", "voltage1", Direction::Input, DataFormat::signed(16))
    }

    #[test]
    fn lookups_name_what_is_missing() {
        let mut backend = backend();
        let io = StreamIo::new(&mut backend);

        assert_eq!(io.device("dac"), Err(StreamError::DeviceNotFound("dac".into())));
        let dev = io.device("adc").unwrap();
        assert_eq!(
            io.channel(dev, "voltage0", Direction::Output),
            Err(StreamError::ChannelNotFound { device: "adc".into(), channel: "voltage0".into() })
        );
    }

    #[test]
    fn enabling_twice_is_tracked_once() {
        let mut backend = backend();
        let mut io = StreamIo::new(&mut backend);
        let dev = io.device("adc").unwrap();
        let chn = io.channel(dev, "voltage1", Direction::Input).unwrap();

        io.enable(chn);
        io.enable(chn);

        assert_eq!(io.enabled, vec![chn]);
        let enables = io
            .backend()
            .events()
            .iter()
            .filter(|e| matches!(e, BackendEvent::Enable(_)))
            .count();
        assert_eq!(enables, 1);
    }

    #[test]
    fn release_order() {
        let mut backend = backend();
        let mut io = StreamIo::new(&mut backend);
        let dev = io.device("adc").unwrap();
        for name in ["voltage1", "voltage0"] {
            let chn = io.channel(dev, name, Direction::Input).unwrap();
            io.enable(chn);
        }
        io.create_buffer(dev, 16, false).unwrap();
        io.create_buffer(dev, 16, false).unwrap();
        assert_eq!(io.buffers.len(), 2);

        io.release();
        assert!(io.buffers.is_empty());
        assert!(io.enabled.is_empty());

        let tail: Vec<BackendEvent> = backend.events()[4..].to_vec();
        assert_eq!(
            tail,
            vec![
                BackendEvent::DestroyBuffer(1),
                BackendEvent::DestroyBuffer(0),
                BackendEvent::Disable("adc/voltage1".into()),
                BackendEvent::Disable("adc/voltage0".into()),
                BackendEvent::Close,
            ]
        );
    }

    #[test]
    fn short_read_is_truncated() {
        let mut backend = backend().with_channel_data("adc", "voltage0", vec![1, 0, 2, 0]);
        let mut io = StreamIo::new(&mut backend);
        let dev = io.device("adc").unwrap();
        let chn = io.channel(dev, "voltage0", Direction::Input).unwrap();
        io.enable(chn);
        let buf = io.create_buffer(dev, 400, false).unwrap();

        let (format, raw) = io.read_samples(chn, buf, 400).unwrap();

        assert_eq!(format.sample_size(), 2);
        assert_eq!(raw, vec![1, 0, 2, 0]);
    }

    #[test]
    fn oversized_read_is_a_configuration_error() {
        let mut backend = backend();
        let mut io = StreamIo::new(&mut backend);
        let dev = io.device("adc").unwrap();
        let chn = io.channel(dev, "voltage0", Direction::Input).unwrap();
        let buf = io.create_buffer(dev, 16, false).unwrap();

        let err = io.read_samples(chn, buf, usize::MAX).unwrap_err();

        assert!(matches!(err, StreamError::ConfigurationFailed(_)), "{:?}", err);
    }
}
