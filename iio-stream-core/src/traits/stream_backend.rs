use crate::models::data_format::{DataFormat, Direction};
use crate::models::error::StreamError;

/// A device found in the context. Borrowed from the context; never freed on
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub usize);

/// A channel of a device. Borrowed from the context like its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(pub usize);

/// A sample buffer. Owned by the caller until `destroy_buffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub usize);

/// Hardware access through an IIO context.
///
/// Implemented over libiio in `iio-stream-libiio`, and by `MockBackend` for
/// tests. Library failures come back as the matching `StreamError` carrying
/// the negative errno.
pub trait StreamBackend {
    /// Number of devices in the context.
    fn device_count(&self) -> usize;

    /// Looks up a device by name or id.
    fn find_device(&self, name: &str) -> Option<DeviceHandle>;

    fn device_name(&self, dev: DeviceHandle) -> String;

    /// Looks up a channel by name or id and direction.
    fn find_channel(&self, dev: DeviceHandle, name: &str, direction: Direction) -> Option<ChannelHandle>;

    fn channel_id(&self, chn: ChannelHandle) -> String;

    fn reg_write(&mut self, dev: DeviceHandle, address: u32, value: u32) -> Result<(), StreamError>;

    fn reg_read(&self, dev: DeviceHandle, address: u32) -> Result<u32, StreamError>;

    fn debug_attr_write(&mut self, dev: DeviceHandle, attr: &str, value: &str) -> Result<(), StreamError>;

    fn channel_attr_read_i64(&self, chn: ChannelHandle, attr: &str) -> Result<i64, StreamError>;

    fn channel_attr_write_i64(&mut self, chn: ChannelHandle, attr: &str, value: i64) -> Result<(), StreamError>;

    fn channel_attr_read_f64(&self, chn: ChannelHandle, attr: &str) -> Result<f64, StreamError>;

    fn channel_attr_write_f64(&mut self, chn: ChannelHandle, attr: &str, value: f64) -> Result<(), StreamError>;

    fn enable_channel(&mut self, chn: ChannelHandle);

    fn disable_channel(&mut self, chn: ChannelHandle);

    fn data_format(&self, chn: ChannelHandle) -> DataFormat;

    /// Creates a buffer of `samples` samples on a device with enabled
    /// channels.
    fn create_buffer(&mut self, dev: DeviceHandle, samples: usize, cyclic: bool) -> Result<BufferHandle, StreamError>;

    /// Fetches a new block of samples. Returns the number of bytes read.
    fn refill(&mut self, buf: BufferHandle) -> Result<usize, StreamError>;

    /// Submits the buffer contents to the hardware. Returns the number of
    /// bytes written.
    fn push(&mut self, buf: BufferHandle) -> Result<usize, StreamError>;

    /// Copies the samples of one channel out of the buffer. Returns the
    /// number of bytes copied.
    fn read_raw(&self, chn: ChannelHandle, buf: BufferHandle, dst: &mut [u8]) -> usize;

    /// Copies samples of one channel into the buffer. Returns the number of
    /// bytes copied.
    fn write_raw(&mut self, chn: ChannelHandle, buf: BufferHandle, src: &[u8]) -> usize;

    fn destroy_buffer(&mut self, buf: BufferHandle);

    /// Destroys the context. No handle may be used afterwards.
    fn close(&mut self);
}
