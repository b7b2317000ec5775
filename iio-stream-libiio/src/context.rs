//! `StreamBackend` over an `industrial_io` context.
//!
//! Handles index tables of the devices, channels and buffers handed out so
//! far. Buffers are destroyed by `destroy_buffer`, or by `close`/`Drop` if
//! still alive.

use std::any::TypeId;
use std::cell::RefCell;
use std::io;

use industrial_io as iio;

use iio_stream_core::models::data_format::{DataFormat, Direction};
use iio_stream_core::models::error::StreamError;
use iio_stream_core::traits::stream_backend::{BufferHandle, ChannelHandle, DeviceHandle, StreamBackend};

use crate::debug_attr::DebugAttrs;
use crate::errno::{context_error, negative_code, EIO};

/// Negative errno behind a wrapper error.
fn code(err: &iio::Error) -> i32 {
    match err {
        iio::Error::Io(e) => negative_code(e),
        _ => -EIO,
    }
}

/// Error for a handle that no longer maps to a library object.
fn stale() -> iio::Error {
    iio::Error::Io(io::Error::from_raw_os_error(EIO))
}

/// Fixed-width sample word, copied to and from buffer bytes in host order.
trait Word: Copy + Default + 'static {
    const SIZE: usize;
    fn put(self, out: &mut [u8]);
    fn take(src: &[u8]) -> Self;
}

macro_rules! word {
    ($($t:ty),*) => {$(
        impl Word for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            fn put(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn take(src: &[u8]) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$t>()];
                bytes.copy_from_slice(src);
                <$t>::from_ne_bytes(bytes)
            }
        }
    )*};
}

word!(i8, u8, i16, u16, i32, u32, i64, u64);

/// Calls `$f::<T>` with `T` the channel's native sample type.
macro_rules! with_word_type {
    ($chan:expr, $f:ident($($arg:expr),*)) => {{
        let ty = $chan.type_of();
        if ty == Some(TypeId::of::<i8>()) { $f::<i8>($($arg),*) }
        else if ty == Some(TypeId::of::<u8>()) { $f::<u8>($($arg),*) }
        else if ty == Some(TypeId::of::<i16>()) { $f::<i16>($($arg),*) }
        else if ty == Some(TypeId::of::<u16>()) { $f::<u16>($($arg),*) }
        else if ty == Some(TypeId::of::<i32>()) { $f::<i32>($($arg),*) }
        else if ty == Some(TypeId::of::<u32>()) { $f::<u32>($($arg),*) }
        else if ty == Some(TypeId::of::<i64>()) { $f::<i64>($($arg),*) }
        else if ty == Some(TypeId::of::<u64>()) { $f::<u64>($($arg),*) }
        else {
            log::warn!("channel {} has no fixed-width sample type", $chan.id().unwrap_or_default());
            0
        }
    }};
}

fn copy_out<T: Word>(chan: &iio::Channel, buf: &iio::Buffer, dst: &mut [u8]) -> usize {
    match chan.read_raw::<T>(buf) {
        Ok(words) => words
            .into_iter()
            .zip(dst.chunks_exact_mut(T::SIZE))
            .map(|(word, out)| {
                word.put(out);
                T::SIZE
            })
            .sum(),
        Err(e) => {
            log::warn!("read of {} failed: {}", chan.id().unwrap_or_default(), e);
            0
        }
    }
}

fn copy_in<T: Word>(chan: &iio::Channel, buf: &iio::Buffer, src: &[u8]) -> usize {
    let words: Vec<T> = src.chunks_exact(T::SIZE).map(T::take).collect();
    match chan.write_raw(buf, &words) {
        Ok(n) => n,
        Err(e) => {
            log::warn!("write of {} failed: {}", chan.id().unwrap_or_default(), e);
            0
        }
    }
}

pub struct LibIioBackend {
    uri: Option<String>,
    ctx: Option<iio::Context>,
    devices: RefCell<Vec<iio::Device>>,
    channels: RefCell<Vec<iio::Channel>>,
    /// Slots of created buffers; `None` once destroyed.
    buffers: Vec<Option<iio::Buffer>>,
    debug: Option<DebugAttrs>,
}

impl LibIioBackend {
    /// Opens the context at `uri` (e.g. `ip:10.0.0.2`), or the default
    /// local context.
    pub fn open(uri: Option<&str>) -> Result<Self, StreamError> {
        let ctx = match uri {
            Some(uri) => iio::Context::from_uri(uri),
            None => iio::Context::new(),
        }
        .map_err(|e| match &e {
            iio::Error::Io(io) => context_error(io),
            other => StreamError::ContextUnavailable(other.to_string()),
        })?;
        log::debug!("IIO context opened ({})", uri.unwrap_or("local"));

        Ok(Self {
            uri: uri.map(str::to_string),
            ctx: Some(ctx),
            devices: RefCell::new(Vec::new()),
            channels: RefCell::new(Vec::new()),
            buffers: Vec::new(),
            debug: None,
        })
    }

    fn with_device<R>(&self, dev: DeviceHandle, f: impl FnOnce(&iio::Device) -> R) -> Option<R> {
        self.devices.borrow().get(dev.0).map(f)
    }

    fn with_channel<R>(&self, chn: ChannelHandle, f: impl FnOnce(&iio::Channel) -> R) -> Option<R> {
        self.channels.borrow().get(chn.0).map(f)
    }

    fn buffer(&self, buf: BufferHandle) -> Option<&iio::Buffer> {
        self.buffers.get(buf.0).and_then(Option::as_ref)
    }
}

impl StreamBackend for LibIioBackend {
    fn device_count(&self) -> usize {
        self.ctx.as_ref().map_or(0, iio::Context::num_devices)
    }

    fn find_device(&self, name: &str) -> Option<DeviceHandle> {
        let dev = self.ctx.as_ref()?.find_device(name)?;
        let mut devices = self.devices.borrow_mut();
        devices.push(dev);
        Some(DeviceHandle(devices.len() - 1))
    }

    fn device_name(&self, dev: DeviceHandle) -> String {
        self.with_device(dev, |d| d.name().unwrap_or_default()).unwrap_or_default()
    }

    fn find_channel(&self, dev: DeviceHandle, name: &str, direction: Direction) -> Option<ChannelHandle> {
        let chan = self.with_device(dev, |d| d.find_channel(name, direction.is_output()))??;
        let mut channels = self.channels.borrow_mut();
        channels.push(chan);
        Some(ChannelHandle(channels.len() - 1))
    }

    fn channel_id(&self, chn: ChannelHandle) -> String {
        self.with_channel(chn, |c| c.id().unwrap_or_default()).unwrap_or_default()
    }

    fn reg_write(&mut self, dev: DeviceHandle, address: u32, value: u32) -> Result<(), StreamError> {
        self.with_device(dev, |d| d.reg_write(address, value))
            .unwrap_or_else(|| Err(stale()))
            .map_err(|e| StreamError::Register { address, code: code(&e) })
    }

    fn reg_read(&self, dev: DeviceHandle, address: u32) -> Result<u32, StreamError> {
        self.with_device(dev, |d| d.reg_read(address))
            .unwrap_or_else(|| Err(stale()))
            .map_err(|e| StreamError::Register { address, code: code(&e) })
    }

    fn debug_attr_write(&mut self, dev: DeviceHandle, attr: &str, value: &str) -> Result<(), StreamError> {
        let name = self.device_name(dev);
        let debug = match &mut self.debug {
            Some(debug) => debug,
            slot @ None => slot.insert(DebugAttrs::open(self.uri.as_deref())?),
        };
        debug.write(&name, attr, value)
    }

    fn channel_attr_read_i64(&self, chn: ChannelHandle, attr: &str) -> Result<i64, StreamError> {
        self.with_channel(chn, |c| c.attr_read_int(attr))
            .unwrap_or_else(|| Err(stale()))
            .map_err(|e| StreamError::AttributeRead { attr: attr.to_string(), code: code(&e) })
    }

    fn channel_attr_write_i64(&mut self, chn: ChannelHandle, attr: &str, value: i64) -> Result<(), StreamError> {
        self.with_channel(chn, |c| c.attr_write_int(attr, value))
            .unwrap_or_else(|| Err(stale()))
            .map_err(|e| StreamError::AttributeWrite { attr: attr.to_string(), code: code(&e) })
    }

    fn channel_attr_read_f64(&self, chn: ChannelHandle, attr: &str) -> Result<f64, StreamError> {
        self.with_channel(chn, |c| c.attr_read_float(attr))
            .unwrap_or_else(|| Err(stale()))
            .map_err(|e| StreamError::AttributeRead { attr: attr.to_string(), code: code(&e) })
    }

    fn channel_attr_write_f64(&mut self, chn: ChannelHandle, attr: &str, value: f64) -> Result<(), StreamError> {
        self.with_channel(chn, |c| c.attr_write_float(attr, value))
            .unwrap_or_else(|| Err(stale()))
            .map_err(|e| StreamError::AttributeWrite { attr: attr.to_string(), code: code(&e) })
    }

    fn enable_channel(&mut self, chn: ChannelHandle) {
        self.with_channel(chn, iio::Channel::enable);
    }

    fn disable_channel(&mut self, chn: ChannelHandle) {
        self.with_channel(chn, iio::Channel::disable);
    }

    fn data_format(&self, chn: ChannelHandle) -> DataFormat {
        self.with_channel(chn, |c| {
            let fmt = c.data_format();
            DataFormat {
                length: fmt.length() as u32,
                bits: fmt.bits() as u32,
                shift: fmt.shift() as u32,
                is_signed: fmt.is_signed(),
                is_big_endian: fmt.is_big_endian(),
                repeat: fmt.repeat() as u32,
            }
        })
        .unwrap_or_else(|| DataFormat::signed(0))
    }

    fn create_buffer(&mut self, dev: DeviceHandle, samples: usize, cyclic: bool) -> Result<BufferHandle, StreamError> {
        let buf = self
            .with_device(dev, |d| d.create_buffer(samples, cyclic))
            .unwrap_or_else(|| Err(stale()))
            .map_err(|e| StreamError::BufferCreate(code(&e)))?;
        self.buffers.push(Some(buf));
        Ok(BufferHandle(self.buffers.len() - 1))
    }

    fn refill(&mut self, buf: BufferHandle) -> Result<usize, StreamError> {
        match self.buffers.get_mut(buf.0).and_then(Option::as_mut) {
            Some(buffer) => buffer.refill().map_err(|e| StreamError::Refill(code(&e))),
            None => Err(StreamError::Refill(-EIO)),
        }
    }

    fn push(&mut self, buf: BufferHandle) -> Result<usize, StreamError> {
        match self.buffer(buf) {
            Some(buffer) => buffer.push().map_err(|e| StreamError::Push(code(&e))),
            None => Err(StreamError::Push(-EIO)),
        }
    }

    fn read_raw(&self, chn: ChannelHandle, buf: BufferHandle, dst: &mut [u8]) -> usize {
        let Some(buffer) = self.buffer(buf) else {
            return 0;
        };
        self.with_channel(chn, |c| with_word_type!(c, copy_out(c, buffer, dst)))
            .unwrap_or(0)
    }

    fn write_raw(&mut self, chn: ChannelHandle, buf: BufferHandle, src: &[u8]) -> usize {
        let Some(buffer) = self.buffer(buf) else {
            return 0;
        };
        self.with_channel(chn, |c| with_word_type!(c, copy_in(c, buffer, src)))
            .unwrap_or(0)
    }

    fn destroy_buffer(&mut self, buf: BufferHandle) {
        if let Some(slot) = self.buffers.get_mut(buf.0) {
            slot.take();
        }
    }

    fn close(&mut self) {
        // Newest first.
        while self.buffers.pop().is_some() {}
        self.channels.borrow_mut().clear();
        self.devices.borrow_mut().clear();
        self.debug = None;
        self.ctx = None;
    }
}

impl Drop for LibIioBackend {
    fn drop(&mut self) {
        self.close();
    }
}
