//! In-memory backend for exercising profiles and sessions without hardware.
//!
//! Every mutating call is recorded as a `BackendEvent` in call order, so
//! tests can assert configuration writes and teardown ordering.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::capture_block::CaptureBlock;
use crate::models::data_format::{DataFormat, Direction};
use crate::models::error::StreamError;
use crate::models::state::StreamState;
use crate::models::summary::StreamSummary;
use crate::session::stop_signal::StopSignal;
use crate::traits::stream_backend::{BufferHandle, ChannelHandle, DeviceHandle, StreamBackend};
use crate::traits::stream_delegate::StreamDelegate;

/// A recorded backend call. Channels are named `<device>/<channel id>`.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    RegWrite { device: String, address: u32, value: u32 },
    DebugAttrWrite { device: String, attr: String, value: String },
    AttrWriteI64 { channel: String, attr: String, value: i64 },
    AttrWriteF64 { channel: String, attr: String, value: f64 },
    Enable(String),
    Disable(String),
    CreateBuffer { device: String, samples: usize, cyclic: bool },
    Refill(usize),
    Push(usize),
    WriteRaw { channel: String, bytes: usize },
    DestroyBuffer(usize),
    Close,
}

impl BackendEvent {
    pub fn is_destroy_buffer(&self) -> bool {
        matches!(self, Self::DestroyBuffer(_))
    }

    pub fn is_disable(&self) -> bool {
        matches!(self, Self::Disable(_))
    }
}

#[derive(Debug, Clone)]
struct MockChannel {
    device: usize,
    id: String,
    direction: Direction,
    format: DataFormat,
    attrs_i64: HashMap<String, i64>,
    attrs_f64: HashMap<String, f64>,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct MockDevice {
    name: String,
    registers: HashMap<u32, u32>,
}

/// Scripted in-memory IIO context.
#[derive(Debug, Default)]
pub struct MockBackend {
    devices: Vec<MockDevice>,
    channels: Vec<MockChannel>,
    buffers: Vec<Option<usize>>,
    events: Vec<BackendEvent>,
    refills: usize,
    stop_after: Option<(usize, Arc<StopSignal>)>,
    refill_failure: Option<(usize, i32)>,
    attr_write_failures: HashMap<String, i32>,
    register_failures: HashMap<u32, i32>,
    closed: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device. Returns `self` for chaining.
    pub fn with_device(mut self, name: &str) -> Self {
        self.devices.push(MockDevice {
            name: name.to_string(),
            registers: HashMap::new(),
        });
        self
    }

    /// Adds a channel to a previously added device.
    pub fn with_channel(mut self, device: &str, id: &str, direction: Direction, format: DataFormat) -> Self {
        if let Some(dev) = self.devices.iter().position(|d| d.name == device) {
            self.channels.push(MockChannel {
                device: dev,
                id: id.to_string(),
                direction,
                format,
                attrs_i64: HashMap::new(),
                attrs_f64: HashMap::new(),
                data: Vec::new(),
            });
        }
        self
    }

    /// Bytes `read_raw` returns for a channel after every refill.
    pub fn with_channel_data(mut self, device: &str, id: &str, data: Vec<u8>) -> Self {
        if let Some(chn) = self.channel_mut(device, id) {
            chn.data = data;
        }
        self
    }

    pub fn with_attr_i64(mut self, device: &str, id: &str, attr: &str, value: i64) -> Self {
        if let Some(chn) = self.channel_mut(device, id) {
            chn.attrs_i64.insert(attr.to_string(), value);
        }
        self
    }

    /// Requests a stop on `signal` once `refills` refills have completed.
    pub fn stop_after_refills(mut self, refills: usize, signal: Arc<StopSignal>) -> Self {
        self.stop_after = Some((refills, signal));
        self
    }

    /// Makes the `nth` refill (1-based) fail with `code`.
    pub fn fail_refill(mut self, nth: usize, code: i32) -> Self {
        self.refill_failure = Some((nth, code));
        self
    }

    /// Makes every write of `attr` fail with `code`.
    pub fn fail_attr_write(mut self, attr: &str, code: i32) -> Self {
        self.attr_write_failures.insert(attr.to_string(), code);
        self
    }

    /// Makes every access to register `address` fail with `code`.
    pub fn fail_register(mut self, address: u32, code: i32) -> Self {
        self.register_failures.insert(address, code);
        self
    }

    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    pub fn refills(&self) -> usize {
        self.refills
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current value of a register, as the last write left it.
    pub fn register(&self, device: &str, address: u32) -> Option<u32> {
        self.devices
            .iter()
            .find(|d| d.name == device)
            .and_then(|d| d.registers.get(&address).copied())
    }

    /// Position of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&BackendEvent) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }

    /// Position of the last event matching `pred`.
    pub fn last_position(&self, pred: impl Fn(&BackendEvent) -> bool) -> Option<usize> {
        self.events.iter().rposition(pred)
    }

    /// True when the context was closed last and every buffer was destroyed
    /// before the first channel was disabled.
    pub fn teardown_in_order(&self) -> bool {
        let Some(close) = self.position(|e| *e == BackendEvent::Close) else {
            return false;
        };
        let last_destroy = self.last_position(BackendEvent::is_destroy_buffer);
        let first_disable = self.position(BackendEvent::is_disable);
        let last_disable = self.last_position(BackendEvent::is_disable);

        let buffers_first = match (last_destroy, first_disable) {
            (Some(destroy), Some(disable)) => destroy < disable,
            _ => true,
        };
        close + 1 == self.events.len()
            && buffers_first
            && last_destroy.map_or(true, |d| d < close)
            && last_disable.map_or(true, |d| d < close)
    }

    fn channel_mut(&mut self, device: &str, id: &str) -> Option<&mut MockChannel> {
        let dev = self.devices.iter().position(|d| d.name == device)?;
        self.channels.iter_mut().find(|c| c.device == dev && c.id == id)
    }

    fn channel_label(&self, chn: ChannelHandle) -> String {
        match self.channels.get(chn.0) {
            Some(c) => format!("{}/{}", self.devices[c.device].name, c.id),
            None => format!("?/{}", chn.0),
        }
    }
}

impl StreamBackend for MockBackend {
    fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn find_device(&self, name: &str) -> Option<DeviceHandle> {
        self.devices.iter().position(|d| d.name == name).map(DeviceHandle)
    }

    fn device_name(&self, dev: DeviceHandle) -> String {
        self.devices.get(dev.0).map(|d| d.name.clone()).unwrap_or_default()
    }

    fn find_channel(&self, dev: DeviceHandle, name: &str, direction: Direction) -> Option<ChannelHandle> {
        self.channels
            .iter()
            .position(|c| c.device == dev.0 && c.id == name && c.direction == direction)
            .map(ChannelHandle)
    }

    fn channel_id(&self, chn: ChannelHandle) -> String {
        self.channels.get(chn.0).map(|c| c.id.clone()).unwrap_or_default()
    }

    fn reg_write(&mut self, dev: DeviceHandle, address: u32, value: u32) -> Result<(), StreamError> {
        if let Some(&code) = self.register_failures.get(&address) {
            return Err(StreamError::Register { address, code });
        }
        let device = &mut self.devices[dev.0];
        device.registers.insert(address, value);
        self.events.push(BackendEvent::RegWrite {
            device: device.name.clone(),
            address,
            value,
        });
        Ok(())
    }

    fn reg_read(&self, dev: DeviceHandle, address: u32) -> Result<u32, StreamError> {
        if let Some(&code) = self.register_failures.get(&address) {
            return Err(StreamError::Register { address, code });
        }
        Ok(self.devices[dev.0].registers.get(&address).copied().unwrap_or(0))
    }

    fn debug_attr_write(&mut self, dev: DeviceHandle, attr: &str, value: &str) -> Result<(), StreamError> {
        if let Some(&code) = self.attr_write_failures.get(attr) {
            return Err(StreamError::AttributeWrite { attr: attr.to_string(), code });
        }
        self.events.push(BackendEvent::DebugAttrWrite {
            device: self.devices[dev.0].name.clone(),
            attr: attr.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn channel_attr_read_i64(&self, chn: ChannelHandle, attr: &str) -> Result<i64, StreamError> {
        self.channels[chn.0]
            .attrs_i64
            .get(attr)
            .copied()
            .ok_or(StreamError::AttributeRead { attr: attr.to_string(), code: -2 })
    }

    fn channel_attr_write_i64(&mut self, chn: ChannelHandle, attr: &str, value: i64) -> Result<(), StreamError> {
        if let Some(&code) = self.attr_write_failures.get(attr) {
            return Err(StreamError::AttributeWrite { attr: attr.to_string(), code });
        }
        let channel = self.channel_label(chn);
        self.channels[chn.0].attrs_i64.insert(attr.to_string(), value);
        self.events.push(BackendEvent::AttrWriteI64 {
            channel,
            attr: attr.to_string(),
            value,
        });
        Ok(())
    }

    fn channel_attr_read_f64(&self, chn: ChannelHandle, attr: &str) -> Result<f64, StreamError> {
        self.channels[chn.0]
            .attrs_f64
            .get(attr)
            .copied()
            .ok_or(StreamError::AttributeRead { attr: attr.to_string(), code: -2 })
    }

    fn channel_attr_write_f64(&mut self, chn: ChannelHandle, attr: &str, value: f64) -> Result<(), StreamError> {
        if let Some(&code) = self.attr_write_failures.get(attr) {
            return Err(StreamError::AttributeWrite { attr: attr.to_string(), code });
        }
        let channel = self.channel_label(chn);
        self.channels[chn.0].attrs_f64.insert(attr.to_string(), value);
        self.events.push(BackendEvent::AttrWriteF64 {
            channel,
            attr: attr.to_string(),
            value,
        });
        Ok(())
    }

    fn enable_channel(&mut self, chn: ChannelHandle) {
        let label = self.channel_label(chn);
        self.events.push(BackendEvent::Enable(label));
    }

    fn disable_channel(&mut self, chn: ChannelHandle) {
        let label = self.channel_label(chn);
        self.events.push(BackendEvent::Disable(label));
    }

    fn data_format(&self, chn: ChannelHandle) -> DataFormat {
        self.channels[chn.0].format
    }

    fn create_buffer(&mut self, dev: DeviceHandle, samples: usize, cyclic: bool) -> Result<BufferHandle, StreamError> {
        if samples == 0 {
            return Err(StreamError::BufferCreate(-22));
        }
        self.buffers.push(Some(dev.0));
        self.events.push(BackendEvent::CreateBuffer {
            device: self.devices[dev.0].name.clone(),
            samples,
            cyclic,
        });
        Ok(BufferHandle(self.buffers.len() - 1))
    }

    fn refill(&mut self, buf: BufferHandle) -> Result<usize, StreamError> {
        self.refills += 1;
        if let Some((nth, code)) = self.refill_failure {
            if self.refills == nth {
                return Err(StreamError::Refill(code));
            }
        }
        self.events.push(BackendEvent::Refill(buf.0));
        if let Some((after, signal)) = &self.stop_after {
            if self.refills >= *after {
                signal.request_stop();
            }
        }
        Ok(0)
    }

    fn push(&mut self, buf: BufferHandle) -> Result<usize, StreamError> {
        self.events.push(BackendEvent::Push(buf.0));
        Ok(0)
    }

    fn read_raw(&self, chn: ChannelHandle, _buf: BufferHandle, dst: &mut [u8]) -> usize {
        let data = &self.channels[chn.0].data;
        let n = data.len().min(dst.len());
        dst[..n].copy_from_slice(&data[..n]);
        n
    }

    fn write_raw(&mut self, chn: ChannelHandle, _buf: BufferHandle, src: &[u8]) -> usize {
        let channel = self.channel_label(chn);
        self.events.push(BackendEvent::WriteRaw {
            channel,
            bytes: src.len(),
        });
        src.len()
    }

    fn destroy_buffer(&mut self, buf: BufferHandle) {
        if let Some(slot) = self.buffers.get_mut(buf.0) {
            *slot = None;
        }
        self.events.push(BackendEvent::DestroyBuffer(buf.0));
    }

    fn close(&mut self) {
        self.closed = true;
        self.events.push(BackendEvent::Close);
    }
}

/// Delegate that keeps everything it is told.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    pub states: Mutex<Vec<&'static str>>,
    pub blocks: Mutex<Vec<CaptureBlock>>,
    pub errors: Mutex<Vec<StreamError>>,
    pub finished: Mutex<Option<StreamSummary>>,
}

impl RecordingDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl StreamDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: &StreamState) {
        self.states.lock().push(state.name());
    }

    fn on_block(&self, block: &CaptureBlock) {
        self.blocks.lock().push(block.clone());
    }

    fn on_error(&self, error: &StreamError) {
        self.errors.lock().push(error.clone());
    }

    fn on_stream_finished(&self, summary: &StreamSummary) {
        *self.finished.lock() = Some(summary.clone());
    }
}
