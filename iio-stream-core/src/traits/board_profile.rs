use std::time::Duration;

use crate::models::capture_block::CaptureBlock;
use crate::models::error::StreamError;
use crate::session::io::StreamIo;
use crate::traits::stream_backend::StreamBackend;

/// Per-part behavior plugged into `StreamSession::run`.
///
/// Channels and buffers must be enabled and created through `StreamIo` so
/// the session can release them.
pub trait BoardProfile {
    /// Part name, e.g. `AD4630-24`.
    fn part_name(&self) -> &str;

    /// Name of the device samples are captured from.
    fn device_name(&self) -> &str;

    /// Writes modes, registers and attributes, enables channels and creates
    /// buffers. Transitions: idle → configuring.
    fn configure<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<(), StreamError>;

    /// One loop iteration: refill, read, unpack.
    fn capture<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<CaptureBlock, StreamError>;

    /// Restores what `configure` changed on the hardware. Runs on both the
    /// clean and the failure path, before any buffer is destroyed.
    fn finish<B: StreamBackend>(&mut self, _io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
        Ok(())
    }

    /// Pause between refills.
    fn refill_interval(&self) -> Option<Duration> {
        None
    }

    /// Pause before the first refill.
    fn warmup_delay(&self) -> Option<Duration> {
        None
    }
}
