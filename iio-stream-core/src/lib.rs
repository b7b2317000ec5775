//! # iio-stream-core
//!
//! Hardware-independent core of the IIO streaming programs.
//!
//! Provides sample unpacking, register encodings, per-board configuration
//! profiles and the capture session. The libiio backend lives in
//! `iio-stream-libiio` and implements the `StreamBackend` trait, which
//! plugs into the generic `StreamSession`.
//!
//! ## Architecture
//!
//! ```text
//! iio-stream-core (this crate)
//! ├── traits/       ← StreamBackend, BoardProfile, StreamDelegate
//! ├── models/       ← StreamError, StreamState, DataFormat, CaptureBlock, StreamSummary
//! ├── processing/   ← AD4630 unpacking, modes register, ADRV9002 TX sine table
//! ├── boards/       ← AD4630, AD4696/AD7606B/AD7768, ADRV9002 profiles
//! ├── session/      ← StreamSession, StreamIo, StopSignal
//! └── storage/      ← JSON config loading and session summaries
//! ```

pub mod boards;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export key types at crate root for convenience.
pub use boards::ad4630::{Ad4630Config, Ad4630Profile};
pub use boards::adc::{AdcConfig, AdcProfile};
pub use boards::adrv9002::{Adrv9002Config, Adrv9002Profile, TxDacMode};
pub use models::capture_block::{BlockData, CaptureBlock, IqSample};
pub use models::config::BoardConfig;
pub use models::data_format::{DataFormat, Direction};
pub use models::error::StreamError;
pub use models::state::StreamState;
pub use models::summary::StreamSummary;
pub use processing::modes_register::ModesRegister;
pub use session::io::StreamIo;
pub use session::stop_signal::StopSignal;
pub use session::stream::StreamSession;
pub use traits::board_profile::BoardProfile;
pub use traits::stream_backend::{BufferHandle, ChannelHandle, DeviceHandle, StreamBackend};
pub use traits::stream_delegate::StreamDelegate;
