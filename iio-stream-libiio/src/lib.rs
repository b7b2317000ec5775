//! # iio-stream-libiio
//!
//! libiio backend for iio-stream.
//!
//! Provides:
//! - `LibIioBackend`: `StreamBackend` over a local or remote `industrial_io`
//!   context
//! - `errno`: conversion of libiio return codes into `StreamError`
//!
//! ## Platform Requirements
//! - libiio 0.2x installed with its headers (`libiio-dev`)
//! - build with `--features libiio`
//!
//! ## Usage
//! ```ignore
//! use iio_stream_core::{AdcConfig, AdcProfile, StreamSession};
//! use iio_stream_libiio::LibIioBackend;
//!
//! let backend = LibIioBackend::open(Some("ip:10.0.0.2"))?;
//! let mut session = StreamSession::new(backend);
//! session.run(&mut AdcProfile::new(AdcConfig::ad7606b()))?;
//! ```

pub mod errno;

#[cfg(feature = "libiio")]
pub mod context;
#[cfg(feature = "libiio")]
mod debug_attr;

#[cfg(feature = "libiio")]
pub use context::LibIioBackend;
