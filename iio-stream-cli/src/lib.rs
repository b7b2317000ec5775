//! # iio-stream-cli
//!
//! Glue shared by the streaming binaries in `src/bin/`.
//!
//! Provides:
//! - `CommonArgs`: context URI, `--config` and `--summary`, flattened into
//!   each binary's arguments
//! - `prepare`: board configuration from preset, JSON file and flags
//! - `stream`: one session against any `StreamBackend`, samples to stdout
//! - `run_board`: the whole program over libiio (`libiio` feature)

pub mod args;
pub mod runner;

pub use args::{parse_variant, secs_to_ms, CommonArgs};
pub use runner::{config_failure, exit_code, init_logging, install_stop_handler, prepare, stream, StdoutDelegate};

#[cfg(feature = "libiio")]
pub use runner::run_board;
