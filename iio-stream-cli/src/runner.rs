use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use iio_stream_core::models::capture_block::CaptureBlock;
use iio_stream_core::models::config::BoardConfig;
use iio_stream_core::models::error::StreamError;
use iio_stream_core::models::state::StreamState;
use iio_stream_core::models::summary::StreamSummary;
use iio_stream_core::session::stop_signal::StopSignal;
use iio_stream_core::session::stream::StreamSession;
use iio_stream_core::storage::summary::{load_config, write_summary};
use iio_stream_core::traits::board_profile::BoardProfile;
use iio_stream_core::traits::stream_backend::StreamBackend;
use iio_stream_core::traits::stream_delegate::StreamDelegate;

use crate::args::CommonArgs;

/// Logger with `info` as the default level; `RUST_LOG` overrides it.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}

/// Builds the board configuration: preset, then `--config` file, then
/// command-line flags, then validation.
pub fn prepare<C: BoardConfig>(
    common: &CommonArgs,
    preset: C,
    flags: impl FnOnce(&mut C),
) -> Result<C, StreamError> {
    let mut config = match &common.config {
        Some(path) => {
            log::info!("* Loading configuration from {}", path.display());
            load_config(preset, path)?
        }
        None => preset,
    };
    flags(&mut config);
    config.validate().map_err(StreamError::ConfigurationFailed)?;
    Ok(config)
}

/// Sets `stop` on SIGINT or SIGTERM.
pub fn install_stop_handler(stop: Arc<StopSignal>) -> Result<(), StreamError> {
    ctrlc::set_handler(move || {
        log::info!("Waiting for process to finish... Got signal");
        stop.request_stop();
    })
    .map_err(|e| StreamError::Signal(format!("failed to install handler: {}", e)))
}

/// Prints capture blocks to stdout; everything else goes to the log.
#[derive(Debug, Default)]
pub struct StdoutDelegate;

impl StreamDelegate for StdoutDelegate {
    fn on_state_changed(&self, state: &StreamState) {
        if let StreamState::Running { buffers: 0 } = state {
            log::info!("* Streaming");
        }
    }

    fn on_block(&self, block: &CaptureBlock) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = write!(out, "{}", block).and_then(|_| out.flush()) {
            log::warn!("could not write samples: {}", e);
        }
    }

    fn on_error(&self, _error: &StreamError) {}

    fn on_stream_finished(&self, summary: &StreamSummary) {
        log::info!(
            "* {} buffers ({} samples, {:.0} per buffer) in {:.1} s",
            summary.buffers_captured,
            summary.samples_captured,
            summary.samples_per_buffer(),
            summary.duration_secs
        );
    }
}

/// Runs one session until `stop` is set or an error occurs, then writes
/// the summary if asked to.
pub fn stream<B: StreamBackend, P: BoardProfile>(
    backend: B,
    stop: Arc<StopSignal>,
    profile: &mut P,
    delegate: Arc<dyn StreamDelegate>,
    summary_path: Option<&Path>,
) -> Result<StreamSummary, StreamError> {
    let mut session = StreamSession::with_stop_signal(backend, stop);
    session.set_delegate(delegate);
    let summary = session.run(profile)?;

    if let Some(path) = summary_path {
        write_summary(&summary, path)?;
        log::info!("* Summary written to {}", path.display());
    }
    Ok(summary)
}

/// Process exit status for a failed run.
pub fn exit_code(err: &StreamError) -> u8 {
    match err {
        e if e.is_lookup() => 1,
        StreamError::ConfigurationFailed(_) => 2,
        StreamError::Signal(_) | StreamError::StorageError(_) => 4,
        _ => 3,
    }
}

fn finish(result: Result<(), StreamError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Installs the signal handler, opens the context and streams `profile`
/// until a signal arrives.
#[cfg(feature = "libiio")]
pub fn run_board<P: BoardProfile>(common: &CommonArgs, mut profile: P) -> ExitCode {
    finish(open_and_stream(common, &mut profile))
}

#[cfg(feature = "libiio")]
fn open_and_stream<P: BoardProfile>(common: &CommonArgs, profile: &mut P) -> Result<(), StreamError> {
    let stop = Arc::new(StopSignal::new());
    install_stop_handler(Arc::clone(&stop))?;

    log::info!("* Acquiring IIO context");
    let backend = iio_stream_libiio::LibIioBackend::open(common.uri.as_deref())?;

    stream(
        backend,
        stop,
        profile,
        Arc::new(StdoutDelegate),
        common.summary.as_deref(),
    )?;
    Ok(())
}

/// Exit status for a configuration that failed to build.
pub fn config_failure(err: StreamError) -> ExitCode {
    finish(Err(err))
}
