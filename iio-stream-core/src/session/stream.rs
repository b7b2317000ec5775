use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::models::error::StreamError;
use crate::models::state::StreamState;
use crate::models::summary::StreamSummary;
use crate::session::io::StreamIo;
use crate::session::stop_signal::StopSignal;
use crate::traits::board_profile::BoardProfile;
use crate::traits::stream_backend::StreamBackend;
use crate::traits::stream_delegate::StreamDelegate;

/// State shared with observers, plus the delegate to notify.
struct Reporter {
    state: Arc<Mutex<StreamState>>,
    delegate: Option<Arc<dyn StreamDelegate>>,
}

impl Reporter {
    fn set_state(&self, new_state: StreamState) {
        log::debug!("stream state: {}", new_state.name());
        *self.state.lock() = new_state.clone();
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    /// Updates the buffer count without a delegate notification.
    fn count_buffer(&self, buffers: u64) {
        *self.state.lock() = StreamState::Running { buffers };
    }
}

/// Runs one board profile against one context, from configuration to
/// teardown.
///
/// Data flow:
/// ```text
/// [configure] → loop { [refill] → [read_raw] → [unpack] → delegate } → [finish] → [release]
///                  ↑ stop flag checked once per iteration
/// ```
pub struct StreamSession<B: StreamBackend> {
    backend: B,
    reporter: Reporter,
    stop: Arc<StopSignal>,
}

impl<B: StreamBackend> StreamSession<B> {
    pub fn new(backend: B) -> Self {
        Self::with_stop_signal(backend, Arc::new(StopSignal::new()))
    }

    /// Uses an existing stop flag, e.g. one a signal handler was installed
    /// with before the context was opened.
    pub fn with_stop_signal(backend: B, stop: Arc<StopSignal>) -> Self {
        Self {
            backend,
            reporter: Reporter {
                state: Arc::new(Mutex::new(StreamState::Idle)),
                delegate: None,
            },
            stop,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn StreamDelegate>) {
        self.reporter.delegate = Some(delegate);
    }

    /// The stop flag to hand to a signal handler.
    pub fn stop_signal(&self) -> Arc<StopSignal> {
        Arc::clone(&self.stop)
    }

    pub fn state(&self) -> StreamState {
        self.reporter.state.lock().clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Configure, stream until stopped, then tear down.
    ///
    /// Fail-fast: the first error ends the loop, `finish` and teardown still
    /// run, and the error is returned. Transitions: idle → configuring →
    /// running → stopping → completed/failed.
    pub fn run<P: BoardProfile>(&mut self, profile: &mut P) -> Result<StreamSummary, StreamError> {
        if !self.reporter.state.lock().is_idle() {
            return Err(StreamError::ConfigurationFailed(
                "a session can only run once".into(),
            ));
        }

        let reporter = &self.reporter;
        let stop = &self.stop;
        let mut io = StreamIo::new(&mut self.backend);

        let outcome = Self::stream(&mut io, profile, reporter, stop);

        if let Err(ref e) = outcome {
            log::error!("{}", e);
            if let Some(ref delegate) = reporter.delegate {
                delegate.on_error(e);
            }
        }

        reporter.set_state(StreamState::Stopping);
        if let Err(e) = profile.finish(&mut io) {
            log::warn!("could not restore {} settings: {}", profile.part_name(), e);
        }
        io.release();

        match outcome {
            Ok(summary) => {
                reporter.set_state(StreamState::Completed(Box::new(summary.clone())));
                if let Some(ref delegate) = reporter.delegate {
                    delegate.on_stream_finished(&summary);
                }
                Ok(summary)
            }
            Err(e) => {
                reporter.set_state(StreamState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    fn stream<P: BoardProfile>(
        io: &mut StreamIo<'_, B>,
        profile: &mut P,
        reporter: &Reporter,
        stop: &StopSignal,
    ) -> Result<StreamSummary, StreamError> {
        if io.backend().device_count() == 0 {
            return Err(StreamError::NoDevices);
        }

        reporter.set_state(StreamState::Configuring);
        log::info!("* Configuring {} for streaming", profile.part_name());
        profile.configure(io)?;

        let mut summary = StreamSummary::begin(profile.part_name(), profile.device_name());
        let started = Instant::now();
        reporter.set_state(StreamState::Running { buffers: 0 });

        if let Some(delay) = profile.warmup_delay() {
            stop.wait_timeout(delay);
        }

        log::info!("* Starting IO streaming (press CTRL+C to cancel)");
        while !stop.is_stop_requested() {
            let block = profile.capture(io)?;

            summary.buffers_captured += 1;
            summary.samples_captured += block.len() as u64;
            reporter.count_buffer(summary.buffers_captured);
            if let Some(ref delegate) = reporter.delegate {
                delegate.on_block(&block);
            }

            if let Some(interval) = profile.refill_interval() {
                stop.wait_timeout(interval);
            }
        }

        summary.duration_secs = started.elapsed().as_secs_f64();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BackendEvent, MockBackend, RecordingDelegate};
    use crate::models::capture_block::{BlockData, CaptureBlock};
    use crate::models::data_format::{DataFormat, Direction};
    use crate::traits::stream_backend::{BufferHandle, ChannelHandle};

    /// Minimal profile: one channel on one device, samples passed through.
    struct EchoProfile {
        chn: Option<ChannelHandle>,
        buf: Option<BufferHandle>,
        finished: bool,
    }

    impl EchoProfile {
        fn new() -> Self {
            Self { chn: None, buf: None, finished: false }
        }
    }

    impl BoardProfile for EchoProfile {
        fn part_name(&self) -> &str {
            "ECHO"
        }

        fn device_name(&self) -> &str {
            "echo-adc"
        }

        fn configure<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
            let dev = io.device("echo-adc")?;
            let chn = io.channel(dev, "voltage0", Direction::Input)?;
            io.enable(chn);
            self.buf = Some(io.create_buffer(dev, 4, false)?);
            self.chn = Some(chn);
            Ok(())
        }

        fn capture<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<CaptureBlock, StreamError> {
            let (chn, buf) = match (self.chn, self.buf) {
                (Some(c), Some(b)) => (c, b),
                _ => return Err(StreamError::ConfigurationFailed("not configured".into())),
            };
            io.backend_mut().refill(buf)?;
            let (format, raw) = io.read_samples(chn, buf, 4)?;
            Ok(CaptureBlock {
                channel_id: io.backend().channel_id(chn),
                format: Some(format),
                common_mode_voltage: None,
                data: BlockData::Inline {
                    values: raw.iter().map(|&b| i32::from(b)).collect(),
                },
            })
        }

        fn finish<B: StreamBackend>(&mut self, _io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
            self.finished = true;
            Ok(())
        }
    }

    fn echo_backend(stop: Arc<StopSignal>, refills: usize) -> MockBackend {
        MockBackend::new()
            .with_device("echo-adc")
            .with_channel("echo-adc", "voltage0", Direction::Input, DataFormat::signed(8))
            .with_channel_data("echo-adc", "voltage0", vec![1, 2, 3, 4])
            .stop_after_refills(refills, stop)
    }

    fn session_with(build: impl FnOnce(Arc<StopSignal>) -> MockBackend) -> StreamSession<MockBackend> {
        let stop = Arc::new(StopSignal::new());
        let backend = build(Arc::clone(&stop));
        StreamSession::with_stop_signal(backend, stop)
    }

    #[test]
    fn clean_stop_completes_with_summary() {
        let mut session = session_with(|stop| echo_backend(stop, 3));
        let delegate = RecordingDelegate::new();
        session.set_delegate(delegate.clone());
        let mut profile = EchoProfile::new();

        let summary = session.run(&mut profile).unwrap();

        assert_eq!(summary.buffers_captured, 3);
        assert_eq!(summary.samples_captured, 12);
        assert_eq!(summary.part, "ECHO");
        assert!(profile.finished);
        assert!(matches!(session.state(), StreamState::Completed(_)));
        assert_eq!(delegate.blocks.lock().len(), 3);
        assert_eq!(
            *delegate.states.lock(),
            vec!["configuring", "running", "stopping", "completed"]
        );
        assert!(delegate.finished.lock().is_some());
        assert!(delegate.errors.lock().is_empty());
    }

    #[test]
    fn teardown_order_on_clean_stop() {
        let mut session = session_with(|stop| echo_backend(stop, 1));
        session.run(&mut EchoProfile::new()).unwrap();

        let backend = session.backend();
        let events = backend.events();
        assert_eq!(
            &events[events.len() - 3..],
            &[
                BackendEvent::DestroyBuffer(0),
                BackendEvent::Disable("echo-adc/voltage0".into()),
                BackendEvent::Close,
            ]
        );
    }

    #[test]
    fn refill_failure_is_fail_fast() {
        let mut session = session_with(|stop| echo_backend(stop, 10).fail_refill(2, -110));
        let delegate = RecordingDelegate::new();
        session.set_delegate(delegate.clone());
        let mut profile = EchoProfile::new();

        let err = session.run(&mut profile).unwrap_err();

        assert_eq!(err, StreamError::Refill(-110));
        assert_eq!(session.state(), StreamState::Failed(StreamError::Refill(-110)));
        assert_eq!(session.backend().refills(), 2, "no retries");
        assert!(profile.finished, "finish runs on failure");
        assert!(session.backend().is_closed());
        assert_eq!(delegate.blocks.lock().len(), 1);
        assert_eq!(*delegate.errors.lock(), vec![StreamError::Refill(-110)]);
        assert!(delegate.finished.lock().is_none());
    }

    #[test]
    fn teardown_order_on_refill_failure() {
        let mut session = session_with(|stop| echo_backend(stop, 10).fail_refill(2, -110));
        session.run(&mut EchoProfile::new()).unwrap_err();

        let backend = session.backend();
        let events = backend.events();
        assert_eq!(
            &events[events.len() - 3..],
            &[
                BackendEvent::DestroyBuffer(0),
                BackendEvent::Disable("echo-adc/voltage0".into()),
                BackendEvent::Close,
            ]
        );
        assert!(backend.teardown_in_order());
    }

    #[test]
    fn teardown_order_when_configure_fails_after_enable() {
        // Zero samples: the buffer is refused after the channel is enabled.
        struct NoSamples;

        impl BoardProfile for NoSamples {
            fn part_name(&self) -> &str {
                "ECHO"
            }

            fn device_name(&self) -> &str {
                "echo-adc"
            }

            fn configure<B: StreamBackend>(&mut self, io: &mut StreamIo<'_, B>) -> Result<(), StreamError> {
                let dev = io.device("echo-adc")?;
                let chn = io.channel(dev, "voltage0", Direction::Input)?;
                io.enable(chn);
                io.create_buffer(dev, 4, false)?;
                io.create_buffer(dev, 0, false)?;
                Ok(())
            }

            fn capture<B: StreamBackend>(&mut self, _io: &mut StreamIo<'_, B>) -> Result<CaptureBlock, StreamError> {
                Err(StreamError::ConfigurationFailed("not configured".into()))
            }
        }

        let mut session = session_with(|stop| echo_backend(stop, 1));
        let err = session.run(&mut NoSamples).unwrap_err();

        assert_eq!(err, StreamError::BufferCreate(-22));
        let backend = session.backend();
        assert_eq!(backend.refills(), 0);
        let events = backend.events();
        assert_eq!(
            &events[events.len() - 3..],
            &[
                BackendEvent::DestroyBuffer(0),
                BackendEvent::Disable("echo-adc/voltage0".into()),
                BackendEvent::Close,
            ]
        );
        assert!(backend.teardown_in_order());
    }

    #[test]
    fn missing_device_still_closes_context() {
        let mut session = session_with(|_| MockBackend::new().with_device("other"));

        let err = session.run(&mut EchoProfile::new()).unwrap_err();

        assert_eq!(err, StreamError::DeviceNotFound("echo-adc".into()));
        assert!(err.is_lookup());
        assert_eq!(session.backend().events(), &[BackendEvent::Close]);
    }

    #[test]
    fn empty_context_fails_with_no_devices() {
        let mut session = session_with(|_| MockBackend::new());

        let err = session.run(&mut EchoProfile::new()).unwrap_err();

        assert_eq!(err, StreamError::NoDevices);
        assert!(session.backend().is_closed());
    }

    #[test]
    fn missing_channel_names_device() {
        let mut session = session_with(|_| MockBackend::new().with_device("echo-adc"));

        let err = session.run(&mut EchoProfile::new()).unwrap_err();

        assert_eq!(
            err,
            StreamError::ChannelNotFound {
                device: "echo-adc".into(),
                channel: "voltage0".into(),
            }
        );
    }

    #[test]
    fn zero_sample_size_is_a_configuration_error() {
        let mut session = session_with(|stop| {
            MockBackend::new()
                .with_device("echo-adc")
                .with_channel("echo-adc", "voltage0", Direction::Input, DataFormat::signed(4))
                .stop_after_refills(5, stop)
        });

        let err = session.run(&mut EchoProfile::new()).unwrap_err();
        assert!(matches!(err, StreamError::ConfigurationFailed(_)));
        assert!(session.backend().is_closed());
    }

    #[test]
    fn stop_before_start_captures_nothing() {
        let mut session = session_with(|stop| echo_backend(stop, 100));
        session.stop_signal().request_stop();

        let summary = session.run(&mut EchoProfile::new()).unwrap();

        assert_eq!(summary.buffers_captured, 0);
        assert_eq!(session.backend().refills(), 0);
        assert!(session.backend().is_closed());
    }

    #[test]
    fn session_runs_once() {
        let mut session = session_with(|stop| echo_backend(stop, 1));
        session.run(&mut EchoProfile::new()).unwrap();

        let err = session.run(&mut EchoProfile::new()).unwrap_err();
        assert!(matches!(err, StreamError::ConfigurationFailed(_)));
    }
}
