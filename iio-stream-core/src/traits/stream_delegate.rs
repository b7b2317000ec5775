use crate::models::capture_block::CaptureBlock;
use crate::models::error::StreamError;
use crate::models::state::StreamState;
use crate::models::summary::StreamSummary;

/// Event delegate for stream session notifications.
///
/// All methods are called from the thread running the session loop.
pub trait StreamDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &StreamState);

    /// Called with the decoded samples of every refill.
    fn on_block(&self, block: &CaptureBlock);

    /// Called when a step fails, before teardown.
    fn on_error(&self, error: &StreamError);

    /// Called after a clean shutdown, once every resource is released.
    fn on_stream_finished(&self, summary: &StreamSummary);
}
