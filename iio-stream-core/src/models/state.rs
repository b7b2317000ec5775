use super::error::StreamError;
use super::summary::StreamSummary;

/// Stream session state machine.
///
/// State transitions:
/// ```text
/// idle → configuring → running ─→ stopping → completed / failed
///             │                      ↑
///             └──────── (error) ─────┘
/// ```
///
/// `Stopping` is entered when the stop flag is seen at an iteration
/// boundary or when any step fails.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamState {
    Idle,
    Configuring,
    Running { buffers: u64 },
    Stopping,
    Completed(Box<StreamSummary>),
    Failed(StreamError),
}

impl StreamState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Short lowercase name, used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Running { .. } => "running",
            Self::Stopping => "stopping",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }
}
