use std::time::Duration;

/// Why a single plugin step did not produce output.
///
/// These never escape the pipeline; they are rendered into
/// `ExecutionResult::error` and the step is treated as a no-op.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0:#}")]
    Failed(anyhow::Error),

    #[error("plugin '{plugin}' timed out after {}ms", .timeout.as_millis())]
    TimedOut { plugin: String, timeout: Duration },

    #[error("plugin '{plugin}' panicked: {message}")]
    Panicked { plugin: String, message: String },

    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
