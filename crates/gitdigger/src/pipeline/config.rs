use std::time::Duration;

/// Tunables for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Pause after entering `processing`, letting clients observe the
    /// intermediate state. Zero disables it.
    pub simulated_delay: Duration,
}

impl PipelineConfig {
    pub fn with_delay(simulated_delay: Duration) -> Self {
        Self { simulated_delay }
    }
}
