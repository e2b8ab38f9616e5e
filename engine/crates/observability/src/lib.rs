use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Per-frame counters emitted by the world server's main loop.
#[derive(Debug, Clone)]
pub struct FrameMetrics {
    pub frame_number: u64,
    pub duration_us: u128,
    /// Wall-time allowance the scheduler was given, in microseconds.
    pub budget_us: u128,
    /// Characters stepped this frame.
    pub processed: usize,
    /// Characters deferred to the next frame.
    pub deferred: usize,
    pub character_count: usize,
    pub drop_count: usize,
    pub connection_count: usize,
}

impl FrameMetrics {
    pub fn log(&self) {
        if self.duration_us > self.budget_us {
            tracing::warn!(
                frame = self.frame_number,
                duration_us = self.duration_us,
                processed = self.processed,
                deferred = self.deferred,
                characters = self.character_count,
                drops = self.drop_count,
                connections = self.connection_count,
                "frame exceeded budget ({}us > {}us)",
                self.duration_us,
                self.budget_us
            );
        } else {
            tracing::debug!(
                frame = self.frame_number,
                duration_us = self.duration_us,
                processed = self.processed,
                deferred = self.deferred,
                characters = self.character_count,
                drops = self.drop_count,
                connections = self.connection_count,
                "frame completed"
            );
        }
    }
}
