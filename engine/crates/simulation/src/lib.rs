mod clock;
mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{FrameReport, SchedulerConfig, TickScheduler};
