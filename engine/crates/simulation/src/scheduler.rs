use std::collections::VecDeque;

use entities::{CharacterArena, CharacterId};

use crate::clock::Clock;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Characters stepped between budget checks.
    pub batch_size: usize,
    /// Wall-time allowance per frame. At least one batch always runs.
    pub frame_budget_ms: u64,
    /// Interval between trace reports of throughput extremes.
    pub report_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            frame_budget_ms: 5,
            report_interval_ms: 60_000,
        }
    }
}

/// Outcome of one scheduler frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Characters actually stepped this frame. Stale ids are skipped
    /// silently and do not count.
    pub processed: usize,
    /// Queue length left over for the next frame.
    pub remaining: usize,
    /// Whether the frame stopped on its time budget rather than an
    /// empty queue.
    pub budget_exhausted: bool,
    /// Whether the queue was refilled from a fresh arena snapshot at the
    /// start of this frame.
    pub refilled: bool,
}

/// Amortized character scheduler. Every live character is stepped exactly
/// once per pass; a pass may span several frames when the population
/// outgrows the frame budget. Characters spawned mid-pass wait for the
/// next snapshot, so no character is ever stepped twice in one pass.
pub struct TickScheduler {
    config: SchedulerConfig,
    queue: VecDeque<CharacterId>,
    /// Throughput extremes across budget-exhausted frames since the last
    /// report. Frames that drain the queue are not representative of
    /// saturation and are left out.
    min_processed: Option<usize>,
    max_processed: Option<usize>,
    last_report_at: u64,
}

impl TickScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            min_processed: None,
            max_processed: None,
            last_report_at: 0,
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Run one frame: refill the queue from the arena if the previous pass
    /// finished, then step batches until the queue drains or the frame
    /// budget elapses. `step` receives the elapsed seconds since that
    /// character was last stepped.
    pub fn run_frame(
        &mut self,
        arena: &mut CharacterArena,
        clock: &impl Clock,
        mut step: impl FnMut(&mut CharacterArena, CharacterId, f32),
    ) -> FrameReport {
        let frame_start = clock.now_ms();
        let refilled = self.queue.is_empty();
        if refilled {
            self.queue.extend(arena.live_ids());
        }

        let mut processed = 0usize;
        loop {
            for _ in 0..self.config.batch_size {
                let Some(id) = self.queue.pop_front() else {
                    break;
                };
                let now = clock.now_ms();
                let Some(character) = arena.get_mut(id) else {
                    continue;
                };
                let dt = if character.last_process_tick == 0 {
                    0.0
                } else {
                    now.saturating_sub(character.last_process_tick) as f32 / 1000.0
                };
                character.last_process_tick = now;
                step(&mut *arena, id, dt);
                processed += 1;
            }
            if self.queue.is_empty() {
                break;
            }
            if clock.now_ms().saturating_sub(frame_start) >= self.config.frame_budget_ms {
                break;
            }
        }

        let budget_exhausted = !self.queue.is_empty();
        if budget_exhausted {
            self.min_processed = Some(match self.min_processed {
                Some(min) => min.min(processed),
                None => processed,
            });
            self.max_processed = Some(match self.max_processed {
                Some(max) => max.max(processed),
                None => processed,
            });
        }
        self.maybe_report(clock.now_ms());

        FrameReport {
            processed,
            remaining: self.queue.len(),
            budget_exhausted,
            refilled,
        }
    }

    fn maybe_report(&mut self, now: u64) {
        if now.saturating_sub(self.last_report_at) < self.config.report_interval_ms {
            return;
        }
        self.last_report_at = now;
        if let (Some(min), Some(max)) = (self.min_processed, self.max_processed) {
            tracing::trace!(
                min_per_frame = min,
                max_per_frame = max,
                "scheduler throughput under load"
            );
        }
        self.min_processed = None;
        self.max_processed = None;
    }
}
