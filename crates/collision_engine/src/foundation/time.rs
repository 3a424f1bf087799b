//! Time management utilities

use std::time::Instant;

/// Fixed-step accumulator that turns variable frame deltas into whole ticks
///
/// The collision subsystem is driven by one step per tick; hosts feed real
/// elapsed time in and drain however many fixed steps fit.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
    max_steps_per_frame: u32,
    tick_count: u64,
}

impl FixedTimestep {
    /// Create an accumulator producing ticks of `step` seconds
    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
            max_steps_per_frame: 8,
            tick_count: 0,
        }
    }

    /// Cap the number of ticks a single frame may produce
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps_per_frame = max_steps.max(1);
        self
    }

    /// Add elapsed time and return how many fixed ticks should run now
    ///
    /// Time beyond the per-frame cap is discarded so a long stall cannot
    /// trigger a spiral of catch-up ticks.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        self.accumulator += elapsed.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps_per_frame {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps_per_frame {
            self.accumulator = self.accumulator.min(self.step);
        }
        self.tick_count += u64::from(steps);
        steps
    }

    /// Fixed step length in seconds
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Interpolation factor between the last tick and the next
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }

    /// Total ticks produced so far
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

/// Wall-clock frame timer feeding a [`FixedTimestep`]
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }
}
