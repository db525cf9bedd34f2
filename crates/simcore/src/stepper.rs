use crate::SimContext;

/// Fixed-timestep driver that accumulates frame time and
/// runs as many fixed ticks as fit into it.
#[derive(Debug, Clone)]
pub struct FixedStepper {
    pub fixed_dt: f64,
    pub accumulator: f64,
    t: f64,
    ticks: u64,
}

impl FixedStepper {
    pub fn new(fixed_dt: f64) -> Self {
        FixedStepper {
            fixed_dt,
            accumulator: 0.0,
            t: 0.0,
            ticks: 0,
        }
    }

    /// Advances by `dt` of frame time, calling `tick` once per fixed step.
    /// Returns the remaining time that didn't fit into a full step.
    pub fn step<F: FnMut(SimContext)>(&mut self, dt: f64, mut tick: F) -> f64 {
        if self.fixed_dt <= 0.0 {
            return self.accumulator;
        }
        self.accumulator += dt.max(0.0);

        while self.accumulator >= self.fixed_dt {
            tick(SimContext {
                dt: self.fixed_dt,
                t: self.t,
            });
            self.accumulator -= self.fixed_dt;
            self.t += self.fixed_dt;
            self.ticks += 1;
        }

        self.accumulator
    }

    /// Simulated time covered by completed ticks
    pub fn elapsed(&self) -> f64 {
        self.t
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.t = 0.0;
        self.ticks = 0;
    }
}
