use crate::TICK_RATE_MS;

/// Per-section countdown. Starting always rearms to the full budget; expiry
/// fires exactly once per arm, no matter how many ticks follow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    budget_secs: f64,
    seconds_remaining: f64,
    running: bool,
    fired: bool,
}

impl Countdown {
    pub fn new(budget_secs: f64) -> Self {
        Self {
            budget_secs,
            seconds_remaining: budget_secs,
            running: false,
            fired: false,
        }
    }

    /// Rearm to a full budget and start counting.
    pub fn start(&mut self, budget_secs: f64) {
        self.budget_secs = budget_secs;
        self.seconds_remaining = budget_secs;
        self.running = true;
        self.fired = false;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance by one tick. Returns true on the tick that reaches zero.
    pub fn on_tick(&mut self) -> bool {
        if !self.running || self.fired {
            return false;
        }

        self.seconds_remaining -= TICK_RATE_MS as f64 / 1000_f64;

        if self.seconds_remaining <= 0.0 {
            self.seconds_remaining = 0.0;
            self.running = false;
            self.fired = true;
            return true;
        }

        false
    }

    pub fn seconds_remaining(&self) -> f64 {
        self.seconds_remaining
    }

    pub fn budget_secs(&self) -> f64 {
        self.budget_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Threshold check for the warning styles. Never affects progression.
    pub fn within_final(&self, secs: f64) -> bool {
        self.running && self.seconds_remaining <= secs
    }
}
