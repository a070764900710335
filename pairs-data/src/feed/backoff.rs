use crate::error::DataError;
use rand::Rng;
use std::time::Duration;

/// Lower bound on any reconnect delay, guarding against tight reconnect loops.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(250);

/// Exponential reconnect policy with a floor, a cap and proportional jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first reconnect attempt. Must be at least [`MIN_RECONNECT_DELAY`].
    pub initial: Duration,
    /// Upper bound on any delay.
    pub max: Duration,
    /// Growth factor applied per consecutive failed attempt.
    pub multiplier: f64,
    /// Maximum extra delay as a fraction of the base delay, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    pub fn with_initial(mut self, initial: Duration) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.initial < MIN_RECONNECT_DELAY {
            return Err(DataError::InvalidBackoff(format!(
                "initial delay {:?} below minimum {:?}",
                self.initial, MIN_RECONNECT_DELAY
            )));
        }
        if self.max < self.initial {
            return Err(DataError::InvalidBackoff(format!(
                "max delay {:?} below initial delay {:?}",
                self.max, self.initial
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(DataError::InvalidBackoff(format!(
                "multiplier {} must be finite and >= 1",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(DataError::InvalidBackoff(format!(
                "jitter {} must be within [0, 1]",
                self.jitter
            )));
        }
        Ok(())
    }
}

/// Per-connection reconnect state driven by a [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Delay to wait before the next reconnect attempt, advancing the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay();
        self.attempt = self.attempt.saturating_add(1);

        let jitter = if self.policy.jitter > 0.0 {
            rand::rng().random_range(0.0..=self.policy.jitter.min(1.0))
        } else {
            0.0
        };

        base.mul_f64(1.0 + jitter)
            .min(self.policy.max)
            .max(self.floor())
    }

    /// Forget previous failures after a connection succeeds.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    fn floor(&self) -> Duration {
        self.policy.initial.max(MIN_RECONNECT_DELAY)
    }

    fn base_delay(&self) -> Duration {
        let exponent = i32::try_from(self.attempt.min(32)).unwrap_or(32);
        let secs = self.policy.initial.as_secs_f64() * self.policy.multiplier.powi(exponent);

        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.policy.max)
            .min(self.policy.max)
    }
}
