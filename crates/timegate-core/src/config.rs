//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Timing knobs for the gate runtime evaluator.
///
/// These are explicit fields rather than process-wide constants so the
/// scheduler stays testable in isolation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Config {
    /// How far ahead of a gate opening its resources are prefetched, in
    /// seconds of playback time.
    pub prefetch_time: f64,

    /// How long a gate must stay continuously closed before its resources
    /// are released, in seconds of playback time.
    pub max_idle_time: f64,
}

impl Default for Config {
    fn default() -> Self {
        let prefetch_time = 1.0;
        Self {
            prefetch_time,
            max_idle_time: prefetch_time + 3.0,
        }
    }
}

impl Config {
    /// Reject non-finite or negative windows, and an idle window shorter
    /// than the prefetch window (resources would be released while still
    /// being prefetched ahead of the next activation).
    pub fn validate(&self) -> Result<(), BuildError> {
        if !self.prefetch_time.is_finite() || self.prefetch_time < 0.0 {
            return Err(BuildError::InvalidConfiguration(format!(
                "prefetch_time must be finite and non-negative, got {}",
                self.prefetch_time
            )));
        }
        if !self.max_idle_time.is_finite() || self.max_idle_time < 0.0 {
            return Err(BuildError::InvalidConfiguration(format!(
                "max_idle_time must be finite and non-negative, got {}",
                self.max_idle_time
            )));
        }
        if self.max_idle_time < self.prefetch_time {
            return Err(BuildError::InvalidConfiguration(format!(
                "max_idle_time ({}) must not be shorter than prefetch_time ({})",
                self.max_idle_time, self.prefetch_time
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_windows() {
        let cfg = Config::default();
        assert_eq!(cfg.prefetch_time, 1.0);
        assert_eq!(cfg.max_idle_time, 4.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_windows() {
        assert!(Config {
            prefetch_time: -1.0,
            max_idle_time: 4.0
        }
        .validate()
        .is_err());
        assert!(Config {
            prefetch_time: f64::NAN,
            max_idle_time: 4.0
        }
        .validate()
        .is_err());
        assert!(Config {
            prefetch_time: 2.0,
            max_idle_time: 1.0
        }
        .validate()
        .is_err());
    }
}
