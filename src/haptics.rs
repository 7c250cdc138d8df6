// src/haptics.rs
use crate::config::GestureConfig;
use std::time::Duration;
use tracing::debug;

/// Fire-and-forget vibration output.
pub trait Haptics {
    fn pulse(&mut self, duration: Duration);

    /// False when pulses go nowhere.
    fn is_audible(&self) -> bool {
        true
    }
}

/// For hosts without a vibration motor.
#[derive(Debug, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&mut self, _duration: Duration) {}

    fn is_audible(&self) -> bool {
        false
    }
}

/// Logs pulses; handy when rehearsing on a desktop.
#[derive(Debug, Default)]
pub struct TracingHaptics {
    pulses: u64,
}

impl Haptics for TracingHaptics {
    fn pulse(&mut self, duration: Duration) {
        self.pulses += 1;
        debug!(total = self.pulses, ms = duration.as_millis() as u64, "Haptic pulse");
    }
}

pub fn haptics_for(config: &GestureConfig) -> Box<dyn Haptics> {
    if config.log_haptics {
        Box::<TracingHaptics>::default()
    } else {
        Box::new(NoHaptics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_selects_output() {
        assert!(haptics_for(&GestureConfig::default()).is_audible());

        let quiet = GestureConfig {
            log_haptics: false,
            ..GestureConfig::default()
        };
        let mut haptics = haptics_for(&quiet);
        assert!(!haptics.is_audible());
        // pulses on a host without a motor are tolerated
        haptics.pulse(Duration::from_millis(100));
    }
}
