use crate::error::{Chip8Error, Result};
use std::time::Duration;

/// the COSMAC VIP interpreter managed roughly this; modern ROMs expect more
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: f64 = 1000.0;
pub const DEFAULT_FRAMES_PER_SECOND: f64 = 60.0;

/// delay and sound timers count down at this rate in wall-clock mode
pub const TIMER_HZ: f64 = 60.0;

/// longest autorepeat delay in common use, plus a margin
const KEY_HOLD_MS: u64 = 650;

/// How the delay and sound timers count down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    /// once per executed instruction; timing then depends on the instruction
    /// rate and mix, but matches what existing ROMs were tuned against
    #[default]
    PerInstruction,
    /// at a fixed 60Hz on a monotonic clock, independent of the instruction rate
    WallClock,
}

/// Knobs for the simulation and render loops
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub instructions_per_second: f64,
    pub frames_per_second: f64,
    pub timer_mode: TimerMode,
    /// how long a blocked FX0A sleeps between looks at the event queue
    pub key_wait_poll: Duration,
    /// terminals only report presses; a key with no repeat for this long is
    /// considered released. Must outlast the terminal's autorepeat delay
    /// (commonly 250-600ms), or a held key flickers up and down once before
    /// the repeats start
    pub key_hold: Duration,
    /// seed for CXNN; entropy if absent
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instructions_per_second: DEFAULT_INSTRUCTIONS_PER_SECOND,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            timer_mode: TimerMode::default(),
            key_wait_poll: Duration::from_millis(100),
            key_hold: Duration::from_millis(KEY_HOLD_MS),
            seed: None,
        }
    }
}

impl Config {
    /// both loops are paced off these rates, so they have to make sense
    pub fn validate(&self) -> Result<()> {
        check_rate("instructions per second", self.instructions_per_second)?;
        check_rate("frames per second", self.frames_per_second)?;
        Ok(())
    }
}

/// a loop rate: finite and above zero
pub fn check_rate(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Chip8Error::InvalidRate { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_rates() {
        let c = Config::default();
        assert_eq!(c.instructions_per_second, 1000.0);
        assert_eq!(c.frames_per_second, 60.0);
        assert_eq!(c.timer_mode, TimerMode::PerInstruction);
        assert_eq!(c.key_wait_poll, Duration::from_millis(100));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_hold_outlasts_autorepeat_delay() {
        assert!(Config::default().key_hold > Duration::from_millis(600));
    }

    #[test]
    fn test_rejects_unusable_rates() {
        for bad in [0.0, -60.0, f64::NAN, f64::INFINITY] {
            let c = Config {
                instructions_per_second: bad,
                ..Config::default()
            };
            assert!(matches!(
                c.validate(),
                Err(Chip8Error::InvalidRate {
                    name: "instructions per second",
                    ..
                })
            ));
            let c = Config {
                frames_per_second: bad,
                ..Config::default()
            };
            assert!(matches!(
                c.validate(),
                Err(Chip8Error::InvalidRate {
                    name: "frames per second",
                    ..
                })
            ));
        }
        assert_eq!(check_rate("rate", 0.5).ok(), Some(0.5));
    }
}
