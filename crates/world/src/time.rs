//! World clock and day/night cycle.
//!
//! Time is measured in 60 Hz frames and advances by the frame `dt`, so it is a
//! float. The host's clock is authoritative: joiners overwrite theirs from
//! INIT_SYNC and TIME_SYNC.

use serde::{Deserialize, Serialize};

/// Frames per in-game day.
pub const DAY_LENGTH: f64 = 24_000.0;

/// Monotonic world time with a repeating day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldClock {
    /// Frames elapsed since world creation.
    pub time: f64,
    /// Frames per day.
    pub day_length: f64,
}

impl Default for WorldClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldClock {
    /// New worlds start mid-morning.
    pub fn new() -> Self {
        Self {
            time: DAY_LENGTH * 0.3,
            day_length: DAY_LENGTH,
        }
    }

    /// Clock set to an absolute time.
    pub fn at(time: f64) -> Self {
        Self {
            time,
            ..Self::new()
        }
    }

    /// Advance by `dt` frames.
    pub fn advance(&mut self, dt: f32) {
        self.time += f64::from(dt.max(0.0));
    }

    /// Overwrite with an authoritative value.
    pub fn sync(&mut self, time: f64) {
        if time.is_finite() && time >= 0.0 {
            self.time = time;
        }
    }

    /// Fraction of the day (0.0 = midnight, 0.5 = noon).
    pub fn time_of_day(&self) -> f64 {
        (self.time % self.day_length) / self.day_length
    }

    /// Sun elevation in radians, `-pi/2` at midnight and `pi/2` at noon.
    pub fn sun_elevation(&self) -> f64 {
        let angle = (self.time_of_day() - 0.25) * std::f64::consts::TAU;
        angle.sin() * std::f64::consts::FRAC_PI_2
    }

    /// True between sunset and sunrise.
    pub fn is_night(&self) -> bool {
        self.sun_elevation() < 0.0
    }

    /// Ambient brightness in `[0.2, 1.0]` for the render collaborator.
    pub fn daylight(&self) -> f32 {
        let normalized = (self.sun_elevation() + std::f64::consts::FRAC_PI_2) / std::f64::consts::PI;
        (0.2 + 0.8 * normalized.clamp(0.0, 1.0)) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_wraps() {
        let mut clock = WorldClock::at(0.0);
        assert_eq!(clock.time_of_day(), 0.0);
        clock.advance(12_000.0);
        assert!((clock.time_of_day() - 0.5).abs() < 1e-9);
        clock.advance(12_000.0);
        assert!(clock.time_of_day().abs() < 1e-9);
    }

    #[test]
    fn daylight_bounds() {
        assert!((WorldClock::at(0.0).daylight() - 0.2).abs() < 1e-6);
        assert!((WorldClock::at(12_000.0).daylight() - 1.0).abs() < 1e-6);
        assert!(WorldClock::at(0.0).is_night());
        assert!(!WorldClock::new().is_night());
    }

    #[test]
    fn sync_rejects_garbage() {
        let mut clock = WorldClock::new();
        clock.sync(f64::NAN);
        clock.sync(-5.0);
        assert_eq!(clock.time, DAY_LENGTH * 0.3);
        clock.sync(100.0);
        assert_eq!(clock.time, 100.0);
    }
}
