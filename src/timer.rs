//! One-shot countdowns used for ability cooldowns and scripted delays.
//!
//! A `Countdown` is a pure value type: it never mutates anything but itself.
//! The owning entity polls `tick` once per frame and applies whatever effect
//! the expiry stands for (re-enabling a dash, ending invulnerability, ...).
//! State is plain data so a countdown can be snapshotted with serde and
//! resumed without changing when it fires.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    duration: f32,
    elapsed: f32,
    active: bool,
}

impl Countdown {
    pub fn from_millis(duration_ms: u64) -> Self {
        Self {
            duration: duration_ms as f32 / 1000.0,
            elapsed: 0.0,
            active: false,
        }
    }

    /// (Re)starts the countdown from zero. Restarting while already running is
    /// allowed and simply rewinds the clock.
    pub fn activate(&mut self) {
        self.elapsed = 0.0;
        self.active = true;
    }

    /// Stops the countdown without it ever reporting expiry.
    pub fn deactivate(&mut self) {
        self.elapsed = 0.0;
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advances the countdown by `dt` seconds. Returns `true` on exactly the
    /// tick that crosses the duration; the countdown deactivates itself at
    /// that point, so expiry is reported once per activation.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }

        self.elapsed += dt;
        if self.elapsed >= self.duration {
            self.deactivate();
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_exactly_once() {
        let mut timer = Countdown::from_millis(100);
        timer.activate();

        assert!(!timer.tick(0.05));
        assert!(timer.is_active());
        assert!(timer.tick(0.06));
        assert!(!timer.is_active());

        // Once expired, further ticks stay silent until reactivated.
        assert!(!timer.tick(1.0));

        timer.activate();
        assert!(timer.tick(0.2));
    }

    #[test]
    fn deactivate_suppresses_expiry() {
        let mut timer = Countdown::from_millis(100);
        timer.activate();
        timer.tick(0.09);
        timer.deactivate();

        assert!(!timer.tick(10.0));
    }

    #[test]
    fn restart_rewinds_the_clock() {
        let mut timer = Countdown::from_millis(100);
        timer.activate();
        timer.tick(0.09);
        timer.activate();

        assert!(!timer.tick(0.05));
        assert!(timer.tick(0.05));
    }

    #[test]
    fn serialized_state_resumes_on_the_same_tick() {
        let mut uninterrupted = Countdown::from_millis(500);
        uninterrupted.activate();

        let mut resumed = Countdown::from_millis(500);
        resumed.activate();

        let dt = 0.016;
        let mut fired_uninterrupted = None;
        let mut fired_resumed = None;

        for frame in 0..64 {
            if uninterrupted.tick(dt) {
                fired_uninterrupted = Some(frame);
            }

            // Round-trip the second timer through serde every frame.
            let snapshot = serde_json::to_string(&resumed).unwrap();
            resumed = serde_json::from_str(&snapshot).unwrap();
            if resumed.tick(dt) {
                fired_resumed = Some(frame);
            }
        }

        assert!(fired_uninterrupted.is_some());
        assert_eq!(fired_uninterrupted, fired_resumed);
    }
}
