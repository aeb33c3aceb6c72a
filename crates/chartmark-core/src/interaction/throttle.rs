//! Pointer-move throttling.

/// Drops pointer moves that arrive faster than `interval_ms`, unless the
/// caller says the move belongs to a press or drag.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveThrottle {
    interval_ms: f64,
    last_ms: Option<f64>,
}

impl MoveThrottle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(0.0),
            last_ms: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Whether to handle a move at `time_ms`.
    ///
    /// `pressed` is true while a button is held or a drag is armed or
    /// running; those moves are never dropped.
    pub fn should_process(&mut self, time_ms: f64, pressed: bool) -> bool {
        let due = match self.last_ms {
            Some(last) => time_ms - last >= self.interval_ms || time_ms < last,
            None => true,
        };
        if pressed || due {
            self.last_ms = Some(time_ms);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_fast_moves() {
        let mut throttle = MoveThrottle::new(16.0);
        assert!(throttle.should_process(0.0, false));
        assert!(!throttle.should_process(10.0, false));
        assert!(throttle.should_process(16.0, false));
        assert!(!throttle.should_process(31.0, false));
    }

    #[test]
    fn test_pressed_moves_always_pass() {
        let mut throttle = MoveThrottle::new(16.0);
        assert!(throttle.should_process(0.0, false));
        for t in 1..10 {
            assert!(throttle.should_process(t as f64, true));
        }
        // the window restarts from the last pressed move
        assert!(!throttle.should_process(12.0, false));
    }

    #[test]
    fn test_clock_going_backwards() {
        let mut throttle = MoveThrottle::new(16.0);
        assert!(throttle.should_process(1000.0, false));
        assert!(throttle.should_process(5.0, false));
    }
}
