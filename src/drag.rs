use crate::geom::Point;
use rand::Rng;
use std::time::Duration;

pub(crate) const DRAG_LINES: &[&str] = &["Put me down!", "Mrrrow?!", "Hsss...", "Not the scruff!"];
pub(crate) const ESCAPE_LINES: &[&str] = &["Nope!", "Bye~", "Freedom!"];

/// Per-check probability for a memoryless escape rate over `dt`.
pub(crate) fn escape_probability(rate_per_sec: f32, dt: Duration) -> f64 {
    let lambda = f64::from(rate_per_sec.max(0.0));
    1.0 - (-lambda * dt.as_secs_f64()).exp()
}

pub(crate) fn roll_escape<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    if !p.is_finite() || p <= 0.0 {
        return false;
    }
    rng.gen_bool(p.min(1.0))
}

/// A pointer press that landed on the agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Press {
    pub(crate) start: Point,
    /// Pointer position relative to the agent's top-left at press time.
    pub(crate) grab: Point,
    /// Set once movement crossed the drag threshold.
    pub(crate) dragging: bool,
    /// Asleep agents can be clicked but not dragged.
    pub(crate) draggable: bool,
}

impl Press {
    pub(crate) fn new(start: Point, agent_pos: Point, draggable: bool) -> Self {
        Self {
            start,
            grab: start - agent_pos,
            dragging: false,
            draggable,
        }
    }

    pub(crate) fn crosses(&self, pointer: Point, threshold: f32) -> bool {
        self.start.distance(pointer) > threshold
    }
}

/// Timestamps for the periodic work done during an active drag.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DragClock {
    last_check: Duration,
    every: Duration,
    next_chatter: Duration,
}

impl DragClock {
    pub(crate) fn start(now: Duration, every: Duration) -> Self {
        Self {
            last_check: now,
            every,
            next_chatter: now,
        }
    }

    /// Elapsed time covered by the check that is due now, if any.
    pub(crate) fn due_check(&mut self, now: Duration) -> Option<Duration> {
        let elapsed = now.saturating_sub(self.last_check);
        if elapsed < self.every {
            return None;
        }
        self.last_check = now;
        Some(elapsed)
    }

    pub(crate) fn due_chatter(&mut self, now: Duration, every: Duration) -> bool {
        if now < self.next_chatter {
            return false;
        }
        self.next_chatter = now + every;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn probability_matches_rate_conversion() {
        // the rate is configured as f32; compare against its widened value
        let lambda = f64::from(0.1f32);
        let p = escape_probability(0.1, Duration::from_millis(400));
        assert!((p - (1.0 - (-lambda * 0.4).exp())).abs() < 1e-9);
        assert!((p - 0.0392).abs() < 1e-4);
        assert_eq!(escape_probability(0.0, Duration::from_secs(5)), 0.0);
        assert_eq!(escape_probability(0.1, Duration::ZERO), 0.0);
    }

    #[test]
    fn uneven_frames_roll_on_elapsed_time() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let every = Duration::from_millis(400);
        let mut clock = DragClock::start(Duration::ZERO, every);
        let mut now = Duration::ZERO;
        let mut exposure = 0.0f64;
        let mut expected = 0.0f64;
        let mut escapes = 0u32;
        let mut n = 0u64;
        while exposure < 20_000.0 {
            n += 1;
            // frames of 16ms and 33ms interleaved, so checks cover 400..=432ms
            now += Duration::from_millis(if n % 3 == 0 { 33 } else { 16 });
            if let Some(elapsed) = clock.due_check(now) {
                let p = escape_probability(0.1, elapsed);
                exposure += elapsed.as_secs_f64();
                expected += p;
                if roll_escape(&mut rng, p) {
                    escapes += 1;
                }
            }
        }
        let got = f64::from(escapes);
        // about 2000 expected escapes; allow four standard deviations
        assert!((got - expected).abs() < 4.0 * expected.sqrt(), "{got} vs {expected}");
    }

    #[test]
    fn checks_wait_for_interval() {
        let mut clock = DragClock::start(Duration::from_millis(100), Duration::from_millis(400));
        assert_eq!(clock.due_check(Duration::from_millis(499)), None);
        assert_eq!(
            clock.due_check(Duration::from_millis(516)),
            Some(Duration::from_millis(416))
        );
        assert_eq!(clock.due_check(Duration::from_millis(600)), None);
    }

    #[test]
    fn threshold_is_exclusive() {
        let p = Press::new(Point::new(10.0, 5.0), Point::new(9.0, 5.0), true);
        assert_eq!(p.grab, Point::new(1.0, 0.0));
        assert!(!p.crosses(Point::new(10.5, 5.0), 0.5));
        assert!(p.crosses(Point::new(11.0, 5.0), 0.5));
    }
}
