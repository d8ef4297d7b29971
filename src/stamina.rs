use std::time::Duration;

/// Bounded resource in `[0, max]`. Every mutation clamps.
#[derive(Clone, Debug)]
pub(crate) struct Stamina {
    value: f32,
    max: f32,
    regen_blocked_until: Option<Duration>,
}

impl Stamina {
    pub(crate) fn new(max: f32) -> Self {
        let max = if max.is_finite() { max.max(1.0) } else { 100.0 };
        Self {
            value: max,
            max,
            regen_blocked_until: None,
        }
    }

    pub(crate) fn value(&self) -> f32 {
        self.value
    }

    pub(crate) fn max(&self) -> f32 {
        self.max
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.value <= 0.0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.value >= self.max
    }

    pub(crate) fn set(&mut self, v: f32) {
        if v.is_finite() {
            self.value = v.clamp(0.0, self.max);
        }
    }

    pub(crate) fn add(&mut self, amount: f32) {
        self.set(self.value + amount);
    }

    pub(crate) fn drain(&mut self, amount: f32) {
        if amount > 0.0 {
            self.set(self.value - amount);
        }
    }

    pub(crate) fn block_regen_until(&mut self, until: Duration) {
        self.regen_blocked_until = Some(match self.regen_blocked_until {
            Some(prev) => prev.max(until),
            None => until,
        });
    }

    pub(crate) fn regen_blocked(&self, now: Duration) -> bool {
        self.regen_blocked_until.is_some_and(|t| now < t)
    }

    /// Passive recovery; a no-op inside a block window.
    pub(crate) fn regen(&mut self, rate_per_sec: f32, dt: f32, now: Duration) {
        if self.regen_blocked(now) {
            return;
        }
        self.regen_blocked_until = None;
        if rate_per_sec > 0.0 && dt > 0.0 {
            self.add(rate_per_sec * dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Feed(i32),
        Walk(f32),
        Regen(f32, f32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-500i32..500).prop_map(Op::Feed),
            (0.0f32..1e4).prop_map(Op::Walk),
            (0.0f32..50.0, 0.0f32..1.0).prop_map(|(r, dt)| Op::Regen(r, dt)),
        ]
    }

    proptest! {
        #[test]
        fn stays_in_bounds(ops in proptest::collection::vec(op(), 0..200)) {
            let mut s = Stamina::new(100.0);
            for (i, op) in ops.into_iter().enumerate() {
                match op {
                    Op::Feed(n) => s.add(n as f32),
                    Op::Walk(d) => s.drain(d * 0.25),
                    Op::Regen(r, dt) => s.regen(r, dt, Duration::from_millis(i as u64 * 16)),
                }
                prop_assert!(s.value() >= 0.0 && s.value() <= s.max());
            }
        }
    }

    #[test]
    fn ignores_non_finite_input() {
        let mut s = Stamina::new(100.0);
        s.add(f32::NAN);
        assert_eq!(s.value(), 100.0);
        s.drain(f32::INFINITY);
        assert_eq!(s.value(), 100.0);
        s.set(f32::NEG_INFINITY);
        assert_eq!(s.value(), 100.0);
    }

    #[test]
    fn block_window_suspends_regen() {
        let mut s = Stamina::new(100.0);
        s.set(10.0);
        s.block_regen_until(Duration::from_secs(3));
        s.regen(10.0, 1.0, Duration::from_secs(1));
        assert_eq!(s.value(), 10.0);
        s.regen(10.0, 1.0, Duration::from_secs(3));
        assert_eq!(s.value(), 20.0);
    }
}
