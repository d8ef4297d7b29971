use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Mood {
    Normal,
    Happy,
    Laugh,
    Love,
    Smirk,
    Kiss,
    Fear,
    Sad,
    Angry,
}

impl Mood {
    pub(crate) fn face(self) -> &'static str {
        match self {
            Mood::Normal => "😺",
            Mood::Happy => "😸",
            Mood::Laugh => "😹",
            Mood::Love => "😻",
            Mood::Smirk => "😼",
            Mood::Kiss => "😽",
            Mood::Fear => "🙀",
            Mood::Sad => "😿",
            Mood::Angry => "😾",
        }
    }

    /// Default tail decoration. `None` falls back to the agent's tail override.
    pub(crate) fn tail_rule(self) -> Option<TailRule> {
        let rule = match self {
            Mood::Normal | Mood::Happy | Mood::Kiss | Mood::Sad => TailRule::Fixed('~'),
            Mood::Love => TailRule::Fixed('@'),
            Mood::Smirk | Mood::Angry => TailRule::Fixed('/'),
            Mood::Laugh => TailRule::Wag {
                even: '/',
                odd: '\\',
                rest: '~',
            },
            Mood::Fear => TailRule::Wag {
                even: '\\',
                odd: '/',
                rest: '\\',
            },
        };
        Some(rule)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TailRule {
    Fixed(char),
    /// Alternates on the wag tick while walking, `rest` otherwise.
    Wag { even: char, odd: char, rest: char },
}

impl TailRule {
    pub(crate) fn glyph(self, tick: u64, walking: bool) -> char {
        match self {
            TailRule::Fixed(c) => c,
            TailRule::Wag { even, odd, rest } => {
                if !walking {
                    rest
                } else if tick % 2 == 0 {
                    even
                } else {
                    odd
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Facing {
    Left,
    Right,
}

/// Face plus tail, the tail trailing behind the direction of travel.
pub(crate) fn compose(face: &str, tail: char, facing: Facing, suffix: Option<&str>) -> String {
    let mut s = String::with_capacity(16);
    match facing {
        Facing::Right => {
            s.push(tail);
            s.push_str(face);
        }
        Facing::Left => {
            s.push_str(face);
            s.push(tail);
        }
    }
    if let Some(extra) = suffix {
        s.push_str(extra);
    }
    s
}

/// Current mood with a timestamped expiry back to the base mood.
#[derive(Clone, Debug)]
pub(crate) struct MoodState {
    base: Mood,
    current: Mood,
    until: Option<Duration>,
    then: Option<(Mood, Duration)>,
}

impl MoodState {
    pub(crate) fn new(base: Mood) -> Self {
        Self {
            base,
            current: base,
            until: None,
            then: None,
        }
    }

    pub(crate) fn base(&self) -> Mood {
        self.base
    }

    /// A zero duration holds the mood until the next `set`.
    pub(crate) fn set(&mut self, mood: Mood, duration: Duration, as_base: bool, now: Duration) {
        if as_base {
            self.base = mood;
        }
        self.current = mood;
        self.until = (!duration.is_zero()).then(|| now + duration);
        self.then = None;
    }

    /// Temporary mood followed by a second temporary mood, then the base.
    pub(crate) fn set_sequence(
        &mut self,
        first: (Mood, Duration),
        second: (Mood, Duration),
        now: Duration,
    ) {
        self.set(first.0, first.1, false, now);
        if self.until.is_some() && !second.1.is_zero() {
            self.then = Some(second);
        }
    }

    pub(crate) fn restore(&mut self) {
        self.current = self.base;
        self.until = None;
        self.then = None;
    }

    pub(crate) fn current(&mut self, now: Duration) -> Mood {
        while let Some(until) = self.until {
            if now < until {
                break;
            }
            match self.then.take() {
                Some((next, dur)) => {
                    self.current = next;
                    self.until = Some(until + dur);
                }
                None => {
                    self.current = self.base;
                    self.until = None;
                }
            }
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn temporary_mood_reverts_to_base() {
        let mut m = MoodState::new(Mood::Normal);
        m.set(Mood::Love, ms(800), false, ms(1_000));
        assert_eq!(m.current(ms(1_500)), Mood::Love);
        assert_eq!(m.current(ms(1_800)), Mood::Normal);
        assert_eq!(m.current(ms(9_000)), Mood::Normal);
    }

    #[test]
    fn every_timed_mood_expires_to_base() {
        let moods = [
            Mood::Normal,
            Mood::Happy,
            Mood::Laugh,
            Mood::Love,
            Mood::Smirk,
            Mood::Kiss,
            Mood::Fear,
            Mood::Sad,
            Mood::Angry,
        ];
        for (i, &mood) in moods.iter().enumerate() {
            let mut m = MoodState::new(Mood::Sad);
            let dur = ms(50 + 37 * i as u64);
            m.set(mood, dur, false, ms(200));
            assert_eq!(m.current(ms(200) + dur), Mood::Sad, "{mood:?}");
        }
    }

    #[test]
    fn base_mood_change_sticks() {
        let mut m = MoodState::new(Mood::Normal);
        m.set(Mood::Smirk, Duration::ZERO, true, ms(0));
        m.set(Mood::Fear, ms(100), false, ms(10));
        assert_eq!(m.current(ms(500)), Mood::Smirk);
        assert_eq!(m.base(), Mood::Smirk);
    }

    #[test]
    fn sequence_plays_both_steps() {
        let mut m = MoodState::new(Mood::Normal);
        m.set_sequence((Mood::Happy, ms(1_000)), (Mood::Laugh, ms(900)), ms(0));
        assert_eq!(m.current(ms(999)), Mood::Happy);
        assert_eq!(m.current(ms(1_000)), Mood::Laugh);
        assert_eq!(m.current(ms(1_899)), Mood::Laugh);
        assert_eq!(m.current(ms(1_900)), Mood::Normal);
    }

    #[test]
    fn late_read_skips_whole_sequence() {
        let mut m = MoodState::new(Mood::Normal);
        m.set_sequence((Mood::Happy, ms(100)), (Mood::Laugh, ms(100)), ms(0));
        assert_eq!(m.current(ms(5_000)), Mood::Normal);
    }

    #[test]
    fn newer_set_supersedes_pending_expiry() {
        let mut m = MoodState::new(Mood::Normal);
        m.set(Mood::Love, ms(100), false, ms(0));
        m.set(Mood::Angry, ms(1_000), false, ms(50));
        assert_eq!(m.current(ms(200)), Mood::Angry);
    }

    #[test]
    fn wag_alternates_only_while_walking() {
        let rule = Mood::Laugh.tail_rule().unwrap();
        assert_eq!(rule.glyph(0, true), '/');
        assert_eq!(rule.glyph(1, true), '\\');
        assert_eq!(rule.glyph(1, false), '~');
        assert_eq!(Mood::Fear.tail_rule().unwrap().glyph(3, false), '\\');
    }

    #[test]
    fn tail_follows_facing() {
        assert_eq!(compose("😺", '~', Facing::Right, None), "~😺");
        assert_eq!(compose("😺", '~', Facing::Left, Some("💤")), "😺~💤");
    }
}
