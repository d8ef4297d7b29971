//! The roaming pet: one mutable record advanced once per frame.
//!
//! Everything that used to be a scheduled callback (mood reset, speech bubble,
//! meal, pause, escape checks) is a timestamp compared against `now` here, so
//! a stale deadline can never clobber newer state.

use crate::bus::{Bus, Notice, SubscriptionId, Topic};
use crate::config::PetConfig;
use crate::drag::{escape_probability, roll_escape, DragClock, Press, DRAG_LINES, ESCAPE_LINES};
use crate::geom::{Point, Rect, Size};
use crate::mood::{compose, Facing, Mood, MoodState};
use crate::page::{ElementId, Page, Sprite, Tag};
use crate::stamina::Stamina;
use crate::targeting::{choose_target, remeasure, BandTracker, Bounds, Target};
use rand::{rngs::StdRng, seq::SliceRandom, Rng};
use std::time::Duration;
use tracing::{debug, info, warn};

const WAG_STEPS_PER_SEC: f32 = 12.0;
const EATING_GLYPH: &str = "🐟";
const SLEEPING_GLYPH: &str = "💤";

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Activity {
    Idle,
    Walking,
    Eating,
    Asleep,
    Dragging,
}

#[derive(Clone, Debug)]
struct Speech {
    text: String,
    until: Duration,
}

#[derive(Clone, Copy, Debug)]
struct Pause {
    until: Duration,
    resume: Option<Target>,
}

pub(crate) struct PetAgent {
    cfg: PetConfig,
    anchor: ElementId,
    rng: StdRng,
    subscription: Option<SubscriptionId>,
    alive: bool,

    pos: Point,
    facing: Facing,
    velocity: Point,
    target: Option<Target>,
    chasing: bool,
    walking: bool,

    mood: MoodState,
    tail_override: char,
    wag_phase: f32,

    stamina: Stamina,
    asleep_since: Option<Duration>,
    eating_until: Option<Duration>,
    pause: Option<Pause>,
    dwell_until: Option<Duration>,
    idle: Duration,

    press: Option<Press>,
    drag_clock: Option<DragClock>,
    suppress_click: bool,

    speech: Option<Speech>,
    band: BandTracker,
    vp: Size,
    viewport_dirty: bool,
    last_tick: Option<Duration>,
}

impl PetAgent {
    /// Attach to the anchor element named `anchor`. `None` when it is missing.
    pub(crate) fn mount<P: Page + ?Sized>(
        page: &mut P,
        anchor: &str,
        cfg: PetConfig,
        rng: StdRng,
        bus: &mut Bus,
        now: Duration,
    ) -> Option<Self> {
        let Some(anchor_id) = page.find_anchor(anchor) else {
            warn!(anchor, "anchor element not found, pet not mounted");
            return None;
        };

        let mut band = BandTracker::default();
        band.force(page, now);
        let vp = page.viewport();
        let pos = Bounds::new(vp, band.height(), cfg.size, cfg.padding).clamp(cfg.start);

        let mut agent = Self {
            anchor: anchor_id,
            rng,
            subscription: Some(bus.subscribe(&[Topic::Feed])),
            alive: true,
            pos,
            facing: Facing::Right,
            velocity: Point::default(),
            target: None,
            chasing: false,
            walking: false,
            mood: MoodState::new(Mood::Normal),
            tail_override: cfg.tail_char,
            wag_phase: 0.0,
            stamina: Stamina::new(cfg.stamina_max),
            asleep_since: None,
            eating_until: None,
            pause: None,
            dwell_until: None,
            idle: Duration::ZERO,
            press: None,
            drag_clock: None,
            suppress_click: false,
            speech: None,
            band,
            vp,
            viewport_dirty: false,
            last_tick: None,
            cfg,
        };
        info!(x = pos.x, y = pos.y, "pet mounted");
        agent.render(page, now);
        Some(agent)
    }

    /* -----------------------------
       Queries
    ------------------------------ */

    pub(crate) fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn position(&self) -> Point {
        self.pos
    }

    pub(crate) fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn velocity(&self) -> Point {
        self.velocity
    }

    pub(crate) fn stamina(&self) -> &Stamina {
        &self.stamina
    }

    pub(crate) fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub(crate) fn band_height(&self) -> f32 {
        self.band.height()
    }

    pub(crate) fn mood(&mut self, now: Duration) -> Mood {
        self.mood.current(now)
    }

    pub(crate) fn base_mood(&self) -> Mood {
        self.mood.base()
    }

    pub(crate) fn speech(&self, now: Duration) -> Option<&str> {
        self.speech
            .as_ref()
            .filter(|s| now < s.until)
            .map(|s| s.text.as_str())
    }

    pub(crate) fn is_asleep(&self) -> bool {
        self.asleep_since.is_some()
    }

    pub(crate) fn is_eating(&self) -> bool {
        self.eating_until.is_some()
    }

    pub(crate) fn is_dragging(&self) -> bool {
        self.press.is_some_and(|p| p.dragging)
    }

    pub(crate) fn activity(&self) -> Activity {
        if self.is_dragging() {
            Activity::Dragging
        } else if self.is_asleep() {
            Activity::Asleep
        } else if self.is_eating() {
            Activity::Eating
        } else if self.walking {
            Activity::Walking
        } else {
            Activity::Idle
        }
    }

    fn bounds(&self) -> Bounds {
        Bounds::new(self.vp, self.band.height(), self.cfg.size, self.cfg.padding)
    }

    fn hitbox(&self) -> Rect {
        Rect::new(
            self.pos.x.floor(),
            self.pos.y.floor(),
            self.cfg.size.w,
            self.cfg.size.h,
        )
    }

    fn center(&self) -> Point {
        Point::new(
            self.pos.x + self.cfg.size.w / 2.0,
            self.pos.y + self.cfg.size.h / 2.0,
        )
    }

    /* -----------------------------
       External calls
    ------------------------------ */

    /// Always succeeds and always wakes the pet.
    pub(crate) fn feed(&mut self, amount: i32, now: Duration) -> bool {
        if self.is_asleep() {
            self.wake(now);
        }
        self.stamina.add(amount as f32);
        self.eating_until = Some(now + self.cfg.eat());
        self.mood.set(Mood::Happy, ms(800), false, now);
        self.target = None;
        self.chasing = false;
        self.walking = false;
        self.dwell_until = None;
        self.pause = None;
        info!(amount, stamina = self.stamina.value(), "fed");
        true
    }

    pub(crate) fn set_mood(&mut self, mood: Mood, duration: Duration, as_base: bool, now: Duration) {
        self.mood.set(mood, duration, as_base, now);
    }

    pub(crate) fn say(&mut self, text: impl Into<String>, duration: Duration, now: Duration) {
        self.speech = Some(Speech {
            text: text.into(),
            until: now + duration,
        });
    }

    pub(crate) fn set_tail(&mut self, tail: char) {
        self.tail_override = tail;
    }

    pub(crate) fn sleep(&mut self, now: Duration) {
        self.fall_asleep(now, false);
    }

    pub(crate) fn wake(&mut self, now: Duration) {
        if self.asleep_since.take().is_some() {
            self.idle = Duration::ZERO;
            info!(stamina = self.stamina.value(), at = ?now, "woke up");
        }
    }

    /// Hold still for `duration`, then carry on toward the current target.
    pub(crate) fn pause(&mut self, duration: Duration, now: Duration) {
        let resume = match self.pause.take() {
            Some(p) => p.resume,
            None => self.target.take(),
        };
        self.pause = Some(Pause {
            until: now + duration,
            resume,
        });
        self.walking = false;
    }

    /// Resize/scroll happened; handled on the next tick.
    pub(crate) fn mark_viewport_dirty(&mut self) {
        self.viewport_dirty = true;
    }

    /// Detach from the bus and stop the frame loop. Only the first call acts.
    pub(crate) fn destroy(&mut self, bus: &mut Bus) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        if let Some(id) = self.subscription.take() {
            bus.unsubscribe(id);
        }
        self.press = None;
        self.drag_clock = None;
        info!("pet destroyed");
        true
    }

    /* -----------------------------
       Pointer input
    ------------------------------ */

    /// Returns true when the press landed on the pet and is now captured.
    pub(crate) fn pointer_down(&mut self, p: Point, _now: Duration) -> bool {
        if !self.alive || !self.hitbox().contains(p) {
            return false;
        }
        self.press = Some(Press::new(p, self.pos, !self.is_asleep()));
        self.suppress_click = false;
        true
    }

    pub(crate) fn pointer_move(&mut self, p: Point, now: Duration) {
        if !self.alive {
            return;
        }
        if let Some(mut press) = self.press {
            if !press.dragging
                && press.draggable
                && !self.is_asleep()
                && press.crosses(p, self.cfg.drag_threshold)
            {
                press.dragging = true;
                self.begin_drag(now);
            }
            if press.dragging {
                self.pos = self.bounds().clamp(p - press.grab);
            }
            self.press = Some(press);
            return;
        }

        if self.is_asleep() || self.is_eating() || self.pause.is_some() {
            return;
        }
        if self.center().distance(p) < self.cfg.wake_distance {
            let size = self.cfg.size;
            let spot = Point::new(p.x - size.w / 2.0, p.y - size.h / 2.0);
            self.target = Some(Target::free(self.bounds().clamp(spot)));
            self.chasing = true;
            self.dwell_until = None;
        } else {
            self.chasing = false;
        }
    }

    /// Returns true when this release ends a captured press; the caller then
    /// delivers the click that follows it.
    pub(crate) fn pointer_up(&mut self, _p: Point, now: Duration) -> bool {
        let Some(press) = self.press.take() else {
            return false;
        };
        if press.dragging {
            self.drag_clock = None;
            self.mood.restore();
            self.suppress_click = true;
            self.idle = Duration::ZERO;
            debug!(at = ?now, "released after drag");
        }
        true
    }

    pub(crate) fn click(&mut self, now: Duration) {
        if !self.alive {
            return;
        }
        if self.suppress_click {
            self.suppress_click = false;
            return;
        }
        if self.is_asleep() {
            self.mood.set(Mood::Angry, ms(1_200), false, now);
            self.say("Hss... let me sleep", ms(1_000), now);
            self.stamina
                .block_regen_until(now + ms(self.cfg.disturb_block_ms));
            debug!("disturbed while asleep");
        } else {
            self.mood.set(Mood::Love, ms(800), false, now);
            self.say("Meow~", ms(900), now);
            self.pause(ms(800), now);
        }
    }

    fn begin_drag(&mut self, now: Duration) {
        self.target = None;
        self.chasing = false;
        self.walking = false;
        self.dwell_until = None;
        self.pause = None;
        self.mood.set(Mood::Fear, Duration::ZERO, false, now);
        self.drag_clock = Some(DragClock::start(now, self.cfg.escape_check()));
        info!("picked up");
    }

    /* -----------------------------
       Frame loop
    ------------------------------ */

    pub(crate) fn tick<P: Page + ?Sized>(&mut self, page: &mut P, bus: &mut Bus, now: Duration) {
        if !self.alive {
            return;
        }
        let dt = match self.last_tick {
            Some(prev) => now.saturating_sub(prev).min(self.cfg.max_frame()),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);

        if let Some(id) = self.subscription {
            for notice in bus.drain(id) {
                if let Notice::FeedPerformed { amount } = notice {
                    self.feed(amount, now);
                }
            }
        }

        self.sync_viewport(page, now);
        self.expire(now);

        if self.is_dragging() {
            self.drag_tick(page, now);
        } else if self.is_asleep() {
            self.sleep_tick(dt, now);
        } else if self.is_eating() {
            self.walking = false;
            self.stamina.regen(self.cfg.idle_regen, dt.as_secs_f32(), now);
        } else {
            self.roam_tick(page, dt, now);
        }

        self.pos = self.bounds().clamp(self.pos);
        self.render(page, now);
    }

    fn sync_viewport<P: Page + ?Sized>(&mut self, page: &P, now: Duration) {
        let refreshed = if self.viewport_dirty {
            self.viewport_dirty = false;
            self.band.force(page, now);
            true
        } else {
            self.band
                .refresh_if_due(page, now, self.cfg.band_refresh())
        };
        if !refreshed {
            return;
        }
        self.vp = page.viewport();
        let band = self.band.height();
        self.pos = self.bounds().clamp(self.pos);
        if let Some(t) = self.target.take() {
            self.target = remeasure(page, &t, band, &self.cfg);
            if self.target.is_none() {
                debug!("target became unreachable");
            }
        }
        if let Some(pause) = self.pause.as_mut() {
            if let Some(t) = pause.resume.take() {
                pause.resume = remeasure(page, &t, band, &self.cfg);
            }
        }
    }

    fn expire(&mut self, now: Duration) {
        if self.speech.as_ref().is_some_and(|s| now >= s.until) {
            self.speech = None;
        }
        if self.eating_until.is_some_and(|t| now >= t) {
            self.eating_until = None;
            debug!("finished eating");
        }
        if let Some(p) = self.pause {
            if now >= p.until {
                self.pause = None;
                if self.target.is_none() {
                    self.target = p.resume;
                }
            }
        }
        if self.dwell_until.is_some_and(|t| now >= t) {
            self.dwell_until = None;
        }
    }

    fn drag_tick<P: Page + ?Sized>(&mut self, page: &P, now: Duration) {
        let Some(mut clock) = self.drag_clock else {
            return;
        };
        if clock.due_chatter(now, ms(self.cfg.drag_chatter_ms)) {
            if let Some(line) = DRAG_LINES.choose(&mut self.rng) {
                self.say(*line, ms(900), now);
            }
        }
        let escaped = match clock.due_check(now) {
            Some(elapsed) => {
                let p = escape_probability(self.cfg.escape_rate_per_sec, elapsed);
                roll_escape(&mut self.rng, p)
            }
            None => false,
        };
        self.drag_clock = Some(clock);
        if escaped {
            self.escape(page, now);
        }
    }

    /// Wriggle free mid-drag: capture is dropped and a new target picked.
    fn escape<P: Page + ?Sized>(&mut self, page: &P, now: Duration) {
        self.press = None;
        self.drag_clock = None;
        self.suppress_click = false;
        self.mood.restore();
        if let Some(line) = ESCAPE_LINES.choose(&mut self.rng) {
            self.say(*line, ms(900), now);
        }
        let target = choose_target(
            &mut self.rng,
            &page.elements(),
            self.vp,
            self.band.height(),
            &self.cfg,
        );
        self.target = Some(target);
        info!(x = target.point.x, y = target.point.y, "escaped a drag");
    }

    fn sleep_tick(&mut self, dt: Duration, now: Duration) {
        self.walking = false;
        self.stamina.regen(self.cfg.sleep_regen, dt.as_secs_f32(), now);
        let napped = self
            .asleep_since
            .map(|t| now.saturating_sub(t))
            .unwrap_or_default();
        if self.stamina.is_full() && napped >= ms(self.cfg.min_nap_ms) {
            self.wake(now);
        }
    }

    fn roam_tick<P: Page + ?Sized>(&mut self, page: &P, dt: Duration, now: Duration) {
        // elements can vanish between band refreshes
        if let Some(id) = self.target.and_then(|t| t.element).map(|e| e.id) {
            if page.measure(id).is_none() {
                debug!(?id, "target element vanished");
                self.target = None;
                self.chasing = false;
            }
        }

        let settled = self.pause.is_some() || self.dwell_until.is_some();
        if self.target.is_none() && !settled {
            let target = choose_target(
                &mut self.rng,
                &page.elements(),
                self.vp,
                self.band.height(),
                &self.cfg,
            );
            debug!(
                x = target.point.x,
                y = target.point.y,
                tag = target.element.map(|e| e.tag.name()),
                "new target"
            );
            self.target = Some(target);
        }

        let moved = match self.target {
            Some(t) if self.pause.is_none() => self.step_toward(t, dt, now),
            _ => false,
        };
        self.walking = moved;
        if moved {
            self.idle = Duration::ZERO;
            if self.stamina.is_empty() {
                self.fall_asleep(now, false);
            }
            return;
        }

        self.velocity = Point::default();
        self.idle += dt;
        self.stamina.regen(self.cfg.idle_regen, dt.as_secs_f32(), now);
        if self.idle >= self.cfg.idle_sleep() {
            self.fall_asleep(now, true);
        }
    }

    /// Returns true when the pet actually moved this frame.
    fn step_toward(&mut self, t: Target, dt: Duration, now: Duration) -> bool {
        let delta = t.point - self.pos;
        let dist = self.pos.distance(t.point);
        if dist < self.cfg.arrive_epsilon {
            self.arrive(t, now);
            return false;
        }

        let speed = if self.chasing {
            self.cfg.chase_speed
        } else {
            self.cfg.speed
        };
        let dts = dt.as_secs_f32();
        let step = (speed * dts).min(dist);
        if step <= 0.0 {
            return false;
        }
        let dir = Point::new(delta.x / dist, delta.y / dist);
        let before = self.pos;
        self.pos = self
            .bounds()
            .clamp(Point::new(self.pos.x + dir.x * step, self.pos.y + dir.y * step));
        self.velocity = Point::new(dir.x * speed, dir.y * speed);
        if self.velocity.x != 0.0 {
            self.facing = if self.velocity.x > 0.0 {
                Facing::Right
            } else {
                Facing::Left
            };
        }

        let travelled = before.distance(self.pos);
        let mult = if self.chasing {
            self.cfg.chase_cost_multiplier
        } else {
            1.0
        };
        self.stamina.drain(travelled * self.cfg.drain_per_unit * mult);
        self.wag_phase = (self.wag_phase + dts * WAG_STEPS_PER_SEC) % 1_000_000.0;
        travelled > 0.0
    }

    fn arrive(&mut self, t: Target, now: Duration) {
        self.target = None;
        self.chasing = false;
        let (lo, hi) = (self.cfg.dwell_min_ms, self.cfg.dwell_max_ms);
        let dwell = if hi > lo {
            self.rng.gen_range(lo..=hi)
        } else {
            lo
        };
        self.dwell_until = Some(now + ms(dwell));
        self.react(t.element.map(|e| e.tag), now);
    }

    fn react(&mut self, tag: Option<Tag>, now: Duration) {
        match tag {
            Some(Tag::Img) => {
                self.mood.set(Mood::Love, ms(1_500), false, now);
                self.say("I love this picture!", ms(1_200), now);
            }
            Some(Tag::A | Tag::Button) => {
                self.mood.set(Mood::Smirk, ms(1_200), false, now);
                self.say("Want me to press it?", ms(1_000), now);
            }
            Some(Tag::P) => {
                self.mood
                    .set_sequence((Mood::Happy, ms(1_000)), (Mood::Laugh, ms(900)), now);
            }
            _ => {}
        }
    }

    fn fall_asleep(&mut self, now: Duration, reset_base: bool) {
        if self.is_asleep() {
            return;
        }
        self.asleep_since = Some(now);
        self.target = None;
        self.chasing = false;
        self.walking = false;
        self.dwell_until = None;
        self.pause = None;
        self.velocity = Point::default();
        self.idle = Duration::ZERO;
        self.mood.set(Mood::Normal, Duration::ZERO, reset_base, now);
        info!(stamina = self.stamina.value(), "fell asleep");
    }

    fn render<P: Page + ?Sized>(&mut self, page: &mut P, now: Duration) {
        let mood = self.mood.current(now);
        let wag_tick = self.wag_phase as u64;
        let tail = mood
            .tail_rule()
            .map(|rule| rule.glyph(wag_tick, self.walking))
            .unwrap_or(self.tail_override);
        let suffix = if self.is_eating() {
            Some(EATING_GLYPH)
        } else if self.is_asleep() {
            Some(SLEEPING_GLYPH)
        } else {
            None
        };
        let sprite = Sprite {
            text: compose(mood.face(), tail, self.facing, suffix),
            pos: self.pos,
            speech: self.speech(now).map(str::to_string),
            walking: self.walking,
            asleep: self.is_asleep(),
        };
        page.write_anchor(self.anchor, &sprite);
    }
}
