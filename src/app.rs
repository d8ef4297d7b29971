use crate::agent::{Activity, PetAgent};
use crate::bus::{Bus, Notice};
use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::demo_page::{BlockKind, DemoPage, ANCHOR_NAME};
use crate::geom::Size;
use crate::input::{collect_input_nonblocking, map_event_to_action, PlayerAction};
use crate::logging::init_logging;
use crate::mood::Mood;
use crate::page::Page;
use crate::pantry::{Item, Pantry, Purchase, COIN_VALUE};
use crate::render::{bar, draw_center_box, draw_page, draw_sprite, draw_status_line, Palette, Terminal};
use crate::storage::SaveStore;
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const NOTE_MS: u64 = 2_500;

struct Note {
    text: String,
    until: Duration,
}

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    term: Terminal,
    bus: Bus,
    pantry: Pantry,
    page: DemoPage,
    pet: Option<PetAgent>,
    started: Instant,
    note: Option<Note>,
    show_help: bool,
    should_quit: bool,
}

/// The bottom terminal row belongs to the status line.
fn page_size(cols: u16, rows: u16) -> Size {
    Size::new(cols as f32, rows.saturating_sub(1).max(1) as f32)
}

impl App {
    fn init() -> anyhow::Result<Self> {
        let paths = project_paths()?;
        init_logging(&paths.log_path);
        let settings = load_settings(&paths.settings_path);

        let seed = if settings.seed == 0 {
            rand::random()
        } else {
            settings.seed
        };
        info!(seed, "starting");

        let mut bus = Bus::new();
        let store = SaveStore::new(paths.pantry_path.clone(), paths.consent_path.clone());
        let pantry = Pantry::open(Some(store), &mut bus);

        let term = Terminal::begin()?;
        let mut page = DemoPage::new(page_size(term.cols, term.rows));
        let pet = PetAgent::mount(
            &mut page,
            ANCHOR_NAME,
            settings.pet.clone(),
            StdRng::seed_from_u64(seed),
            &mut bus,
            Duration::ZERO,
        );

        Ok(Self {
            settings,
            paths,
            term,
            bus,
            pantry,
            page,
            pet,
            started: Instant::now(),
            note: None,
            show_help: false,
            should_quit: false,
        })
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                self.page.resize(page_size(self.term.cols, self.term.rows));
                if let Some(pet) = self.pet.as_mut() {
                    pet.mark_viewport_dirty();
                }
            }

            let page_rows = self.page.viewport().h as u16;
            for ev in collect_input_nonblocking(frame_dt)? {
                if let Some(action) = map_event_to_action(self.show_help, ev, page_rows) {
                    self.apply(action);
                }
                if self.should_quit {
                    break;
                }
            }

            self.pantry.pump(&mut self.bus);
            let now = self.now();
            if let Some(pet) = self.pet.as_mut() {
                pet.tick(&mut self.page, &mut self.bus, now);
            }

            self.render_frame()?;
            spin_sleep(frame_dt, Instant::now());
        }
        Ok(())
    }

    fn apply(&mut self, action: PlayerAction) {
        let now = self.now();
        match action {
            PlayerAction::Quit => self.should_quit = true,
            PlayerAction::HelpToggle => self.show_help = !self.show_help,
            PlayerAction::Feed => match self.pantry.any_food() {
                Some(item) => {
                    self.pantry.feed(item, &mut self.bus);
                    self.notify(format!("fed {}", item.name()), now);
                }
                None => self.notify("no food left, press b to buy some", now),
            },
            PlayerAction::Buy(item) => {
                let msg = match self.pantry.buy(item, &mut self.bus) {
                    Purchase::Bought => format!("bought {}", item.name()),
                    Purchase::TooPoor => format!("{} costs ${}", item.name(), item.price()),
                    Purchase::AlreadyOwned => format!("you already own a {}", item.name()),
                };
                self.notify(msg, now);
            }
            PlayerAction::CollectCoin => {
                let coin = self
                    .page
                    .visible_blocks()
                    .iter()
                    .find(|v| v.block.kind == BlockKind::Coin)
                    .map(|v| v.rect.center());
                match coin {
                    Some(p) if self.page.take_coin_at(p) => self.collect(now),
                    _ => self.notify("no coins in view", now),
                }
            }
            PlayerAction::ToggleConsent => {
                let enabled = !self.pantry.consent();
                self.bus.publish(Notice::ConsentChanged { enabled });
                let msg = if enabled {
                    "saving to disk enabled"
                } else {
                    "saving to disk disabled"
                };
                self.notify(msg, now);
            }
            PlayerAction::ClearStorage => {
                self.bus.publish(Notice::StorageCleared);
                self.bus.publish(Notice::ConsentChanged { enabled: false });
                self.notify("saved data cleared", now);
            }
            PlayerAction::Nap => {
                if let Some(pet) = self.pet.as_mut() {
                    if pet.is_asleep() {
                        pet.wake(now);
                    } else {
                        pet.sleep(now);
                    }
                }
            }
            PlayerAction::Kiss => {
                if let Some(pet) = self.pet.as_mut() {
                    if !pet.is_asleep() {
                        pet.set_mood(Mood::Kiss, Duration::from_millis(1_200), false, now);
                        pet.say("mwah", Duration::from_millis(900), now);
                    }
                }
            }
            PlayerAction::CycleTail => {
                let tail = next_tail(self.settings.pet.tail_char);
                self.settings.pet.tail_char = tail;
                if let Some(pet) = self.pet.as_mut() {
                    pet.set_tail(tail);
                }
                self.notify(format!("fallback tail {tail}"), now);
            }
            PlayerAction::Scroll(delta) => {
                if self.page.scroll_by(delta) {
                    if let Some(pet) = self.pet.as_mut() {
                        pet.mark_viewport_dirty();
                    }
                }
            }
            PlayerAction::PointerDown(p) => {
                let on_pet = self
                    .pet
                    .as_mut()
                    .is_some_and(|pet| pet.pointer_down(p, now));
                if !on_pet && self.page.take_coin_at(p) {
                    self.collect(now);
                }
            }
            PlayerAction::PointerMove(p) => {
                if let Some(pet) = self.pet.as_mut() {
                    pet.pointer_move(p, now);
                }
            }
            PlayerAction::PointerUp(p) => {
                if let Some(pet) = self.pet.as_mut() {
                    if pet.pointer_up(p, now) {
                        pet.click(now);
                    }
                }
            }
        }
    }

    /// The coin block is gone, so any target on it must be re-measured now.
    fn collect(&mut self, now: Duration) {
        if let Some(pet) = self.pet.as_mut() {
            pet.mark_viewport_dirty();
        }
        self.pantry.collect_coin(&mut self.bus);
        self.notify(format!("+${COIN_VALUE}"), now);
    }

    fn notify(&mut self, text: impl Into<String>, now: Duration) {
        self.note = Some(Note {
            text: text.into(),
            until: now + Duration::from_millis(NOTE_MS),
        });
    }

    fn status_text(&mut self, now: Duration) -> String {
        if let Some(note) = self.note.as_ref().filter(|n| now < n.until) {
            return format!(" {} ", note.text);
        }
        let food: u32 = Item::ALL
            .iter()
            .filter(|i| i.stamina().is_some())
            .map(|&i| self.pantry.count(i))
            .sum();
        let save = if self.pantry.consent() { "on" } else { "off" };
        let wallet = format!("${}  food {}  save {}  ? help", self.pantry.money(), food, save);

        let Some(pet) = self.pet.as_mut() else {
            return format!(" no pet  |  {wallet}");
        };
        let st = pet.stamina();
        let frac = st.value() / st.max().max(1.0);
        let energy = format!("{} {:>3.0}", bar(frac, 10), st.value());
        let activity = match pet.activity() {
            Activity::Idle => "idle",
            Activity::Walking => "walking",
            Activity::Eating => "eating",
            Activity::Asleep => "asleep",
            Activity::Dragging => "carried",
        };
        let mood = pet.mood(now);
        format!(" {energy}  {mood:?}  {activity}  |  {wallet}").to_lowercase()
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let pal = Palette::new(self.settings.enable_color);
        let now = self.now();
        let status = self.status_text(now);
        let page_rows = self.page.viewport().h as u16;

        self.term.frame.clear(pal.bg(crossterm::style::Color::Black));
        draw_page(&mut self.term.frame, &self.page, page_rows, pal);
        if self.pet.as_ref().is_some_and(|p| p.is_alive()) {
            draw_sprite(&mut self.term.frame, self.page.sprite(), page_rows, pal);
        }
        draw_status_line(&mut self.term.frame, &status, pal);

        if self.show_help {
            let help = help_text(self.pet.as_ref(), self.page.scroll(), self.settings.pet.tail_char);
            draw_center_box(&mut self.term.frame, "webcat", &help);
        }

        self.term.present()?;
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        if let Some(pet) = self.pet.as_mut() {
            pet.destroy(&mut self.bus);
        }
        self.term.end()?;
        if let Err(e) = save_settings_atomic(&self.paths.settings_path, &self.settings) {
            warn!(error = %e, "settings not saved");
        }
        info!(
            money = self.pantry.money(),
            subscribers = self.bus.subscriber_count(),
            "bye"
        );
        Ok(())
    }
}

const TAILS: [char; 4] = ['~', '@', '/', '\\'];

fn next_tail(current: char) -> char {
    let i = TAILS.iter().position(|&c| c == current).map_or(0, |i| i + 1);
    TAILS[i % TAILS.len()]
}

fn help_text(pet: Option<&PetAgent>, scroll: f32, tail: char) -> String {
    let mut s = String::from(
        "A cat lives on this page. Click it, drag it, feed it.\n\
         Coins (o) are worth money; click them or press c.\n\n\
         f feed   z nap/wake   k blow a kiss   t cycle tail\n\
         s toggle saving to disk   x clear saved data\n\
         arrows / PgUp / PgDn / wheel scroll   q quit\n\nShop:\n",
    );
    for (n, item) in Item::ALL.iter().enumerate() {
        let gives = match item.stamina() {
            Some(v) => format!("+{v} stamina"),
            None => "toy".to_string(),
        };
        s.push_str(&format!(
            "  {}  {:<17} ${:<4} {}\n",
            n + 1,
            item.name(),
            item.price(),
            gives
        ));
    }
    let Some(pet) = pet else {
        return s;
    };
    let pos = pet.position();
    s.push_str(&format!(
        "\nat {:.0},{:.0}, scrolled {:.0}, base mood {:?}, band {:.0} rows, tail {}\n\
         heading {:?} at {:.1}/s",
        pos.x,
        pos.y,
        scroll,
        pet.base_mood(),
        pet.band_height(),
        tail,
        pet.facing(),
        pet.velocity().x.hypot(pet.velocity().y),
    ));
    if let Some(t) = pet.target() {
        let at = t.element.map(|e| e.tag.name()).unwrap_or("somewhere");
        s.push_str(&format!("\nwalking to {at}"));
    }
    s
}

pub(crate) fn run() -> anyhow::Result<()> {
    let mut app = App::init()?;
    let result = app.run();
    app.shutdown()?;
    result
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PetConfig;

    #[test]
    fn help_lists_shop_and_pet_whereabouts() {
        let mut page = DemoPage::new(Size::new(80.0, 30.0));
        let mut bus = Bus::new();
        let pet = PetAgent::mount(
            &mut page,
            ANCHOR_NAME,
            PetConfig::default(),
            StdRng::seed_from_u64(3),
            &mut bus,
            Duration::ZERO,
        )
        .unwrap();

        let text = help_text(Some(&pet), 4.0, '@');
        for item in Item::ALL {
            assert!(text.contains(item.name()), "{} missing", item.name());
        }
        let pos = pet.position();
        assert!(text.contains(&format!("at {:.0},{:.0}", pos.x, pos.y)));
        assert!(text.contains("scrolled 4"));
        assert!(text.contains("tail @"));

        let bare = help_text(None, 0.0, '~');
        assert!(!bare.contains("base mood"));
    }

    #[test]
    fn tail_key_cycles_through_glyphs() {
        assert_eq!(next_tail('~'), '@');
        assert_eq!(next_tail('\\'), '~');
        assert_eq!(next_tail('x'), '~');
    }
}
