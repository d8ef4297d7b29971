use crate::geom::Point;
use crate::pantry::Item;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use std::time::Duration;

const SCROLL_LINES: f32 = 3.0;

#[derive(Clone, Debug)]
pub(crate) enum InputEvent {
    Key { key: KeyCode, mods: KeyModifiers },
    Mouse { kind: MouseEventKind, at: Point },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum PlayerAction {
    Quit,
    HelpToggle,
    Feed,
    Buy(Item),
    CollectCoin,
    ToggleConsent,
    ClearStorage,
    Nap,
    Kiss,
    CycleTail,
    Scroll(f32),
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
}

/// Cell centre, so a press anywhere inside a cell lands inside boxes that
/// start on that cell.
fn cell_point(column: u16, row: u16) -> Point {
    Point::new(column as f32 + 0.5, row as f32 + 0.5)
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) => {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    out.push(InputEvent::Key {
                        key: k.code,
                        mods: k.modifiers,
                    });
                }
            }
            Event::Mouse(m) => out.push(InputEvent::Mouse {
                kind: m.kind,
                at: cell_point(m.column, m.row),
            }),
            // size is polled once per frame by the terminal
            _ => {}
        }
        if out.len() >= 64 {
            break;
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(help_open: bool, ev: InputEvent, page_rows: u16) -> Option<PlayerAction> {
    match ev {
        InputEvent::Key { key, mods } => map_key(help_open, key, mods, page_rows),
        InputEvent::Mouse { kind, at } => map_mouse(kind, at),
    }
}

fn map_key(help_open: bool, key: KeyCode, mods: KeyModifiers, page_rows: u16) -> Option<PlayerAction> {
    if matches!(key, KeyCode::Char('c')) && mods.contains(KeyModifiers::CONTROL) {
        return Some(PlayerAction::Quit);
    }
    match key {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(PlayerAction::Quit),
        KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('H') => {
            return Some(PlayerAction::HelpToggle)
        }
        KeyCode::Esc if help_open => return Some(PlayerAction::HelpToggle),
        _ => {}
    }
    if help_open {
        return None;
    }

    let page = page_rows.saturating_sub(2).max(1) as f32;
    match key {
        KeyCode::Char('f') | KeyCode::Char('F') => Some(PlayerAction::Feed),
        KeyCode::Char('b') | KeyCode::Char('B') => Some(PlayerAction::Buy(Item::DriedFish)),
        KeyCode::Char(ch @ '1'..='5') => {
            let i = ch as usize - '1' as usize;
            Item::ALL.get(i).map(|&item| PlayerAction::Buy(item))
        }
        KeyCode::Char('c') | KeyCode::Char('C') => Some(PlayerAction::CollectCoin),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(PlayerAction::ToggleConsent),
        KeyCode::Char('x') | KeyCode::Char('X') => Some(PlayerAction::ClearStorage),
        KeyCode::Char('z') | KeyCode::Char('Z') => Some(PlayerAction::Nap),
        KeyCode::Char('k') | KeyCode::Char('K') => Some(PlayerAction::Kiss),
        KeyCode::Char('t') | KeyCode::Char('T') => Some(PlayerAction::CycleTail),
        KeyCode::Up => Some(PlayerAction::Scroll(-1.0)),
        KeyCode::Down => Some(PlayerAction::Scroll(1.0)),
        KeyCode::PageUp => Some(PlayerAction::Scroll(-page)),
        KeyCode::PageDown | KeyCode::Char(' ') => Some(PlayerAction::Scroll(page)),
        _ => None,
    }
}

fn map_mouse(kind: MouseEventKind, at: Point) -> Option<PlayerAction> {
    match kind {
        MouseEventKind::Down(MouseButton::Left) => Some(PlayerAction::PointerDown(at)),
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
            Some(PlayerAction::PointerMove(at))
        }
        MouseEventKind::Up(MouseButton::Left) => Some(PlayerAction::PointerUp(at)),
        MouseEventKind::ScrollUp => Some(PlayerAction::Scroll(-SCROLL_LINES)),
        MouseEventKind::ScrollDown => Some(PlayerAction::Scroll(SCROLL_LINES)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: KeyCode) -> InputEvent {
        InputEvent::Key {
            key: c,
            mods: KeyModifiers::NONE,
        }
    }

    #[test]
    fn shop_keys_map_to_items() {
        assert_eq!(
            map_event_to_action(false, key(KeyCode::Char('b')), 20),
            Some(PlayerAction::Buy(Item::DriedFish))
        );
        assert_eq!(
            map_event_to_action(false, key(KeyCode::Char('3')), 20),
            Some(PlayerAction::Buy(Item::PremiumFishCan))
        );
        assert_eq!(map_event_to_action(false, key(KeyCode::Char('9')), 20), None);
    }

    #[test]
    fn help_swallows_game_keys() {
        assert_eq!(map_event_to_action(true, key(KeyCode::Char('f')), 20), None);
        assert_eq!(
            map_event_to_action(true, key(KeyCode::Esc), 20),
            Some(PlayerAction::HelpToggle)
        );
        assert_eq!(
            map_event_to_action(true, key(KeyCode::Char('q')), 20),
            Some(PlayerAction::Quit)
        );
    }

    #[test]
    fn ctrl_c_quits_and_plain_c_collects() {
        let ctrl = InputEvent::Key {
            key: KeyCode::Char('c'),
            mods: KeyModifiers::CONTROL,
        };
        assert_eq!(map_event_to_action(false, ctrl, 20), Some(PlayerAction::Quit));
        assert_eq!(
            map_event_to_action(false, key(KeyCode::Char('c')), 20),
            Some(PlayerAction::CollectCoin)
        );
    }

    #[test]
    fn tail_key_is_a_game_key() {
        assert_eq!(
            map_event_to_action(false, key(KeyCode::Char('t')), 20),
            Some(PlayerAction::CycleTail)
        );
        assert_eq!(map_event_to_action(true, key(KeyCode::Char('t')), 20), None);
    }

    #[test]
    fn page_keys_scroll_by_screenful() {
        assert_eq!(
            map_event_to_action(false, key(KeyCode::PageDown), 20),
            Some(PlayerAction::Scroll(18.0))
        );
        assert_eq!(
            map_event_to_action(false, key(KeyCode::PageUp), 1),
            Some(PlayerAction::Scroll(-1.0))
        );
    }

    #[test]
    fn mouse_uses_cell_centres() {
        let ev = InputEvent::Mouse {
            kind: MouseEventKind::Down(MouseButton::Left),
            at: cell_point(4, 7),
        };
        assert_eq!(
            map_event_to_action(false, ev, 20),
            Some(PlayerAction::PointerDown(Point::new(4.5, 7.5)))
        );
        let wheel = InputEvent::Mouse {
            kind: MouseEventKind::ScrollDown,
            at: cell_point(0, 0),
        };
        assert_eq!(
            map_event_to_action(false, wheel, 20),
            Some(PlayerAction::Scroll(SCROLL_LINES))
        );
    }
}
