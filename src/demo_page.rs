//! A small scrollable homepage laid out in terminal cells, for the pet to roam.

use crate::geom::{Point, Rect, Size};
use crate::page::{ElementBox, ElementId, Page, Positioning, Sprite, Tag};
use std::collections::BTreeSet;

pub(crate) const ANCHOR_NAME: &str = "catPet";
const ANCHOR_ID: ElementId = ElementId(usize::MAX);

const MARGIN: f32 = 2.0;
const HEADER_H: f32 = 2.0;
/// Sub-slots per content item; links and coins number their pieces.
const SUBS: usize = 16;

/// Ids follow the content list, not the block order, so they survive relayout.
fn block_id(slot: usize, sub: usize) -> ElementId {
    ElementId(slot * SUBS + sub)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Header,
    Nav,
    Heading,
    Paragraph,
    Image,
    Link,
    Button,
    Coin,
}

impl BlockKind {
    fn tag(self) -> Tag {
        match self {
            BlockKind::Header | BlockKind::Nav | BlockKind::Heading => Tag::Other,
            BlockKind::Paragraph => Tag::P,
            BlockKind::Image => Tag::Img,
            BlockKind::Link => Tag::A,
            BlockKind::Button | BlockKind::Coin => Tag::Button,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Block {
    id: ElementId,
    pub(crate) kind: BlockKind,
    /// Document coordinates (fixed blocks: viewport coordinates).
    doc: Rect,
    positioning: Positioning,
    /// Sticky blocks stop here.
    stick_top: f32,
    pub(crate) ignored: bool,
    pub(crate) lines: Vec<String>,
    gone: bool,
}

/// Rendered block in viewport space, for the terminal renderer.
pub(crate) struct VisibleBlock<'a> {
    pub(crate) block: &'a Block,
    pub(crate) rect: Rect,
}

pub(crate) struct DemoPage {
    vp: Size,
    scroll: f32,
    doc_height: f32,
    blocks: Vec<Block>,
    sprite: Sprite,
}

enum Content {
    Heading(&'static str),
    Paragraph(&'static str),
    Image(&'static str),
    Links(&'static [&'static str]),
    Button(&'static str),
    Coins(usize),
    Aside(&'static str),
}

const CONTENT: &[Content] = &[
    Content::Heading("# about"),
    Content::Paragraph(
        "Hi, I write small tools and smaller games. This page is mostly a place to keep \
         notes, screenshots and the occasional half-finished idea.",
    ),
    Content::Coins(2),
    Content::Image("[img] sunset-over-the-harbour.jpg"),
    Content::Paragraph(
        "The cat lives here too. It wanders between paragraphs and pictures, naps when \
         it gets tired and does not enjoy being carried around.",
    ),
    Content::Links(&["github", "mastodon", "rss"]),
    Content::Heading("# works"),
    Content::Image("[img] terminal-aquarium.png"),
    Content::Paragraph(
        "A handful of terminal toys: an aquarium, a lava lamp, a very stubborn lunar \
         lander. Most of them run at sixty frames a second on a good day.",
    ),
    Content::Button("[ open the shop ]"),
    Content::Coins(3),
    Content::Aside(
        "(sidebar) This box is marked off-limits for the pet; it should never walk here.",
    ),
    Content::Heading("# contact"),
    Content::Paragraph(
        "Mail is the best way to reach me. Replies are slow but they do arrive, usually \
         with a picture of the cat attached.",
    ),
    Content::Links(&["mail", "keys"]),
    Content::Image("[img] cat-on-keyboard.gif"),
    Content::Paragraph("Thanks for stopping by."),
];

impl DemoPage {
    pub(crate) fn new(vp: Size) -> Self {
        let mut page = Self {
            vp,
            scroll: 0.0,
            doc_height: 0.0,
            blocks: Vec::new(),
            sprite: Sprite::default(),
        };
        page.layout();
        page
    }

    pub(crate) fn resize(&mut self, vp: Size) {
        // keep collected coins collected across relayout
        let gone: BTreeSet<ElementId> = self
            .blocks
            .iter()
            .filter(|b| b.gone)
            .map(|b| b.id)
            .collect();
        self.vp = vp;
        self.layout();
        for b in self.blocks.iter_mut() {
            b.gone = gone.contains(&b.id);
        }
        self.scroll_by(0.0);
    }

    /// Returns true when the scroll position actually changed.
    pub(crate) fn scroll_by(&mut self, delta: f32) -> bool {
        let max = (self.doc_height - self.vp.h).max(0.0);
        let next = (self.scroll + delta).clamp(0.0, max);
        let changed = next != self.scroll;
        self.scroll = next;
        changed
    }

    pub(crate) fn scroll(&self) -> f32 {
        self.scroll
    }

    pub(crate) fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    /// Collect the coin under `p`, if any.
    pub(crate) fn take_coin_at(&mut self, p: Point) -> bool {
        let hit = (0..self.blocks.len()).find(|&i| {
            let b = &self.blocks[i];
            b.kind == BlockKind::Coin && !b.gone && self.viewport_rect(b).contains(p)
        });
        match hit {
            Some(i) => {
                self.blocks[i].gone = true;
                true
            }
            None => false,
        }
    }

    pub(crate) fn visible_blocks(&self) -> Vec<VisibleBlock<'_>> {
        let mut out: Vec<VisibleBlock<'_>> = self
            .blocks
            .iter()
            .filter(|b| !b.gone)
            .map(|b| VisibleBlock {
                block: b,
                rect: self.viewport_rect(b),
            })
            .filter(|v| v.rect.intersects_viewport(self.vp))
            .collect();
        // pinned chrome paints over flowing content
        out.sort_by_key(|v| v.block.positioning.is_pinned());
        out
    }

    fn viewport_rect(&self, b: &Block) -> Rect {
        match b.positioning {
            Positioning::Fixed => b.doc,
            Positioning::Flow => Rect::new(b.doc.x, b.doc.y - self.scroll, b.doc.w, b.doc.h),
            Positioning::Sticky => {
                let y = (b.doc.y - self.scroll).max(b.stick_top);
                Rect::new(b.doc.x, y, b.doc.w, b.doc.h)
            }
        }
    }

    fn layout(&mut self) {
        let full = self.vp.w.max(24.0);
        let width = (full - MARGIN * 2.0).max(20.0);
        let mut blocks = Vec::new();

        blocks.push(Block {
            id: block_id(0, 0),
            kind: BlockKind::Header,
            doc: Rect::new(0.0, 0.0, full, HEADER_H),
            positioning: Positioning::Fixed,
            stick_top: 0.0,
            ignored: false,
            lines: vec![" ✦ silence · personal homepage ✦".to_string()],
            gone: false,
        });
        let mut y = HEADER_H + 2.0;
        blocks.push(Block {
            id: block_id(1, 0),
            kind: BlockKind::Nav,
            doc: Rect::new(0.0, y, full, 1.0),
            positioning: Positioning::Sticky,
            stick_top: HEADER_H,
            ignored: false,
            lines: vec![" about · works · contact".to_string()],
            gone: false,
        });
        y += 2.0;

        let flow = |id: ElementId, kind: BlockKind, x: f32, y: f32, w: f32, lines: Vec<String>| Block {
            id,
            kind,
            doc: Rect::new(x, y, w, lines.len().max(1) as f32),
            positioning: Positioning::Flow,
            stick_top: 0.0,
            ignored: false,
            lines,
            gone: false,
        };

        for (n, item) in CONTENT.iter().enumerate() {
            let slot = n + 2;
            let id = block_id(slot, 0);
            match item {
                Content::Heading(t) => {
                    blocks.push(flow(id, BlockKind::Heading, MARGIN, y, width, vec![t.to_string()]));
                    y += 2.0;
                }
                Content::Paragraph(t) => {
                    let lines = wrap(t, width as usize);
                    let h = lines.len() as f32;
                    blocks.push(flow(id, BlockKind::Paragraph, MARGIN, y, width, lines));
                    y += h + 1.0;
                }
                Content::Image(label) => {
                    let w = width.min(30.0);
                    let h = 5.0;
                    let mut b = flow(id, BlockKind::Image, MARGIN, y, w, vec![label.to_string()]);
                    b.doc.h = h;
                    blocks.push(b);
                    y += h + 1.0;
                }
                Content::Links(names) => {
                    let mut x = MARGIN;
                    for (sub, name) in names.iter().enumerate() {
                        let text = format!("<{name}>");
                        let w = text.chars().count() as f32;
                        if x + w > MARGIN + width {
                            break;
                        }
                        blocks.push(flow(block_id(slot, sub), BlockKind::Link, x, y, w, vec![text]));
                        x += w + 3.0;
                    }
                    y += 2.0;
                }
                Content::Button(label) => {
                    let w = label.chars().count() as f32;
                    blocks.push(flow(id, BlockKind::Button, MARGIN, y, w, vec![label.to_string()]));
                    y += 2.0;
                }
                Content::Coins(n) => {
                    let step = (width / (*n as f32 + 1.0)).max(4.0);
                    for i in 0..*n {
                        let x = (MARGIN + step * (i as f32 + 1.0)).floor();
                        blocks.push(flow(block_id(slot, i), BlockKind::Coin, x, y, 3.0, vec!["(o)".to_string()]));
                    }
                    y += 2.0;
                }
                Content::Aside(t) => {
                    let lines = wrap(t, (width - 4.0).max(10.0) as usize);
                    let h = lines.len() as f32;
                    let mut b = flow(id, BlockKind::Paragraph, MARGIN + 2.0, y, width - 4.0, lines);
                    b.ignored = true;
                    blocks.push(b);
                    y += h + 1.0;
                }
            }
        }

        self.doc_height = y + 1.0;
        self.blocks = blocks;
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(8);
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let need = if cur.is_empty() { 0 } else { 1 } + word.chars().count();
        if !cur.is_empty() && cur.chars().count() + need > width {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

impl Page for DemoPage {
    fn viewport(&self) -> Size {
        self.vp
    }

    fn elements(&self) -> Vec<ElementBox> {
        self.blocks
            .iter()
            .filter(|b| !b.gone)
            .map(|b| ElementBox {
                id: b.id,
                tag: b.kind.tag(),
                rect: self.viewport_rect(b),
                positioning: b.positioning,
                ignored: b.ignored,
            })
            .collect()
    }

    fn measure(&self, id: ElementId) -> Option<ElementBox> {
        let b = self.blocks.iter().find(|b| b.id == id && !b.gone)?;
        Some(ElementBox {
            id,
            tag: b.kind.tag(),
            rect: self.viewport_rect(b),
            positioning: b.positioning,
            ignored: b.ignored,
        })
    }

    fn find_anchor(&self, name: &str) -> Option<ElementId> {
        (name == ANCHOR_NAME).then_some(ANCHOR_ID)
    }

    fn write_anchor(&mut self, id: ElementId, sprite: &Sprite) {
        if id == ANCHOR_ID {
            self.sprite = sprite.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targeting::compute_band;

    #[test]
    fn nav_sticks_under_header_once_scrolled() {
        let mut page = DemoPage::new(Size::new(80.0, 24.0));
        assert_eq!(compute_band(&page.elements(), page.viewport()), HEADER_H);
        assert!(page.scroll_by(5.0));
        assert_eq!(compute_band(&page.elements(), page.viewport()), HEADER_H + 1.0);
        assert!(page.scroll_by(-100.0));
        assert_eq!(page.scroll(), 0.0);
        assert!(!page.scroll_by(-1.0));
    }

    #[test]
    fn collected_coin_disappears() {
        let mut page = DemoPage::new(Size::new(80.0, 40.0));
        let coin = page
            .elements()
            .into_iter()
            .find(|e| page.blocks.iter().any(|b| b.id == e.id && b.kind == BlockKind::Coin))
            .expect("a coin on screen");
        let p = Point::new(coin.rect.x + 1.0, coin.rect.y);
        assert!(page.take_coin_at(p));
        assert!(!page.take_coin_at(p));
        assert!(page.measure(coin.id).is_none());

        page.resize(Size::new(100.0, 40.0));
        assert!(page.measure(coin.id).is_none());
    }

    fn kind_of(page: &DemoPage, id: ElementId) -> Option<BlockKind> {
        page.blocks.iter().find(|b| b.id == id).map(|b| b.kind)
    }

    #[test]
    fn narrowing_keeps_collected_coins_and_ids() {
        let mut page = DemoPage::new(Size::new(80.0, 40.0));
        let before: Vec<(ElementId, BlockKind)> = page.blocks.iter().map(|b| (b.id, b.kind)).collect();
        for b in page.blocks.iter_mut().filter(|b| b.kind == BlockKind::Coin) {
            b.gone = true;
        }

        // the link row loses pieces at this width, so the block count shrinks
        page.resize(Size::new(30.0, 40.0));
        assert!(page.blocks.len() < before.len());

        let live_coins = page
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Coin && !b.gone)
            .count();
        assert_eq!(live_coins, 0);
        assert!(page.blocks.iter().all(|b| !b.gone || b.kind == BlockKind::Coin));
        for (id, kind) in before {
            if let Some(now) = kind_of(&page, id) {
                assert_eq!(now, kind, "{id:?} changed kind");
            }
        }
        let para = page
            .blocks
            .iter()
            .find(|b| b.kind == BlockKind::Paragraph && !b.ignored)
            .map(|b| b.id)
            .unwrap();
        assert_eq!(page.measure(para).map(|e| e.tag), Some(Tag::P));
    }

    #[test]
    fn flow_blocks_move_with_scroll() {
        let mut page = DemoPage::new(Size::new(80.0, 24.0));
        let id = page
            .elements()
            .into_iter()
            .find(|e| e.tag == Tag::Img)
            .unwrap()
            .id;
        let before = page.measure(id).unwrap().rect.y;
        page.scroll_by(3.0);
        assert_eq!(page.measure(id).unwrap().rect.y, before - 3.0);
    }

    #[test]
    fn aside_is_ignored() {
        let page = DemoPage::new(Size::new(80.0, 200.0));
        assert!(page.elements().iter().any(|e| e.ignored && e.tag == Tag::P));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("one two three four five six", 9);
        assert!(lines.iter().all(|l| l.chars().count() <= 9));
        assert_eq!(lines.join(" "), "one two three four five six");
    }

    #[test]
    fn anchor_lookup() {
        let mut page = DemoPage::new(Size::new(80.0, 24.0));
        assert_eq!(page.find_anchor("catPet"), Some(ANCHOR_ID));
        assert_eq!(page.find_anchor("dog"), None);
        let s = Sprite {
            text: "~😺".into(),
            ..Sprite::default()
        };
        page.write_anchor(ANCHOR_ID, &s);
        assert_eq!(page.sprite().text, "~😺");
    }
}
