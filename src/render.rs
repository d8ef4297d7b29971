use crate::demo_page::{BlockKind, DemoPage, VisibleBlock};
use crate::geom::Rect;
use crate::page::Sprite;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Trailing half of a double-width glyph; never printed.
const WIDE_TAIL: char = '\0';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Cell {
    fn blank(bg: Color) -> Self {
        Self::glyph(' ', Color::White, bg, false)
    }

    fn glyph(ch: char, fg: Color, bg: Color, bold: bool) -> Self {
        Self { ch, fg, bg, bold }
    }

    fn style(&self) -> (Color, Color, bool) {
        (self.fg, self.bg, self.bold)
    }
}

/// What the terminal shows before the first frame; never equal to a drawn cell.
const UNKNOWN: Cell = Cell {
    ch: WIDE_TAIL,
    fg: Color::Reset,
    bg: Color::Reset,
    bold: true,
};

/// Row-major grid of cells, the size of the terminal.
pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self::filled(w, h, Cell::blank(Color::Black))
    }

    fn filled(w: u16, h: u16, cell: Cell) -> Self {
        Self {
            w,
            h,
            cells: vec![cell; usize::from(w) * usize::from(h)],
        }
    }

    fn row(&self, y: u16) -> &[Cell] {
        let w = usize::from(self.w);
        let start = usize::from(y) * w;
        &self.cells[start..start + w]
    }

    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (y < self.h).then(|| self.row(y).get(usize::from(x)).copied()).flatten()
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = usize::from(y) * usize::from(self.w) + usize::from(x);
            self.cells[i] = c;
        }
    }

    pub(crate) fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell::blank(bg));
    }
}

/// Emoji faces and the fish/zzz glyphs take two terminal columns.
fn glyph_width(ch: char) -> u16 {
    if ch as u32 >= 0x1F000 {
        2
    } else {
        1
    }
}

pub(crate) fn text_width(s: &str) -> u16 {
    s.chars().map(glyph_width).sum()
}

/// Style last sent to the terminal, so runs only switch what changed.
#[derive(Default)]
struct Pen {
    style: Option<(Color, Color, bool)>,
}

impl Pen {
    fn apply(&mut self, out: &mut impl Write, cell: &Cell) -> io::Result<()> {
        let want = cell.style();
        let (fg, bg, bold) = want;
        let had = self.style;
        if had.map(|s| s.0) != Some(fg) {
            queue!(out, SetForegroundColor(fg))?;
        }
        if had.map(|s| s.1) != Some(bg) {
            queue!(out, SetBackgroundColor(bg))?;
        }
        if had.map(|s| s.2) != Some(bold) {
            let attr = if bold {
                Attribute::Bold
            } else {
                Attribute::NormalIntensity
            };
            queue!(out, SetAttribute(attr))?;
        }
        self.style = Some(want);
        Ok(())
    }
}

/// Owns the alternate screen while the page is up. Drawing goes into
/// `frame`; `present` sends only the cells that differ from `shown`.
pub(crate) struct Terminal {
    out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    shown: CellBuffer,
    pub(crate) frame: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            shown: CellBuffer::filled(cols, rows, UNKNOWN),
            frame: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(
            self.out,
            ResetColor,
            SetAttribute(Attribute::Reset),
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        Ok(())
    }

    /// Returns true when the terminal changed size; both buffers are reset.
    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let size = terminal::size()?;
        if size == (self.cols, self.rows) {
            return Ok(false);
        }
        (self.cols, self.rows) = size;
        self.shown = CellBuffer::filled(self.cols, self.rows, UNKNOWN);
        self.frame = CellBuffer::new(self.cols, self.rows);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;
        let mut pen = Pen::default();
        for y in 0..self.rows {
            for (x, run) in changed_runs(self.shown.row(y), self.frame.row(y)) {
                queue!(self.out, cursor::MoveTo(x, y))?;
                for cell in run.iter().filter(|c| c.ch != WIDE_TAIL) {
                    pen.apply(&mut self.out, cell)?;
                    queue!(self.out, Print(cell.ch))?;
                }
            }
        }
        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.shown.cells.copy_from_slice(&self.frame.cells);
        Ok(())
    }
}

/// Contiguous stretches of `next` that differ from `shown`, with their
/// starting column. A run never starts on the tail of a wide glyph.
fn changed_runs<'a>(shown: &[Cell], next: &'a [Cell]) -> Vec<(u16, &'a [Cell])> {
    let mut runs = Vec::new();
    let mut x = 0;
    while x < next.len() {
        if shown.get(x) == Some(&next[x]) {
            x += 1;
            continue;
        }
        let mut from = x;
        while from > 0 && next[from].ch == WIDE_TAIL {
            from -= 1;
        }
        let mut to = x + 1;
        while to < next.len() && (shown.get(to) != Some(&next[to]) || next[to].ch == WIDE_TAIL) {
            to += 1;
        }
        runs.push((from as u16, &next[from..to]));
        x = to;
    }
    runs
}

/* -----------------------------
   Palette
------------------------------ */

#[derive(Clone, Copy)]
pub(crate) struct Palette {
    color: bool,
}

impl Palette {
    pub(crate) fn new(enable_color: bool) -> Self {
        Self {
            color: enable_color,
        }
    }

    pub(crate) fn fg(self, c: Color) -> Color {
        if self.color {
            c
        } else {
            Color::White
        }
    }

    pub(crate) fn bg(self, c: Color) -> Color {
        if self.color {
            c
        } else {
            Color::Black
        }
    }
}

/* -----------------------------
   Text primitives
------------------------------ */

/// Draws `s` from column `x` (may be negative), clipped to the buffer.
pub(crate) fn draw_text_at(buf: &mut CellBuffer, x: i32, y: i32, s: &str, fg: Color, bg: Color, bold: bool) {
    if y < 0 || y >= buf.h as i32 {
        return;
    }
    let mut xx = x;
    for ch in s.chars() {
        let w = glyph_width(ch) as i32;
        if xx >= buf.w as i32 {
            break;
        }
        if xx >= 0 && xx + w <= buf.w as i32 {
            buf.set(xx as u16, y as u16, Cell::glyph(ch, fg, bg, bold));
            if w == 2 {
                buf.set((xx + 1) as u16, y as u16, Cell::glyph(WIDE_TAIL, fg, bg, bold));
            }
        }
        xx += w;
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    draw_text_at(buf, x as i32, y as i32, s, fg, bg, false);
}

fn fill_rect(buf: &mut CellBuffer, r: Rect, bottom_limit: i32, bg: Color) {
    let (x0, y0) = (r.x.floor() as i32, r.y.floor() as i32);
    let (x1, y1) = (r.right().ceil() as i32, (r.bottom().ceil() as i32).min(bottom_limit));
    for y in y0.max(0)..y1 {
        for x in x0.max(0)..x1.min(buf.w as i32) {
            buf.set(x as u16, y as u16, Cell::blank(bg));
        }
    }
}

pub(crate) fn bar(value01: f32, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::new();
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

/* -----------------------------
   Page
------------------------------ */

/// Paints the visible part of the page into rows `0..page_rows`.
pub(crate) fn draw_page(buf: &mut CellBuffer, page: &DemoPage, page_rows: u16, pal: Palette) {
    let limit = page_rows as i32;
    for vb in page.visible_blocks() {
        draw_block(buf, &vb, limit, pal);
    }
}

fn draw_block(buf: &mut CellBuffer, vb: &VisibleBlock<'_>, limit: i32, pal: Palette) {
    let r = vb.rect;
    let x = r.x.floor() as i32;
    let y = r.y.floor() as i32;
    let black = pal.bg(Color::Black);

    let (fg, bg, bold) = match vb.block.kind {
        BlockKind::Header => (Color::White, pal.bg(Color::DarkBlue), true),
        BlockKind::Nav => (Color::White, pal.bg(Color::DarkGrey), false),
        BlockKind::Heading => (pal.fg(Color::Yellow), black, true),
        BlockKind::Paragraph if vb.block.ignored => (pal.fg(Color::DarkGrey), black, false),
        BlockKind::Paragraph => (Color::White, black, false),
        BlockKind::Image => (pal.fg(Color::Cyan), black, false),
        BlockKind::Link => (pal.fg(Color::Blue), black, false),
        BlockKind::Button => (pal.fg(Color::Black), pal.bg(Color::Green), true),
        BlockKind::Coin => (pal.fg(Color::Yellow), black, true),
    };

    match vb.block.kind {
        BlockKind::Header | BlockKind::Nav | BlockKind::Button => {
            fill_rect(buf, r, limit, bg);
        }
        BlockKind::Image => {
            draw_frame(buf, r, limit, fg, bg);
        }
        _ => {}
    }

    let inset = if vb.block.kind == BlockKind::Image { 2 } else { 0 };
    let text_y0 = if vb.block.kind == BlockKind::Image {
        y + (r.h as i32) / 2
    } else {
        y
    };
    for (i, line) in vb.block.lines.iter().enumerate() {
        let ly = text_y0 + i as i32;
        if ly >= limit {
            break;
        }
        draw_text_at(buf, x + inset, ly, line, fg, bg, bold);
    }
}

fn draw_frame(buf: &mut CellBuffer, r: Rect, limit: i32, fg: Color, bg: Color) {
    let x0 = r.x.floor() as i32;
    let y0 = r.y.floor() as i32;
    let x1 = x0 + r.w as i32 - 1;
    let y1 = y0 + r.h as i32 - 1;
    let mut put = |x: i32, y: i32, ch: char| {
        if x >= 0 && y >= 0 && y < limit && x < buf.w as i32 {
            buf.set(x as u16, y as u16, Cell::glyph(ch, fg, bg, false));
        }
    };
    for x in x0 + 1..x1 {
        put(x, y0, '─');
        put(x, y1, '─');
    }
    for y in y0 + 1..y1 {
        put(x0, y, '│');
        put(x1, y, '│');
    }
    put(x0, y0, '┌');
    put(x1, y0, '┐');
    put(x0, y1, '└');
    put(x1, y1, '┘');
}

/* -----------------------------
   Pet
------------------------------ */

pub(crate) fn draw_sprite(buf: &mut CellBuffer, sprite: &Sprite, page_rows: u16, pal: Palette) {
    if sprite.text.is_empty() {
        return;
    }
    let x = sprite.pos.x.floor() as i32;
    let y = sprite.pos.y.floor() as i32;
    if y >= page_rows as i32 {
        return;
    }
    let bg = pal.bg(Color::Black);
    let fg = if sprite.asleep {
        pal.fg(Color::DarkGrey)
    } else {
        Color::White
    };
    draw_text_at(buf, x, y, &sprite.text, fg, bg, sprite.walking);

    if let Some(text) = &sprite.speech {
        let bubble = format!("‹ {text} ›");
        let w = text_width(&bubble) as i32;
        let bx = (x - w / 2 + 1).clamp(0, (buf.w as i32 - w).max(0));
        // above the pet, or below when it hugs the top
        let by = if y >= 1 { y - 1 } else { y + 1 };
        if by < page_rows as i32 {
            draw_text_at(buf, bx, by, &bubble, pal.fg(Color::Black), pal.bg(Color::White), false);
        }
    }
}

/* -----------------------------
   HUD + overlays
------------------------------ */

pub(crate) fn draw_status_line(buf: &mut CellBuffer, text: &str, pal: Palette) {
    let y = buf.h.saturating_sub(1);
    let bg = pal.bg(Color::DarkGrey);
    for x in 0..buf.w {
        buf.set(x, y, Cell::blank(bg));
    }
    draw_text(buf, 0, y, text, Color::White, bg);
}

pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let w = buf.w;
    let h = buf.h;
    let lines = body.lines().count() as u16;

    let bw = 62.min(w.saturating_sub(4)).max(2);
    let bh = (lines + 5).min(h.saturating_sub(2)).max(2);
    let x0 = w.saturating_sub(bw) / 2;
    let y0 = h.saturating_sub(bh) / 2;

    let fg = Color::White;
    let bg = Color::Black;
    let edge = |ch| Cell::glyph(ch, fg, bg, false);

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            buf.set(x, y, edge(' '));
        }
    }
    for x in x0..x0 + bw {
        buf.set(x, y0, edge('─'));
        buf.set(x, y0 + bh - 1, edge('─'));
    }
    for y in y0..y0 + bh {
        buf.set(x0, y, edge('│'));
        buf.set(x0 + bw - 1, y, edge('│'));
    }
    buf.set(x0, y0, edge('┌'));
    buf.set(x0 + bw - 1, y0, edge('┐'));
    buf.set(x0, y0 + bh - 1, edge('└'));
    buf.set(x0 + bw - 1, y0 + bh - 1, edge('┘'));

    draw_text_at(buf, x0 as i32 + 2, y0 as i32 + 1, title, fg, bg, true);
    let mut yy = y0 + 3;
    for line in body.lines() {
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, line, fg, bg);
        yy += 1;
    }
}
