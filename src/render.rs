use crate::assets::{ReadyGate, Sprites};
use crate::dialogue::{DialogueState, DialogueView};
use crate::sprites::Frame;
use crate::world::{Scene, Vec2, World};
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

pub(crate) const FOOTER_ROWS: u16 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn set_i32(&mut self, x: i32, y: i32, c: Cell) {
        if x >= 0 && y >= 0 {
            self.set(x as u16, y as u16, c);
        }
    }
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                bg,
                ..Cell::default()
            };
        }
    }
    #[cfg(test)]
    pub(crate) fn row_text(&self, y: u16) -> String {
        (0..self.w)
            .filter_map(|x| self.get(x, y))
            .map(|c| c.ch)
            .collect()
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
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
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            DisableMouseCapture,
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   World -> cell mapping
------------------------------ */

#[derive(Clone, Copy, Debug)]
pub(crate) struct ScreenMap {
    pub(crate) cols: u16,
    pub(crate) play_rows: u16,
    sx: f32,
    sy: f32,
}

impl ScreenMap {
    pub(crate) fn new(scene: Scene, cols: u16, rows: u16) -> Self {
        let cols = cols.max(1);
        let play_rows = rows.saturating_sub(FOOTER_ROWS).max(1);
        Self {
            cols,
            play_rows,
            sx: cols as f32 / scene.width,
            sy: play_rows as f32 / scene.height,
        }
    }

    pub(crate) fn to_cell(&self, p: Vec2) -> (i32, i32) {
        ((p.x * self.sx).floor() as i32, (p.y * self.sy).floor() as i32)
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Palette {
    pub(crate) bg: Color,
    pub(crate) fg: Color,
    pub(crate) player: Color,
    pub(crate) chicken: Color,
    pub(crate) box_bg: Color,
    pub(crate) hovered: Color,
    pub(crate) dead_link: Color,
    pub(crate) accent: Color,
}

impl Palette {
    pub(crate) fn new(enable_color: bool) -> Self {
        if !enable_color {
            return Self {
                bg: Color::Black,
                fg: Color::White,
                player: Color::White,
                chicken: Color::White,
                box_bg: Color::Black,
                hovered: Color::White,
                dead_link: Color::White,
                accent: Color::White,
            };
        }
        Self {
            bg: Color::Rgb { r: 12, g: 20, b: 10 },
            fg: Color::Rgb {
                r: 235,
                g: 235,
                b: 235,
            },
            player: Color::Rgb {
                r: 140,
                g: 200,
                b: 255,
            },
            chicken: Color::Rgb {
                r: 255,
                g: 240,
                b: 200,
            },
            box_bg: Color::Rgb { r: 8, g: 8, b: 12 },
            hovered: Color::Yellow,
            dead_link: Color::Red,
            accent: Color::Rgb {
                r: 255,
                g: 220,
                b: 140,
            },
        }
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

fn draw_text_i32(buf: &mut CellBuffer, x: i32, y: i32, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        buf.set_i32(x + i as i32, y, Cell { ch, fg, bg });
    }
}

pub(crate) fn draw_sprite(buf: &mut CellBuffer, frame: Frame<'_>, x: i32, y: i32, fg: Color, bg: Color) {
    for dy in 0..frame.height() {
        for dx in 0..frame.width() {
            if let Some(ch) = frame.glyph(dx, dy) {
                buf.set_i32(x + dx as i32, y + dy as i32, Cell { ch, fg, bg });
            }
        }
    }
}

pub(crate) fn draw_world(
    buf: &mut CellBuffer,
    map: &ScreenMap,
    world: &World,
    sprites: &Sprites,
    pal: &Palette,
) {
    let c = &world.chicken;
    let sheet = if c.eating {
        &sprites.chicken_eat
    } else {
        &sprites.chicken_walk
    };
    let (cx, cy) = map.to_cell(c.pos);
    draw_sprite(buf, sheet.frame(c.anim.frame, c.row), cx, cy, pal.chicken, pal.bg);

    let p = &world.player;
    let (px, py) = map.to_cell(p.pos);
    draw_sprite(
        buf,
        sprites.player.frame(p.anim.frame, p.row),
        px,
        py,
        pal.player,
        pal.bg,
    );
}

/// Talk indicator and transient message above the chicken.
pub(crate) fn draw_npc_overlay(
    buf: &mut CellBuffer,
    map: &ScreenMap,
    world: &World,
    view: &DialogueView,
    pal: &Palette,
) {
    let (cx, cy) = map.to_cell(world.chicken.pos);
    if view.show_indicator {
        draw_text_i32(buf, cx + 1, cy - 1, "[..]", pal.accent, pal.bg);
    }
    if let Some(msg) = &view.transient_message {
        draw_text_i32(buf, cx, cy - 1, msg, pal.fg, pal.bg);
    }
}

/// Greedy word wrap by character count. Words longer than the line are split.
pub(crate) fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split(' ') {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed <= max_width || current_len == 0 {
            if current_len > 0 {
                current.push(' ');
            }
            current.extend(word.iter());
            current_len = needed;
        } else {
            lines.push(std::mem::take(&mut current));
            current.extend(word.iter());
            current_len = word.len();
        }
    }
    lines.push(current);
    lines
}

/// Screen row of a visible choice, for mouse hit testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ChoiceRow {
    pub(crate) row: u16,
    pub(crate) index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BoxLayout {
    pub(crate) x: u16,
    pub(crate) width: u16,
    pub(crate) top: u16,
    pub(crate) height: u16,
    pub(crate) target_height: u16,
}

pub(crate) fn box_layout(view: &DialogueView, map: &ScreenMap, box_row_ms: f32) -> BoxLayout {
    let x = 1u16;
    let width = map.cols.saturating_sub(2).max(4);
    let text_w = width.saturating_sub(4).max(1) as usize;
    let text_lines = wrap_text(&view.npc_text, text_w).len();
    let target = (2 + text_lines + view.choices.len()).min(map.play_rows as usize) as u16;
    let grown = 1 + (view.box_anim_ms / box_row_ms.max(1.0)) as u16;
    let height = grown.min(target).max(1);
    BoxLayout {
        x,
        width,
        top: map.play_rows.saturating_sub(height),
        height,
        target_height: target,
    }
}

pub(crate) fn draw_dialogue(
    buf: &mut CellBuffer,
    map: &ScreenMap,
    view: &DialogueView,
    box_row_ms: f32,
    pal: &Palette,
) -> Vec<ChoiceRow> {
    let mut rows = Vec::new();
    if !(view.is_active && view.in_range) {
        return rows;
    }

    let b = box_layout(view, map, box_row_ms);
    let bottom = b.top + b.height - 1;
    let right = b.x + b.width - 1;
    for y in b.top..=bottom {
        for x in b.x..=right {
            let ch = match (x == b.x, x == right, y == b.top, y == bottom) {
                (true, _, true, _) => '┌',
                (_, true, true, _) => '┐',
                (true, _, _, true) => '└',
                (_, true, _, true) => '┘',
                (_, _, true, _) | (_, _, _, true) => '─',
                (true, _, _, _) | (_, true, _, _) => '│',
                _ => ' ',
            };
            buf.set(
                x,
                y,
                Cell {
                    ch,
                    fg: pal.fg,
                    bg: pal.box_bg,
                },
            );
        }
    }
    if b.height < 3 {
        return rows;
    }

    let text_x = b.x + 2;
    let text_w = b.width.saturating_sub(4).max(1) as usize;
    let inner_top = b.top + 1;
    let inner_rows = b.height - 2;

    for (i, line) in wrap_text(&view.streamed_text, text_w).iter().enumerate() {
        if i as u16 >= inner_rows {
            break;
        }
        draw_text(buf, text_x, inner_top + i as u16, line, pal.fg, pal.box_bg);
    }

    if view.choices_visible {
        let offset = wrap_text(&view.npc_text, text_w).len();
        for (i, choice) in view.choices.iter().enumerate() {
            let row_in_box = (offset + i) as u16;
            if row_in_box >= inner_rows {
                break;
            }
            let (marker, fg) = if choice.dead_link {
                ('x', pal.dead_link)
            } else if choice.hovered {
                ('>', pal.hovered)
            } else {
                (' ', pal.fg)
            };
            let label = format!("{marker}{}. {}", i + 1, choice.text);
            let row = inner_top + row_in_box;
            draw_text(buf, text_x, row, &label, fg, pal.box_bg);
            rows.push(ChoiceRow { row, index: i });
        }
    }
    rows
}

pub(crate) fn draw_footer(buf: &mut CellBuffer, view: &DialogueView, pal: &Palette) {
    let help = match view.state {
        DialogueState::Idle => "Move: arrows/wasd | q quit",
        DialogueState::Available => "Space talk | Move: arrows/wasd | q quit",
        DialogueState::Ended => "The chicken is done talking | Space bawk | q quit",
        DialogueState::Streaming => "Space skip | q quit",
        DialogueState::AwaitingChoice => "1-9 or click to choose | q quit",
        DialogueState::DeadLinkShown => "That leads nowhere, choose it again to leave | q quit",
    };
    let y = buf.h.saturating_sub(1);
    for x in 0..buf.w {
        buf.set(
            x,
            y,
            Cell {
                ch: ' ',
                fg: pal.fg,
                bg: Color::Black,
            },
        );
    }
    draw_text(buf, 1, y, help, pal.fg, Color::Black);
}

pub(crate) fn draw_loading(buf: &mut CellBuffer, gate: ReadyGate, pal: &Palette) {
    let msg = format!("Loading... {}/{}", gate.loaded(), gate.expected());
    let x = (buf.w / 2).saturating_sub(msg.len() as u16 / 2);
    let y = buf.h / 2;
    draw_text(buf, x, y, &msg, pal.fg, pal.bg);
}
