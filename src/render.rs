use crate::assets::{Bitmap, SpriteSheet};
use crate::model::{Bounds, GameState, Scene};
use crate::sim::motion_status;
use crossterm::{
    cursor,
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::cmp::{max, min, Reverse};
use std::io::{self, Write};

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
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            c.ch = ' ';
            c.fg = Color::White;
            c.bg = bg;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Pixel>,
}

impl PixelCanvas {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn clear(&mut self, p: Pixel) {
        self.px.fill(p);
    }
    pub(crate) fn put(&mut self, x: i32, y: i32, p: Pixel) {
        if x < 0 || y < 0 || x as u32 >= self.w || y as u32 >= self.h {
            return;
        }
        let i = self.idx(x as u32, y as u32);
        self.px[i] = p;
    }
    pub(crate) fn blend_over(&mut self, x: i32, y: i32, src: Pixel) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0;

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            let out = (sc * sa + dc * da * (1.0 - sa)) / out_a;
            (out.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: (out_a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        };
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
    pub(crate) canvas: PixelCanvas,
    active: bool,
    force_full: bool,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        let prev = CellBuffer::new(cols, rows);
        let cur = CellBuffer::new(cols, rows);

        // Braille: 2×4 pixels per cell
        let canvas = PixelCanvas::new(cols as u32 * 2, rows as u32 * 4);

        Ok(Self {
            out,
            cols,
            rows,
            prev,
            cur,
            canvas,
            active: true,
            force_full: true,
        })
    }

    /// Restores the user's screen. Safe to call more than once.
    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
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
        self.canvas = PixelCanvas::new(c as u32 * 2, r as u32 * 4);
        // prev no longer matches what is on screen
        queue!(self.out, ResetColor, Clear(ClearType::All))?;
        self.force_full = true;
        Ok(true)
    }

    pub(crate) fn viewport(&self) -> Viewport {
        pet_viewport(self.cols, self.rows)
    }

    /// Writes only the cells that changed since the last frame.
    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        let full = std::mem::take(&mut self.force_full);
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if !full && c == self.prev.cells[i] {
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

impl Drop for Terminal {
    fn drop(&mut self) {
        // a panic unwinding through the loop must not leave raw mode behind
        let _ = self.end();
    }
}

/* -----------------------------
   Braille encoding: 2×4 pixels -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    // Dot mapping:
    // (0,0)=1 (0,1)=2 (0,2)=4 (0,3)=64
    // (1,0)=8 (1,1)=16 (1,2)=32 (1,3)=128
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Below this squared RGB distance a cell counts as a single flat color.
const SPLIT_THRESHOLD: i32 = 24 * 24 * 3;

fn dist2(a: [i32; 3], b: [i32; 3]) -> i32 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

fn mean(group: &[[i32; 3]]) -> Color {
    let n = group.len().max(1) as i32;
    let sum = group.iter().fold([0i32; 3], |acc, c| {
        [acc[0] + c[0], acc[1] + c[1], acc[2] + c[2]]
    });
    Color::Rgb {
        r: (sum[0] / n) as u8,
        g: (sum[1] / n) as u8,
        b: (sum[2] / n) as u8,
    }
}

/// Each cell is split into two color groups: the dominant color seeds the
/// background group, the sub-pixel farthest from it seeds the dots. Flat cells
/// become a plain background. Transparent sub-pixels take the color of `bg`.
pub(crate) fn canvas_to_cells(
    canvas: &PixelCanvas,
    out: &mut CellBuffer,
    enable_color: bool,
    bg: Color,
) {
    let bg_rgb = match bg {
        Color::Rgb { r, g, b } => [r as i32, g as i32, b as i32],
        _ => [0, 0, 0],
    };

    for cy in 0..out.h as u32 {
        for cx in 0..out.w as u32 {
            let mut samples: Vec<(u32, u32, [i32; 3])> = Vec::with_capacity(8);
            for dy in 0..4 {
                for dx in 0..2 {
                    let (x, y) = (cx * 2 + dx, cy * 4 + dy);
                    if x >= canvas.w || y >= canvas.h {
                        continue;
                    }
                    let p = canvas.px[canvas.idx(x, y)];
                    let rgb = if p.a >= 32 {
                        [p.r as i32, p.g as i32, p.b as i32]
                    } else {
                        bg_rgb
                    };
                    samples.push((dx, dy, rgb));
                }
            }

            // dominant color, earliest sub-pixel wins ties
            let Some(seed_bg) = samples
                .iter()
                .map(|s| s.2)
                .min_by_key(|c| {
                    Reverse(
                        samples
                            .iter()
                            .filter(|o| dist2(o.2, *c) < SPLIT_THRESHOLD)
                            .count(),
                    )
                })
            else {
                continue;
            };
            let seed_ink = samples
                .iter()
                .map(|s| s.2)
                .max_by_key(|c| dist2(*c, seed_bg))
                .unwrap_or(seed_bg);

            let mut cell = Cell {
                ch: ' ',
                fg: Color::White,
                bg,
            };
            if dist2(seed_ink, seed_bg) < SPLIT_THRESHOLD {
                if enable_color {
                    let flat: Vec<[i32; 3]> = samples.iter().map(|s| s.2).collect();
                    cell.bg = mean(&flat);
                }
                out.set(cx as u16, cy as u16, cell);
                continue;
            }

            let mut mask: u8 = 0;
            let mut ink = Vec::with_capacity(8);
            let mut back = Vec::with_capacity(8);
            for (dx, dy, rgb) in samples {
                if dist2(rgb, seed_ink) < dist2(rgb, seed_bg) {
                    mask |= braille_bit(dx, dy);
                    ink.push(rgb);
                } else {
                    back.push(rgb);
                }
            }

            cell.ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
            if enable_color {
                cell.fg = mean(&ink);
                cell.bg = mean(&back);
            }
            out.set(cx as u16, cy as u16, cell);
        }
    }
}

/* -----------------------------
   Drawing surface + pet scene
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rect {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) w: i32,
    pub(crate) h: i32,
}

pub(crate) const SKY: Pixel = Pixel {
    r: 0xAD,
    g: 0xD8,
    b: 0xE6,
    a: 255,
};
pub(crate) const GRASS: Pixel = Pixel {
    r: 0x90,
    g: 0xEE,
    b: 0x90,
    a: 255,
};

/// Something the pet scene can be painted on.
pub(crate) trait Surface {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: Pixel);
    /// Nearest-neighbour scaled blit of `img` into `dst`.
    fn draw_image(&mut self, img: &Bitmap, dst: Rect, mirrored: bool);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Viewport {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) w: i32,
    pub(crate) h: i32,
}

impl Viewport {
    pub(crate) fn bounds(&self) -> Bounds {
        Bounds {
            width: self.w as f32,
            height: self.h as f32,
        }
    }
}

/// Pet area in braille sub-pixels: everything right of the text panel.
pub(crate) fn pet_viewport(cols: u16, rows: u16) -> Viewport {
    let cols = cols as i32;
    let rows = rows as i32;
    let panel_w_cells = min(max(26, cols / 3), cols - 10).max(0);
    Viewport {
        x: panel_w_cells * 2,
        y: 0,
        w: (cols - panel_w_cells).max(0) * 2,
        h: rows * 4,
    }
}

/// The braille canvas seen through a viewport; coordinates are local.
pub(crate) struct ViewportSurface<'a> {
    canvas: &'a mut PixelCanvas,
    vp: Viewport,
}

impl<'a> ViewportSurface<'a> {
    pub(crate) fn new(canvas: &'a mut PixelCanvas, vp: Viewport) -> Self {
        Self { canvas, vp }
    }
}

impl Surface for ViewportSurface<'_> {
    fn width(&self) -> i32 {
        self.vp.w
    }

    fn height(&self) -> i32 {
        self.vp.h
    }

    fn clear(&mut self) {
        for y in 0..self.vp.h {
            for x in 0..self.vp.w {
                self.canvas.put(self.vp.x + x, self.vp.y + y, Pixel::default());
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Pixel) {
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = (rect.x + rect.w).min(self.vp.w);
        let y1 = (rect.y + rect.h).min(self.vp.h);
        for y in y0..y1 {
            for x in x0..x1 {
                self.canvas.blend_over(self.vp.x + x, self.vp.y + y, color);
            }
        }
    }

    fn draw_image(&mut self, img: &Bitmap, dst: Rect, mirrored: bool) {
        if img.w == 0 || img.h == 0 || dst.w <= 0 || dst.h <= 0 {
            return;
        }
        // only the part of dst that lands inside the viewport
        let (dx0, dx1) = (dst.x.saturating_neg().max(0), dst.w.min(self.vp.w.saturating_sub(dst.x)));
        let (dy0, dy1) = (dst.y.saturating_neg().max(0), dst.h.min(self.vp.h.saturating_sub(dst.y)));
        for dy in dy0..dy1 {
            let sy = (dy as u64 * img.h as u64 / dst.h as u64) as u32;
            for dx in dx0..dx1 {
                let (x, y) = (dst.x + dx, dst.y + dy);
                let mut sx = (dx as u64 * img.w as u64 / dst.w as u64) as u32;
                if mirrored {
                    sx = img.w - 1 - sx;
                }
                let p = img.get(sx, sy);
                if p.a == 0 {
                    continue;
                }
                self.canvas.blend_over(self.vp.x + x, self.vp.y + y, p);
            }
        }
    }
}

/// Background (sky over grass) and the pet sprite, once per frame.
pub(crate) fn draw_scene(surface: &mut impl Surface, st: &GameState, sprites: &SpriteSheet) {
    surface.clear();

    let (w, h) = (surface.width(), surface.height());
    let horizon = h * 2 / 3;
    surface.fill_rect(
        Rect {
            x: 0,
            y: horizon,
            w,
            h: h - horizon,
        },
        GRASS,
    );
    surface.fill_rect(
        Rect {
            x: 0,
            y: 0,
            w,
            h: horizon,
        },
        SKY,
    );

    let pet = &st.sprite;
    let (img, mirrored) = sprites.resolve(pet.sprite());
    let dst = Rect {
        x: pet.pos.x.round() as i32,
        y: pet.pos.y.round() as i32,
        w: pet.size.x.round() as i32,
        h: pet.size.y.round() as i32,
    };
    surface.draw_image(img, dst, mirrored);
}

/* -----------------------------
   UI overlay (text + meters)
------------------------------ */

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(
            xx,
            y,
            Cell {
                ch,
                fg,
                bg,
            },
        );
    }
}

fn bar(value01: f32, width: usize) -> String {
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

pub(crate) fn ui_overlay(buf: &mut CellBuffer, st: &GameState) {
    let bg = Color::Black;
    let fg = Color::White;

    let title = format!("RetroPet  |  {}", motion_status(&st.sprite));
    draw_text(buf, 1, 0, &title, fg, bg);

    let s = st.stats;
    let lines = [
        ("Happy ", s.happiness),
        ("Hunger", s.hunger),
        ("Clean ", s.cleanliness),
        ("Health", s.health),
    ];
    for (i, (name, val)) in lines.iter().enumerate() {
        let b = bar(*val as f32 / 100.0, 12);
        let line = format!("{name}: {b} {:>3}", val);
        draw_text(buf, 1, 2 + i as u16, &line, fg, bg);
    }

    let care = match &st.last_care {
        Some(c) => format!("Last care: {} at {}", c.action, c.at.format("%H:%M:%S")),
        None => "Last care: -".to_string(),
    };
    draw_text(buf, 1, 7, &care, fg, bg);

    if st.controls_locked() {
        draw_text(buf, 1, 9, "Shh... controls locked", Color::Yellow, bg);
    }

    let help = match st.scene {
        Scene::Main => "q quit | f feed | p play | c clean | s sleep | h heal | ? help",
        Scene::Help => "Help: esc back | ? close | q quit",
    };
    draw_text(buf, 1, buf.h.saturating_sub(1), help, fg, bg);
}

pub(crate) const HELP_TEXT: &str = "Keep your pig fed, clean and happy.\n\n\
    F Feed: -hunger, +happiness\n\
    P Play: +happiness, +hunger\n\
    C Clean: cleanliness back to 100\n\
    S Sleep: +health, +hunger; naps at the next landing\n\
    H Heal: health back to 100\n\n\
    Esc or ? to close help.";

pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str) {
    let (w, h) = (buf.w, buf.h);
    let bw = min(60, w.saturating_sub(4));
    let bh = min(16, h.saturating_sub(4));
    if bw < 2 || bh < 2 {
        return;
    }
    let x0 = (w - bw) / 2;
    let y0 = (h - bh) / 2;

    let frame = |ch: char| Cell {
        ch,
        fg: Color::White,
        bg: Color::Black,
    };
    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            let top_or_bottom = y == y0 || y == y0 + bh - 1;
            let side = x == x0 || x == x0 + bw - 1;
            let ch = match (top_or_bottom, side) {
                (true, true) => match (x == x0, y == y0) {
                    (true, true) => '┌',
                    (false, true) => '┐',
                    (true, false) => '└',
                    (false, false) => '┘',
                },
                (true, false) => '─',
                (false, true) => '│',
                (false, false) => ' ',
            };
            buf.set(x, y, frame(ch));
        }
    }

    draw_text(buf, x0 + 2, y0 + 1, title, Color::White, Color::Black);
    for (i, line) in body.lines().enumerate() {
        let yy = y0 + 3 + i as u16;
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, line, Color::White, Color::Black);
    }
}
