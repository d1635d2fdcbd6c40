//! Software-rendered HUD using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ STATUS: UNLOCKED                                 │
//! │ VOLUME: 53.0%  [██████████░░░░░░░░]              │
//! │ [hold bar]  HOLD PROGRESS: 40%                   │
//! │                                                  │
//! │        left skeleton          right skeleton     │
//! │                               thumb──index line  │
//! │                                                  │
//! │ HOLD LEFT PALM 2S: LOCK/UNLOCK                   │
//! │ RIGHT HAND: CONTROL VOLUME                       │
//! └──────────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, KeyRepeat, Window, WindowOptions};
use palm_lock::{index, Handedness};

use crate::frame::{HandFrame, SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:       usize = 640;
pub const WIN_H:       usize = 480;
const TEXT_SCALE:      usize = 3;
const SMALL_SCALE:     usize = 2;
const BAR_W:           usize = 200;
const BAR_H:           usize = 20;
const BG_COLOR:        u32   = 0xFF101018;
const WHITE:           u32   = 0xFFFFFFFF;
const GREY:            u32   = 0xFF888888;
const LOCKED_COLOR:    u32   = 0xFFFF3030;
const UNLOCKED_COLOR:  u32   = 0xFF30FF30;
const LEFT_BONE:       u32   = 0xFF66AAFF;
const RIGHT_BONE:      u32   = 0xFFFFAA66;
const JOINT_COLOR:     u32   = 0xFFFF4444;

/// What the HUD shows besides the hands.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HudView {
    pub locked:    bool,
    /// Hold progress 0–100; the bar is hidden at 0.
    pub progress:  f32,
    /// Most recently applied volume level, if any.
    pub volume:    Option<f32>,
    pub hold_secs: f32,
}

// ════════════════════════════════════════════════════════════════════════════
// Hud
// ════════════════════════════════════════════════════════════════════════════

pub struct Hud {
    window: Window,
    buf:    Vec<u32>,
    /// Present when the keyboard drives a [`SimHandSource`](crate::frame::SimHandSource).
    sim_tx: Option<Sender<SimInput>>,
}

impl Hud {
    pub fn new(sim_tx: Option<Sender<SimInput>>) -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "Gesture Volume Control",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Hud {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    fn send(&self, input: SimInput) {
        if let Some(tx) = &self.sim_tx {
            let _ = tx.send(input);
        }
    }

    /// Poll keyboard input and forward it to the sim source.  Returns false
    /// when the window should close.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        if self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            self.send(SimInput::KeyDown(SimKey::Quit));
            return false;
        }

        if self.window.is_key_pressed(Key::O, KeyRepeat::No) {
            self.send(SimInput::KeyDown(SimKey::OpenPalm));
        }
        if self.window.is_key_released(Key::O) {
            self.send(SimInput::KeyUp(SimKey::OpenPalm));
        }
        if self.window.is_key_pressed(Key::R, KeyRepeat::No) {
            self.send(SimInput::KeyDown(SimKey::ToggleRight));
        }
        if self.window.is_key_pressed(Key::Up, KeyRepeat::Yes) {
            self.send(SimInput::KeyDown(SimKey::Wider));
        }
        if self.window.is_key_pressed(Key::Down, KeyRepeat::Yes) {
            self.send(SimInput::KeyDown(SimKey::Narrower));
        }

        true
    }

    /// Render one frame.
    pub fn render(&mut self, frame: Option<&HandFrame>, view: &HudView) {
        self.buf.fill(BG_COLOR);

        // ── Hands ─────────────────────────────────────────────────────────
        if let Some(frame) = frame {
            for hand in &frame.hands {
                let px = hand.landmarks.scaled(WIN_W as f32, WIN_H as f32);
                let bone = match hand.handedness {
                    Handedness::Left  => LEFT_BONE,
                    Handedness::Right => RIGHT_BONE,
                };
                for &(a, b) in index::HAND_CONNECTIONS.iter() {
                    let (pa, pb) = (px.get(a), px.get(b));
                    self.draw_line(pa.x, pa.y, pb.x, pb.y, bone);
                }
                for p in px.points() {
                    self.fill_rect_f(p.x - 2.0, p.y - 2.0, 5, 5, JOINT_COLOR);
                }
                if hand.handedness == Handedness::Right && !view.locked {
                    let (t, i) = (px.get(index::THUMB_TIP), px.get(index::INDEX_TIP));
                    self.draw_line(t.x, t.y, i.x, i.y, UNLOCKED_COLOR);
                }
            }
        }

        // ── Status ────────────────────────────────────────────────────────
        let (status, color) = if view.locked {
            ("STATUS: LOCKED", LOCKED_COLOR)
        } else {
            ("STATUS: UNLOCKED", UNLOCKED_COLOR)
        };
        self.draw_text(status, 10, 10, TEXT_SCALE, color);

        if let Some(volume) = view.volume {
            self.draw_text(&format!("VOLUME: {:.1}%", volume), 10, 40, TEXT_SCALE, WHITE);
            let filled = ((volume / 100.0).clamp(0.0, 1.0) * BAR_W as f32) as usize;
            self.draw_border(330, 38, BAR_W, BAR_H, WHITE);
            self.fill_rect(330, 38, filled, BAR_H, WHITE);
        }

        // ── Hold progress ─────────────────────────────────────────────────
        if view.progress > 0.0 {
            let filled = ((view.progress / 100.0).clamp(0.0, 1.0) * BAR_W as f32) as usize;
            self.draw_border(10, 70, BAR_W, BAR_H, WHITE);
            self.fill_rect(10, 70, filled, BAR_H, UNLOCKED_COLOR);
            self.draw_text(&format!("HOLD PROGRESS: {:.0}%", view.progress), 10, 96, SMALL_SCALE, WHITE);
        }

        // ── Legend ────────────────────────────────────────────────────────
        self.draw_text(
            &format!("HOLD LEFT PALM {}S: LOCK/UNLOCK", view.hold_secs),
            10, WIN_H - 60, SMALL_SCALE, WHITE,
        );
        self.draw_text("RIGHT HAND: CONTROL VOLUME", 10, WIN_H - 44, SMALL_SCALE, WHITE);
        if self.sim_tx.is_some() {
            self.draw_text(
                "O=OPEN PALM  R=RIGHT HAND  UP/DOWN=PINCH  Q=QUIT",
                10, WIN_H - 20, SMALL_SCALE, GREY,
            );
        } else {
            self.draw_text("Q=QUIT", 10, WIN_H - 20, SMALL_SCALE, GREY);
        }

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn fill_rect_f(&mut self, x: f32, y: f32, w: usize, h: usize, color: u32) {
        if x < 0.0 || y < 0.0 { return; }
        self.fill_rect(x as usize, y as usize, w, h, color);
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for col in x..(x+w).min(WIN_W) {
            if y < WIN_H           { self.buf[y           * WIN_W + col] = color; }
            if y+h-1 < WIN_H       { self.buf[(y+h-1)     * WIN_W + col] = color; }
        }
        for row in y..(y+h).min(WIN_H) {
            if x < WIN_W           { self.buf[row * WIN_W + x    ] = color; }
            if x+w-1 < WIN_W       { self.buf[row * WIN_W + x+w-1] = color; }
        }
    }

    fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < WIN_W && (y as usize) < WIN_H {
            self.buf[y as usize * WIN_W + x as usize] = color;
        }
    }

    /// Bresenham line, 2 px thick.
    fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: u32) {
        let (mut x, mut y) = (x0 as isize, y0 as isize);
        let (x1, y1) = (x1 as isize, y1 as isize);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.set_pixel(x, y, color);
            self.set_pixel(x + 1, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// 3×5 bitmap font, each pixel drawn as a `scale`×`scale` block.
    fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hud_text_glyphs_all_defined() {
        let fallback = char_glyph('\u{1}');
        for ch in "STATUS: LOCKED UNLOCKED VOLUME 0123456789.% HOLD PROGRESS Q=QUIT UP/DOWN".chars() {
            if ch == ' ' { continue; }
            assert_ne!(char_glyph(ch), fallback, "missing glyph for {:?}", ch);
        }
    }

    #[test]
    fn glyphs_fit_three_columns() {
        for ch in ('A'..='Z').chain('0'..='9') {
            assert!(char_glyph(ch).iter().all(|&row| row <= 0b111));
        }
    }
}
