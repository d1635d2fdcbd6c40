//! # gesture_volume
//!
//! Two-hand gesture controller for the system output volume, with a HUD.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Hand | Action |
//! |---|---|---|
//! | Open palm held for `hold_secs` (default 2 s) | Left | Toggle the volume lock |
//! | Thumb–index distance | Right | Set volume (15 px → 0 %, 200 px → 100 %) while unlocked |
//!
//! The lock is decided before the volume on every frame, so a toggle always
//! wins over a volume change landing on the same frame.
//!
//! ## Frame sources
//!
//! * `sim` — keyboard-driven synthetic hands (HUD only).
//! * `stdin` / `file:<path>` — JSON lines from an external hand detector.
//! * `leap` — LeapMotion controller via LeapC (needs the `leap` feature).
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Gesture |
//! |---|---|
//! | `O` (hold) | Open the left palm |
//! | `R` | Show / hide the right hand |
//! | `Up` / `Down` | Widen / narrow the right-hand pinch |
//! | `Q` / `Escape` | Quit |

pub mod frame;
pub mod engine;
pub mod sink;
pub mod settings;
pub mod hud;
pub mod app;
