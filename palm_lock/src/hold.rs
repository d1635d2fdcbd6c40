//! Hold-to-toggle lock state machine.
//!
//! ```text
//!            palm open                     palm open, elapsed < threshold
//!   Idle ─────────────────▶ Holding ◀──────────────────────────────┐
//!    ▲                        │  └──────────────────────────────────┘
//!    │  palm lost / no hand   │
//!    ├────────────────────────┤
//!    │  elapsed ≥ threshold   │
//!    └────────────────────────┘   (flips `locked`, fires once per hold)
//! ```
//!
//! The lock flag is orthogonal to Idle/Holding.  Time is always supplied by
//! the caller, so the machine never reads a clock itself and resolution is
//! bounded by how often frames arrive.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::landmark::LandmarkSet;
use crate::posture::is_palm_open;

/// Default dwell time before a held palm toggles the lock.
pub const DEFAULT_HOLD: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoldConfig {
    pub threshold: Duration,
}

impl Default for HoldConfig {
    fn default() -> Self {
        HoldConfig { threshold: DEFAULT_HOLD }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSession — the persistent state
// ════════════════════════════════════════════════════════════════════════════

/// Lock flag plus the running hold, carried from frame to frame.
///
/// `hold_start` is `Some` only while the open palm has been seen on every
/// frame since that instant.  `progress` is in `[0, 100]` and is zero
/// whenever no hold is running.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureSession {
    pub locked:     bool,
    pub hold_start: Option<Instant>,
    pub progress:   f32,
}

impl GestureSession {
    pub fn is_holding(&self) -> bool { self.hold_start.is_some() }

    /// Feed one frame's posture.  Returns the next session and whether the
    /// lock flipped on this frame.
    pub fn advance(self, palm_open: bool, now: Instant, threshold: Duration) -> (GestureSession, bool) {
        if !palm_open {
            let idle = GestureSession { hold_start: None, progress: 0.0, ..self };
            return (idle, false);
        }

        let Some(start) = self.hold_start else {
            let holding = GestureSession { hold_start: Some(now), progress: 0.0, ..self };
            return (holding, false);
        };

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= threshold {
            let toggled = GestureSession { locked: !self.locked, hold_start: None, progress: 0.0 };
            return (toggled, true);
        }

        // Never move backwards within one hold, even if timestamps jitter.
        let progress = (elapsed.as_secs_f32() / threshold.as_secs_f32() * 100.0)
            .min(100.0)
            .max(self.progress);
        (GestureSession { progress, ..self }, false)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HoldTracker
// ════════════════════════════════════════════════════════════════════════════

/// Result of one [`HoldTracker::update`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LockReport {
    pub locked:   bool,
    /// Hold progress after this frame, 0–100.  Zero on the toggle frame.
    pub progress: f32,
    /// The lock flipped on this frame.
    pub toggled:  bool,
}

/// Classifies the lock hand each frame and advances its [`GestureSession`].
#[derive(Clone, Debug, Default)]
pub struct HoldTracker {
    config:  HoldConfig,
    session: GestureSession,
}

impl HoldTracker {
    pub fn new(config: HoldConfig) -> Self {
        HoldTracker { config, session: GestureSession::default() }
    }

    pub fn config(&self)  -> &HoldConfig     { &self.config }
    pub fn session(&self) -> &GestureSession { &self.session }
    pub fn is_locked(&self) -> bool          { self.session.locked }

    /// Call exactly once per frame.  `None` means the lock hand was not
    /// seen, which ends any running hold.
    pub fn update(&mut self, hand: Option<&LandmarkSet>, now: Instant) -> LockReport {
        let palm_open = hand.is_some_and(is_palm_open);
        let before = self.session;
        let (after, toggled) = before.advance(palm_open, now, self.config.threshold);
        self.session = after;

        if toggled {
            info!("volume {}", if after.locked { "locked" } else { "unlocked" });
        } else if after.is_holding() && !before.is_holding() {
            debug!("palm hold started");
        } else if before.is_holding() && !after.is_holding() {
            debug!("palm hold reset at {:.1}%", before.progress);
        } else if after.is_holding() {
            debug!("palm hold progress {:.1}%", after.progress);
        }

        LockReport { locked: after.locked, progress: after.progress, toggled }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
