//! # palm_lock
//!
//! Turns per-frame hand landmarks into a debounced lock flag.
//!
//! * [`landmark`] — 21-point hand sets, handedness, and the one-hand-per-label
//!   selection policy.
//! * [`posture`] — frame-local open-palm classifier.
//! * [`hold`] — hold-to-toggle state machine with progress feedback.
//!
//! No clock, camera or detector lives here: callers pass landmarks and the
//! current [`Instant`](std::time::Instant) for each frame.
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use palm_lock::{HoldTracker, HoldConfig};
//!
//! let mut tracker = HoldTracker::new(HoldConfig { threshold: Duration::from_secs(2) });
//! let report = tracker.update(None, Instant::now());
//! assert!(!report.locked);
//! ```

pub mod landmark;
pub mod posture;
pub mod hold;

pub use landmark::{
    index, HandObservation, HandPair, Handedness, LandmarkError, LandmarkSet, Point,
    LANDMARK_COUNT,
};
pub use posture::{extended_fingers, is_palm_open, OPEN_PALM_MIN_EXTENDED};
pub use hold::{GestureSession, HoldConfig, HoldTracker, LockReport, DEFAULT_HOLD};
