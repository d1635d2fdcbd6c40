//! Per-frame orchestration.
//!
//! Each frame: pick at most one Left and one Right hand, update the lock from
//! the Left hand (or its absence), then map the Right hand onto the volume.
//! The lock is always decided first, so a toggle and a volume change can land
//! on the same frame and the toggle wins.

use std::time::Instant;

use tracing::warn;

use palm_lock::{HandPair, HoldConfig, HoldTracker, LockReport};
use volume_map::{ControlMapper, ControlOutcome, ControlState, DistanceRange, VolumeSink};

use crate::frame::HandFrame;
use crate::settings::Settings;

// ════════════════════════════════════════════════════════════════════════════
// FrameClock
// ════════════════════════════════════════════════════════════════════════════

/// Turns a frame into the instant the hold timer sees.
///
/// Frames carrying a feed timestamp are placed relative to `origin`; live
/// frames sample the wall clock once, on arrival.  A timestamp too far out to
/// be represented is treated like a live frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    origin: Instant,
}

impl FrameClock {
    pub fn new(origin: Instant) -> Self { FrameClock { origin } }

    pub fn start() -> Self { FrameClock::new(Instant::now()) }

    pub fn stamp(&self, frame: &HandFrame) -> Instant {
        match frame.at {
            Some(offset) => self.origin.checked_add(offset).unwrap_or_else(|| {
                warn!("feed timestamp {:?} out of range, using arrival time", offset);
                Instant::now()
            }),
            None => Instant::now(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// VolumeEngine
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct FrameOutcome {
    pub lock:    LockReport,
    /// Present when a Right hand was seen this frame.
    pub control: Option<ControlOutcome>,
}

impl FrameOutcome {
    pub fn applied(&self) -> Option<u8> {
        self.control.as_ref().and_then(ControlOutcome::applied)
    }
}

/// Owns all cross-frame state: the lock session, the control state and the
/// sink.  Single-threaded; one [`process`](Self::process) call per frame.
pub struct VolumeEngine<S: VolumeSink> {
    tracker: HoldTracker,
    mapper:  ControlMapper,
    sink:    S,
    width:   f32,
    height:  f32,
}

impl<S: VolumeSink> VolumeEngine<S> {
    pub fn new(hold: HoldConfig, range: DistanceRange, sink: S, width: f32, height: f32) -> Self {
        VolumeEngine {
            tracker: HoldTracker::new(hold),
            mapper:  ControlMapper::new(range),
            sink,
            width,
            height,
        }
    }

    pub fn from_settings(settings: &Settings, sink: S) -> Self {
        Self::new(
            settings.hold_config(),
            settings.distance_range(),
            sink,
            settings.frame_width as f32,
            settings.frame_height as f32,
        )
    }

    pub fn process(&mut self, frame: &HandFrame, now: Instant) -> FrameOutcome {
        let pair = HandPair::select(&frame.hands);

        let lock = self.tracker.update(pair.left.map(|h| &h.landmarks), now);

        let control = match pair.right {
            Some(right) => {
                let px = right.landmarks.scaled(self.width, self.height);
                Some(self.mapper.drive(&px, lock.locked, &mut self.sink))
            }
            None => None,
        };

        FrameOutcome { lock, control }
    }

    pub fn is_locked(&self) -> bool              { self.tracker.is_locked() }
    pub fn tracker(&self) -> &HoldTracker        { &self.tracker }
    pub fn control_state(&self) -> &ControlState { self.mapper.state() }
    pub fn frame_size(&self) -> (f32, f32)       { (self.width, self.height) }
    pub fn sink(&self) -> &S                     { &self.sink }
}
