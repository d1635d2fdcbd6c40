//! # volume_map
//!
//! Measures the thumb-tip ↔ index-tip distance of the control hand, maps it
//! linearly onto a 0–100 volume and hands the result to a [`VolumeSink`],
//! unless the lock is engaged.
//!
//! | Distance (px) | Volume |
//! |---|---|
//! | ≤ 15 | 0 |
//! | 107.5 | 50 |
//! | ≥ 200 | 100 |
//!
//! ```rust
//! use volume_map::DistanceRange;
//!
//! let range = DistanceRange::default();
//! assert_eq!(range.percent_for(5.0),   0);
//! assert_eq!(range.percent_for(250.0), 100);
//! ```

use std::io;
use std::process::Command;

use palm_lock::{index, LandmarkSet};
use thiserror::Error;
use tracing::{info, trace, warn};

// ════════════════════════════════════════════════════════════════════════════
// DistanceRange — linear interpolation with clamping
// ════════════════════════════════════════════════════════════════════════════

/// Input distance span mapped onto 0–100.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceRange {
    pub min: f32,
    pub max: f32,
}

impl Default for DistanceRange {
    fn default() -> Self {
        DistanceRange { min: 15.0, max: 200.0 }
    }
}

impl DistanceRange {
    pub fn new(min: f32, max: f32) -> Self {
        DistanceRange { min, max }
    }

    /// Continuous volume level in `[0, 100]`.
    pub fn level_for(&self, distance: f32) -> f32 {
        if distance <= self.min { return 0.0; }
        if distance >= self.max { return 100.0; }
        (distance - self.min) / (self.max - self.min) * 100.0
    }

    /// Integer volume, truncated toward zero.
    pub fn percent_for(&self, distance: f32) -> u8 {
        self.level_for(distance) as u8
    }
}

// ════════════════════════════════════════════════════════════════════════════
// VolumeSink — where volume ends up
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source:  io::Error,
    },
    #[error("{program} exited with status {code:?}")]
    Status { program: &'static str, code: Option<i32> },
    #[error("MIDI output error: {0}")]
    Midi(String),
}

/// Side-effecting volume setter.  Receives integers in `0..=100`.
pub trait VolumeSink {
    fn set_volume(&mut self, percent: u8) -> Result<(), SinkError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

impl<S: VolumeSink + ?Sized> VolumeSink for Box<S> {
    fn set_volume(&mut self, percent: u8) -> Result<(), SinkError> {
        (**self).set_volume(percent)
    }
    fn name(&self) -> &'static str { (**self).name() }
}

fn run_command(program: &'static str, args: &[&str]) -> Result<(), SinkError> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| SinkError::Spawn { program, source })?;
    if status.success() {
        Ok(())
    } else {
        Err(SinkError::Status { program, code: status.code() })
    }
}

// ── macOS ─────────────────────────────────────────────────────────────────

/// `osascript -e "set volume output volume N"`.
#[derive(Debug, Default)]
pub struct OsascriptSink;

impl VolumeSink for OsascriptSink {
    fn set_volume(&mut self, percent: u8) -> Result<(), SinkError> {
        let script = format!("set volume output volume {}", percent.min(100));
        run_command("osascript", &["-e", &script])
    }
    fn name(&self) -> &'static str { "osascript" }
}

// ── Linux / ALSA ──────────────────────────────────────────────────────────

/// `amixer -q sset <control> N%`.
#[derive(Debug)]
pub struct AmixerSink {
    pub control: String,
}

impl Default for AmixerSink {
    fn default() -> Self {
        AmixerSink { control: "Master".to_string() }
    }
}

impl VolumeSink for AmixerSink {
    fn set_volume(&mut self, percent: u8) -> Result<(), SinkError> {
        let level = format!("{}%", percent.min(100));
        run_command("amixer", &["-q", "sset", &self.control, &level])
    }
    fn name(&self) -> &'static str { "amixer" }
}

// ── log only ──────────────────────────────────────────────────────────────

/// Writes each change to the log; used when no real output is wanted.
#[derive(Debug, Default)]
pub struct LogSink {
    last: Option<u8>,
}

impl LogSink {
    pub fn last(&self) -> Option<u8> { self.last }
}

impl VolumeSink for LogSink {
    fn set_volume(&mut self, percent: u8) -> Result<(), SinkError> {
        let percent = percent.min(100);
        if self.last != Some(percent) {
            info!("volume -> {}%", percent);
        }
        self.last = Some(percent);
        Ok(())
    }
    fn name(&self) -> &'static str { "log" }
}

// ════════════════════════════════════════════════════════════════════════════
// ControlMapper
// ════════════════════════════════════════════════════════════════════════════

/// Value most recently accepted by the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlState {
    pub last_applied: Option<u8>,
}

/// What happened to the mapped value on one frame.
#[derive(Debug)]
pub enum Application {
    /// Lock engaged; the sink was not called.
    Locked,
    Applied(u8),
    /// The sink call failed; [`ControlState`] is unchanged.
    Failed(SinkError),
}

#[derive(Debug)]
pub struct ControlOutcome {
    /// Thumb–index distance in the caller's coordinate space.
    pub distance:    f32,
    pub level:       f32,
    pub percent:     u8,
    pub application: Application,
}

impl ControlOutcome {
    pub fn applied(&self) -> Option<u8> {
        match self.application {
            Application::Applied(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ControlMapper {
    range: DistanceRange,
    state: ControlState,
}

impl ControlMapper {
    pub fn new(range: DistanceRange) -> Self {
        ControlMapper { range, state: ControlState::default() }
    }

    pub fn range(&self) -> &DistanceRange { &self.range }
    pub fn state(&self) -> &ControlState  { &self.state }

    /// Map the control hand and, when unlocked, call `sink` exactly once.
    ///
    /// `hand` should already be in pixel space so the distance range is
    /// meaningful on screen.
    pub fn drive(&mut self, hand: &LandmarkSet, locked: bool, sink: &mut dyn VolumeSink) -> ControlOutcome {
        let distance = hand.distance(index::THUMB_TIP, index::INDEX_TIP);
        let level    = self.range.level_for(distance);
        let percent  = self.range.percent_for(distance);
        trace!("finger distance {:.1}px, volume {:.1}%", distance, level);

        let application = if locked {
            Application::Locked
        } else {
            match sink.set_volume(percent) {
                Ok(()) => {
                    self.state.last_applied = Some(percent);
                    Application::Applied(percent)
                }
                Err(e) => {
                    warn!("failed to set volume via {}: {}", sink.name(), e);
                    Application::Failed(e)
                }
            }
        };

        ControlOutcome { distance, level, percent, application }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use palm_lock::{Point, LANDMARK_COUNT};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<u8>,
        fail:  bool,
    }

    impl VolumeSink for Recorder {
        fn set_volume(&mut self, percent: u8) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Status { program: "test", code: Some(1) });
            }
            self.calls.push(percent);
            Ok(())
        }
        fn name(&self) -> &'static str { "recorder" }
    }

    fn pinch(distance: f32) -> LandmarkSet {
        let mut pts = [Point::new(100.0, 100.0); LANDMARK_COUNT];
        pts[index::INDEX_TIP] = Point::new(100.0 + distance, 100.0);
        LandmarkSet::new(pts)
    }

    #[test]
    fn clamps_below_and_above_range() {
        let r = DistanceRange::default();
        for d in [0.0, 10.0, 15.0] { assert_eq!(r.percent_for(d), 0); }
        for d in [200.0, 300.0, 1e6] { assert_eq!(r.percent_for(d), 100); }
    }

    #[test]
    fn midpoint_maps_to_half() {
        let p = DistanceRange::default().percent_for(107.5);
        assert!((49..=50).contains(&p), "got {}", p);
    }

    #[test]
    fn level_is_monotonic() {
        let r = DistanceRange::default();
        let mut prev = -1.0;
        for d in (0..250).map(|i| i as f32) {
            let l = r.level_for(d);
            assert!(l >= prev);
            prev = l;
        }
    }

    #[test]
    fn unlocked_applies_once() {
        let mut m = ControlMapper::default();
        let mut sink = Recorder::default();
        let out = m.drive(&pinch(200.0), false, &mut sink);
        assert_eq!(sink.calls, vec![100]);
        assert_eq!(out.applied(), Some(100));
        assert_eq!(m.state().last_applied, Some(100));
    }

    #[test]
    fn locked_skips_sink_but_reports_value() {
        let mut m = ControlMapper::default();
        let mut sink = Recorder::default();
        let out = m.drive(&pinch(107.5), true, &mut sink);
        assert!(sink.calls.is_empty());
        assert!(matches!(out.application, Application::Locked));
        assert!((out.level - 50.0).abs() < 0.01);
        assert_eq!(m.state().last_applied, None);
    }

    #[test]
    fn sink_failure_keeps_previous_state() {
        let mut m = ControlMapper::default();
        let mut sink = Recorder::default();
        m.drive(&pinch(15.0), false, &mut sink);
        sink.fail = true;
        let out = m.drive(&pinch(200.0), false, &mut sink);
        assert!(matches!(out.application, Application::Failed(_)));
        assert_eq!(m.state().last_applied, Some(0));
    }

    #[test]
    fn log_sink_remembers_last() {
        let mut s = LogSink::default();
        s.set_volume(42).unwrap();
        assert_eq!(s.last(), Some(42));
    }

    #[test]
    fn boxed_sink_forwards() {
        let mut boxed: Box<dyn VolumeSink> = Box::new(LogSink::default());
        assert!(boxed.set_volume(7).is_ok());
        assert_eq!(boxed.name(), "log");
    }
}
