//! Multi-frame scenarios driven through `VolumeEngine` with synthetic time.

use std::time::{Duration, Instant};

use gesture_volume::engine::VolumeEngine;
use gesture_volume::frame::{parse_frame_line, synthetic_hand, HandFrame, SimPose};
use gesture_volume::settings::Settings;
use palm_lock::{HandObservation, Handedness};
use volume_map::{Application, SinkError, VolumeSink};

#[derive(Default)]
struct Recorder {
    calls: Vec<u8>,
    fail:  bool,
}

impl VolumeSink for Recorder {
    fn set_volume(&mut self, percent: u8) -> Result<(), SinkError> {
        self.calls.push(percent);
        if self.fail {
            Err(SinkError::Status { program: "recorder", code: Some(1) })
        } else {
            Ok(())
        }
    }
    fn name(&self) -> &'static str { "recorder" }
}

fn engine() -> VolumeEngine<Recorder> {
    VolumeEngine::from_settings(&Settings::default(), Recorder::default())
}

fn ms(t0: Instant, n: u64) -> Instant {
    t0 + Duration::from_millis(n)
}

fn pose(left_open: bool, right_visible: bool, pinch_px: f32) -> HandFrame {
    SimPose { left_open, right_visible, pinch_px }.frame(480.0)
}

fn only_left(open: bool) -> HandFrame {
    pose(open, false, 0.0)
}

#[test]
fn open_palm_held_for_two_seconds_locks() {
    let mut e = engine();
    let t0 = Instant::now();

    let mut reports = Vec::new();
    for step in 0..=4 {
        reports.push(e.process(&only_left(true), ms(t0, step * 500)).lock);
    }

    let progress: Vec<f32> = reports.iter().map(|r| r.progress).collect();
    assert_eq!(progress[0], 0.0);
    assert!((progress[1] - 25.0).abs() < 0.01);
    assert!((progress[2] - 50.0).abs() < 0.01);
    assert!((progress[3] - 75.0).abs() < 0.01);
    assert!(reports[..4].iter().all(|r| !r.toggled && !r.locked));

    assert!(reports[4].toggled);
    assert!(reports[4].locked);
    assert_eq!(reports[4].progress, 0.0);
    assert!(e.is_locked());

    // Still holding at 2.5 s: a fresh hold starts, the lock stays put.
    let after = e.process(&only_left(true), ms(t0, 2500)).lock;
    assert!(!after.toggled);
    assert!(after.locked);
    assert_eq!(after.progress, 0.0);
    assert!(e.tracker().session().is_holding());
    assert_eq!(e.tracker().session().hold_start, Some(ms(t0, 2500)));
}

#[test]
fn missing_left_hand_restarts_the_hold() {
    let mut e = engine();
    let t0 = Instant::now();

    e.process(&only_left(true), t0);
    let gone = e.process(&HandFrame::default(), ms(t0, 500));
    assert_eq!(gone.lock.progress, 0.0);

    // Hold restarts at 0.6 s, so nothing happens at 2.0 s.
    e.process(&only_left(true), ms(t0, 600));
    let at_two = e.process(&only_left(true), ms(t0, 2000));
    assert!(!at_two.lock.toggled);
    assert!(!at_two.lock.locked);
    assert!((at_two.lock.progress - 70.0).abs() < 0.01);

    let at_two_six = e.process(&only_left(true), ms(t0, 2600));
    assert!(at_two_six.lock.toggled);
}

#[test]
fn fist_resets_progress() {
    let mut e = engine();
    let t0 = Instant::now();
    e.process(&only_left(true), t0);
    e.process(&only_left(true), ms(t0, 1500));
    let fist = e.process(&only_left(false), ms(t0, 1600));
    assert_eq!(fist.lock.progress, 0.0);
    assert!(!e.tracker().session().is_holding());
}

#[test]
fn sink_untouched_while_locked() {
    let mut e = engine();
    let t0 = Instant::now();

    e.process(&only_left(true), t0);
    e.process(&only_left(true), ms(t0, 2000));
    assert!(e.is_locked());

    for (i, pinch) in [0.0, 100.0, 300.0].into_iter().enumerate() {
        let out = e.process(&pose(false, true, pinch), ms(t0, 2100 + i as u64 * 100));
        let control = out.control.expect("right hand seen");
        assert!(matches!(control.application, Application::Locked));
    }
    assert!(e.sink().calls.is_empty());
    assert_eq!(e.control_state().last_applied, None);
}

#[test]
fn one_sink_call_per_unlocked_frame() {
    let mut e = engine();
    let t0 = Instant::now();

    e.process(&pose(false, true, 300.0), t0);
    e.process(&pose(false, true, 300.0), ms(t0, 33));
    e.process(&pose(false, true, 0.0), ms(t0, 66));
    e.process(&pose(false, false, 0.0), ms(t0, 99));

    assert_eq!(e.sink().calls, vec![100, 100, 0]);
    assert_eq!(e.control_state().last_applied, Some(0));
}

#[test]
fn toggle_takes_effect_before_volume_on_same_frame() {
    let mut e = engine();
    let t0 = Instant::now();

    let first = e.process(&pose(true, true, 300.0), t0);
    assert_eq!(first.applied(), Some(100));

    let second = e.process(&pose(true, true, 0.0), ms(t0, 2000));
    assert!(second.lock.toggled);
    assert_eq!(second.applied(), None);
    assert_eq!(e.sink().calls, vec![100]);

    // Unlocking on a later hold lets the same frame apply again.
    e.process(&pose(true, true, 0.0), ms(t0, 2100));
    let unlock = e.process(&pose(true, true, 0.0), ms(t0, 4100));
    assert!(unlock.lock.toggled);
    assert!(!unlock.lock.locked);
    assert_eq!(unlock.applied(), Some(0));
}

#[test]
fn first_left_hand_wins_when_label_repeats() {
    let mut e = engine();
    let t0 = Instant::now();

    let frame = |first_open: bool| HandFrame {
        hands: vec![
            HandObservation::new(Handedness::Left, synthetic_hand(0.25, 0.5, first_open, false)),
            HandObservation::new(Handedness::Left, synthetic_hand(0.45, 0.5, !first_open, false)),
        ],
        at: None,
    };

    e.process(&frame(true), t0);
    let held = e.process(&frame(true), ms(t0, 1000));
    assert!((held.lock.progress - 50.0).abs() < 0.01);

    let reset = e.process(&frame(false), ms(t0, 1500));
    assert_eq!(reset.lock.progress, 0.0);
}

#[test]
fn progress_never_decreases_within_a_hold() {
    let mut e = engine();
    let t0 = Instant::now();
    let offsets = [0, 100, 400, 350, 900, 1300, 1250, 1900];

    let mut last = 0.0;
    for &o in &offsets {
        let r = e.process(&only_left(true), ms(t0, o)).lock;
        assert!(r.progress >= last, "progress fell from {last} to {}", r.progress);
        last = r.progress;
    }
}

#[test]
fn failed_sink_keeps_previous_state() {
    let mut e = engine();
    let t0 = Instant::now();
    e.process(&pose(false, true, 300.0), t0);
    assert_eq!(e.control_state().last_applied, Some(100));

    let mut failing = VolumeEngine::from_settings(
        &Settings::default(),
        Recorder { fail: true, ..Recorder::default() },
    );
    let out = failing.process(&pose(false, true, 300.0), t0);
    let control = out.control.expect("right hand seen");
    assert!(matches!(control.application, Application::Failed(_)));
    assert_eq!(failing.control_state().last_applied, None);
    assert_eq!(failing.sink().calls, vec![100]);
}

#[test]
fn feed_line_drives_the_engine() {
    let mut e = engine();
    let fist: Vec<String> = synthetic_hand(0.25, 0.5, false, false)
        .points()
        .iter()
        .map(|p| format!(r#"{{"x":{},"y":{}}}"#, p.x, p.y))
        .collect();
    let line = format!(
        r#"{{"t":0.5,"hands":[{{"handedness":"Left","score":0.9,"landmarks":[{}]}}]}}"#,
        fist.join(",")
    );

    let frame = parse_frame_line(&line, 0.75).expect("valid line");
    assert_eq!(frame.at, Some(Duration::from_millis(500)));
    let out = e.process(&frame, Instant::now());
    assert!(!out.lock.locked);
    assert!(out.control.is_none());
}
