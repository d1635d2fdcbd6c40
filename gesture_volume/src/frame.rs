//! Hand frame sources: a JSON landmark feed, keyboard simulation, or
//! LeapMotion hardware.
//!
//! Every source delivers [`FrameEvent`]s over an `mpsc` channel, one
//! [`HandFrame`] per detector frame.  Frames with no hands are still sent:
//! absence of the lock hand is meaningful input.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use palm_lock::{index, HandObservation, Handedness, LandmarkSet, Point, LANDMARK_COUNT};
use serde::Deserialize;
use tracing::{debug, warn};

// ════════════════════════════════════════════════════════════════════════════
// HandFrame / FrameEvent
// ════════════════════════════════════════════════════════════════════════════

/// All hands the detector reported for one frame, landmarks normalised.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandFrame {
    pub hands: Vec<HandObservation>,
    /// Capture time relative to the start of the feed, when the source knows
    /// it.  Live frames leave this `None` and are stamped on arrival.
    pub at:    Option<Duration>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    Frame(HandFrame),
    /// The source is finished (end of feed, or the user quit).
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`FrameEvent`]s over a channel.
pub trait FrameSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>);
}

/// Spawn a frame source on its own thread and return the receiving end.
pub fn spawn_frame_source(source: Box<dyn FrameSource>) -> Receiver<FrameEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || source.run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource — landmark feed from a detector process
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct HandJson {
    handedness: String,
    #[serde(default = "full_score")]
    score:      f32,
    landmarks:  Vec<Point>,
}

fn full_score() -> f32 { 1.0 }

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    t:     Option<f64>,
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one line of the landmark feed.
///
/// ```json
/// {"t": 0.033, "hands": [{"handedness": "Left", "score": 0.93,
///   "landmarks": [{"x": 0.41, "y": 0.62, "z": -0.01}, ...]}]}
/// ```
///
/// Hands below `min_score`, with an unknown label or with the wrong number of
/// landmarks are dropped with a warning; the rest of the frame survives.
pub fn parse_frame_line(line: &str, min_score: f32) -> Result<HandFrame, serde_json::Error> {
    let det: DetectionJson = serde_json::from_str(line)?;

    if let Some(error) = det.error {
        warn!("detector error: {}", error);
    }

    let at = det.t.and_then(|t| Duration::try_from_secs_f64(t).ok());
    let mut hands = Vec::with_capacity(det.hands.len());
    for hand in det.hands {
        if hand.score < min_score {
            debug!("dropping {} hand with score {:.2}", hand.handedness, hand.score);
            continue;
        }
        let handedness: Handedness = match hand.handedness.parse() {
            Ok(h)  => h,
            Err(e) => { warn!("{}", e); continue; }
        };
        match LandmarkSet::try_from(hand.landmarks) {
            Ok(landmarks) => hands.push(HandObservation::new(handedness, landmarks)),
            Err(e)        => warn!("dropping {} hand: {}", handedness, e),
        }
    }

    Ok(HandFrame { hands, at })
}

/// Reads newline-delimited detection results, e.g. piped from a MediaPipe
/// sidecar.  Sends [`FrameEvent::Quit`] at end of input.
pub struct JsonLinesSource {
    reader:    Box<dyn BufRead + Send>,
    min_score: f32,
}

impl JsonLinesSource {
    pub fn new(reader: Box<dyn BufRead + Send>, min_score: f32) -> Self {
        JsonLinesSource { reader, min_score }
    }

    pub fn stdin(min_score: f32) -> Self {
        Self::new(Box::new(BufReader::new(io::stdin())), min_score)
    }

    pub fn open(path: &Path, min_score: f32) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(Box::new(BufReader::new(file)), min_score))
    }
}

impl FrameSource for JsonLinesSource {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>) {
        let min_score = self.min_score;
        for (n, line) in self.reader.lines().enumerate() {
            let line = match line {
                Ok(l)  => l,
                Err(e) => { warn!("landmark feed read error: {}", e); break; }
            };
            if line.trim().is_empty() { continue; }
            match parse_frame_line(&line, min_score) {
                Ok(frame) => {
                    if tx.send(FrameEvent::Frame(frame)).is_err() { return; }
                }
                Err(e) => warn!("skipping malformed feed line {}: {}", n + 1, e),
            }
        }
        let _ = tx.send(FrameEvent::Quit);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource — keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the HUD window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    KeyDown(SimKey),
    KeyUp(SimKey),
}

/// Simulated key codes (mapped from minifb Key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    OpenPalm,      // O (held)
    ToggleRight,   // R
    Wider,         // Up
    Narrower,      // Down
    Quit,          // Q
}

const PINCH_STEP_PX: f32 = 5.0;
const PINCH_MAX_PX:  f32 = 300.0;

/// Simulated pose: a left hand that is open or a fist, and an optional
/// right hand with a given thumb–index gap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimPose {
    pub left_open:     bool,
    pub right_visible: bool,
    /// Thumb–index gap in pixels.
    pub pinch_px:      f32,
}

impl Default for SimPose {
    fn default() -> Self {
        SimPose { left_open: false, right_visible: true, pinch_px: 100.0 }
    }
}

impl SimPose {
    /// Apply one input.  Returns false when the user asked to quit.
    pub fn apply(&mut self, input: SimInput) -> bool {
        match input {
            SimInput::KeyDown(SimKey::Quit)        => return false,
            SimInput::KeyDown(SimKey::OpenPalm)    => self.left_open = true,
            SimInput::KeyUp(SimKey::OpenPalm)      => self.left_open = false,
            SimInput::KeyDown(SimKey::ToggleRight) => self.right_visible = !self.right_visible,
            SimInput::KeyDown(SimKey::Wider)       =>
                self.pinch_px = (self.pinch_px + PINCH_STEP_PX).min(PINCH_MAX_PX),
            SimInput::KeyDown(SimKey::Narrower)    =>
                self.pinch_px = (self.pinch_px - PINCH_STEP_PX).max(0.0),
            SimInput::KeyUp(_) => {}
        }
        true
    }

    /// Synthesize this pose as a detector frame.  `height` is the pixel
    /// height the frame will be scaled to; the pinch gap is vertical, so it
    /// alone fixes the pixel distance.
    pub fn frame(&self, height: f32) -> HandFrame {
        let mut hands = vec![HandObservation::new(
            Handedness::Left,
            synthetic_hand(0.25, 0.5, self.left_open, false),
        )];
        if self.right_visible {
            let mut right = *synthetic_hand(0.72, 0.5, false, true).points();
            let (gx, gy) = (0.74, 0.42);
            let half = self.pinch_px / 2.0 / height.max(1.0);
            right[index::INDEX_TIP] = Point::new(gx, gy - half);
            right[index::THUMB_TIP] = Point::new(gx, gy + half);
            hands.push(HandObservation::new(Handedness::Right, LandmarkSet::new(right)));
        }
        HandFrame { hands, at: None }
    }
}

/// A plausible 21-point hand centred near `(cx, cy)`, fingers up.
///
/// `mirror` flips it left↔right so the thumb points toward +x.
pub fn synthetic_hand(cx: f32, cy: f32, open: bool, mirror: bool) -> LandmarkSet {
    let side = if mirror { -1.0 } else { 1.0 };
    let at = |dx: f32, dy: f32| Point::new(cx + dx * side, cy + dy);

    let mut pts = [Point::default(); LANDMARK_COUNT];
    pts[index::WRIST] = at(0.0, 0.15);

    pts[index::THUMB_CMC] = at(-0.04, 0.12);
    pts[index::THUMB_MCP] = at(-0.07, 0.09);
    pts[index::THUMB_IP]  = at(-0.09, 0.06);
    pts[index::THUMB_TIP] = if open { at(-0.11, 0.04) } else { at(-0.05, 0.04) };

    let fingers = [index::INDEX_MCP, index::MIDDLE_MCP, index::RING_MCP, index::PINKY_MCP];
    for (i, &mcp) in fingers.iter().enumerate() {
        let dx = -0.03 + 0.025 * i as f32;
        pts[mcp]     = at(dx, 0.0);
        pts[mcp + 1] = at(dx, -0.04);
        if open {
            pts[mcp + 2] = at(dx, -0.07);
            pts[mcp + 3] = at(dx, -0.10);
        } else {
            pts[mcp + 2] = at(dx, -0.01);
            pts[mcp + 3] = at(dx, 0.01);
        }
    }
    LandmarkSet::new(pts)
}

/// Gesture source driven by [`SimInput`] events from the HUD window.
///
/// Emits one synthetic frame every `period` until the user quits or the
/// window goes away.
pub struct SimHandSource {
    pub rx:     Receiver<SimInput>,
    pub height: f32,
    pub period: Duration,
}

impl FrameSource for SimHandSource {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>) {
        let mut pose = SimPose::default();
        loop {
            loop {
                match self.rx.try_recv() {
                    Ok(input) => {
                        if !pose.apply(input) {
                            let _ = tx.send(FrameEvent::Quit);
                            return;
                        }
                    }
                    Err(TryRecvError::Empty)        => break,
                    Err(TryRecvError::Disconnected) => {
                        let _ = tx.send(FrameEvent::Quit);
                        return;
                    }
                }
            }
            if tx.send(FrameEvent::Frame(pose.frame(self.height))).is_err() {
                return;
            }
            thread::sleep(self.period);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapFrameSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Frame source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Joint positions (mm) are projected onto a normalised image plane and
/// mirrored in x so a palm held flat over the device reads like a palm facing
/// a selfie camera.
#[cfg(feature = "leap")]
pub struct LeapFrameSource;

#[cfg(feature = "leap")]
impl FrameSource for LeapFrameSource {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>) {
        use leaprs::*;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                tracing::error!("failed to create LeapC connection: {:?}", e);
                let _ = tx.send(FrameEvent::Quit);
                return;
            }
        };
        if let Err(e) = connection.open() {
            tracing::error!("failed to open LeapMotion device: {:?}", e);
            let _ = tx.send(FrameEvent::Quit);
            return;
        }

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                let hands = frame.hands().filter_map(|h| leap_hand(&h)).collect();
                if tx.send(FrameEvent::Frame(HandFrame { hands, at: None })).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(feature = "leap")]
fn leap_hand(hand: &leaprs::Hand) -> Option<HandObservation> {
    use leaprs::HandType;

    // Interaction volume above the device, mm.
    const HALF_SPAN: f32 = 200.0;
    const HEIGHT:    f32 = 400.0;
    let project = |x: f32, y: f32| Point::new((HALF_SPAN - x) / (2.0 * HALF_SPAN), 1.0 - y / HEIGHT);

    let digits: Vec<_> = hand.digits().collect();
    if digits.len() < 5 { return None; }

    let mut pts = [Point::default(); LANDMARK_COUNT];
    let wrist = digits[2].metacarpal().prev_joint();
    pts[index::WRIST] = project(wrist.x, wrist.y);

    // Thumb starts at 1, each finger four slots after the previous.
    for (d, digit) in digits.iter().take(5).enumerate() {
        let base = 1 + 4 * d;
        let joints = [
            digit.proximal().prev_joint(),
            digit.intermediate().prev_joint(),
            digit.distal().prev_joint(),
            digit.distal().next_joint(),
        ];
        for (k, j) in joints.iter().enumerate() {
            pts[base + k] = project(j.x, j.y);
        }
    }

    let handedness = if hand.hand_type() == HandType::Left { Handedness::Left } else { Handedness::Right };
    Some(HandObservation::new(handedness, LandmarkSet::new(pts)))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use palm_lock::is_palm_open;

    fn landmarks_json(n: usize) -> String {
        let pts: Vec<String> = (0..n).map(|i| format!(r#"{{"x":0.{:02},"y":0.5}}"#, i)).collect();
        format!("[{}]", pts.join(","))
    }

    #[test]
    fn parses_hands_and_timestamp() {
        let line = format!(
            r#"{{"t":1.5,"hands":[{{"handedness":"Left","score":0.9,"landmarks":{}}}]}}"#,
            landmarks_json(21)
        );
        let frame = parse_frame_line(&line, 0.75).unwrap();
        assert_eq!(frame.at, Some(Duration::from_millis(1500)));
        assert_eq!(frame.hands.len(), 1);
        assert_eq!(frame.hands[0].handedness, Handedness::Left);
    }

    #[test]
    fn low_score_and_short_hands_dropped() {
        let line = format!(
            r#"{{"hands":[{{"handedness":"Left","score":0.5,"landmarks":{}}},
                         {{"handedness":"Right","landmarks":{}}},
                         {{"handedness":"Right","score":0.8,"landmarks":{}}}]}}"#,
            landmarks_json(21), landmarks_json(20), landmarks_json(21)
        );
        let frame = parse_frame_line(&line, 0.75).unwrap();
        assert_eq!(frame.hands.len(), 1);
        assert_eq!(frame.hands[0].handedness, Handedness::Right);
        assert_eq!(frame.at, None);
    }

    #[test]
    fn empty_and_error_frames_have_no_hands() {
        assert!(parse_frame_line(r#"{"hands":[]}"#, 0.75).unwrap().hands.is_empty());
        assert!(parse_frame_line(r#"{"error":"camera busy"}"#, 0.75).unwrap().hands.is_empty());
    }

    #[test]
    fn malformed_line_is_error() {
        assert!(parse_frame_line("not json", 0.75).is_err());
    }

    #[test]
    fn json_source_sends_frames_then_quit() {
        let feed = format!(
            "{{\"hands\":[]}}\n\ngarbage\n{{\"t\":0.1,\"hands\":[{{\"handedness\":\"Right\",\"landmarks\":{}}}]}}\n",
            landmarks_json(21)
        );
        let src = JsonLinesSource::new(Box::new(io::Cursor::new(feed.into_bytes())), 0.75);
        let rx = spawn_frame_source(Box::new(src));
        let events: Vec<FrameEvent> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], FrameEvent::Frame(f) if f.hands.len() == 1));
        assert_eq!(events[2], FrameEvent::Quit);
    }

    #[test]
    fn synthetic_postures_classify() {
        assert!(is_palm_open(&synthetic_hand(0.3, 0.5, true, false)));
        assert!(!is_palm_open(&synthetic_hand(0.3, 0.5, false, false)));
    }

    #[test]
    fn sim_pose_pinch_distance_in_pixels() {
        let pose = SimPose { pinch_px: 120.0, ..SimPose::default() };
        let frame = pose.frame(480.0);
        let right = &frame.hands[1].landmarks.scaled(640.0, 480.0);
        let d = right.distance(index::THUMB_TIP, index::INDEX_TIP);
        assert!((d - 120.0).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn sim_keys_update_pose() {
        let mut pose = SimPose::default();
        assert!(pose.apply(SimInput::KeyDown(SimKey::OpenPalm)));
        assert!(pose.left_open);
        pose.apply(SimInput::KeyUp(SimKey::OpenPalm));
        assert!(!pose.left_open);
        pose.apply(SimInput::KeyDown(SimKey::ToggleRight));
        assert!(!pose.right_visible);
        assert_eq!(pose.frame(480.0).hands.len(), 1);
        for _ in 0..100 { pose.apply(SimInput::KeyDown(SimKey::Narrower)); }
        assert_eq!(pose.pinch_px, 0.0);
        assert!(!pose.apply(SimInput::KeyDown(SimKey::Quit)));
    }
}
