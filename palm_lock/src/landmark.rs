//! Hand landmark data model.
//!
//! A detector reports each hand as 21 ordered points (MediaPipe hand model
//! numbering) plus a `Left`/`Right` label.  Everything here is read-only per
//! frame; the caller owns the data.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Number of landmarks in one hand.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices (MediaPipe hand model convention).
pub mod index {
    pub const WRIST:      usize = 0;
    pub const THUMB_CMC:  usize = 1;
    pub const THUMB_MCP:  usize = 2;
    pub const THUMB_IP:   usize = 3;
    pub const THUMB_TIP:  usize = 4;
    pub const INDEX_MCP:  usize = 5;
    pub const INDEX_PIP:  usize = 6;
    pub const INDEX_DIP:  usize = 7;
    pub const INDEX_TIP:  usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP:   usize = 13;
    pub const RING_PIP:   usize = 14;
    pub const RING_DIP:   usize = 15;
    pub const RING_TIP:   usize = 16;
    pub const PINKY_MCP:  usize = 17;
    pub const PINKY_PIP:  usize = 18;
    pub const PINKY_DIP:  usize = 19;
    pub const PINKY_TIP:  usize = 20;

    /// Bone segments, for drawing a skeleton.
    pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
        (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
        (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
        (INDEX_MCP, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
        (MIDDLE_MCP, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
        (RING_MCP, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
        (WRIST, PINKY_MCP),
    ];
}

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LandmarkError {
    #[error("expected {LANDMARK_COUNT} landmarks, got {0}")]
    WrongCount(usize),
    #[error("unknown handedness label {0:?}")]
    UnknownHandedness(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Point / LandmarkSet
// ════════════════════════════════════════════════════════════════════════════

/// One tracked point.  `x`/`y` are normalised frame coordinates (or pixels
/// after [`LandmarkSet::scaled`]); `y` grows downward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Point { x, y, z: 0.0 }
    }
}

/// Exactly [`LANDMARK_COUNT`] points, indexed per [`index`].
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: [Point; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Point; LANDMARK_COUNT]) -> Self {
        LandmarkSet { points }
    }

    pub fn points(&self) -> &[Point; LANDMARK_COUNT] { &self.points }

    pub fn get(&self, idx: usize) -> Point { self.points[idx] }

    /// Copy of this set with x scaled by `width` and y by `height`.
    pub fn scaled(&self, width: f32, height: f32) -> LandmarkSet {
        let mut points = self.points;
        for p in points.iter_mut() {
            p.x *= width;
            p.y *= height;
        }
        LandmarkSet { points }
    }

    /// Planar Euclidean distance between two landmarks.
    pub fn distance(&self, a: usize, b: usize) -> f32 {
        let (pa, pb) = (self.points[a], self.points[b]);
        (pb.x - pa.x).hypot(pb.y - pa.y)
    }
}

impl From<[Point; LANDMARK_COUNT]> for LandmarkSet {
    fn from(points: [Point; LANDMARK_COUNT]) -> Self {
        LandmarkSet { points }
    }
}

impl TryFrom<Vec<Point>> for LandmarkSet {
    type Error = LandmarkError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        let n = points.len();
        let points: [Point; LANDMARK_COUNT] =
            points.try_into().map_err(|_| LandmarkError::WrongCount(n))?;
        Ok(LandmarkSet { points })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Handedness / HandObservation
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handedness { Left, Right }

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left  => "Left",
            Handedness::Right => "Right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Handedness {
    type Err = LandmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left"  => Ok(Handedness::Left),
            "right" => Ok(Handedness::Right),
            _       => Err(LandmarkError::UnknownHandedness(s.to_string())),
        }
    }
}

/// One detected hand in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HandObservation {
    pub handedness: Handedness,
    pub landmarks:  LandmarkSet,
}

impl HandObservation {
    pub fn new(handedness: Handedness, landmarks: LandmarkSet) -> Self {
        HandObservation { handedness, landmarks }
    }
}

/// At most one observation per label for a single frame.
///
/// When the detector reports the same label more than once, the first
/// observation in detector order is kept and the rest are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct HandPair<'a> {
    pub left:  Option<&'a HandObservation>,
    pub right: Option<&'a HandObservation>,
}

impl<'a> HandPair<'a> {
    pub fn select(observations: &'a [HandObservation]) -> Self {
        let mut pair = HandPair::default();
        for obs in observations {
            let slot = match obs.handedness {
                Handedness::Left  => &mut pair.left,
                Handedness::Right => &mut pair.right,
            };
            if slot.is_some() {
                debug!("dropping duplicate {} hand", obs.handedness);
                continue;
            }
            *slot = Some(obs);
        }
        pair
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
