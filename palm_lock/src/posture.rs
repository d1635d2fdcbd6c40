//! Open-palm posture classifier.
//!
//! Frame-local and stateless.  A finger counts as extended when its tip is
//! above its PIP joint in image coordinates (smaller `y`).  The thumb counts
//! as extended when its tip lies left of its IP joint.
//!
//! # Orientation constraint
//!
//! The thumb rule only holds for a left hand seen in a horizontally mirrored
//! camera image, which is how the lock hand is observed.  A right hand (or an
//! unmirrored left hand) points its thumb the other way and will usually fail
//! the thumb test; it can still classify as open through the four fingers.

use crate::landmark::{index, LandmarkSet};

/// Extended digits (out of 5) needed for an open palm.
pub const OPEN_PALM_MIN_EXTENDED: usize = 4;

const FINGER_TIPS: [usize; 4] = [index::INDEX_TIP, index::MIDDLE_TIP, index::RING_TIP, index::PINKY_TIP];
const FINGER_PIPS: [usize; 4] = [index::INDEX_PIP, index::MIDDLE_PIP, index::RING_PIP, index::PINKY_PIP];

/// Number of extended digits, thumb included.
pub fn extended_fingers(hand: &LandmarkSet) -> usize {
    let fingers = FINGER_TIPS.iter()
        .zip(FINGER_PIPS.iter())
        .filter(|(&tip, &pip)| hand.get(tip).y < hand.get(pip).y)
        .count();

    let thumb = hand.get(index::THUMB_TIP).x < hand.get(index::THUMB_IP).x;
    fingers + usize::from(thumb)
}

pub fn is_palm_open(hand: &LandmarkSet) -> bool {
    extended_fingers(hand) >= OPEN_PALM_MIN_EXTENDED
}
