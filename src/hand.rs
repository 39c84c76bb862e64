// src/hand.rs - Hand landmark frame and finger extension
use nalgebra::Vector2;
use thiserror::Error;

/// One landmark in source-frame pixel space. y grows downward.
pub type LandmarkPoint = Vector2<f64>;

pub const LANDMARK_COUNT: usize = 21;

// Hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP: usize = 16;
pub const PINKY_TIP: usize = 20;

/// How far above the wrist a fingertip must sit to count as extended.
pub const EXTENSION_MARGIN: f64 = 55.0;

#[derive(Debug, Error, PartialEq)]
pub enum HandFrameError {
    #[error("hand frame needs {LANDMARK_COUNT} landmarks, got {0}")]
    WrongLandmarkCount(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digit {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Digit {
    pub const ALL: [Digit; 5] = [
        Digit::Thumb,
        Digit::Index,
        Digit::Middle,
        Digit::Ring,
        Digit::Pinky,
    ];

    pub fn tip_index(self) -> usize {
        match self {
            Digit::Thumb => THUMB_TIP,
            Digit::Index => INDEX_TIP,
            Digit::Middle => MIDDLE_TIP,
            Digit::Ring => RING_TIP,
            Digit::Pinky => PINKY_TIP,
        }
    }
}

/// The 21 landmarks of a single detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandFrame {
    landmarks: [LandmarkPoint; LANDMARK_COUNT],
}

impl HandFrame {
    pub fn from_points(points: &[[f64; 2]]) -> Result<Self, HandFrameError> {
        if points.len() != LANDMARK_COUNT {
            return Err(HandFrameError::WrongLandmarkCount(points.len()));
        }

        let mut landmarks = [LandmarkPoint::zeros(); LANDMARK_COUNT];
        for (slot, p) in landmarks.iter_mut().zip(points) {
            *slot = LandmarkPoint::new(p[0], p[1]);
        }
        Ok(Self { landmarks })
    }

    pub fn wrist(&self) -> &LandmarkPoint {
        &self.landmarks[WRIST]
    }

    pub fn tip(&self, digit: Digit) -> &LandmarkPoint {
        &self.landmarks[digit.tip_index()]
    }

    pub fn finger_extension(&self) -> FingerExtension {
        let threshold = self.wrist().y - EXTENSION_MARGIN;
        let extended = |digit: Digit| self.tip(digit).y < threshold;

        FingerExtension {
            thumb: extended(Digit::Thumb),
            index: extended(Digit::Index),
            middle: extended(Digit::Middle),
            ring: extended(Digit::Ring),
            pinky: extended(Digit::Pinky),
        }
    }
}

/// Which digits are straightened above the wrist. Derived per frame, no memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FingerExtension {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerExtension {
    /// A vector with exactly the listed digits extended.
    pub fn only(digits: &[Digit]) -> Self {
        let mut ext = Self::default();
        for digit in digits {
            *ext.slot_mut(*digit) = true;
        }
        ext
    }

    pub fn is_extended(&self, digit: Digit) -> bool {
        match digit {
            Digit::Thumb => self.thumb,
            Digit::Index => self.index,
            Digit::Middle => self.middle,
            Digit::Ring => self.ring,
            Digit::Pinky => self.pinky,
        }
    }

    pub fn count(&self) -> usize {
        Digit::ALL.iter().filter(|d| self.is_extended(**d)).count()
    }

    fn slot_mut(&mut self, digit: Digit) -> &mut bool {
        match digit {
            Digit::Thumb => &mut self.thumb,
            Digit::Index => &mut self.index,
            Digit::Middle => &mut self.middle,
            Digit::Ring => &mut self.ring,
            Digit::Pinky => &mut self.pinky,
        }
    }
}

#[cfg(test)]
impl HandFrame {
    pub fn new(landmarks: [LandmarkPoint; LANDMARK_COUNT]) -> Self {
        Self { landmarks }
    }

    pub fn landmark(&self, index: usize) -> &LandmarkPoint {
        &self.landmarks[index]
    }

    pub fn set_tip(&mut self, digit: Digit, point: LandmarkPoint) {
        self.landmarks[digit.tip_index()] = point;
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const WRIST_X: f64 = 160.0;
    pub const WRIST_Y: f64 = 200.0;

    /// Every landmark parked on the wrist: nothing extended, nothing pointing down.
    pub fn relaxed_hand() -> HandFrame {
        HandFrame::new([LandmarkPoint::new(WRIST_X, WRIST_Y); LANDMARK_COUNT])
    }

    /// Tips of the listed digits raised 100px above the wrist, spread apart in x.
    pub fn raised(digits: &[Digit]) -> HandFrame {
        let mut hand = relaxed_hand();
        for digit in digits {
            let x = WRIST_X - 80.0 + 40.0 * *digit as usize as f64;
            hand.set_tip(*digit, LandmarkPoint::new(x, WRIST_Y - 100.0));
        }
        hand
    }
}
