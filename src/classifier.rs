// src/classifier.rs - Static hand pose to gesture label
use crate::hand::{Digit, FingerExtension, HandFrame};
use std::fmt;

/// Thumb/index tips closer than this form the OK ring.
pub const OK_PINCH_DISTANCE: f64 = 30.0;
/// Raise above the wrist required by OneUp and TwoUp.
pub const POINT_UP_MARGIN: f64 = 30.0;
/// Raise above the wrist required by FourUp.
pub const FOUR_UP_MARGIN: f64 = 20.0;
/// Drop below the wrist that marks a finger as pointing down.
pub const POINT_DOWN_MARGIN: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gesture {
    #[default]
    None,
    Shaka,
    Ok,
    Open,
    OneUp,
    OneDown,
    TwoUp,
    TwoDown,
    FourUp,
    FourDown,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Shaka => "Shaka",
            Self::Ok => "OK",
            Self::Open => "Open",
            Self::OneUp => "OneUp",
            Self::OneDown => "OneDown",
            Self::TwoUp => "TwoUp",
            Self::TwoDown => "TwoDown",
            Self::FourUp => "FourUp",
            Self::FourDown => "FourDown",
        }
    }

    /// Adjustment gestures repeat on a cadence while held; everything else is debounced.
    pub fn is_adjustment(&self) -> bool {
        matches!(
            self,
            Self::OneUp
                | Self::OneDown
                | Self::TwoUp
                | Self::TwoDown
                | Self::FourUp
                | Self::FourDown
        )
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Rule = fn(&HandFrame, &FingerExtension) -> bool;

/// Evaluated top to bottom, first match wins. Several conditions overlap
/// (an OK hand usually has all five digits extended), so order matters.
pub const RULES: [(Gesture, Rule); 9] = [
    (Gesture::Shaka, is_shaka),
    (Gesture::Ok, is_ok),
    (Gesture::Open, is_open),
    (Gesture::OneUp, is_one_up),
    (Gesture::OneDown, is_one_down),
    (Gesture::FourUp, is_four_up),
    (Gesture::FourDown, is_four_down),
    (Gesture::TwoUp, is_two_up),
    (Gesture::TwoDown, is_two_down),
];

/// Classify the first detected hand, if any. Stateless.
pub fn classify(hand: Option<&HandFrame>) -> Gesture {
    let Some(hand) = hand else {
        return Gesture::None;
    };

    let ext = hand.finger_extension();
    RULES
        .iter()
        .find(|(_, rule)| rule(hand, &ext))
        .map(|(gesture, _)| *gesture)
        .unwrap_or(Gesture::None)
}

fn tip_y(hand: &HandFrame, digit: Digit) -> f64 {
    hand.tip(digit).y
}

fn is_shaka(_hand: &HandFrame, ext: &FingerExtension) -> bool {
    ext.count() == 2 && ext.thumb && ext.pinky
}

fn is_ok(hand: &HandFrame, ext: &FingerExtension) -> bool {
    let pinch = (hand.tip(Digit::Thumb) - hand.tip(Digit::Index)).norm();
    pinch < OK_PINCH_DISTANCE && ext.middle && ext.ring && ext.pinky
}

fn is_open(_hand: &HandFrame, ext: &FingerExtension) -> bool {
    ext.count() == 5
}

fn is_one_up(hand: &HandFrame, ext: &FingerExtension) -> bool {
    *ext == FingerExtension::only(&[Digit::Index])
        && tip_y(hand, Digit::Index) < hand.wrist().y - POINT_UP_MARGIN
}

// The Down rules look only at tip geometry, never at the extension vector.
fn is_one_down(hand: &HandFrame, _ext: &FingerExtension) -> bool {
    let index = tip_y(hand, Digit::Index);
    index > hand.wrist().y + POINT_DOWN_MARGIN
        && tip_y(hand, Digit::Middle) < index
        && tip_y(hand, Digit::Pinky) < index
}

fn is_four_up(hand: &HandFrame, ext: &FingerExtension) -> bool {
    if !(ext.index && ext.middle && ext.pinky) || ext.thumb {
        return false;
    }
    if !(3..=4).contains(&ext.count()) {
        return false;
    }

    let limit = hand.wrist().y - FOUR_UP_MARGIN;
    [Digit::Index, Digit::Middle, Digit::Pinky]
        .iter()
        .all(|d| tip_y(hand, *d) < limit)
}

fn is_four_down(hand: &HandFrame, _ext: &FingerExtension) -> bool {
    let limit = hand.wrist().y + POINT_DOWN_MARGIN;
    [Digit::Index, Digit::Middle, Digit::Pinky]
        .iter()
        .all(|d| tip_y(hand, *d) > limit)
}

fn is_two_up(hand: &HandFrame, ext: &FingerExtension) -> bool {
    let limit = hand.wrist().y - POINT_UP_MARGIN;
    *ext == FingerExtension::only(&[Digit::Index, Digit::Middle])
        && tip_y(hand, Digit::Index) < limit
        && tip_y(hand, Digit::Middle) < limit
}

fn is_two_down(hand: &HandFrame, _ext: &FingerExtension) -> bool {
    let limit = hand.wrist().y + POINT_DOWN_MARGIN;
    let middle = tip_y(hand, Digit::Middle);
    tip_y(hand, Digit::Index) > limit && middle > limit && tip_y(hand, Digit::Pinky) < middle
}
