// src/dispatcher.rs - Turns the per-tick gesture stream into one-shot actions
use crate::classifier::Gesture;

/// How long a discrete gesture must stay unchanged before it fires.
pub const HOLD_THRESHOLD_MS: u64 = 1000;
/// Minimum spacing between adjustment firings.
pub const REPEAT_INTERVAL_MS: u64 = 1000;

/// Stabilizer state, advanced once per loop iteration.
///
/// Discrete gestures (Shaka, OK, Open) are debounced: the label has to be
/// seen continuously for [`HOLD_THRESHOLD_MS`] and then fires once until it
/// changes. Adjustment gestures repeat every [`REPEAT_INTERVAL_MS`] while
/// present, on a single cooldown clock shared by all six of them.
#[derive(Debug, Clone, Default)]
pub struct Stabilizer {
    tracked: Gesture,
    tracking_since_ms: u64,
    fired: bool,
    // None means the cooldown has never started, so the next adjustment fires at once.
    last_adjustment_ms: Option<u64>,
}

impl Stabilizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the label observed at `now_ms`. Returns the gesture to act on, if any.
    pub fn update(&mut self, gesture: Gesture, now_ms: u64) -> Option<Gesture> {
        if gesture.is_adjustment() {
            self.repeat(gesture, now_ms)
        } else {
            self.debounce(gesture, now_ms)
        }
    }

    fn repeat(&mut self, gesture: Gesture, now_ms: u64) -> Option<Gesture> {
        let due = self
            .last_adjustment_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= REPEAT_INTERVAL_MS);
        if !due {
            return None;
        }

        self.last_adjustment_ms = Some(now_ms);
        Some(gesture)
    }

    fn debounce(&mut self, gesture: Gesture, now_ms: u64) -> Option<Gesture> {
        if gesture != self.tracked {
            self.tracked = gesture;
            self.tracking_since_ms = now_ms;
            self.fired = false;
            return None;
        }

        if gesture == Gesture::None || self.fired {
            return None;
        }
        if now_ms.saturating_sub(self.tracking_since_ms) < HOLD_THRESHOLD_MS {
            return None;
        }

        self.fired = true;
        Some(gesture)
    }

    /// How long the tracked discrete gesture has been stable, if one is tracked.
    pub fn held_for(&self, now_ms: u64) -> Option<u64> {
        if self.tracked == Gesture::None {
            return None;
        }
        Some(now_ms.saturating_sub(self.tracking_since_ms))
    }
}

#[cfg(test)]
impl Stabilizer {
    /// Label currently being debounced.
    pub fn tracked(&self) -> Gesture {
        self.tracked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_MS: u64 = 10;

    /// Hold `gesture` from `start` to `end` inclusive at a fixed frame step,
    /// collecting the timestamps where it fired.
    fn hold(stab: &mut Stabilizer, gesture: Gesture, start: u64, end: u64) -> Vec<u64> {
        let mut fired = Vec::new();
        let mut now = start;
        while now <= end {
            if stab.update(gesture, now).is_some() {
                fired.push(now);
            }
            now += FRAME_MS;
        }
        fired
    }

    #[test]
    fn test_adjustment_repeats_every_interval() {
        let mut stab = Stabilizer::new();
        let fired = hold(&mut stab, Gesture::OneUp, 0, 3500);
        assert_eq!(fired, vec![0, 1000, 2000, 3000]);
    }

    #[test]
    fn test_adjustment_cooldown_is_shared() {
        let mut stab = Stabilizer::new();
        assert_eq!(stab.update(Gesture::OneUp, 0), Some(Gesture::OneUp));

        // Switching to another adjustment gesture inherits the remaining cooldown.
        assert_eq!(stab.update(Gesture::TwoDown, 400), None);
        assert_eq!(stab.update(Gesture::FourUp, 999), None);
        assert_eq!(stab.update(Gesture::FourUp, 1000), Some(Gesture::FourUp));
    }

    #[test]
    fn test_discrete_fires_once_after_hold() {
        let mut stab = Stabilizer::new();
        let fired = hold(&mut stab, Gesture::Shaka, 0, 1200);
        assert_eq!(fired, vec![1000]);

        assert_eq!(stab.update(Gesture::Shaka, 5000), None);
    }

    #[test]
    fn test_switch_before_hold_restarts_timer() {
        let mut stab = Stabilizer::new();
        assert!(hold(&mut stab, Gesture::Shaka, 0, 790).is_empty());

        // OK appears at 800 and must be held a full second from there.
        assert!(hold(&mut stab, Gesture::Ok, 800, 1790).is_empty());
        assert_eq!(stab.update(Gesture::Ok, 1800), Some(Gesture::Ok));
    }

    #[test]
    fn test_rearms_after_release() {
        let mut stab = Stabilizer::new();
        assert_eq!(hold(&mut stab, Gesture::Open, 0, 1000), vec![1000]);

        stab.update(Gesture::None, 1010);
        assert_eq!(hold(&mut stab, Gesture::Open, 1020, 2020), vec![2020]);
    }

    #[test]
    fn test_none_never_fires() {
        let mut stab = Stabilizer::new();
        assert!(hold(&mut stab, Gesture::None, 0, 5000).is_empty());
        assert_eq!(stab.held_for(5000), None);
    }

    #[test]
    fn test_adjustment_leaves_debounce_untouched() {
        let mut stab = Stabilizer::new();
        stab.update(Gesture::Shaka, 0);
        stab.update(Gesture::OneUp, 500);

        assert_eq!(stab.tracked(), Gesture::Shaka);
        assert_eq!(stab.update(Gesture::Shaka, 1000), Some(Gesture::Shaka));
    }

    #[test]
    fn test_held_for_reports_elapsed() {
        let mut stab = Stabilizer::new();
        stab.update(Gesture::Ok, 300);
        assert_eq!(stab.held_for(1500), Some(1200));
    }
}
