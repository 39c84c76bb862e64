// src/control.rs - Single-owner control loop tying classifier, dispatcher, device and link together
use crate::classifier::{classify, Gesture};
use crate::codec::{decode_status, encode_batch, Command};
use crate::device::{self, DeviceStatus, DurationParams};
use crate::dispatcher::Stabilizer;
use crate::hand::HandFrame;
use crate::transport::{LinkError, LinkParams, SerialLink};
use std::fmt;
use tracing::{debug, info, warn};

/// What happened during one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IterationReport {
    pub gesture: Gesture,
    pub fired: Option<Gesture>,
    pub command: Option<Command>,
    /// The command reached the link.
    pub sent: bool,
    /// An inbound status line was applied.
    pub status_updated: bool,
}

/// Human-readable state of the loop, the equivalent of the status readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSnapshot {
    pub status: DeviceStatus,
    pub gesture: Gesture,
    pub held_for_ms: Option<u64>,
    pub durations: DurationParams,
    pub connected: bool,
}

impl fmt::Display for LoopSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode={} led={} brightness={} gesture={}",
            self.status.mode.as_str(),
            self.status.led.as_str(),
            self.status.brightness,
            self.gesture,
        )?;
        if let Some(ms) = self.held_for_ms {
            write!(f, " stable={:.1}s", ms as f64 / 1000.0)?;
        }
        write!(
            f,
            " red={}ms yellow={}ms green={}ms link={}",
            self.durations.red,
            self.durations.yellow,
            self.durations.green,
            if self.connected { "open" } else { "closed" },
        )
    }
}

/// Owns every piece of mutable core state. Nothing else writes to it.
pub struct ControlLoop<L: SerialLink> {
    link: L,
    stabilizer: Stabilizer,
    durations: DurationParams,
    status: DeviceStatus,
    last_gesture: Gesture,
}

impl<L: SerialLink> ControlLoop<L> {
    pub fn new(link: L, durations: DurationParams) -> Self {
        Self {
            link,
            stabilizer: Stabilizer::new(),
            durations,
            status: DeviceStatus::default(),
            last_gesture: Gesture::None,
        }
    }

    /// Open the link if it is not already open.
    pub fn connect(&mut self, params: &LinkParams) -> Result<(), LinkError> {
        if self.link.is_open() {
            debug!("Link already open");
            return Ok(());
        }
        self.link.open(params)?;
        info!("Serial connected: {}", params.port.display());
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.link.is_open() {
            self.link.close();
            info!("Serial disconnected");
        } else {
            debug!("Serial is already closed");
        }
    }

    /// Run one iteration: drain at most one inbound line, classify the hand,
    /// advance the stabilizer and emit whatever fired.
    pub fn step(&mut self, hand: Option<&HandFrame>, now_ms: u64) -> IterationReport {
        let status_updated = self.poll_status();

        let gesture = classify(hand);
        if gesture != self.last_gesture {
            debug!("Gesture {} -> {}", self.last_gesture, gesture);
            self.last_gesture = gesture;
        }

        let mut report = IterationReport {
            gesture,
            status_updated,
            ..Default::default()
        };

        let Some(fired) = self.stabilizer.update(gesture, now_ms) else {
            return report;
        };
        report.fired = Some(fired);

        if let Some(command) = device::fire(fired, &mut self.durations) {
            info!("{} -> {}", fired, command);
            report.command = Some(command);
            report.sent = self.send(&command.encode());
        }
        report
    }

    /// Manually set all three durations at once. Values are clamped and all
    /// three lines go out in a single write.
    pub fn set_durations(&mut self, red: u32, yellow: u32, green: u32) -> bool {
        self.durations = DurationParams::clamped(red, yellow, green);
        let batch = encode_batch(&self.durations.commands());
        let sent = self.send(&batch);
        if sent {
            info!("Sent durations {:?}", batch);
        }
        sent
    }

    fn poll_status(&mut self) -> bool {
        let Some(line) = self.link.read_line() else {
            return false;
        };

        match decode_status(&line) {
            Ok(report) => {
                let before = self.status;
                self.status.apply(&report);
                if self.status != before {
                    info!(
                        "Controller status: mode={} led={} brightness={}",
                        self.status.mode.as_str(),
                        self.status.led.as_str(),
                        self.status.brightness
                    );
                }
                true
            }
            Err(e) => {
                debug!("Ignoring controller line {:?}: {}", line, e);
                false
            }
        }
    }

    // Fire-and-forget: nothing is queued or retried.
    fn send(&mut self, text: &str) -> bool {
        if !self.link.is_open() {
            warn!("Serial port is not open, dropped {:?}", text.trim_end());
            return false;
        }
        match self.link.write(text) {
            Ok(()) => true,
            Err(e) => {
                warn!("Serial write failed: {}", e);
                false
            }
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> LoopSnapshot {
        LoopSnapshot {
            status: self.status,
            gesture: self.last_gesture,
            held_for_ms: self.stabilizer.held_for(now_ms),
            durations: self.durations,
            connected: self.link.is_open(),
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

#[cfg(test)]
impl<L: SerialLink> ControlLoop<L> {
    pub fn durations(&self) -> &DurationParams {
        &self.durations
    }

    pub fn status(&self) -> &DeviceStatus {
        &self.status
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceMode, LedState};
    use crate::hand::fixtures::*;
    use crate::hand::Digit;
    use crate::transport::LoopbackLink;

    fn connected_loop() -> ControlLoop<LoopbackLink> {
        let mut control = ControlLoop::new(LoopbackLink::new(), DurationParams::default());
        control.connect(&LinkParams::default()).unwrap();
        control
    }

    fn run(control: &mut ControlLoop<LoopbackLink>, hand: &HandFrame, start: u64, end: u64) {
        let mut now = start;
        while now <= end {
            control.step(Some(hand), now);
            now += 16;
        }
    }

    #[test]
    fn test_held_one_up_raises_red_each_second() {
        let mut control = connected_loop();
        let hand = raised(&[Digit::Index]);

        // 16ms frames: firings land on the first frame at or past each second.
        run(&mut control, &hand, 0, 3500);

        assert_eq!(
            control.link().written(),
            ["RED:2300\n", "RED:2600\n", "RED:2900\n", "RED:3200\n"]
                .map(String::from)
        );
        assert_eq!(control.durations().red, 3200);
    }

    #[test]
    fn test_shaka_presses_button_once() {
        let mut control = connected_loop();
        let hand = raised(&[Digit::Thumb, Digit::Pinky]);

        run(&mut control, &hand, 0, 3000);
        assert_eq!(control.link().written(), ["BTN1\n".to_string()]);
    }

    #[test]
    fn test_no_hand_sends_nothing() {
        let mut control = connected_loop();
        for now in (0..5000).step_by(16) {
            let report = control.step(None, now);
            assert_eq!(report.gesture, Gesture::None);
            assert_eq!(report.fired, None);
        }
        assert!(control.link().written().is_empty());
    }

    #[test]
    fn test_closed_link_skips_emission_but_mutates() {
        let mut control = ControlLoop::new(LoopbackLink::new(), DurationParams::default());
        let hand = raised(&[Digit::Index, Digit::Middle]);

        let report = control.step(Some(&hand), 0);
        assert_eq!(report.fired, Some(Gesture::TwoUp));
        assert!(!report.sent);
        assert_eq!(control.durations().yellow, 650);
        assert!(control.link().written().is_empty());
    }

    #[test]
    fn test_one_status_line_per_iteration() {
        let mut control = connected_loop();
        control.link_mut().feed(
            "MODE:Blink Mode, LED:X, BRIGHT:200\nMODE:NORMAL, LED:Green, Brightness:50\n",
        );

        let report = control.step(None, 0);
        assert!(report.status_updated);
        assert_eq!(*control.status(), DeviceStatus {
            mode: DeviceMode::BlinkMode,
            led: LedState::All,
            brightness: 200,
        });

        control.step(None, 16);
        assert_eq!(*control.status(), DeviceStatus {
            mode: DeviceMode::Normal,
            led: LedState::Green,
            brightness: 50,
        });

        assert!(!control.step(None, 32).status_updated);
    }

    #[test]
    fn test_malformed_status_leaves_state() {
        let mut control = connected_loop();
        control.link_mut().feed("MODE:Red Mode, LED:Red, Brightness:80\n");
        control.step(None, 0);
        let before = *control.status();

        control.link_mut().feed("MODE:Power OFF, LED:OFF\nGreen Blinking: ON\n");
        control.step(None, 16);
        control.step(None, 32);
        assert_eq!(*control.status(), before);
    }

    #[test]
    fn test_partial_status_line_waits() {
        let mut control = connected_loop();
        control.link_mut().feed("MODE:Power OFF, LED:");
        assert!(!control.step(None, 0).status_updated);

        control.link_mut().feed("OFF, Brightness:0\n");
        assert!(control.step(None, 16).status_updated);
        assert_eq!(control.status().mode, DeviceMode::PowerOff);
    }

    #[test]
    fn test_set_durations_sends_all_channels() {
        let mut control = connected_loop();
        assert!(control.set_durations(100, 1200, 7000));

        assert_eq!(
            control.link().written(),
            ["RED:500\nYELLOW:1200\nGREEN:5000\n".to_string()]
        );
        assert_eq!(*control.durations(), DurationParams { red: 500, yellow: 1200, green: 5000 });
    }

    #[test]
    fn test_connect_and_disconnect() {
        let mut control = ControlLoop::new(LoopbackLink::new(), DurationParams::default());
        let params = LinkParams::default();

        control.connect(&params).unwrap();
        control.connect(&params).unwrap();
        assert!(control.link().is_open());
        control.disconnect();
        assert!(!control.link().is_open());
    }

    #[test]
    fn test_snapshot_display() {
        let mut control = connected_loop();
        let hand = raised(&[Digit::Thumb, Digit::Pinky]);
        control.step(Some(&hand), 0);

        let text = control.snapshot(1500).to_string();
        assert!(text.contains("mode=NORMAL"));
        assert!(text.contains("gesture=Shaka"));
        assert!(text.contains("stable=1.5s"));
        assert!(text.contains("link=open"));
    }
}
