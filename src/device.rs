// src/device.rs - Duration channels and the mirrored controller status
use crate::classifier::Gesture;
use crate::codec::{Button, Command, StatusReport};
use serde::{Deserialize, Serialize};

/// One of the three light-phase timers on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Yellow,
    Green,
}

/// Fixed bounds and gesture step of a channel. These are part of the wire
/// contract with the controller firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLimits {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Yellow, Channel::Green];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Yellow => "YELLOW",
            Self::Green => "GREEN",
        }
    }

    pub fn limits(&self) -> ChannelLimits {
        match self {
            Self::Red | Self::Green => ChannelLimits { min: 500, max: 5000, step: 300 },
            Self::Yellow => ChannelLimits { min: 200, max: 2000, step: 150 },
        }
    }

    pub fn clamp(&self, value: u32) -> u32 {
        let limits = self.limits();
        value.clamp(limits.min, limits.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Light-phase durations in milliseconds. Every value stays inside its
/// channel's limits after any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationParams {
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
}

impl Default for DurationParams {
    fn default() -> Self {
        Self {
            red: 2000,
            yellow: 500,
            green: 2000,
        }
    }
}

impl DurationParams {
    /// Build from arbitrary values, clamping each into range.
    pub fn clamped(red: u32, yellow: u32, green: u32) -> Self {
        let mut params = Self::default();
        params.set(Channel::Red, red);
        params.set(Channel::Yellow, yellow);
        params.set(Channel::Green, green);
        params
    }

    pub fn get(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Red => self.red,
            Channel::Yellow => self.yellow,
            Channel::Green => self.green,
        }
    }

    /// Store a clamped value and return what was stored.
    pub fn set(&mut self, channel: Channel, value: u32) -> u32 {
        let value = channel.clamp(value);
        *self.slot_mut(channel) = value;
        value
    }

    /// Move one step in `direction`, saturating at the channel limits.
    pub fn adjust(&mut self, channel: Channel, direction: Direction) -> u32 {
        let step = channel.limits().step;
        let current = self.get(channel);
        let next = match direction {
            Direction::Up => current.saturating_add(step),
            Direction::Down => current.saturating_sub(step),
        };
        self.set(channel, next)
    }

    /// Duration commands for all three channels, in RED, YELLOW, GREEN order.
    pub fn commands(&self) -> Vec<Command> {
        Channel::ALL
            .iter()
            .map(|channel| Command::SetDuration {
                channel: *channel,
                millis: self.get(*channel),
            })
            .collect()
    }

    fn slot_mut(&mut self, channel: Channel) -> &mut u32 {
        match channel {
            Channel::Red => &mut self.red,
            Channel::Yellow => &mut self.yellow,
            Channel::Green => &mut self.green,
        }
    }
}

/// Apply a fired gesture to the duration model and produce the command to send.
///
/// Adjustment gestures move exactly one channel by one step; discrete
/// gestures map to a controller button and leave the durations alone.
pub fn fire(gesture: Gesture, params: &mut DurationParams) -> Option<Command> {
    let (channel, direction) = match gesture {
        Gesture::None => return None,
        Gesture::Shaka => return Some(Command::Press(Button::Btn1)),
        Gesture::Ok => return Some(Command::Press(Button::Btn2)),
        Gesture::Open => return Some(Command::Press(Button::Btn3)),
        Gesture::OneUp => (Channel::Red, Direction::Up),
        Gesture::OneDown => (Channel::Red, Direction::Down),
        Gesture::TwoUp => (Channel::Yellow, Direction::Up),
        Gesture::TwoDown => (Channel::Yellow, Direction::Down),
        Gesture::FourUp => (Channel::Green, Direction::Up),
        Gesture::FourDown => (Channel::Green, Direction::Down),
    };

    let millis = params.adjust(channel, direction);
    Some(Command::SetDuration { channel, millis })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceMode {
    #[default]
    Normal,
    RedMode,
    BlinkMode,
    PowerOff,
}

impl DeviceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::RedMode => "Red Mode",
            Self::BlinkMode => "Blink Mode",
            Self::PowerOff => "Power OFF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedState {
    #[default]
    None,
    Red,
    Yellow,
    Green,
    All,
}

impl LedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Red => "Red",
            Self::Yellow => "Yellow",
            Self::Green => "Green",
            Self::All => "ALL",
        }
    }
}

/// Last status reported by the controller. Only inbound status lines write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    pub mode: DeviceMode,
    pub led: LedState,
    pub brightness: u8,
}

impl DeviceStatus {
    /// Merge a decoded report. Fields the report could not supply keep their
    /// previous value; outside Normal mode the LED state follows the mode.
    pub fn apply(&mut self, report: &StatusReport) {
        if let Some(mode) = report.mode {
            self.mode = mode;
        }

        let reported_led = report.led.unwrap_or(self.led);
        self.led = match self.mode {
            DeviceMode::RedMode => LedState::Red,
            DeviceMode::BlinkMode => LedState::All,
            DeviceMode::PowerOff => LedState::None,
            DeviceMode::Normal => reported_led,
        };

        if let Some(brightness) = report.brightness {
            self.brightness = brightness;
        }
    }
}
