// src/codec.rs - Line protocol spoken with the traffic-light controller
use crate::device::{Channel, DeviceMode, LedState};
use std::fmt;
use std::num::IntErrorKind;
use thiserror::Error;

/// Inbound status lines carry at least this many `key:value` fields.
pub const STATUS_FIELD_COUNT: usize = 3;
const FIELD_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Btn1,
    Btn2,
    Btn3,
}

impl Button {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Btn1 => "BTN1",
            Self::Btn2 => "BTN2",
            Self::Btn3 => "BTN3",
        }
    }
}

/// Outbound command, one line each on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetDuration { channel: Channel, millis: u32 },
    Press(Button),
}

impl Command {
    /// Wire form including the trailing newline.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetDuration { channel, millis } => {
                write!(f, "{}:{}", channel.wire_name(), millis)
            }
            Self::Press(button) => f.write_str(button.wire_name()),
        }
    }
}

/// Concatenate several commands into a single write.
pub fn encode_batch(commands: &[Command]) -> String {
    commands.iter().map(Command::encode).collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty status line")]
    Empty,
    #[error("status line has {0} fields, need at least {STATUS_FIELD_COUNT}")]
    TooFewFields(usize),
}

/// A decoded status line. `None` means the field was present but unusable,
/// in which case the previous value should be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusReport {
    pub mode: Option<DeviceMode>,
    pub led: Option<LedState>,
    pub brightness: Option<u8>,
}

/// Decode `MODE:<mode>, LED:<led>, <key>:<brightness>`.
///
/// Fields are positional; the keys are not checked. Lines with fewer than
/// three fields (the controller also prints free-form progress messages) are
/// rejected as a whole.
pub fn decode_status(line: &str) -> Result<StatusReport, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() < STATUS_FIELD_COUNT {
        return Err(DecodeError::TooFewFields(fields.len()));
    }

    Ok(StatusReport {
        mode: field_value(fields[0]).map(parse_mode),
        led: field_value(fields[1]).map(parse_led),
        brightness: field_value(fields[2]).and_then(parse_brightness),
    })
}

// Everything after the first colon; empty or missing values count as absent.
fn field_value(field: &str) -> Option<&str> {
    field
        .split_once(':')
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_mode(value: &str) -> DeviceMode {
    match value.to_ascii_lowercase().as_str() {
        "red mode" => DeviceMode::RedMode,
        "blink mode" => DeviceMode::BlinkMode,
        "power off" => DeviceMode::PowerOff,
        _ => DeviceMode::Normal,
    }
}

fn parse_led(value: &str) -> LedState {
    match value.to_ascii_lowercase().as_str() {
        "red" => LedState::Red,
        "yellow" => LedState::Yellow,
        "green" => LedState::Green,
        "all" | "blinking" => LedState::All,
        _ => LedState::None,
    }
}

// Leading integer; trailing junk is ignored.
fn parse_brightness(value: &str) -> Option<u8> {
    let digits_end = value
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map_or(value.len(), |(i, _)| i);

    let number = match value[..digits_end].parse::<i64>() {
        Ok(number) => number,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => return None,
        },
    };
    Some(number.clamp(0, u8::MAX as i64) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_duration() {
        let cmd = Command::SetDuration { channel: Channel::Yellow, millis: 650 };
        assert_eq!(cmd.encode(), "YELLOW:650\n");
    }

    #[test]
    fn test_encode_buttons() {
        assert_eq!(Command::Press(Button::Btn1).encode(), "BTN1\n");
        assert_eq!(Command::Press(Button::Btn3).encode(), "BTN3\n");
    }

    #[test]
    fn test_encode_batch() {
        let batch = encode_batch(&[
            Command::SetDuration { channel: Channel::Red, millis: 2000 },
            Command::SetDuration { channel: Channel::Yellow, millis: 500 },
            Command::SetDuration { channel: Channel::Green, millis: 2000 },
        ]);
        assert_eq!(batch, "RED:2000\nYELLOW:500\nGREEN:2000\n");
    }

    #[test]
    fn test_decode_blink_mode() {
        let report = decode_status("MODE:Blink Mode, LED:X, BRIGHT:200\n").unwrap();
        assert_eq!(report.mode, Some(DeviceMode::BlinkMode));
        assert_eq!(report.brightness, Some(200));
    }

    #[test]
    fn test_decode_firmware_line() {
        let report = decode_status("MODE:NORMAL, LED:Green, Brightness:87\r\n").unwrap();
        assert_eq!(report, StatusReport {
            mode: Some(DeviceMode::Normal),
            led: Some(LedState::Green),
            brightness: Some(87),
        });

        let report = decode_status("MODE:Power OFF, LED:OFF, Brightness:0").unwrap();
        assert_eq!(report.mode, Some(DeviceMode::PowerOff));
        assert_eq!(report.led, Some(LedState::None));
        assert_eq!(report.brightness, Some(0));
    }

    #[test]
    fn test_decode_rejects_short_lines() {
        assert_eq!(
            decode_status("MODE:Red Mode, LED:Red"),
            Err(DecodeError::TooFewFields(2))
        );
        assert_eq!(
            decode_status("Yellow is running..."),
            Err(DecodeError::TooFewFields(1))
        );
        assert_eq!(decode_status("  \n"), Err(DecodeError::Empty));
    }

    #[test]
    fn test_decode_splits_on_first_colon() {
        let report = decode_status("MODE:Red Mode, LED:Red:extra, B:12:30").unwrap();
        assert_eq!(report.led, Some(LedState::None));
        assert_eq!(report.brightness, Some(12));
    }

    #[test]
    fn test_decode_unusable_fields_are_absent() {
        let report = decode_status("MODE:, LED, BRIGHT:dim").unwrap();
        assert_eq!(report, StatusReport::default());
    }

    #[test]
    fn test_brightness_parsing() {
        assert_eq!(parse_brightness("255"), Some(255));
        assert_eq!(parse_brightness("300"), Some(255));
        assert_eq!(parse_brightness("-4"), Some(0));
        assert_eq!(parse_brightness("42lux"), Some(42));
        assert_eq!(parse_brightness("-"), None);
        assert_eq!(parse_brightness("x1"), None);
    }

    #[test]
    fn test_brightness_overflow_saturates() {
        assert_eq!(parse_brightness("99999999999999999999"), Some(255));
        assert_eq!(parse_brightness("+99999999999999999999dim"), Some(255));
        assert_eq!(parse_brightness("-99999999999999999999"), Some(0));

        let report = decode_status("MODE:NORMAL, LED:Red, Brightness:99999999999999999999").unwrap();
        assert_eq!(report.brightness, Some(255));
    }
}
