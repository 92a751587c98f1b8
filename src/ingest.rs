//! Line-oriented inbound adapter.
//!
//! Each line carries a topic and a JSON payload separated by whitespace:
//!
//! ```text
//! consumption {"p": 812}
//! production {"p": 1540.6}
//! control {"command": "force", "name": "water_heater", "power": 2400, "duration": 3600}
//! ```

use serde::Deserialize;

use crate::error::InboundError;
use crate::regulation::Command;

pub const CONSUMPTION_TOPIC: &str = "consumption";
pub const PRODUCTION_TOPIC: &str = "production";
pub const CONTROL_TOPIC: &str = "control";

/// Largest meter reading accepted, in absolute value (W).
pub const MAX_READING_W: f64 = 1e9;

/// One inbound event, in the form the live loop dispatches.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Consumption(i64),
    Production(i64),
    Command(Command),
}

#[derive(Debug, Deserialize)]
struct MeterReading {
    /// Instantaneous power (W).
    p: f64,
}

/// Parses one inbound line into an event.
///
/// Fractional watts are truncated. Extra payload fields are ignored.
/// Readings beyond `MAX_READING_W` in absolute value are rejected.
///
/// # Errors
///
/// Returns an `InboundError` for blank lines, unknown topics, payloads that
/// do not decode and out-of-range readings.
pub fn parse_line(line: &str) -> Result<Event, InboundError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(InboundError::Empty);
    }

    let (topic, payload) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(t, p)| (t, p.trim_start()));
    let payload_error = |source: serde_json::Error| InboundError::Payload {
        topic: topic.to_string(),
        source,
    };

    let watts = |payload: &str| -> Result<i64, InboundError> {
        let reading: MeterReading = serde_json::from_str(payload).map_err(payload_error)?;
        if !reading.p.is_finite() || reading.p.abs() > MAX_READING_W {
            return Err(InboundError::OutOfRange {
                topic: topic.to_string(),
                value: reading.p,
            });
        }
        Ok(reading.p as i64)
    };

    match topic {
        CONSUMPTION_TOPIC => watts(payload).map(Event::Consumption),
        PRODUCTION_TOPIC => watts(payload).map(Event::Production),
        CONTROL_TOPIC => Command::from_json(payload)
            .map(Event::Command)
            .map_err(payload_error),
        other => Err(InboundError::UnknownTopic(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_meter_readings() {
        assert_eq!(
            parse_line(r#"consumption {"p": 812}"#).expect("valid line"),
            Event::Consumption(812)
        );
        assert_eq!(
            parse_line("production   {\"p\": 1540.6, \"unit\": \"W\"}\n").expect("valid line"),
            Event::Production(1540)
        );
    }

    #[test]
    fn parses_control_commands() {
        let event = parse_line(r#"control {"command":"unforce","name":"water_heater"}"#)
            .expect("valid line");
        assert_eq!(
            event,
            Event::Command(Command::Unforce {
                name: "water_heater".to_string()
            })
        );
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(matches!(parse_line("   "), Err(InboundError::Empty)));
        assert!(matches!(
            parse_line(r#"Consumption {"p": 1}"#),
            Err(InboundError::UnknownTopic(t)) if t == "Consumption"
        ));
        assert!(matches!(
            parse_line("production"),
            Err(InboundError::Payload { .. })
        ));
        assert!(matches!(
            parse_line(r#"control {"command":"reboot"}"#),
            Err(InboundError::Payload { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_readings() {
        assert!(matches!(
            parse_line(r#"consumption {"p": -1e30}"#),
            Err(InboundError::OutOfRange { topic, .. }) if topic == "consumption"
        ));
        assert!(matches!(
            parse_line(r#"production {"p": 2e9}"#),
            Err(InboundError::OutOfRange { .. })
        ));
        assert_eq!(
            parse_line(r#"production {"p": -1e9}"#).expect("at the bound"),
            Event::Production(-1_000_000_000)
        );
    }
}
