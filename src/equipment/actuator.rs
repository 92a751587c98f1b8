//! Actuator implementations: logging only, JSON lines, and in-memory.

use std::io::Write;

use serde::Serialize;
use tracing::info;

use super::types::{Actuator, ActuatorCommand};
use crate::error::ActuatorError;

/// Dry-run actuator: logs every command and sends nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogActuator;

impl Actuator for LogActuator {
    fn send(&mut self, name: &str, command: ActuatorCommand) -> Result<(), ActuatorError> {
        info!(equipment = name, %command, "would send actuator command");
        Ok(())
    }
}

#[derive(Serialize)]
struct CommandLine<'a> {
    actuator: &'a str,
    #[serde(flatten)]
    command: ActuatorCommand,
}

/// Writes one JSON object per command, e.g. `{"actuator":"water_heater","percent":42.4}`.
#[derive(Debug)]
pub struct JsonLinesActuator<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesActuator<W> {
    /// Creates an actuator writing one JSON object per command to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Actuator for JsonLinesActuator<W> {
    fn send(&mut self, name: &str, command: ActuatorCommand) -> Result<(), ActuatorError> {
        let line = CommandLine {
            actuator: name,
            command,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every command in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct RecordingActuator {
    pub commands: Vec<(String, ActuatorCommand)>,
}

impl RecordingActuator {
    /// Last command sent to `name`, if any.
    pub fn last_for(&self, name: &str) -> Option<ActuatorCommand> {
        self.commands
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
    }
}

impl Actuator for RecordingActuator {
    fn send(&mut self, name: &str, command: ActuatorCommand) -> Result<(), ActuatorError> {
        self.commands.push((name.to_string(), command));
        Ok(())
    }
}
