//! Live loop: a single consumer applying inbound events to the engine in arrival order.

use std::io;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::equipment::Actuator;
use crate::error::InboundError;
use crate::ingest::{Event, parse_line};
use crate::regulation::{Clock, RegulationEngine, StatusReporter, TickOutcome};

/// Capacity of the inbound event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Applies one event at `now`.
pub fn dispatch<A: Actuator, R: StatusReporter>(
    engine: &mut RegulationEngine<A, R>,
    event: Event,
    now: DateTime<FixedOffset>,
) -> Option<TickOutcome> {
    match event {
        Event::Consumption(w) => engine.set_consumption(w, now),
        Event::Production(w) => engine.set_production(w, now),
        Event::Command(command) => engine.apply_command(&command, now),
    }
}

/// Drives `engine` until every sender of `events` is dropped.
///
/// When no event arrives within `idle_timeout` the engine ticks anyway, so
/// forcing expiry and the daily fallback are checked without new readings.
pub async fn run<A, R, C>(
    engine: &mut RegulationEngine<A, R>,
    mut events: mpsc::Receiver<Event>,
    clock: &C,
    idle_timeout: Duration,
) where
    A: Actuator,
    R: StatusReporter,
    C: Clock,
{
    info!(idle_timeout_secs = idle_timeout.as_secs_f64(), "regulation loop started");
    loop {
        match tokio::time::timeout(idle_timeout, events.recv()).await {
            Ok(Some(event)) => {
                let outcome = dispatch(engine, event, clock.now());
                debug!(?outcome, "event applied");
            }
            Ok(None) => break,
            Err(_) => {
                let outcome = engine.tick(clock.now());
                debug!(?outcome, "idle tick");
            }
        }
    }
    info!("inbound channel closed, regulation loop stopped");
}

/// Reads inbound lines and forwards the decoded events.
///
/// Blank lines are skipped silently and malformed lines with a warning.
/// Returns when the reader is exhausted or the receiver is gone.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub async fn read_lines<Rd>(reader: Rd, events: mpsc::Sender<Event>) -> io::Result<()>
where
    Rd: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(event) => {
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Err(InboundError::Empty) => {}
            Err(e) => warn!(error = %e, "skipping inbound line"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::{Equipment, Power, RecordingActuator};
    use crate::regulation::{ManualClock, RecordingReporter, RegulationParams};
    use chrono::TimeZone;

    fn start() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("valid offset")
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .unwrap()
    }

    fn engine() -> RegulationEngine<RecordingActuator, RecordingReporter> {
        RegulationEngine::new(
            RegulationParams::default(),
            vec![Equipment::variable("water_heater", 2400)],
            RecordingActuator::default(),
            RecordingReporter::default(),
            start(),
        )
    }

    #[tokio::test]
    async fn reader_feeds_loop_until_input_ends() {
        let mut engine = engine();
        let clock = ManualClock::new(start());
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let input: &[u8] = b"consumption {\"p\": 300}\n\ngarbage\nproduction {\"p\": 1320}\n";
        read_lines(input, tx).await.expect("in-memory read");
        run(&mut engine, rx, &clock, Duration::from_secs(60)).await;

        assert_eq!(engine.consumption_w(), Some(300));
        assert_eq!(engine.production_w(), Some(1320));
        // second reading arrives at the same instant and is rate limited
        assert!(engine.reporter().snapshots.is_empty());
    }

    #[tokio::test]
    async fn idle_timeout_ticks_without_events() {
        let mut engine = engine();
        let clock = ManualClock::new(start());
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(tx);
        });
        run(&mut engine, rx, &clock, Duration::from_millis(5)).await;

        assert_eq!(engine.last_evaluation(), Some(start()));
    }

    #[test]
    fn dispatch_routes_commands() {
        let mut engine = engine();
        let command = crate::regulation::Command::Force {
            name: "water_heater".to_string(),
            power: 1000,
            duration: None,
        };
        dispatch(&mut engine, Event::Command(command), start());
        let heater = engine.equipment("water_heater").expect("configured");
        assert!(heater.is_forced());
        assert_eq!(heater.current_power(), Power::Watts(1000));
    }

    #[test]
    fn hostile_inbound_lines_leave_the_loop_running() {
        let mut engine = engine();
        let line = r#"control {"command":"force","name":"water_heater","power":1000,"duration":9000000000000}"#;
        let event = parse_line(line).expect("valid command");
        dispatch(&mut engine, event, start());
        let heater = engine.equipment("water_heater").expect("configured");
        assert!(heater.is_forced());
        assert_eq!(heater.forced_until(), None);

        assert!(parse_line(r#"consumption {"p": -1e30}"#).is_err());
    }
}
