#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Mirrors the controller's telemetry ring to the log.
//!
//! The ring lives inside the scheduler context; the lamp task hands it to a
//! [`TelemetryForwarder`] after every tick and only records newer than the
//! forwarder's cursor are emitted.

use lamp_core::telemetry::{EventId, TelemetryEventKind, TelemetryRecord, TelemetryRecorder};

/// Tracks which telemetry records have already been logged.
#[derive(Debug, Default)]
pub struct TelemetryForwarder {
    cursor: EventId,
}

impl TelemetryForwarder {
    pub const fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Logs every record added since the previous call. Returns how many were
    /// emitted.
    pub fn forward(&mut self, recorder: &TelemetryRecorder) -> usize {
        let missed = recorder.missed_since(self.cursor);
        if missed > 0 {
            emit_missed(missed);
        }
        let mut emitted = 0;
        for record in recorder.since(self.cursor) {
            emit(record);
            emitted += 1;
        }
        self.cursor = recorder.next_id();
        emitted
    }

    pub const fn cursor(&self) -> EventId {
        self.cursor
    }
}

#[cfg(target_os = "none")]
fn emit(record: &TelemetryRecord) {
    match record.event {
        TelemetryEventKind::PressDropped => {
            defmt::warn!("telemetry: {}", defmt::Display2Format(record));
        }
        TelemetryEventKind::StatusReport => {
            defmt::debug!("telemetry: {}", defmt::Display2Format(record));
        }
        _ => defmt::info!("telemetry: {}", defmt::Display2Format(record)),
    }
}

#[cfg(target_os = "none")]
fn emit_missed(missed: u32) {
    defmt::warn!("telemetry: {=u32} records lost", missed);
}

#[cfg(not(target_os = "none"))]
fn emit_missed(missed: u32) {
    println!("telemetry: {missed} records lost");
}

#[cfg(not(target_os = "none"))]
fn emit(record: &TelemetryRecord) {
    if record.event != TelemetryEventKind::StatusReport {
        println!("telemetry: {record}");
    }
}
