//! Telemetry event catalog and the ring buffer every target drains.
//!
//! The core never logs directly. Tasks record strongly typed events here and
//! the platform decides where they go: `defmt` on the firmware, stdout and an
//! optional transcript file on the host. Event kinds serialize to compact
//! numeric codes so they can travel over narrow diagnostics links.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::clock::Millis;
use crate::fsm::LampState;

/// Monotonically increasing record identifier. Wraps after `u32::MAX`.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    ButtonPressed,
    ButtonReleased,
    StateChanged(LampState, LampState),
    BrightnessChanged,
    PressDropped,
    StatusReport,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::ButtonPressed => f.write_str("button-pressed"),
            TelemetryEventKind::ButtonReleased => f.write_str("button-released"),
            TelemetryEventKind::StateChanged(from, to) => write!(f, "state {from}->{to}"),
            TelemetryEventKind::BrightnessChanged => f.write_str("brightness-changed"),
            TelemetryEventKind::PressDropped => f.write_str("press-dropped"),
            TelemetryEventKind::StatusReport => f.write_str("status"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const BUTTON_PRESSED_CODE: u16 = 0x0001;
    const BUTTON_RELEASED_CODE: u16 = 0x0002;
    const STATE_CHANGED_BASE: u16 = 0x0010;
    const BRIGHTNESS_CODE: u16 = 0x0020;
    const PRESS_DROPPED_CODE: u16 = 0x0021;
    const STATUS_CODE: u16 = 0x0030;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::ButtonPressed => Self::BUTTON_PRESSED_CODE,
            TelemetryEventKind::ButtonReleased => Self::BUTTON_RELEASED_CODE,
            TelemetryEventKind::StateChanged(from, to) => {
                Self::STATE_CHANGED_BASE + u16::from(from.code()) * 3 + u16::from(to.code())
            }
            TelemetryEventKind::BrightnessChanged => Self::BRIGHTNESS_CODE,
            TelemetryEventKind::PressDropped => Self::PRESS_DROPPED_CODE,
            TelemetryEventKind::StatusReport => Self::STATUS_CODE,
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEventKind::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::BUTTON_PRESSED_CODE => TelemetryEventKind::ButtonPressed,
            Self::BUTTON_RELEASED_CODE => TelemetryEventKind::ButtonReleased,
            Self::BRIGHTNESS_CODE => TelemetryEventKind::BrightnessChanged,
            Self::PRESS_DROPPED_CODE => TelemetryEventKind::PressDropped,
            Self::STATUS_CODE => TelemetryEventKind::StatusReport,
            value if (Self::STATE_CHANGED_BASE..Self::STATE_CHANGED_BASE + 9).contains(&value) => {
                let offset = value - Self::STATE_CHANGED_BASE;
                match (state_from_index(offset / 3), state_from_index(offset % 3)) {
                    (Some(from), Some(to)) => TelemetryEventKind::StateChanged(from, to),
                    _ => TelemetryEventKind::Custom(value),
                }
            }
            other => TelemetryEventKind::Custom(other),
        }
    }
}

fn state_from_index(index: u16) -> Option<LampState> {
    u8::try_from(index).ok().and_then(LampState::from_code)
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Physical presses confirmed so far.
    Button { presses: u32 },
    /// Time spent in the state being left, unknown for the first change.
    Transition { dwell_ms: Option<u32> },
    Brightness { from: u8, to: u8 },
    /// Presses merged into an undrained one so far.
    Dropped { total: u32 },
    Status(StatusTelemetry),
}

impl TelemetryPayload {
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

impl fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryPayload::None => Ok(()),
            TelemetryPayload::Button { presses } => write!(f, " presses={presses}"),
            TelemetryPayload::Transition { dwell_ms: Some(ms) } => write!(f, " dwell={ms}ms"),
            TelemetryPayload::Transition { dwell_ms: None } => Ok(()),
            TelemetryPayload::Brightness { from, to } => write!(f, " {from}%->{to}%"),
            TelemetryPayload::Dropped { total } => write!(f, " total={total}"),
            TelemetryPayload::Status(status) => {
                write!(
                    f,
                    " state={} output={} duty={}",
                    status.state,
                    if status.level { "high" } else { "low" },
                    status.duty
                )?;
                match status.sensor {
                    Some(value) => write!(f, " sensor={value}"),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Snapshot captured by the periodic status task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusTelemetry {
    pub state: LampState,
    pub level: bool,
    pub duty: u8,
    /// Filtered sensor value, if the board has produced one.
    pub sensor: Option<u16>,
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Millis,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>8}ms] #{} {}{}",
            self.timestamp.as_millis(),
            self.id,
            self.event,
            self.details
        )
    }
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: TelemetryRing<CAPACITY>,
    last_transition_at: Option<Millis>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_transition_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Identifier the next record will receive. Use it as a drain cursor.
    #[must_use]
    pub const fn next_id(&self) -> EventId {
        self.next_event_id
    }

    /// Records still retained whose id is at or after `cursor`, oldest first.
    pub fn since(&self, cursor: EventId) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        let pending = self.next_event_id.wrapping_sub(cursor);
        let next = self.next_event_id;
        self.ring
            .oldest_ordered()
            .filter(move |record| next.wrapping_sub(record.id) <= pending)
    }

    /// Records after `cursor` that were overwritten before being drained.
    #[must_use]
    pub fn missed_since(&self, cursor: EventId) -> u32 {
        let pending = self.next_event_id.wrapping_sub(cursor);
        let retained = u32::try_from(self.ring.len()).unwrap_or(u32::MAX);
        pending.saturating_sub(retained)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn record_button(
        &mut self,
        pressed: bool,
        presses: u32,
        timestamp: Millis,
    ) -> EventId {
        let event = if pressed {
            TelemetryEventKind::ButtonPressed
        } else {
            TelemetryEventKind::ButtonReleased
        };
        self.record(event, TelemetryPayload::Button { presses }, timestamp)
    }

    /// Records a state change and the time spent in the state being left.
    pub fn record_transition(
        &mut self,
        from: LampState,
        to: LampState,
        timestamp: Millis,
    ) -> EventId {
        let dwell_ms = self
            .last_transition_at
            .map(|previous| timestamp.wrapping_since(previous));
        self.last_transition_at = Some(timestamp);

        self.record(
            TelemetryEventKind::StateChanged(from, to),
            TelemetryPayload::Transition { dwell_ms },
            timestamp,
        )
    }

    pub fn record_brightness(&mut self, from: u8, to: u8, timestamp: Millis) -> EventId {
        self.record(
            TelemetryEventKind::BrightnessChanged,
            TelemetryPayload::Brightness { from, to },
            timestamp,
        )
    }

    pub fn record_dropped(&mut self, total: u32, timestamp: Millis) -> EventId {
        self.record(
            TelemetryEventKind::PressDropped,
            TelemetryPayload::Dropped { total },
            timestamp,
        )
    }

    pub fn record_status(&mut self, status: StatusTelemetry, timestamp: Millis) -> EventId {
        self.record(
            TelemetryEventKind::StatusReport,
            TelemetryPayload::Status(status),
            timestamp,
        )
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: Millis,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
