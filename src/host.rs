//! The seam between the watchface and whatever it's running on. On a watch
//! this is the OS; in the simulator it's [crate::sim::SimHost]. The core
//! never blocks: it schedules one-shot timers and gets called back.

use crate::message::Record;
use chrono::NaiveDateTime;
use log::trace;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// The three things we ever wait on. At most one timer per kind is live.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum TimerKind {
    WeatherRetry,
    TickerRetry,
    SecondsAutoOff,
}

/// Identifies one scheduled timer. Handles are never reused, so a fired
/// handle that doesn't match the one we're holding is stale.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct TimerHandle(pub u64);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickUnit {
    Second,
    Minute,
}

/// Reasons an outbound message can fail. None of these are fatal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("Timed out waiting for the phone")]
    Timeout,
    #[error("Phone rejected the message")]
    Rejected,
    #[error("Phone is not connected")]
    NotConnected,
    #[error("Phone app is not running")]
    AppNotRunning,
    #[error("Invalid arguments")]
    InvalidArgs,
    #[error("Outbox is busy")]
    Busy,
    #[error("Message buffer overflow")]
    BufferOverflow,
    #[error("Message was already released")]
    AlreadyReleased,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Internal error")]
    Internal,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BatteryState {
    pub charge_percent: u8,
    pub is_charging: bool,
    pub is_plugged: bool,
}

/// Wall clock reading
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalTime {
    pub time: NaiveDateTime,
    /// Zone abbreviation, e.g. "PDT"
    pub zone: String,
}

/// Services the host provides to the watchface
pub trait Host {
    /// Schedule a one-shot timer. When it fires the host calls
    /// [crate::watchface::Watchface::on_timer] with the same kind and handle.
    fn schedule(&mut self, kind: TimerKind, after: Duration) -> TimerHandle;

    /// Cancel a pending timer. Cancelling a timer that already fired is a
    /// no-op.
    fn cancel(&mut self, handle: TimerHandle);

    /// Hand a record to the outbox
    fn send(&mut self, record: Record) -> Result<(), SendError>;

    /// Deliver ticks at the given granularity, replacing any previous
    /// subscription
    fn subscribe_ticks(&mut self, unit: TickUnit);

    fn unsubscribe_ticks(&mut self);

    fn subscribe_taps(&mut self);

    fn unsubscribe_taps(&mut self);

    fn vibrate(&mut self);

    /// Restart the whole app. Some firmware gets its outbox stuck in the busy
    /// state, and this is the only way out.
    fn restart(&mut self);

    fn now(&self) -> LocalTime;
}

/// Holds the handle for one kind of timer. Arming cancels whatever was
/// there, and the handle is cleared as soon as the timer fires or is
/// cancelled.
#[derive(Debug)]
pub struct TimerSlot {
    kind: TimerKind,
    handle: Option<TimerHandle>,
}

impl TimerSlot {
    pub fn new(kind: TimerKind) -> Self {
        Self { kind, handle: None }
    }

    pub fn arm<H: Host>(&mut self, host: &mut H, after: Duration) {
        self.cancel(host);
        trace!("Arming {:?} timer for {:?}", self.kind, after);
        self.handle = Some(host.schedule(self.kind, after));
    }

    pub fn cancel<H: Host>(&mut self, host: &mut H) {
        if let Some(handle) = self.handle.take() {
            host.cancel(handle);
        }
    }

    /// Claim a fired timer. Returns false if the handle is stale, in which
    /// case the caller should ignore the event.
    pub fn fire(&mut self, handle: TimerHandle) -> bool {
        if self.handle == Some(handle) {
            self.handle = None;
            true
        } else {
            trace!("Ignoring stale {:?} timer {:?}", self.kind, handle);
            false
        }
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}
