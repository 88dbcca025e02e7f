//! Test doubles for the host and the surface. They just write down what they
//! were asked to do.

use crate::{
    host::{
        Host, LocalTime, SendError, TickUnit, TimerHandle, TimerKind,
    },
    message::{OutboundRequest, Record},
    state::{FontSize, HandStyle, Theme},
    view::{Layer, Surface, TextField},
};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::time::Duration;

#[derive(Debug)]
pub struct FakeHost {
    next_handle: u64,
    /// Every timer ever scheduled, in order
    pub scheduled: Vec<(TimerKind, TimerHandle, Duration)>,
    /// Timers scheduled but not yet fired or cancelled
    live: Vec<(TimerKind, TimerHandle)>,
    pub cancelled: Vec<TimerHandle>,
    /// Records that made it into the outbox
    pub sent: Vec<Record>,
    pub send_attempts: usize,
    /// What the next sends return
    pub send_result: Result<(), SendError>,
    pub ticks: Option<TickUnit>,
    pub taps: bool,
    pub vibrations: usize,
    pub restarts: usize,
    pub now: LocalTime,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            next_handle: 0,
            scheduled: Vec::new(),
            live: Vec::new(),
            cancelled: Vec::new(),
            sent: Vec::new(),
            send_attempts: 0,
            send_result: Ok(()),
            ticks: None,
            taps: false,
            vibrations: 0,
            restarts: 0,
            now: LocalTime {
                time: datetime(10, 15, 0),
                zone: "PDT".into(),
            },
        }
    }
}

impl FakeHost {
    pub fn last_scheduled(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.scheduled
            .iter()
            .rev()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, handle, _)| *handle)
    }

    pub fn last_interval(&self, kind: TimerKind) -> Option<Duration> {
        self.scheduled
            .iter()
            .rev()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, _, after)| *after)
    }

    pub fn live_timer(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.live
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, handle)| *handle)
    }

    pub fn live_timers(&self) -> usize {
        self.live.len()
    }

    /// Fire the live timer of the given kind, as the host would when it
    /// expires. Returns the handle to pass to the watchface.
    pub fn fire(&mut self, kind: TimerKind) -> Option<TimerHandle> {
        let index = self.live.iter().position(|(k, _)| *k == kind)?;
        Some(self.live.remove(index).1)
    }

    /// Decode everything sent so far
    pub fn sent_requests(&self) -> Vec<OutboundRequest> {
        self.sent
            .iter()
            .map(|record| OutboundRequest::decode(record).unwrap())
            .collect()
    }
}

impl Host for FakeHost {
    fn schedule(&mut self, kind: TimerKind, after: Duration) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.scheduled.push((kind, handle, after));
        self.live.push((kind, handle));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.live.retain(|(_, h)| *h != handle);
        self.cancelled.push(handle);
    }

    fn send(&mut self, record: Record) -> Result<(), SendError> {
        self.send_attempts += 1;
        self.send_result?;
        self.sent.push(record);
        Ok(())
    }

    fn subscribe_ticks(&mut self, unit: TickUnit) {
        self.ticks = Some(unit);
    }

    fn unsubscribe_ticks(&mut self) {
        self.ticks = None;
    }

    fn subscribe_taps(&mut self) {
        self.taps = true;
    }

    fn unsubscribe_taps(&mut self) {
        self.taps = false;
    }

    fn vibrate(&mut self) {
        self.vibrations += 1;
    }

    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn now(&self) -> LocalTime {
        self.now.clone()
    }
}

#[derive(Debug, Default)]
pub struct FakeSurface {
    pub text: IndexMap<TextField, String>,
    pub fonts: IndexMap<TextField, FontSize>,
    pub theme: Option<Theme>,
    pub hand_style: Option<HandStyle>,
    pub seconds_visible: Option<bool>,
    pub battery_level: Option<Option<u8>>,
    pub dirty: Vec<Layer>,
}

impl FakeSurface {
    pub fn text(&self, field: TextField) -> &str {
        self.text.get(&field).map(String::as_str).unwrap_or_default()
    }

    pub fn take_dirty(&mut self) -> Vec<Layer> {
        std::mem::take(&mut self.dirty)
    }
}

impl Surface for FakeSurface {
    fn set_text(&mut self, field: TextField, text: &str) {
        self.text.insert(field, text.to_owned());
    }

    fn set_font(&mut self, field: TextField, size: FontSize) {
        self.fonts.insert(field, size);
    }

    fn set_theme(&mut self, theme: Theme) {
        self.theme = Some(theme);
    }

    fn set_hand_style(&mut self, style: HandStyle) {
        self.hand_style = Some(style);
    }

    fn set_seconds_visible(&mut self, visible: bool) {
        self.seconds_visible = Some(visible);
    }

    fn set_battery_level(&mut self, level: Option<u8>) {
        self.battery_level = Some(level);
    }

    fn mark_dirty(&mut self, layer: Layer) {
        self.dirty.push(layer);
    }
}

/// 2024-03-15 (a Friday) at the given time
pub fn datetime(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}
