//! Exponential backoff for requests to the phone. The phone is flaky, so every
//! request arms a retry timer, and every retry waits twice as long as the
//! last one (up to a cap). A reply is only honored if it carries the id of
//! the most recent request.

use crate::host::{Host, TimerHandle, TimerKind, TimerSlot};
use log::{debug, trace};
use std::time::Duration;

pub const MIN_BACKOFF: Duration = Duration::from_secs(10);
pub const MAX_BACKOFF: Duration = Duration::from_secs(30 * 60);

/// Each class gets its own ids and its own timer
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RequestClass {
    Weather,
    Ticker,
}

impl RequestClass {
    pub fn timer_kind(self) -> TimerKind {
        match self {
            Self::Weather => TimerKind::WeatherRetry,
            Self::Ticker => TimerKind::TickerRetry,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RetryState {
    Idle,
    AwaitingReply,
}

#[derive(Debug)]
pub struct RetryController {
    class: RequestClass,
    state: RetryState,
    /// Id of the most recent request. Bumped on every send.
    expected_id: i32,
    /// What the timer will be armed with on the next send
    next_interval: Duration,
    timer: TimerSlot,
}

impl RetryController {
    pub fn new(class: RequestClass) -> Self {
        Self {
            class,
            state: RetryState::Idle,
            expected_id: 0,
            next_interval: MIN_BACKOFF,
            timer: TimerSlot::new(class.timer_kind()),
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn expected_id(&self) -> i32 {
        self.expected_id
    }

    pub fn next_interval(&self) -> Duration {
        self.next_interval
    }

    /// Start a fresh request cycle: drop any pending retry, reset the backoff
    /// and send right away. Supersedes an outstanding request. Returns the id
    /// to put on the wire, or `None` if there's nothing to send.
    pub fn trigger<H: Host>(
        &mut self,
        host: &mut H,
        connected: bool,
    ) -> Option<i32> {
        self.timer.cancel(host);
        self.next_interval = MIN_BACKOFF;
        self.prepare_send(host, connected)
    }

    /// Retry timer went off. Returns the id to send, if we should send.
    pub fn on_timer<H: Host>(
        &mut self,
        host: &mut H,
        handle: TimerHandle,
        connected: bool,
    ) -> Option<i32> {
        if !self.timer.fire(handle) {
            return None;
        }
        if connected {
            debug!("No {:?} reply yet, retrying", self.class);
            self.prepare_send(host, connected)
        } else {
            // Keep waiting at the same pace until the phone comes back
            debug!(
                "{:?} retry while disconnected, checking back in {:?}",
                self.class, self.next_interval
            );
            self.timer.arm(host, self.next_interval);
            None
        }
    }

    /// A reply came in. Returns true if it's the one we were waiting for.
    pub fn on_reply<H: Host>(&mut self, host: &mut H, id: i32) -> bool {
        if self.state == RetryState::AwaitingReply && id == self.expected_id {
            self.timer.cancel(host);
            self.state = RetryState::Idle;
            true
        } else {
            trace!(
                "Discarding {:?} reply {id} (expected {}, {:?})",
                self.class,
                self.expected_id,
                self.state
            );
            false
        }
    }

    pub fn cancel<H: Host>(&mut self, host: &mut H) {
        self.timer.cancel(host);
        self.state = RetryState::Idle;
    }

    /// Arm the retry timer, bump the backoff and hand out a fresh id. Nothing
    /// happens while disconnected; reconnecting triggers a fresh cycle.
    fn prepare_send<H: Host>(
        &mut self,
        host: &mut H,
        connected: bool,
    ) -> Option<i32> {
        if !connected {
            debug!("Not requesting {:?}, phone is disconnected", self.class);
            return None;
        }

        self.timer.arm(host, self.next_interval);
        self.next_interval = (self.next_interval * 2).min(MAX_BACKOFF);
        self.expected_id = self.expected_id.wrapping_add(1);
        self.state = RetryState::AwaitingReply;
        Some(self.expected_id)
    }
}
