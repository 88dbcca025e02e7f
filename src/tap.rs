//! Tapping the watch shows or hides the seconds hand, depending on the mode.
//! Taps tend to come in bursts, so anything within a couple seconds of the
//! previous tap is dropped.

use crate::{
    host::{Host, TimerHandle, TimerKind, TimerSlot},
    state::SecondsHandMode,
};
use chrono::NaiveDateTime;
use log::{debug, trace, warn};
use std::time::Duration;

/// Taps closer together than this count as one. Measured from the previous
/// tap, whether or not that one was accepted.
pub const DEBOUNCE: Duration = Duration::from_secs(2);

/// What a tap does in a given mode
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub next: SecondsHandMode,
    /// Hands need to be redrawn right away
    pub redraw: bool,
    /// Tick granularity changes
    pub resubscribe_ticks: bool,
    /// (Re)start the timer that hides the hand again
    pub arm_auto_off: bool,
}

/// The full transition table. Modes that don't react to taps give `None`.
pub fn transition(mode: SecondsHandMode) -> Option<Transition> {
    use SecondsHandMode::*;
    let transition = match mode {
        FixedDurationOff => Transition {
            next: FixedDurationOn,
            redraw: true,
            resubscribe_ticks: true,
            arm_auto_off: true,
        },
        // Already showing, just give it more time
        FixedDurationOn => Transition {
            next: FixedDurationOn,
            redraw: false,
            resubscribe_ticks: false,
            arm_auto_off: true,
        },
        ToggleTapOff => Transition {
            next: ToggleTapOn,
            redraw: true,
            resubscribe_ticks: true,
            arm_auto_off: false,
        },
        ToggleTapOn => Transition {
            next: ToggleTapOff,
            redraw: true,
            resubscribe_ticks: true,
            arm_auto_off: false,
        },
        Off | On => return None,
    };
    Some(transition)
}

#[derive(Debug)]
pub struct TapToggle {
    last_tap: Option<NaiveDateTime>,
    auto_off: TimerSlot,
}

impl TapToggle {
    pub fn new() -> Self {
        Self {
            last_tap: None,
            auto_off: TimerSlot::new(TimerKind::SecondsAutoOff),
        }
    }

    /// Handle a tap, updating the mode in place. Returns what changed, so the
    /// caller can redraw. The new mode is deliberately not persisted.
    pub fn on_tap<H: Host>(
        &mut self,
        host: &mut H,
        now: NaiveDateTime,
        mode: &mut SecondsHandMode,
        duration_minutes: i32,
    ) -> Option<Transition> {
        let debounced = self.last_tap.is_some_and(|last| {
            now.signed_duration_since(last).num_milliseconds()
                < DEBOUNCE.as_millis() as i64
        });
        self.last_tap = Some(now);
        if debounced {
            trace!("Ignoring tap inside debounce window");
            return None;
        }

        let Some(transition) = transition(*mode) else {
            warn!("Received tap in mode {mode:?}, which doesn't expect one");
            return None;
        };
        debug!("Tap: {:?} -> {:?}", mode, transition.next);
        *mode = transition.next;
        if transition.arm_auto_off {
            self.auto_off.arm(host, auto_off_after(duration_minutes));
        }
        Some(transition)
    }

    /// Auto-off timer fired. Returns true if the hand should now be hidden.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        mode: &mut SecondsHandMode,
    ) -> bool {
        if !self.auto_off.fire(handle) {
            return false;
        }
        if *mode == SecondsHandMode::FixedDurationOn {
            *mode = SecondsHandMode::FixedDurationOff;
            true
        } else {
            warn!("Seconds hand auto-off fired in mode {mode:?}, ignoring");
            false
        }
    }

    pub fn cancel<H: Host>(&mut self, host: &mut H) {
        self.auto_off.cancel(host);
    }
}

impl Default for TapToggle {
    fn default() -> Self {
        Self::new()
    }
}

fn auto_off_after(duration_minutes: i32) -> Duration {
    Duration::from_secs(u64::try_from(duration_minutes).unwrap_or(0) * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;
    use chrono::{NaiveDate, TimeDelta};

    fn at(seconds: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + TimeDelta::seconds(seconds)
    }

    /// Tap at each time (in seconds), return how many taps did something
    fn transitions(mut mode: SecondsHandMode, taps: &[i64]) -> usize {
        let mut host = FakeHost::default();
        let mut toggle = TapToggle::new();
        taps.iter()
            .filter(|&&time| {
                toggle.on_tap(&mut host, at(time), &mut mode, 2).is_some()
            })
            .count()
    }

    #[test]
    fn test_debounce() {
        use SecondsHandMode::*;
        assert_eq!(transitions(ToggleTapOff, &[0, 1]), 1);
        assert_eq!(transitions(ToggleTapOff, &[0, 2]), 2);
        assert_eq!(transitions(ToggleTapOff, &[0, 5]), 2);
        // Every tap restarts the window, even ignored ones
        assert_eq!(transitions(ToggleTapOff, &[0, 1, 2, 3]), 1);
        assert_eq!(transitions(FixedDurationOff, &[0, 1]), 1);
    }

    #[test]
    fn test_toggle() {
        let mut host = FakeHost::default();
        let mut toggle = TapToggle::new();
        let mut mode = SecondsHandMode::ToggleTapOff;

        let transition =
            toggle.on_tap(&mut host, at(0), &mut mode, 2).unwrap();
        assert_eq!(mode, SecondsHandMode::ToggleTapOn);
        assert!(transition.redraw && transition.resubscribe_ticks);
        assert!(!transition.arm_auto_off);

        toggle.on_tap(&mut host, at(10), &mut mode, 2).unwrap();
        assert_eq!(mode, SecondsHandMode::ToggleTapOff);
        // Toggle mode never touches the timer
        assert_eq!(host.live_timers(), 0);
    }

    #[test]
    fn test_fixed_duration() {
        let mut host = FakeHost::default();
        let mut toggle = TapToggle::new();
        let mut mode = SecondsHandMode::FixedDurationOff;

        toggle.on_tap(&mut host, at(0), &mut mode, 3).unwrap();
        assert_eq!(mode, SecondsHandMode::FixedDurationOn);
        assert_eq!(
            host.last_interval(TimerKind::SecondsAutoOff),
            Some(Duration::from_secs(180))
        );
        let first = host.live_timer(TimerKind::SecondsAutoOff).unwrap();

        // Tapping again restarts the timer without redrawing
        let transition =
            toggle.on_tap(&mut host, at(30), &mut mode, 3).unwrap();
        assert!(!transition.redraw);
        assert_eq!(mode, SecondsHandMode::FixedDurationOn);
        assert_eq!(host.cancelled, vec![first]);
        assert_eq!(host.live_timers(), 1);

        let handle = host.fire(TimerKind::SecondsAutoOff).unwrap();
        assert!(!toggle.on_timer(first, &mut mode));
        assert!(toggle.on_timer(handle, &mut mode));
        assert_eq!(mode, SecondsHandMode::FixedDurationOff);
    }

    #[test]
    fn test_auto_off_wrong_mode() {
        let mut host = FakeHost::default();
        let mut toggle = TapToggle::new();
        let mut mode = SecondsHandMode::FixedDurationOff;
        toggle.on_tap(&mut host, at(0), &mut mode, 2).unwrap();

        // Config page switched modes while the timer was pending
        mode = SecondsHandMode::On;
        let handle = host.fire(TimerKind::SecondsAutoOff).unwrap();
        assert!(!toggle.on_timer(handle, &mut mode));
        assert_eq!(mode, SecondsHandMode::On);
    }

    #[test]
    fn test_untappable_modes() {
        let mut host = FakeHost::default();
        let mut toggle = TapToggle::new();
        let mut mode = SecondsHandMode::On;
        assert_eq!(toggle.on_tap(&mut host, at(0), &mut mode, 2), None);
        assert_eq!(mode, SecondsHandMode::On);
        assert_eq!(transition(SecondsHandMode::Off), None);
    }
}
