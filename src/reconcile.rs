//! Apply an incoming settings snapshot to the current settings, one field at
//! a time. Only fields that actually changed get persisted, and the view work
//! they imply is collected into one [Effects] so it's done once at the end.

use crate::{
    message::Key,
    persist::Store,
    state::{Code, Settings, SettingsSnapshot},
};
use log::{debug, error};
use std::fmt::Debug;

/// Follow-up work implied by a settings change
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Effects {
    pub redraw_background: bool,
    pub redraw_battery: bool,
    pub reload_fonts: bool,
    /// Redraw hands and re-read everything time-dependent
    pub recompute_time: bool,
    pub resubscribe_ticks: bool,
    pub resubscribe_taps: bool,
    pub refresh_weather: bool,
    pub clear_timezone: bool,
    pub clear_ticker: bool,
    pub refresh_date: bool,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Diff `snapshot` against `settings`, persisting and applying each changed
/// field
pub fn reconcile<S: Store>(
    settings: &mut Settings,
    snapshot: &SettingsSnapshot,
    store: &mut S,
) -> Effects {
    let mut effects = Effects::default();

    update(
        store,
        Key::SecondsHandDuration,
        &mut settings.seconds_hand_duration,
        snapshot.seconds_hand_duration,
    );

    let old_mode = settings.seconds_hand_mode;
    if update(
        store,
        Key::SecondsHandMode,
        &mut settings.seconds_hand_mode,
        snapshot.seconds_hand_mode,
    ) {
        let new_mode = settings.seconds_hand_mode;
        effects.recompute_time = true;
        effects.resubscribe_ticks |=
            old_mode.shows_seconds() != new_mode.shows_seconds();
        effects.resubscribe_taps |=
            old_mode.needs_tap_sensor() != new_mode.needs_tap_sensor();
    }

    // Anything the phone needs to fetch differently
    effects.refresh_weather |= update(
        store,
        Key::TemperatureUnits,
        &mut settings.temperature_units,
        snapshot.temperature_units,
    );
    effects.refresh_weather |=
        update(store, Key::Coin, &mut settings.coin, snapshot.coin);
    effects.refresh_weather |= update(
        store,
        Key::Currency,
        &mut settings.currency,
        snapshot.currency,
    );
    effects.refresh_weather |= update(
        store,
        Key::WeatherSource,
        &mut settings.weather_source,
        snapshot.weather_source,
    );

    update_bool(
        store,
        Key::VibrateOnDisconnect,
        &mut settings.vibrate_on_disconnect,
        snapshot.vibrate_on_disconnect,
    );
    effects.clear_timezone |= update_bool(
        store,
        Key::ShowTimezone,
        &mut settings.show_timezone,
        snapshot.show_timezone,
    );
    effects.clear_ticker |= update_bool(
        store,
        Key::TickerEnabled,
        &mut settings.show_ticker,
        snapshot.show_ticker,
    );
    effects.redraw_battery |= update(
        store,
        Key::ShowBatteryAtPercent,
        &mut settings.show_battery_at_percent,
        snapshot.show_battery_at_percent,
    );
    effects.recompute_time |= update(
        store,
        Key::HandStyle,
        &mut settings.hand_style,
        snapshot.hand_style,
    );
    effects.reload_fonts |= update(
        store,
        Key::TemperatureFontSize,
        &mut settings.temperature_font_size,
        snapshot.temperature_font_size,
    );
    effects.reload_fonts |= update(
        store,
        Key::TickerFontSize,
        &mut settings.ticker_font_size,
        snapshot.ticker_font_size,
    );

    // Colors
    effects.redraw_background |= update(
        store,
        Key::BackgroundColor,
        &mut settings.theme.background,
        snapshot.background_color,
    );
    if update(
        store,
        Key::Foreground1Color,
        &mut settings.theme.foreground_1,
        snapshot.foreground_1_color,
    ) {
        // Everything drawn in fg1 has to be redone
        effects.redraw_background = true;
        effects.refresh_weather = true;
        effects.refresh_date = true;
    }
    effects.recompute_time |= update(
        store,
        Key::Foreground2Color,
        &mut settings.theme.foreground_2,
        snapshot.foreground_2_color,
    );
    effects.recompute_time |= update(
        store,
        Key::Foreground3Color,
        &mut settings.theme.foreground_3,
        snapshot.foreground_3_color,
    );

    // Quiet time only matters the next time we think about refreshing
    update_bool(
        store,
        Key::QuietTime,
        &mut settings.quiet_time.enabled,
        snapshot.quiet_time,
    );
    update(
        store,
        Key::QuietTimeStart,
        &mut settings.quiet_time.start,
        snapshot.quiet_time_start,
    );
    update(
        store,
        Key::QuietTimeStop,
        &mut settings.quiet_time.stop,
        snapshot.quiet_time_stop,
    );

    debug!("Settings reconciled, effects: {effects:?}");
    effects
}

/// Persist and apply one field if it's present and different. Returns
/// whether it changed. A failed write is logged; the in-memory value still
/// changes so the face reflects what the user asked for.
fn update<S: Store, T: Code + PartialEq + Debug>(
    store: &mut S,
    key: Key,
    current: &mut T,
    incoming: Option<T>,
) -> bool {
    match incoming {
        Some(value) if value != *current => {
            debug!("{key:?} changed: {current:?} -> {value:?}");
            if let Err(err) = store.write_code(key, value) {
                error!("Error persisting {key:?}: {err:?}");
            }
            *current = value;
            true
        }
        _ => false,
    }
}

fn update_bool<S: Store>(
    store: &mut S,
    key: Key,
    current: &mut bool,
    incoming: Option<bool>,
) -> bool {
    match incoming {
        Some(value) if value != *current => {
            debug!("{key:?} changed: {current} -> {value}");
            if let Err(err) = store.write_bool(key.id(), value) {
                error!("Error persisting {key:?}: {err:?}");
            }
            *current = value;
            true
        }
        _ => false,
    }
}
