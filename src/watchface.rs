//! The watchface proper. Owns all the state, reacts to host events one at a
//! time, and tells the surface what to show. Nothing in here blocks.

use crate::{
    host::{
        BatteryState, Host, LocalTime, SendError, TickUnit, TimerHandle,
        TimerKind,
    },
    message::{
        self, InboundMessage, OutboundRequest, Record, TickerRequest,
        WeatherRequest,
    },
    persist::Store,
    reconcile::{self, Effects},
    retry::{RequestClass, RetryController},
    state::{Settings, WatchState},
    tap::TapToggle,
    view::{self, Icon, Layer, Surface, TextField},
    weather,
};
use chrono::{NaiveDateTime, Timelike};
use log::{debug, error, info, warn};

pub struct Watchface<S: Store, H: Host, V: Surface> {
    state: WatchState,
    store: S,
    host: H,
    surface: V,
    weather: RetryController,
    ticker: RetryController,
    tap: TapToggle,
    /// Zone text currently on screen. Empty when hidden.
    timezone_text: String,
}

impl<S: Store, H: Host, V: Surface> Watchface<S, H, V> {
    /// Load settings from the store. Nothing is shown or requested until
    /// [Self::start].
    pub fn new(store: S, host: H, surface: V) -> Self {
        let state = WatchState::load(&store);
        debug!("Loaded settings: {:?}", state.settings);
        Self {
            state,
            store,
            host,
            surface,
            weather: RetryController::new(RequestClass::Weather),
            ticker: RetryController::new(RequestClass::Ticker),
            tap: TapToggle::new(),
            timezone_text: String::new(),
        }
    }

    /// Seed the view, subscribe to host services and apply the initial
    /// connection state (which requests weather, if we're connected)
    pub fn start(&mut self, connected: bool) {
        info!("Starting watchface");
        let settings = &self.state.settings;
        self.surface.set_theme(settings.theme);
        self.surface
            .set_font(TextField::Temperature, settings.temperature_font_size);
        self.surface
            .set_font(TextField::Ticker, settings.ticker_font_size);
        self.refresh_date();
        self.recompute_time();
        self.subscribe_ticks();
        if self.state.settings.seconds_hand_mode.needs_tap_sensor() {
            self.host.subscribe_taps();
        }
        self.update_bluetooth(connected);
    }

    pub fn on_tick(&mut self, now: &LocalTime) {
        self.surface.mark_dirty(Layer::SecondHand);
        self.update_timezone(&now.zone);

        let time = now.time;
        // Top of the minute
        if time.second() == 0 {
            self.surface.mark_dirty(Layer::Hands);
            if time.hour() == 0 && time.minute() == 0 {
                self.set_date(&time);
            }
            // Top and bottom of the hour
            if (time.minute() == 0 || time.minute() == 30)
                && !self.state.settings.quiet_time.contains(time.hour())
            {
                self.trigger_weather();
            }
        }
    }

    pub fn on_connection(&mut self, connected: bool) {
        self.update_bluetooth(connected);
        if !connected && self.state.settings.vibrate_on_disconnect {
            self.host.vibrate();
        }
    }

    pub fn on_battery(&mut self, battery: BatteryState) {
        debug!("Battery: {battery:?}");
        self.state.battery = Some(battery);
        self.update_battery();
    }

    pub fn on_tap(&mut self) {
        let now = self.host.now().time;
        let duration = self.state.settings.seconds_hand_duration;
        let transition = self.tap.on_tap(
            &mut self.host,
            now,
            &mut self.state.settings.seconds_hand_mode,
            duration,
        );
        if let Some(transition) = transition {
            self.apply_effects(Effects {
                recompute_time: transition.redraw,
                resubscribe_ticks: transition.resubscribe_ticks,
                ..Effects::default()
            });
        }
    }

    pub fn on_timer(&mut self, kind: TimerKind, handle: TimerHandle) {
        let connected = self.state.bluetooth_connected;
        match kind {
            TimerKind::WeatherRetry => {
                if let Some(id) =
                    self.weather.on_timer(&mut self.host, handle, connected)
                {
                    let weather = weather_request(&self.state.settings, id);
                    let request = OutboundRequest {
                        weather: Some(weather),
                        ticker: None,
                    };
                    self.send(request);
                }
            }
            TimerKind::TickerRetry => {
                if let Some(id) =
                    self.ticker.on_timer(&mut self.host, handle, connected)
                {
                    let request = OutboundRequest {
                        weather: None,
                        ticker: Some(ticker_request(&self.state.settings, id)),
                    };
                    self.send(request);
                }
            }
            TimerKind::SecondsAutoOff => {
                if self.tap.on_timer(
                    handle,
                    &mut self.state.settings.seconds_hand_mode,
                ) {
                    self.apply_effects(Effects {
                        recompute_time: true,
                        resubscribe_ticks: true,
                        ..Effects::default()
                    });
                }
            }
        }
    }

    pub fn on_message(&mut self, record: &Record) {
        let message = match message::decode(record) {
            Ok(message) => message,
            Err(err) => {
                error!("Error decoding message: {err:#}");
                return;
            }
        };

        match message {
            InboundMessage::Ready => {
                info!("Phone is ready");
                self.trigger_weather();
                self.refresh_date();
            }
            InboundMessage::Weather {
                request_id,
                condition_code,
                temperature,
                is_daylight,
            } => {
                if self.weather.on_reply(&mut self.host, request_id) {
                    let icon = weather::condition_icon(
                        self.state.settings.weather_source,
                        condition_code,
                        is_daylight,
                    );
                    // Done syncing
                    self.surface
                        .set_text(TextField::Bluetooth, Icon::None.glyph());
                    self.surface.set_text(TextField::Condition, icon.glyph());
                    self.surface.set_text(
                        TextField::Temperature,
                        &weather::temperature_text(temperature),
                    );
                }
            }
            InboundMessage::Ticker {
                request_id,
                symbol_text,
            } => {
                if self.ticker.on_reply(&mut self.host, request_id) {
                    if self.state.settings.show_ticker {
                        let text = view::ticker_text(&symbol_text);
                        debug!("Updating ticker to {text}");
                        self.surface.set_text(TextField::Ticker, &text);
                    } else {
                        debug!("Ticker is hidden, dropping {symbol_text:?}");
                    }
                }
            }
            InboundMessage::Settings(snapshot) => {
                info!(
                    "Received settings{}",
                    if snapshot.from_config_page {
                        " from config page"
                    } else {
                        ""
                    }
                );
                let effects = reconcile::reconcile(
                    &mut self.state.settings,
                    &snapshot,
                    &mut self.store,
                );
                self.apply_effects(effects);
            }
        }
    }

    /// The host reports an outbound message failed after it was handed off
    pub fn on_send_failed(&mut self, error: SendError) {
        warn!("Outbox failed to send: {error}");
        if error == SendError::Busy {
            self.restart();
        }
    }

    /// Cancel all timers and drop all host subscriptions
    pub fn stop(&mut self) {
        info!("Stopping watchface");
        self.weather.cancel(&mut self.host);
        self.ticker.cancel(&mut self.host);
        self.tap.cancel(&mut self.host);
        self.host.unsubscribe_ticks();
        self.host.unsubscribe_taps();
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn surface(&self) -> &V {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut V {
        &mut self.surface
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tear down into the pieces needed to build a fresh watchface
    pub fn into_parts(self) -> (S, H, V) {
        (self.store, self.host, self.surface)
    }

    /// Start a fresh weather cycle, with the ticker riding along if it's
    /// enabled. Both go out in one record.
    fn trigger_weather(&mut self) {
        let connected = self.state.bluetooth_connected;
        let weather = self
            .weather
            .trigger(&mut self.host, connected)
            .map(|id| weather_request(&self.state.settings, id));
        let ticker = if self.state.settings.show_ticker {
            self.ticker
                .trigger(&mut self.host, connected)
                .map(|id| ticker_request(&self.state.settings, id))
        } else {
            None
        };

        if weather.is_some() || ticker.is_some() {
            self.send(OutboundRequest { weather, ticker });
        }
    }

    fn send(&mut self, request: OutboundRequest) {
        debug!("Sending {request:?}");
        if let Err(err) = self.host.send(request.encode()) {
            warn!("Unable to send request: {err}");
            // Some firmware never recovers from a busy outbox after a
            // reconnect. The retry timer stays armed either way.
            if err == SendError::Busy {
                self.restart();
            }
        }
    }

    fn restart(&mut self) {
        error!("Restarting watchface to recover from a stuck outbox");
        self.surface
            .set_text(TextField::Bluetooth, Icon::Restart.glyph());
        self.host.restart();
    }

    fn update_bluetooth(&mut self, connected: bool) {
        info!(
            "Phone {}",
            if connected { "connected" } else { "disconnected" }
        );
        let icon = if connected {
            Icon::None
        } else {
            Icon::BluetoothDisconnect
        };
        self.surface.set_text(TextField::Bluetooth, icon.glyph());
        self.state.bluetooth_connected = connected;
        if connected {
            self.trigger_weather();
        }
    }

    fn update_battery(&mut self) {
        if let Some(battery) = &self.state.battery {
            let threshold = self.state.settings.show_battery_at_percent;
            self.surface
                .set_battery_level(view::battery_level(battery, threshold));
            self.surface.set_text(
                TextField::Battery,
                view::battery_icon(battery).glyph(),
            );
        }
        self.surface.mark_dirty(Layer::Battery);
    }

    fn update_timezone(&mut self, zone: &str) {
        if !self.state.settings.show_timezone {
            return;
        }
        let text = view::timezone_text(zone);
        if text != self.timezone_text {
            debug!("Updating timezone to {text}");
            self.timezone_text = text.to_owned();
            self.surface.set_text(TextField::Timezone, text);
        }
    }

    fn refresh_date(&mut self) {
        let now = self.host.now().time;
        self.set_date(&now);
    }

    fn set_date(&mut self, now: &NaiveDateTime) {
        self.surface.set_text(TextField::Date, &view::date_text(now));
    }

    /// Redraw everything that depends on the time or the hands
    fn recompute_time(&mut self) {
        let settings = &self.state.settings;
        self.surface.set_hand_style(settings.hand_style);
        self.surface
            .set_seconds_visible(settings.seconds_hand_mode.shows_seconds());
        self.surface.mark_dirty(Layer::Hands);
        self.surface.mark_dirty(Layer::SecondHand);
        let now = self.host.now();
        self.update_timezone(&now.zone);
    }

    fn subscribe_ticks(&mut self) {
        let unit = if self.state.settings.seconds_hand_mode.shows_seconds() {
            TickUnit::Second
        } else {
            TickUnit::Minute
        };
        debug!("Subscribing to ticks every {unit:?}");
        self.host.subscribe_ticks(unit);
    }

    /// Carry out everything a batch of changes asked for, once
    fn apply_effects(&mut self, effects: Effects) {
        if effects.is_empty() {
            return;
        }
        let settings = &self.state.settings;

        if effects.redraw_background
            || effects.recompute_time
            || effects.refresh_date
        {
            self.surface.set_theme(settings.theme);
        }
        if effects.redraw_background {
            self.surface.mark_dirty(Layer::Background);
        }
        if effects.reload_fonts {
            self.surface.set_font(
                TextField::Temperature,
                settings.temperature_font_size,
            );
            self.surface
                .set_font(TextField::Ticker, settings.ticker_font_size);
        }
        if effects.clear_timezone {
            // Filled back in on the next tick, if it's enabled
            self.timezone_text.clear();
            self.surface.set_text(TextField::Timezone, "");
        }
        if effects.clear_ticker {
            self.surface
                .set_text(TextField::Ticker, &view::ticker_text(""));
            if !settings.show_ticker {
                self.ticker.cancel(&mut self.host);
            }
        }
        if effects.redraw_battery {
            self.update_battery();
        }
        if effects.refresh_date {
            self.refresh_date();
        }
        if effects.refresh_weather {
            self.trigger_weather();
        }
        if effects.recompute_time {
            self.recompute_time();
        }
        if effects.resubscribe_ticks {
            self.subscribe_ticks();
        }
        if effects.resubscribe_taps {
            if self.state.settings.seconds_hand_mode.needs_tap_sensor() {
                self.host.subscribe_taps();
            } else {
                self.host.unsubscribe_taps();
            }
        }
    }
}

fn weather_request(settings: &Settings, id: i32) -> WeatherRequest {
    WeatherRequest {
        id,
        source: settings.weather_source,
        units: settings.temperature_units,
    }
}

fn ticker_request(settings: &Settings, id: i32) -> TickerRequest {
    TickerRequest {
        id,
        coin: settings.coin,
        currency: settings.currency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        message::Key,
        persist::MemoryStore,
        state::{
            Coin, Currency, SecondsHandMode, SettingsSnapshot,
            TemperatureUnits, WeatherSource,
        },
        testing::{datetime, FakeHost, FakeSurface},
    };

    type TestWatchface = Watchface<MemoryStore, FakeHost, FakeSurface>;

    fn watchface() -> TestWatchface {
        Watchface::new(
            MemoryStore::default(),
            FakeHost::default(),
            FakeSurface::default(),
        )
    }

    /// A started, connected watchface with the startup request already
    /// answered and forgotten
    fn started() -> TestWatchface {
        let mut watchface = watchface();
        watchface.start(true);
        watchface.on_message(&weather_reply(1, 800, 72));
        watchface.on_message(&ticker_reply(1, "63.3k"));
        watchface.host_mut().sent.clear();
        watchface.surface_mut().take_dirty();
        watchface
    }

    fn with_store(store: MemoryStore) -> TestWatchface {
        Watchface::new(store, FakeHost::default(), FakeSurface::default())
    }

    fn weather_reply(id: i32, code: i32, temperature: i32) -> Record {
        Record::new()
            .with(Key::MessageType, 1)
            .with(Key::WeatherMessageId, id)
            .with(Key::ConditionCode, code)
            .with(Key::Temperature, temperature)
            .with(Key::IsDaylight, 1)
    }

    fn ticker_reply(id: i32, text: &str) -> Record {
        Record::new()
            .with(Key::MessageType, 3)
            .with(Key::TickerMessageId, id)
            .with(Key::TickerText, text)
    }

    fn tick(time: NaiveDateTime) -> LocalTime {
        LocalTime {
            time,
            zone: "PDT".into(),
        }
    }

    #[test]
    fn test_start_connected() {
        let mut watchface = watchface();
        watchface.start(true);

        let host = watchface.host();
        assert_eq!(host.ticks, Some(TickUnit::Minute));
        assert!(!host.taps);
        assert_eq!(
            host.sent_requests(),
            vec![OutboundRequest {
                weather: Some(WeatherRequest {
                    id: 1,
                    source: WeatherSource::OpenWeatherMap,
                    units: TemperatureUnits::Fahrenheit,
                }),
                ticker: Some(TickerRequest {
                    id: 1,
                    coin: Coin::Bitcoin,
                    currency: Currency::Usd,
                }),
            }]
        );
        assert!(host.live_timer(TimerKind::WeatherRetry).is_some());
        assert!(host.live_timer(TimerKind::TickerRetry).is_some());

        let surface = watchface.surface();
        assert_eq!(surface.text(TextField::Date), "Fri 15");
        assert_eq!(surface.text(TextField::Bluetooth), "");
        assert_eq!(surface.seconds_visible, Some(false));
    }

    #[test]
    fn test_start_disconnected() {
        let mut watchface = watchface();
        watchface.start(false);
        assert!(watchface.host().sent.is_empty());
        assert_eq!(watchface.host().live_timers(), 0);
        assert_eq!(watchface.surface().text(TextField::Bluetooth), "b");
        // Startup isn't a disconnect event, so no buzz
        assert_eq!(watchface.host().vibrations, 0);
    }

    #[test]
    fn test_weather_reply() {
        let mut watchface = watchface();
        watchface.start(true);

        // Stale reply is dropped
        watchface.on_message(&weather_reply(0, 500, 50));
        assert_eq!(watchface.surface().text(TextField::Condition), "");

        watchface.on_message(&weather_reply(1, 800, 72));
        let surface = watchface.surface();
        assert_eq!(surface.text(TextField::Condition), "N");
        assert_eq!(surface.text(TextField::Temperature), "72°");
        let host = watchface.host();
        assert!(host.live_timer(TimerKind::WeatherRetry).is_none());
        // Ticker is still waiting on its own reply
        assert!(host.live_timer(TimerKind::TickerRetry).is_some());
    }

    #[test]
    fn test_ticker_reply() {
        let mut watchface = watchface();
        watchface.start(true);
        watchface.on_message(&ticker_reply(1, "63.3k"));
        assert_eq!(watchface.surface().text(TextField::Ticker), "$63.3k");
        assert!(watchface
            .host()
            .live_timer(TimerKind::TickerRetry)
            .is_none());
    }

    #[test]
    fn test_bad_message_is_ignored() {
        let mut watchface = started();
        watchface.on_message(&Record::new().with(Key::MessageType, 42));
        watchface.on_message(&Record::new());
        assert!(watchface.host().sent.is_empty());
    }

    #[test]
    fn test_ready_triggers_weather() {
        let mut watchface = started();
        watchface.on_message(&Record::new().with(Key::MessageType, 0));
        let requests = watchface.host().sent_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].weather.unwrap().id, 2);
        assert_eq!(requests[0].ticker.unwrap().id, 2);
    }

    #[test]
    fn test_tick_schedule() {
        let mut watchface = started();

        watchface.on_tick(&tick(datetime(10, 29, 0)));
        assert!(watchface.host().sent.is_empty());
        assert_eq!(
            watchface.surface_mut().take_dirty(),
            vec![Layer::SecondHand, Layer::Hands]
        );

        watchface.on_tick(&tick(datetime(10, 30, 0)));
        assert_eq!(watchface.host().sent.len(), 1);

        // Only on the top of the minute
        watchface.on_tick(&tick(datetime(11, 0, 1)));
        assert_eq!(watchface.host().sent.len(), 1);
        watchface.on_tick(&tick(datetime(11, 0, 0)));
        assert_eq!(watchface.host().sent.len(), 2);
    }

    #[test]
    fn test_tick_quiet_time() {
        let mut store = MemoryStore::default();
        store.write_bool(Key::QuietTime.id(), true).unwrap();
        let mut watchface = with_store(store);
        watchface.start(true);
        watchface.host_mut().sent.clear();

        // Default window is 23 -> 6
        watchface.on_tick(&tick(datetime(2, 0, 0)));
        watchface.on_tick(&tick(datetime(23, 30, 0)));
        assert!(watchface.host().sent.is_empty());
        watchface.on_tick(&tick(datetime(6, 0, 0)));
        assert_eq!(watchface.host().sent.len(), 1);
    }

    #[test]
    fn test_midnight_refreshes_date() {
        let mut watchface = started();
        let midnight = chrono::NaiveDate::from_ymd_opt(2024, 3, 16)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        watchface.on_tick(&tick(midnight));
        assert_eq!(watchface.surface().text(TextField::Date), "Sat 16");
    }

    #[test]
    fn test_timezone() {
        let mut store = MemoryStore::default();
        store.write_bool(Key::ShowTimezone.id(), true).unwrap();
        let mut watchface = with_store(store);
        watchface.start(true);
        assert_eq!(watchface.surface().text(TextField::Timezone), "PDT");

        watchface.on_tick(&LocalTime {
            time: datetime(10, 16, 0),
            zone: "AEST".into(),
        });
        assert_eq!(watchface.surface().text(TextField::Timezone), "AEST");

        // Turning it off clears it
        watchface.on_message(
            &SettingsSnapshot {
                show_timezone: Some(false),
                ..Default::default()
            }
            .to_record(),
        );
        assert_eq!(watchface.surface().text(TextField::Timezone), "");
        watchface.on_tick(&tick(datetime(10, 17, 0)));
        assert_eq!(watchface.surface().text(TextField::Timezone), "");
    }

    #[test]
    fn test_connection() {
        let mut watchface = started();
        watchface.on_connection(false);
        assert_eq!(watchface.host().vibrations, 1);
        assert_eq!(watchface.surface().text(TextField::Bluetooth), "b");
        assert!(watchface.host().sent.is_empty());

        watchface.on_connection(true);
        assert_eq!(watchface.surface().text(TextField::Bluetooth), "");
        assert_eq!(watchface.host().sent.len(), 1);
        assert_eq!(watchface.host().vibrations, 1);
    }

    #[test]
    fn test_no_vibrate_when_disabled() {
        let mut store = MemoryStore::default();
        store.write_bool(Key::VibrateOnDisconnect.id(), false).unwrap();
        let mut watchface = with_store(store);
        watchface.start(true);
        watchface.on_connection(false);
        assert_eq!(watchface.host().vibrations, 0);
    }

    #[test]
    fn test_retry_timers() {
        let mut watchface = watchface();
        watchface.start(true);
        watchface.host_mut().sent.clear();

        let handle = watchface
            .host_mut()
            .fire(TimerKind::WeatherRetry)
            .unwrap();
        watchface.on_timer(TimerKind::WeatherRetry, handle);
        let handle = watchface.host_mut().fire(TimerKind::TickerRetry).unwrap();
        watchface.on_timer(TimerKind::TickerRetry, handle);

        let requests = watchface.host().sent_requests();
        assert_eq!(requests.len(), 2);
        // Each retry only re-requests its own half
        assert_eq!(requests[0].weather.unwrap().id, 2);
        assert_eq!(requests[0].ticker, None);
        assert_eq!(requests[1].weather, None);
        assert_eq!(requests[1].ticker.unwrap().id, 2);
        assert_eq!(
            watchface.host().last_interval(TimerKind::WeatherRetry),
            Some(std::time::Duration::from_secs(20))
        );
    }

    #[test]
    fn test_retry_while_disconnected() {
        let mut watchface = watchface();
        watchface.start(true);
        watchface.on_connection(false);
        watchface.host_mut().sent.clear();

        let handle = watchface
            .host_mut()
            .fire(TimerKind::WeatherRetry)
            .unwrap();
        watchface.on_timer(TimerKind::WeatherRetry, handle);
        assert!(watchface.host().sent.is_empty());
        // Still waiting, at the same pace
        assert!(watchface
            .host()
            .live_timer(TimerKind::WeatherRetry)
            .is_some());
        assert_eq!(
            watchface.host().last_interval(TimerKind::WeatherRetry),
            Some(std::time::Duration::from_secs(20))
        );
    }

    #[test]
    fn test_busy_restarts() {
        let mut watchface = watchface();
        watchface.host_mut().send_result = Err(SendError::Busy);
        watchface.start(true);
        assert_eq!(watchface.host().restarts, 1);
        assert_eq!(watchface.surface().text(TextField::Bluetooth), "h");
        // Retry timer survives the failed send
        assert!(watchface
            .host()
            .live_timer(TimerKind::WeatherRetry)
            .is_some());

        // Other failures are just logged
        watchface.host_mut().send_result = Err(SendError::Timeout);
        watchface.on_message(&Record::new().with(Key::MessageType, 0));
        watchface.on_send_failed(SendError::NotConnected);
        assert_eq!(watchface.host().restarts, 1);

        watchface.on_send_failed(SendError::Busy);
        assert_eq!(watchface.host().restarts, 2);
    }

    #[test]
    fn test_settings_message() {
        let mut watchface = started();
        let snapshot = SettingsSnapshot {
            temperature_units: Some(TemperatureUnits::Celsius),
            seconds_hand_mode: Some(SecondsHandMode::On),
            ..Default::default()
        };
        watchface.on_message(&snapshot.to_record());

        let settings = &watchface.state().settings;
        assert_eq!(settings.temperature_units, TemperatureUnits::Celsius);
        assert_eq!(
            watchface.store().read_int(Key::TemperatureUnits.id()),
            Some(0)
        );
        assert_eq!(watchface.host().ticks, Some(TickUnit::Second));
        assert_eq!(watchface.surface().seconds_visible, Some(true));
        // Units changed, so weather is re-requested in the new units
        let requests = watchface.host().sent_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].weather.unwrap().units,
            TemperatureUnits::Celsius
        );

        // Same settings again do nothing
        watchface.on_message(&snapshot.to_record());
        assert_eq!(watchface.host().sent.len(), 1);
    }

    #[test]
    fn test_disable_ticker() {
        let mut watchface = watchface();
        watchface.start(true);
        watchface.on_message(
            &SettingsSnapshot {
                show_ticker: Some(false),
                ..Default::default()
            }
            .to_record(),
        );
        // Back to a bare dollar sign
        assert_eq!(watchface.surface().text(TextField::Ticker), "$");
        assert!(watchface
            .host()
            .live_timer(TimerKind::TickerRetry)
            .is_none());

        // Next weather cycle leaves the ticker out
        watchface.host_mut().sent.clear();
        watchface.on_message(&Record::new().with(Key::MessageType, 0));
        assert_eq!(watchface.host().sent_requests()[0].ticker, None);
    }

    #[test]
    fn test_tap_toggle() {
        let mut store = MemoryStore::default();
        store
            .write_int(
                Key::SecondsHandMode.id(),
                0x6, // Toggle, currently off
            )
            .unwrap();
        let mut watchface = with_store(store);
        watchface.start(true);
        assert!(watchface.host().taps);
        assert_eq!(watchface.host().ticks, Some(TickUnit::Minute));

        watchface.on_tap();
        assert_eq!(
            watchface.state().settings.seconds_hand_mode,
            SecondsHandMode::ToggleTapOn
        );
        assert_eq!(watchface.host().ticks, Some(TickUnit::Second));
        assert_eq!(watchface.surface().seconds_visible, Some(true));
        // Tap-driven changes don't get persisted
        assert_eq!(
            watchface.store().read_int(Key::SecondsHandMode.id()),
            Some(0x6)
        );

        // Inside the debounce window
        watchface.on_tap();
        assert_eq!(
            watchface.state().settings.seconds_hand_mode,
            SecondsHandMode::ToggleTapOn
        );

        watchface.host_mut().now.time = datetime(10, 15, 5);
        watchface.on_tap();
        assert_eq!(watchface.host().ticks, Some(TickUnit::Minute));
    }

    #[test]
    fn test_tap_fixed_duration() {
        let mut store = MemoryStore::default();
        store.write_int(Key::SecondsHandMode.id(), 0x5).unwrap();
        let mut watchface = with_store(store);
        watchface.start(true);

        watchface.on_tap();
        assert_eq!(watchface.surface().seconds_visible, Some(true));
        let handle = watchface
            .host_mut()
            .fire(TimerKind::SecondsAutoOff)
            .unwrap();
        watchface.on_timer(TimerKind::SecondsAutoOff, handle);
        assert_eq!(
            watchface.state().settings.seconds_hand_mode,
            SecondsHandMode::FixedDurationOff
        );
        assert_eq!(watchface.surface().seconds_visible, Some(false));
        assert_eq!(watchface.host().ticks, Some(TickUnit::Minute));
    }

    #[test]
    fn test_settings_subscribe_taps() {
        let mut watchface = started();
        assert!(!watchface.host().taps);
        watchface.on_message(
            &SettingsSnapshot {
                seconds_hand_mode: Some(SecondsHandMode::ToggleTapOff),
                ..Default::default()
            }
            .to_record(),
        );
        assert!(watchface.host().taps);

        watchface.on_message(
            &SettingsSnapshot {
                seconds_hand_mode: Some(SecondsHandMode::Off),
                ..Default::default()
            }
            .to_record(),
        );
        assert!(!watchface.host().taps);
    }

    #[test]
    fn test_battery() {
        let mut watchface = started();
        watchface.on_battery(BatteryState {
            charge_percent: 30,
            is_charging: true,
            is_plugged: true,
        });
        let surface = watchface.surface_mut();
        assert_eq!(surface.battery_level, Some(Some(3)));
        assert_eq!(surface.text(TextField::Battery), "s");
        assert_eq!(surface.take_dirty(), vec![Layer::Battery]);

        // Lowering the threshold hides the gauge
        watchface.on_battery(BatteryState {
            charge_percent: 30,
            is_charging: false,
            is_plugged: false,
        });
        watchface.on_message(
            &SettingsSnapshot {
                show_battery_at_percent: Some(20),
                ..Default::default()
            }
            .to_record(),
        );
        assert_eq!(watchface.surface().battery_level, Some(None));
    }

    #[test]
    fn test_stop() {
        let mut watchface = started();
        watchface.on_message(&Record::new().with(Key::MessageType, 0));
        assert!(watchface.host().live_timers() > 0);
        watchface.stop();
        let host = watchface.host();
        assert_eq!(host.live_timers(), 0);
        assert_eq!(host.ticks, None);
        assert!(!host.taps);
    }
}
