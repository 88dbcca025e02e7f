//! Watch state. Everything in here is plain data: no timers, no view handles.
//! The persisted half ([Settings]) is seeded from the store on startup and
//! written back one field at a time by the reconciler.

use crate::{
    host::BatteryState,
    message::Key,
    persist::Store,
    util::Color,
};
use log::warn;
use serde::{Deserialize, Serialize};

/// Anything that travels over the wire (and lives in the store) as a single
/// integer code
pub trait Code: Copy {
    fn code(self) -> i32;

    /// Decode a wire value. Unknown codes fall back to something sensible
    /// rather than failing, since settings arrive from a phone we don't
    /// control.
    fn from_code(code: i32) -> Self;
}

impl Code for i32 {
    fn code(self) -> i32 {
        self
    }

    fn from_code(code: i32) -> Self {
        code
    }
}

impl Code for Color {
    fn code(self) -> i32 {
        self.to_hex() as i32
    }

    fn from_code(code: i32) -> Self {
        Color::from_hex(code as u32)
    }
}

/// How the seconds hand behaves. The config page still speaks the legacy
/// 4-bit encoding (see [Self::code]), where 0x8 means "showing seconds" and
/// 0x4 means "needs the tap sensor". Nothing outside this type looks at bits.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SecondsHandMode {
    #[default]
    Off,
    On,
    /// Tap shows the hand for a fixed duration; currently hidden
    FixedDurationOff,
    /// Tap shows the hand for a fixed duration; currently showing
    FixedDurationOn,
    /// Tap toggles the hand; currently hidden
    ToggleTapOff,
    /// Tap toggles the hand; currently showing
    ToggleTapOn,
}

impl SecondsHandMode {
    pub fn shows_seconds(self) -> bool {
        matches!(self, Self::On | Self::FixedDurationOn | Self::ToggleTapOn)
    }

    pub fn needs_tap_sensor(self) -> bool {
        !matches!(self, Self::Off | Self::On)
    }
}

impl Code for SecondsHandMode {
    fn code(self) -> i32 {
        match self {
            Self::Off => 0x0,
            Self::On => 0x8,
            Self::FixedDurationOff => 0x5,
            Self::FixedDurationOn => 0xd,
            Self::ToggleTapOff => 0x6,
            Self::ToggleTapOn => 0xe,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            0x0 => Self::Off,
            0x8 => Self::On,
            0x5 => Self::FixedDurationOff,
            0xd => Self::FixedDurationOn,
            0x6 => Self::ToggleTapOff,
            0xe => Self::ToggleTapOn,
            _ => {
                warn!("Unknown seconds hand mode {code:#x}, turning it off");
                Self::Off
            }
        }
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnits {
    Celsius,
    #[default]
    Fahrenheit,
}

impl Code for TemperatureUnits {
    fn code(self) -> i32 {
        match self {
            Self::Celsius => 0,
            Self::Fahrenheit => 1,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Celsius,
            1 => Self::Fahrenheit,
            _ => {
                warn!("Unknown temperature units {code}");
                Self::default()
            }
        }
    }
}

/// Where the phone gets weather from. The two sources use different condition
/// code tables, so the watch needs to know which one it's talking to.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSource {
    #[default]
    OpenWeatherMap,
    Yahoo,
}

impl Code for WeatherSource {
    fn code(self) -> i32 {
        match self {
            Self::OpenWeatherMap => 1,
            Self::Yahoo => 2,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            2 => Self::Yahoo,
            // Anything that isn't Yahoo gets the OpenWeatherMap table
            _ => Self::OpenWeatherMap,
        }
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HandStyle {
    #[default]
    Traditional,
    Space,
}

impl Code for HandStyle {
    fn code(self) -> i32 {
        match self {
            Self::Traditional => 1,
            Self::Space => 2,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Traditional,
            2 => Self::Space,
            _ => {
                warn!("Unknown hand style {code}");
                Self::default()
            }
        }
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FontSize {
    Small,
    /// Same face as the date
    #[default]
    Medium,
}

impl Code for FontSize {
    fn code(self) -> i32 {
        match self {
            Self::Small => 1,
            Self::Medium => 2,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Small,
            2 => Self::Medium,
            _ => {
                warn!("Font size {code} out of range, using medium");
                Self::Medium
            }
        }
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Coin {
    #[default]
    Bitcoin,
    Ethereum,
    Ripple,
    Litecoin,
    BitcoinCash,
    EthereumClassic,
}

impl Coin {
    /// Identifier used by the price API
    pub fn api_id(self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Ethereum => "ethereum",
            Self::Ripple => "ripple",
            Self::Litecoin => "litecoin",
            Self::BitcoinCash => "bitcoin-cash",
            Self::EthereumClassic => "ethereum-classic",
        }
    }
}

impl Code for Coin {
    fn code(self) -> i32 {
        match self {
            Self::Bitcoin => 1,
            Self::Ethereum => 2,
            Self::Ripple => 3,
            Self::Litecoin => 4,
            Self::BitcoinCash => 5,
            Self::EthereumClassic => 6,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            2 => Self::Ethereum,
            3 => Self::Ripple,
            4 => Self::Litecoin,
            5 => Self::BitcoinCash,
            6 => Self::EthereumClassic,
            _ => Self::Bitcoin,
        }
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    #[default]
    Usd,
    Aud,
    Cad,
    Nzd,
    Eur,
    Gbp,
}

impl Currency {
    /// Lowercase ISO code, which is what the price API wants
    pub fn api_id(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Aud => "aud",
            Self::Cad => "cad",
            Self::Nzd => "nzd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
        }
    }
}

impl Code for Currency {
    fn code(self) -> i32 {
        match self {
            Self::Usd => 1,
            Self::Aud => 2,
            Self::Cad => 3,
            Self::Nzd => 4,
            Self::Eur => 5,
            Self::Gbp => 6,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            2 => Self::Aud,
            3 => Self::Cad,
            4 => Self::Nzd,
            5 => Self::Eur,
            6 => Self::Gbp,
            _ => Self::Usd,
        }
    }
}

/// The four theme colors
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub background: Color,
    /// Ticks, numbers, date, weather, bluetooth
    pub foreground_1: Color,
    /// Hour and minute hands
    pub foreground_2: Color,
    /// Second hand
    pub foreground_3: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::from_hex(0x000055),   // Oxford blue
            foreground_1: Color::from_hex(0xaaaa55), // Brass
            foreground_2: Color::from_hex(0xffff55), // Icterine
            foreground_3: Color::from_hex(0xff0000), // Red
        }
    }
}

/// Hours during which weather isn't refreshed
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct QuietTime {
    pub enabled: bool,
    /// Hour of day (0-23) when quiet time starts
    pub start: i32,
    /// Hour of day (0-23) when quiet time ends, exclusive
    pub stop: i32,
}

impl QuietTime {
    /// Is the given hour inside the quiet window? A window where start and
    /// stop are equal covers the whole day.
    pub fn contains(&self, hour: u32) -> bool {
        let hour = hour as i32;
        if !self.enabled {
            false
        } else if self.start == self.stop {
            true
        } else if self.start < self.stop {
            // e.g. 1am to 6am
            self.start <= hour && hour < self.stop
        } else {
            // e.g. 11pm to 6am, wraps around midnight
            hour >= self.start || hour < self.stop
        }
    }
}

impl Default for QuietTime {
    fn default() -> Self {
        Self {
            enabled: false,
            start: 23,
            stop: 6,
        }
    }
}

/// User settings. Each field lives under its own key in the persistent store
/// and is independently optional there.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub seconds_hand_mode: SecondsHandMode,
    /// How long a tap shows the seconds hand, in minutes
    pub seconds_hand_duration: i32,
    pub temperature_units: TemperatureUnits,
    pub vibrate_on_disconnect: bool,
    /// Battery gauge is hidden above this charge percentage
    pub show_battery_at_percent: i32,
    pub hand_style: HandStyle,
    pub theme: Theme,
    pub temperature_font_size: FontSize,
    pub ticker_font_size: FontSize,
    pub quiet_time: QuietTime,
    pub weather_source: WeatherSource,
    pub show_timezone: bool,
    pub show_ticker: bool,
    pub coin: Coin,
    pub currency: Currency,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seconds_hand_mode: SecondsHandMode::Off,
            seconds_hand_duration: 2,
            temperature_units: TemperatureUnits::Fahrenheit,
            vibrate_on_disconnect: true,
            show_battery_at_percent: 40,
            hand_style: HandStyle::Traditional,
            theme: Theme::default(),
            temperature_font_size: FontSize::Medium,
            ticker_font_size: FontSize::Medium,
            quiet_time: QuietTime::default(),
            weather_source: WeatherSource::OpenWeatherMap,
            show_timezone: false,
            show_ticker: true,
            coin: Coin::Bitcoin,
            currency: Currency::Usd,
        }
    }
}

impl Settings {
    /// Seed settings from the store. Missing keys get the compiled-in
    /// default; a missing key never means corruption.
    pub fn load<S: Store>(store: &S) -> Self {
        let default = Self::default();
        Self {
            seconds_hand_mode: store.read_code_or_default(
                Key::SecondsHandMode,
                default.seconds_hand_mode,
            ),
            seconds_hand_duration: store.read_code_or_default(
                Key::SecondsHandDuration,
                default.seconds_hand_duration,
            ),
            temperature_units: store.read_code_or_default(
                Key::TemperatureUnits,
                default.temperature_units,
            ),
            vibrate_on_disconnect: store.read_bool_or_default(
                Key::VibrateOnDisconnect,
                default.vibrate_on_disconnect,
            ),
            show_battery_at_percent: store.read_code_or_default(
                Key::ShowBatteryAtPercent,
                default.show_battery_at_percent,
            ),
            hand_style: store
                .read_code_or_default(Key::HandStyle, default.hand_style),
            theme: Theme {
                background: store.read_code_or_default(
                    Key::BackgroundColor,
                    default.theme.background,
                ),
                foreground_1: store.read_code_or_default(
                    Key::Foreground1Color,
                    default.theme.foreground_1,
                ),
                foreground_2: store.read_code_or_default(
                    Key::Foreground2Color,
                    default.theme.foreground_2,
                ),
                foreground_3: store.read_code_or_default(
                    Key::Foreground3Color,
                    default.theme.foreground_3,
                ),
            },
            temperature_font_size: store.read_code_or_default(
                Key::TemperatureFontSize,
                default.temperature_font_size,
            ),
            ticker_font_size: store.read_code_or_default(
                Key::TickerFontSize,
                default.ticker_font_size,
            ),
            quiet_time: QuietTime {
                enabled: store.read_bool_or_default(
                    Key::QuietTime,
                    default.quiet_time.enabled,
                ),
                start: store.read_code_or_default(
                    Key::QuietTimeStart,
                    default.quiet_time.start,
                ),
                stop: store.read_code_or_default(
                    Key::QuietTimeStop,
                    default.quiet_time.stop,
                ),
            },
            weather_source: store.read_code_or_default(
                Key::WeatherSource,
                default.weather_source,
            ),
            show_timezone: store
                .read_bool_or_default(Key::ShowTimezone, default.show_timezone),
            show_ticker: store
                .read_bool_or_default(Key::TickerEnabled, default.show_ticker),
            coin: store.read_code_or_default(Key::Coin, default.coin),
            currency: store
                .read_code_or_default(Key::Currency, default.currency),
        }
    }
}

/// An incoming settings record. Every field is optional: a field that wasn't
/// in the record leaves the current value alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSnapshot {
    pub seconds_hand_mode: Option<SecondsHandMode>,
    pub seconds_hand_duration: Option<i32>,
    pub temperature_units: Option<TemperatureUnits>,
    pub vibrate_on_disconnect: Option<bool>,
    pub show_battery_at_percent: Option<i32>,
    pub hand_style: Option<HandStyle>,
    pub background_color: Option<Color>,
    pub foreground_1_color: Option<Color>,
    pub foreground_2_color: Option<Color>,
    pub foreground_3_color: Option<Color>,
    pub temperature_font_size: Option<FontSize>,
    pub ticker_font_size: Option<FontSize>,
    pub quiet_time: Option<bool>,
    pub quiet_time_start: Option<i32>,
    pub quiet_time_stop: Option<i32>,
    pub weather_source: Option<WeatherSource>,
    pub show_timezone: Option<bool>,
    pub show_ticker: Option<bool>,
    pub coin: Option<Coin>,
    pub currency: Option<Currency>,
    /// Set when the record carried any field only the config page sends.
    /// Provenance only; it doesn't change how fields are validated.
    #[serde(skip)]
    pub from_config_page: bool,
}

impl SettingsSnapshot {
    /// A snapshot carrying every field of the given settings
    pub fn full(settings: &Settings) -> Self {
        Self {
            seconds_hand_mode: Some(settings.seconds_hand_mode),
            seconds_hand_duration: Some(settings.seconds_hand_duration),
            temperature_units: Some(settings.temperature_units),
            vibrate_on_disconnect: Some(settings.vibrate_on_disconnect),
            show_battery_at_percent: Some(settings.show_battery_at_percent),
            hand_style: Some(settings.hand_style),
            background_color: Some(settings.theme.background),
            foreground_1_color: Some(settings.theme.foreground_1),
            foreground_2_color: Some(settings.theme.foreground_2),
            foreground_3_color: Some(settings.theme.foreground_3),
            temperature_font_size: Some(settings.temperature_font_size),
            ticker_font_size: Some(settings.ticker_font_size),
            quiet_time: Some(settings.quiet_time.enabled),
            quiet_time_start: Some(settings.quiet_time.start),
            quiet_time_stop: Some(settings.quiet_time.stop),
            weather_source: Some(settings.weather_source),
            show_timezone: Some(settings.show_timezone),
            show_ticker: Some(settings.show_ticker),
            coin: Some(settings.coin),
            currency: Some(settings.currency),
            from_config_page: false,
        }
    }
}

/// The one long-lived mutable record the watchface owns
#[derive(Clone, Debug, Default)]
pub struct WatchState {
    pub settings: Settings,
    /// Starts out false until the host tells us otherwise
    pub bluetooth_connected: bool,
    /// Last reported battery state, if any
    pub battery: Option<BatteryState>,
}

impl WatchState {
    pub fn load<S: Store>(store: &S) -> Self {
        Self {
            settings: Settings::load(store),
            bluetooth_connected: false,
            battery: None,
        }
    }
}
