//! Wire format between the watch and the phone. A message is an ordered list
//! of `(key, value)` tuples, where a value is either an integer or a string.
//! Which keys show up determines what kind of message it is.

use crate::{
    state::{
        Code, Coin, Currency, SettingsSnapshot, TemperatureUnits,
        WeatherSource,
    },
    util::{self, Color},
};
use anyhow::{anyhow, bail, Context};
use itertools::Itertools;
use log::{trace, warn};
use std::fmt::Display;

/// Every key either side knows about. The discriminant is the wire id, and
/// for settings it's also the persistent store key.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    MessageType = 0,
    WeatherMessageId = 1,
    ConditionCode = 2,
    Temperature = 3,
    IsDaylight = 4,
    SecondsHandMode = 5,
    TemperatureUnits = 6,
    VibrateOnDisconnect = 7,
    ShowBatteryAtPercent = 8,
    HandStyle = 9,
    BackgroundColor = 10,
    Foreground1Color = 11,
    Foreground2Color = 12,
    Foreground3Color = 13,
    TemperatureFontSize = 14,
    QuietTime = 15,
    QuietTimeStart = 16,
    QuietTimeStop = 17,
    SecondsHandDuration = 18,
    WeatherSource = 19,
    ShowTimezone = 20,
    TickerText = 21,
    TickerMessageId = 23,
    Coin = 24,
    Currency = 25,
    TickerEnabled = 26,
    TickerFontSize = 27,
}

impl Key {
    const ALL: &'static [Self] = &[
        Self::MessageType,
        Self::WeatherMessageId,
        Self::ConditionCode,
        Self::Temperature,
        Self::IsDaylight,
        Self::SecondsHandMode,
        Self::TemperatureUnits,
        Self::VibrateOnDisconnect,
        Self::ShowBatteryAtPercent,
        Self::HandStyle,
        Self::BackgroundColor,
        Self::Foreground1Color,
        Self::Foreground2Color,
        Self::Foreground3Color,
        Self::TemperatureFontSize,
        Self::QuietTime,
        Self::QuietTimeStart,
        Self::QuietTimeStop,
        Self::SecondsHandDuration,
        Self::WeatherSource,
        Self::ShowTimezone,
        Self::TickerText,
        Self::TickerMessageId,
        Self::Coin,
        Self::Currency,
        Self::TickerEnabled,
        Self::TickerFontSize,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|key| key.id() == id)
    }

    /// Keys that only the configuration page ever sends. Seeing one of these
    /// means the record is a settings update, whatever its type says.
    /// Ticker-enabled isn't one of them because it also rides along on
    /// weather requests.
    pub fn is_settings_only(self) -> bool {
        matches!(
            self,
            Self::SecondsHandMode
                | Self::TemperatureUnits
                | Self::VibrateOnDisconnect
                | Self::ShowBatteryAtPercent
                | Self::HandStyle
                | Self::BackgroundColor
                | Self::Foreground1Color
                | Self::Foreground2Color
                | Self::Foreground3Color
                | Self::TemperatureFontSize
                | Self::QuietTime
                | Self::QuietTimeStart
                | Self::QuietTimeStop
                | Self::SecondsHandDuration
                | Self::WeatherSource
                | Self::ShowTimezone
                | Self::Coin
                | Self::Currency
                | Self::TickerFontSize
        )
    }

    /// Does the config page send this key as a string?
    fn is_text_encoded(self) -> bool {
        matches!(
            self,
            Self::SecondsHandMode
                | Self::TemperatureUnits
                | Self::HandStyle
                | Self::TemperatureFontSize
                | Self::WeatherSource
                | Self::Coin
                | Self::Currency
                | Self::TickerFontSize
        )
    }
}

impl From<Key> for u32 {
    fn from(key: Key) -> Self {
        key.id()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageType {
    Ready = 0,
    Weather = 1,
    Settings = 2,
    Ticker = 3,
}

impl MessageType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ready),
            1 => Some(Self::Weather),
            2 => Some(Self::Settings),
            3 => Some(Self::Ticker),
            _ => None,
        }
    }
}

/// One value in a record
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Int(i32),
    Text(String),
}

impl Value {
    /// Integer value. Text is parsed like C's `atoi`, so garbage is 0.
    pub fn as_int(&self) -> i32 {
        match self {
            Self::Int(value) => *value,
            Self::Text(text) => util::parse_int(text),
        }
    }

    pub fn as_bool(&self) -> bool {
        self.as_int() != 0
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }

    /// Colors come across as a packed 0xRRGGBB integer, or as hex text from
    /// the config page. Anything else goes through `atoi`.
    pub fn as_color(&self) -> Color {
        match self {
            Self::Int(value) => Color::from_hex(*value as u32),
            Self::Text(text) => text.parse().unwrap_or_else(|_| {
                Color::from_hex(util::parse_int(text) as u32)
            }),
        }
    }

    fn as_code<T: Code>(&self) -> T {
        T::from_code(self.as_int())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Int(value as i32)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "{text:?}"),
        }
    }
}

/// A key-tagged record, in the order the tuples were written
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Record {
    fields: Vec<(u32, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [Self::push]
    pub fn with(
        mut self,
        key: impl Into<u32>,
        value: impl Into<Value>,
    ) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<u32>, value: impl Into<Value>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u32, Value)> {
        self.fields.iter()
    }

    /// First value under the given key
    pub fn get(&self, key: impl Into<u32>) -> Option<&Value> {
        let key = key.into();
        self.fields
            .iter()
            .find(|(field_key, _)| *field_key == key)
            .map(|(_, value)| value)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.fields
                .iter()
                .format_with(", ", |(key, value), f| f(&format_args!(
                    "{key}: {value}"
                )))
        )
    }
}

/// A message from the phone
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    /// The phone side is up and can take requests
    Ready,
    Weather {
        request_id: i32,
        condition_code: i32,
        temperature: i32,
        is_daylight: bool,
    },
    Ticker {
        request_id: i32,
        symbol_text: String,
    },
    Settings(SettingsSnapshot),
}

/// Decode an inbound record. Unknown keys are logged and skipped; a record
/// without a usable message type is an error.
pub fn decode(record: &Record) -> anyhow::Result<InboundMessage> {
    let mut message_type: Option<i32> = None;
    let mut weather_id = None;
    let mut condition_code = None;
    let mut temperature = None;
    let mut is_daylight = None;
    let mut ticker_id = None;
    let mut ticker_text = None;
    let mut snapshot = SettingsSnapshot::default();
    let mut unknown_keys = Vec::new();

    for (id, value) in record.iter() {
        let Some(key) = Key::from_id(*id) else {
            unknown_keys.push(*id);
            continue;
        };
        if key.is_settings_only() {
            snapshot.from_config_page = true;
        }

        match key {
            Key::MessageType => message_type = Some(value.as_int()),
            Key::WeatherMessageId => weather_id = Some(value.as_int()),
            Key::ConditionCode => condition_code = Some(value.as_int()),
            Key::Temperature => temperature = Some(value.as_int()),
            Key::IsDaylight => is_daylight = Some(value.as_bool()),
            Key::TickerMessageId => ticker_id = Some(value.as_int()),
            Key::TickerText => ticker_text = Some(value.as_text()),

            Key::SecondsHandMode => {
                snapshot.seconds_hand_mode = Some(value.as_code())
            }
            Key::SecondsHandDuration => {
                snapshot.seconds_hand_duration = Some(value.as_int())
            }
            Key::TemperatureUnits => {
                snapshot.temperature_units = Some(value.as_code())
            }
            Key::VibrateOnDisconnect => {
                snapshot.vibrate_on_disconnect = Some(value.as_bool())
            }
            Key::ShowBatteryAtPercent => {
                snapshot.show_battery_at_percent = Some(value.as_int())
            }
            Key::HandStyle => snapshot.hand_style = Some(value.as_code()),
            Key::BackgroundColor => {
                snapshot.background_color = Some(value.as_color())
            }
            Key::Foreground1Color => {
                snapshot.foreground_1_color = Some(value.as_color())
            }
            Key::Foreground2Color => {
                snapshot.foreground_2_color = Some(value.as_color())
            }
            Key::Foreground3Color => {
                snapshot.foreground_3_color = Some(value.as_color())
            }
            Key::TemperatureFontSize => {
                snapshot.temperature_font_size = Some(value.as_code())
            }
            Key::TickerFontSize => {
                snapshot.ticker_font_size = Some(value.as_code())
            }
            Key::QuietTime => snapshot.quiet_time = Some(value.as_bool()),
            Key::QuietTimeStart => {
                snapshot.quiet_time_start = Some(value.as_int())
            }
            Key::QuietTimeStop => {
                snapshot.quiet_time_stop = Some(value.as_int())
            }
            Key::WeatherSource => {
                snapshot.weather_source = Some(value.as_code())
            }
            Key::ShowTimezone => {
                snapshot.show_timezone = Some(value.as_bool())
            }
            Key::TickerEnabled => snapshot.show_ticker = Some(value.as_bool()),
            Key::Coin => snapshot.coin = Some(value.as_code()),
            Key::Currency => snapshot.currency = Some(value.as_code()),
        }
    }

    if !unknown_keys.is_empty() {
        warn!(
            "Ignoring unknown message keys: {}",
            unknown_keys.iter().join(", ")
        );
    }

    // The config page doesn't always tag its records, so its keys win
    let message_type = if snapshot.from_config_page {
        MessageType::Settings
    } else {
        let code = message_type
            .ok_or_else(|| anyhow!("Message has no type: {record}"))?;
        MessageType::from_code(code)
            .ok_or_else(|| anyhow!("Message has unknown type {code}"))?
    };
    trace!("Decoded {message_type:?} message {record}");

    let message = match message_type {
        MessageType::Ready => InboundMessage::Ready,
        MessageType::Weather => InboundMessage::Weather {
            request_id: weather_id
                .context("Weather message is missing its request id")?,
            condition_code: condition_code
                .context("Weather message is missing its condition code")?,
            temperature: temperature
                .context("Weather message is missing its temperature")?,
            is_daylight: is_daylight
                .context("Weather message is missing its daylight flag")?,
        },
        MessageType::Ticker => InboundMessage::Ticker {
            request_id: ticker_id
                .context("Ticker message is missing its request id")?,
            symbol_text: ticker_text
                .context("Ticker message is missing its text")?,
        },
        MessageType::Settings => InboundMessage::Settings(snapshot),
    };
    Ok(message)
}

/// Weather half of an outbound request
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WeatherRequest {
    pub id: i32,
    pub source: WeatherSource,
    pub units: TemperatureUnits,
}

/// Ticker half of an outbound request
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickerRequest {
    pub id: i32,
    pub coin: Coin,
    pub currency: Currency,
}

/// A request from the watch to the phone. Weather and ticker share one record
/// when both are due at the same time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OutboundRequest {
    pub weather: Option<WeatherRequest>,
    pub ticker: Option<TickerRequest>,
}

impl OutboundRequest {
    pub fn encode(&self) -> Record {
        let message_type = if self.weather.is_some() {
            MessageType::Weather
        } else {
            MessageType::Ticker
        };
        let mut record =
            Record::new().with(Key::MessageType, message_type.code());

        if let Some(weather) = &self.weather {
            record.push(Key::WeatherMessageId, weather.id);
            record.push(Key::WeatherSource, weather.source.code());
            record.push(Key::TemperatureUnits, weather.units.code());
        }
        record.push(Key::TickerEnabled, self.ticker.is_some());
        if let Some(ticker) = &self.ticker {
            record.push(Key::TickerMessageId, ticker.id);
            record.push(Key::Coin, ticker.coin.code());
            record.push(Key::Currency, ticker.currency.code());
        }
        record
    }

    /// Phone side of [Self::encode]
    pub fn decode(record: &Record) -> anyhow::Result<Self> {
        let int = |key: Key| record.get(key).map(Value::as_int);
        let code = int(Key::MessageType).context("Request has no type")?;
        match MessageType::from_code(code) {
            Some(MessageType::Weather | MessageType::Ticker) => {}
            _ => bail!("Unexpected request type {code}"),
        }

        let weather = int(Key::WeatherMessageId).map(|id| WeatherRequest {
            id,
            source: WeatherSource::from_code(
                int(Key::WeatherSource).unwrap_or_default(),
            ),
            units: int(Key::TemperatureUnits)
                .map(TemperatureUnits::from_code)
                .unwrap_or_default(),
        });
        let ticker_enabled = int(Key::TickerEnabled).unwrap_or(0) != 0;
        let ticker = int(Key::TickerMessageId)
            .filter(|_| ticker_enabled)
            .map(|id| TickerRequest {
                id,
                coin: Coin::from_code(int(Key::Coin).unwrap_or_default()),
                currency: Currency::from_code(
                    int(Key::Currency).unwrap_or_default(),
                ),
            });
        Ok(Self { weather, ticker })
    }
}

impl SettingsSnapshot {
    /// Encode the present fields the same way the configuration page does:
    /// enumerations as text, everything else as integers
    pub fn to_record(&self) -> Record {
        fn push<T: Code>(record: &mut Record, key: Key, value: Option<T>) {
            if let Some(value) = value {
                let code = value.code();
                if key.is_text_encoded() {
                    record.push(key, code.to_string());
                } else {
                    record.push(key, code);
                }
            }
        }
        fn push_bool(record: &mut Record, key: Key, value: Option<bool>) {
            if let Some(value) = value {
                record.push(key, value);
            }
        }

        let mut record = Record::new()
            .with(Key::MessageType, MessageType::Settings.code());
        push(&mut record, Key::SecondsHandMode, self.seconds_hand_mode);
        push(&mut record, Key::SecondsHandDuration, self.seconds_hand_duration);
        push(&mut record, Key::TemperatureUnits, self.temperature_units);
        push_bool(
            &mut record,
            Key::VibrateOnDisconnect,
            self.vibrate_on_disconnect,
        );
        push(
            &mut record,
            Key::ShowBatteryAtPercent,
            self.show_battery_at_percent,
        );
        push(&mut record, Key::HandStyle, self.hand_style);
        push(&mut record, Key::BackgroundColor, self.background_color);
        push(&mut record, Key::Foreground1Color, self.foreground_1_color);
        push(&mut record, Key::Foreground2Color, self.foreground_2_color);
        push(&mut record, Key::Foreground3Color, self.foreground_3_color);
        push(&mut record, Key::TemperatureFontSize, self.temperature_font_size);
        push(&mut record, Key::TickerFontSize, self.ticker_font_size);
        push_bool(&mut record, Key::QuietTime, self.quiet_time);
        push(&mut record, Key::QuietTimeStart, self.quiet_time_start);
        push(&mut record, Key::QuietTimeStop, self.quiet_time_stop);
        push(&mut record, Key::WeatherSource, self.weather_source);
        push_bool(&mut record, Key::ShowTimezone, self.show_timezone);
        push_bool(&mut record, Key::TickerEnabled, self.show_ticker);
        push(&mut record, Key::Coin, self.coin);
        push(&mut record, Key::Currency, self.currency);
        record
    }
}
