//! The phone half of the simulator. It takes requests from the watch's
//! outbox, fetches weather and prices over HTTP, and posts replies back as
//! inbound records.

use crate::{
    config::CompanionConfig,
    message::{
        Key, MessageType, OutboundRequest, Record, TickerRequest,
        WeatherRequest,
    },
    sim::Event,
    state::{SettingsSnapshot, TemperatureUnits, WeatherSource},
};
use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::{
    sync::mpsc::{Receiver, Sender},
    thread::{self, JoinHandle},
};

const OPENWEATHERMAP_URL: &str =
    "https://api.openweathermap.org/data/2.5/weather";
/// Sent in place of a temperature we couldn't convert
const TEMPERATURE_UNKNOWN: i32 = i32::MIN;

#[derive(Debug)]
pub struct Companion {
    config: CompanionConfig,
    /// Pushed to the watch once, right after Ready
    settings: Option<SettingsSnapshot>,
    events: Sender<Event>,
}

impl Companion {
    pub fn new(
        config: CompanionConfig,
        settings: Option<SettingsSnapshot>,
        events: Sender<Event>,
    ) -> Self {
        Self {
            config,
            settings,
            events,
        }
    }

    /// Run on a background thread until the watch's outbox is dropped
    pub fn spawn(self, requests: Receiver<Record>) -> JoinHandle<()> {
        thread::spawn(move || self.run(requests))
    }

    fn run(self, requests: Receiver<Record>) {
        info!("Starting companion");
        self.reply(
            Record::new().with(Key::MessageType, MessageType::Ready.code()),
        );
        if let Some(settings) = &self.settings {
            info!("Pushing configured settings");
            self.reply(settings.to_record());
        }

        for record in requests {
            let request = match OutboundRequest::decode(&record) {
                Ok(request) => request,
                Err(err) => {
                    error!("Error decoding request {record}: {err:?}");
                    continue;
                }
            };
            debug!("Companion received {request:?}");
            // Each half gets answered on its own, so a failed weather fetch
            // doesn't hold up the price
            if let Some(weather) = &request.weather {
                self.reply_with(self.fetch_weather(weather));
            }
            if let Some(ticker) = &request.ticker {
                self.reply_with(self.fetch_ticker(ticker));
            }
        }
        info!("Watch outbox closed, stopping companion");
    }

    fn reply_with(&self, result: anyhow::Result<Record>) {
        match result {
            Ok(record) => self.reply(record),
            Err(err) => error!("Error handling request: {err:?}"),
        }
    }

    fn reply(&self, record: Record) {
        if self.events.send(Event::Inbound(record)).is_err() {
            warn!("Watch is gone, dropping reply");
        }
    }

    fn fetch_weather(
        &self,
        request: &WeatherRequest,
    ) -> anyhow::Result<Record> {
        if request.source == WeatherSource::Yahoo {
            bail!("Yahoo weather is no longer available");
        }

        info!("Fetching weather");
        let response = ureq::get(OPENWEATHERMAP_URL)
            .query("lat", &self.config.latitude.to_string())
            .query("lon", &self.config.longitude.to_string())
            .query("appid", &self.config.api_key)
            .call()
            .with_context(|| {
                format!("Error fetching weather from {OPENWEATHERMAP_URL}")
            })?;
        let weather: CurrentWeather = response
            .into_json()
            .context("Error parsing weather as JSON")?;
        let condition = weather
            .weather
            .first()
            .ok_or_else(|| anyhow!("Weather response has no conditions"))?;

        Ok(Record::new()
            .with(Key::MessageType, MessageType::Weather.code())
            .with(Key::WeatherMessageId, request.id)
            .with(Key::ConditionCode, condition.id)
            .with(
                Key::Temperature,
                kelvin_to(weather.main.temp, request.units),
            )
            .with(
                Key::IsDaylight,
                is_daylight(
                    Utc::now().timestamp(),
                    weather.sys.sunrise,
                    weather.sys.sunset,
                ),
            ))
    }

    fn fetch_ticker(&self, request: &TickerRequest) -> anyhow::Result<Record> {
        let coin = request.coin.api_id();
        let currency = request.currency.api_id();
        info!("Fetching {coin} price in {currency}");
        let response = ureq::get(&self.config.ticker_url)
            .query("ids", coin)
            .query("vs_currencies", currency)
            .call()
            .with_context(|| {
                format!("Error fetching price from {}", self.config.ticker_url)
            })?;
        let prices: Prices =
            response.into_json().context("Error parsing price as JSON")?;
        let price = prices
            .get(coin)
            .and_then(|prices| prices.get(currency))
            .ok_or_else(|| anyhow!("No {coin} price in {currency}"))?;

        Ok(Record::new()
            .with(Key::MessageType, MessageType::Ticker.code())
            .with(Key::TickerMessageId, request.id)
            .with(Key::TickerText, format_price(*price)))
    }
}

/// https://openweathermap.org/current#fields_json
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    weather: Vec<Condition>,
    main: Main,
    sys: Sys,
}

#[derive(Debug, Deserialize)]
struct Condition {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct Main {
    /// Kelvin
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Sys {
    sunrise: i64,
    sunset: i64,
}

/// Coin id -> currency -> price
type Prices = IndexMap<String, IndexMap<String, f64>>;

fn kelvin_to(kelvin: f64, units: TemperatureUnits) -> i32 {
    let celsius = kelvin - 273.15;
    let temperature = match units {
        TemperatureUnits::Celsius => celsius,
        TemperatureUnits::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
    };
    if temperature.is_finite() {
        temperature.round() as i32
    } else {
        TEMPERATURE_UNKNOWN
    }
}

/// Is `now` between sunrise and sunset, inclusive? All in unix seconds.
fn is_daylight(now: i64, sunrise: i64, sunset: i64) -> bool {
    (sunrise..=sunset).contains(&now)
}

/// Squeeze a price into the few characters the watch has room for: small
/// prices as is, four digits with a comma, anything bigger in thousands.
/// The watch truncates whatever doesn't fit.
fn format_price(price: f64) -> String {
    if price < 1000.0 {
        return price.to_string();
    }
    let whole = price.round() as i64;
    if whole < 10_000 {
        format!("{},{:03}", whole / 1000, whole % 1000)
    } else if whole % 1000 == 0 {
        format!("{}k", whole / 1000)
    } else {
        format!("{:.1}k", whole as f64 / 1000.0)
    }
}
