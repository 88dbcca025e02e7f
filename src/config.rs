use crate::state::SettingsSnapshot;
use anyhow::Context;
use log::info;
use serde::Deserialize;
use std::{fs::File, path::PathBuf};

/// Simulator configuration, loaded from `config.json`
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Where the watch's persisted settings live
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    pub companion: CompanionConfig,
    /// Settings the phone pushes as soon as it connects, as if they came
    /// from the configuration page
    #[serde(default)]
    pub settings: Option<SettingsSnapshot>,
}

/// The phone side of the simulator
#[derive(Clone, Debug, Deserialize)]
pub struct CompanionConfig {
    #[serde(rename = "openweathermap_api_key")]
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_ticker_url")]
    pub ticker_url: String,
    /// Start the phone disconnected
    #[serde(default)]
    pub start_disconnected: bool,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from the fixed path in the working directory
    pub fn load() -> anyhow::Result<Self> {
        info!("Loading config from `{}`", Self::PATH);
        let file = File::open(Self::PATH).with_context(|| {
            format!("Error opening config file {}", Self::PATH)
        })?;
        serde_json::from_reader(file)
            .context(format!("Error parsing config file {}", Self::PATH))
    }
}

fn default_store_path() -> PathBuf {
    "./settings.json".into()
}

fn default_ticker_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Coin, SecondsHandMode};

    #[test]
    fn test_parse() {
        let config: Config = serde_json::from_str(
            r##"{
                "companion": {
                    "openweathermap_api_key": "abc",
                    "latitude": 42.36,
                    "longitude": -71.06
                },
                "settings": {
                    "seconds_hand_mode": "toggle_tap_off",
                    "coin": "ethereum",
                    "background_color": "#000055"
                }
            }"##,
        )
        .unwrap();
        assert_eq!(config.store_path, PathBuf::from("./settings.json"));
        assert!(!config.companion.start_disconnected);
        assert_eq!(config.companion.api_key, "abc");
        assert!(config.companion.ticker_url.starts_with("https://"));
        let settings = config.settings.unwrap();
        assert_eq!(
            settings.seconds_hand_mode,
            Some(SecondsHandMode::ToggleTapOff)
        );
        assert_eq!(settings.coin, Some(Coin::Ethereum));
        assert_eq!(settings.background_color.unwrap().to_hex(), 0x000055);
        assert_eq!(settings.hand_style, None);
    }
}
