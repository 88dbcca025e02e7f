//! What the watchface tells the display. The core never draws: it pushes
//! text into named fields and marks layers dirty, and the surface does the
//! rest.

use crate::{
    host::BatteryState,
    state::{FontSize, HandStyle, Theme},
    util,
};
use chrono::NaiveDateTime;

/// Text fields on the face
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum TextField {
    Date,
    Ticker,
    Temperature,
    /// Weather condition icon
    Condition,
    /// Charging/plugged icon
    Battery,
    /// Disconnected, syncing and restart icons
    Bluetooth,
    Timezone,
}

/// Layers that get redrawn from state rather than from text
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Layer {
    /// Tick marks and hour numbers
    Background,
    Battery,
    Hands,
    SecondHand,
}

pub trait Surface {
    fn set_text(&mut self, field: TextField, text: &str);

    fn set_font(&mut self, field: TextField, size: FontSize);

    fn set_theme(&mut self, theme: Theme);

    fn set_hand_style(&mut self, style: HandStyle);

    fn set_seconds_visible(&mut self, visible: bool);

    /// Battery gauge fill, in tenths. `None` hides the gauge.
    fn set_battery_level(&mut self, level: Option<u8>);

    fn mark_dirty(&mut self, layer: Layer);
}

/// Glyphs in the watch's icon font
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Icon {
    None,
    Refresh,
    Tornado,
    Hurricane,
    Thunderstorm,
    FreezingRain,
    Rain,
    Snow,
    Fog,
    Windy,
    Cold,
    Cloudy,
    PartlyCloudyDay,
    PartlyCloudyNight,
    ClearDay,
    ClearNight,
    Hot,
    Unknown,
    Restart,
    Charging,
    Plugged,
    BluetoothDisconnect,
}

impl Icon {
    pub fn glyph(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Refresh => "f",
            Self::Tornado => "A",
            Self::Hurricane => "B",
            Self::Thunderstorm => "C",
            Self::FreezingRain => "D",
            Self::Rain => "E",
            Self::Snow => "F",
            Self::Fog => "G",
            Self::Windy => "H",
            Self::Cold => "I",
            Self::Cloudy => "J",
            Self::PartlyCloudyNight => "K",
            Self::PartlyCloudyDay => "L",
            Self::ClearNight => "M",
            Self::ClearDay => "N",
            Self::Hot => "O",
            Self::Unknown => "d",
            Self::Restart => "h",
            Self::Charging => "s",
            Self::Plugged => "t",
            Self::BluetoothDisconnect => "b",
        }
    }
}

/// Ticker text is capped at this many characters, `$` included
const TICKER_MAX_CHARS: usize = 6;
const TIMEZONE_MAX_CHARS: usize = 5;

/// e.g. "Fri 15"
pub fn date_text(now: &NaiveDateTime) -> String {
    now.format("%a %d").to_string()
}

pub fn ticker_text(symbol: &str) -> String {
    let text = format!("${symbol}");
    util::truncate(&text, TICKER_MAX_CHARS).to_owned()
}

pub fn timezone_text(zone: &str) -> &str {
    util::truncate(zone, TIMEZONE_MAX_CHARS)
}

/// How full to draw the battery gauge, or `None` when it shouldn't be shown.
/// The gauge only appears when the charge is at or below the threshold, or
/// while on the charger.
pub fn battery_level(battery: &BatteryState, threshold: i32) -> Option<u8> {
    let visible = i32::from(battery.charge_percent) <= threshold
        || battery.is_charging
        || battery.is_plugged;
    visible.then_some(battery.charge_percent / 10)
}

pub fn battery_icon(battery: &BatteryState) -> Icon {
    if battery.is_charging {
        Icon::Charging
    } else if battery.is_plugged {
        Icon::Plugged
    } else {
        Icon::None
    }
}
