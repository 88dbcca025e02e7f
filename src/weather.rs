//! Gotta know weather or not it's gonna rain. Turns the phone's weather reply
//! into something that fits on the face.

use crate::{state::WeatherSource, view::Icon};
use log::debug;

/// Sent in place of a real condition code while a refresh is pending
pub const CONDITION_REFRESH: i32 = -1;

/// Map a condition code to an icon. The two weather sources number their
/// conditions completely differently.
pub fn condition_icon(
    source: WeatherSource,
    condition_code: i32,
    is_daylight: bool,
) -> Icon {
    debug!(
        "Condition code {condition_code} from {source:?} \
        (daylight: {is_daylight})"
    );
    match source {
        WeatherSource::OpenWeatherMap => {
            openweathermap_icon(condition_code, is_daylight)
        }
        WeatherSource::Yahoo => yahoo_icon(condition_code, is_daylight),
    }
}

/// https://openweathermap.org/weather-conditions
fn openweathermap_icon(condition_code: i32, is_daylight: bool) -> Icon {
    let day_or_night = |day, night| if is_daylight { day } else { night };
    match condition_code {
        CONDITION_REFRESH => Icon::Refresh,
        200..=299 => Icon::Thunderstorm,
        // Drizzle and rain
        300..=599 => Icon::Rain,
        // Light rain and snow, rain and snow
        615 | 616 => Icon::FreezingRain,
        600..=699 => Icon::Snow,
        // Mist, smoke, haze, dust...
        700..=799 => Icon::Fog,
        800 => day_or_night(Icon::ClearDay, Icon::ClearNight),
        801..=803 => {
            day_or_night(Icon::PartlyCloudyDay, Icon::PartlyCloudyNight)
        }
        804 => Icon::Cloudy,
        900 => Icon::Tornado,
        901 | 902 => Icon::Hurricane,
        903 => Icon::Cold,
        904 => Icon::Hot,
        905 => Icon::Windy,
        // Hail
        906 => Icon::FreezingRain,
        _ => Icon::Unknown,
    }
}

/// Yahoo's legacy condition table, 0-47
fn yahoo_icon(condition_code: i32, is_daylight: bool) -> Icon {
    let day_or_night = |day, night| if is_daylight { day } else { night };
    match condition_code {
        CONDITION_REFRESH => Icon::Refresh,
        0 => Icon::Tornado,
        // Tropical storm, hurricane
        1 | 2 => Icon::Hurricane,
        3 | 4 | 37 | 38 | 39 | 45 | 47 => Icon::Thunderstorm,
        5 | 6 | 8 | 10 | 17 | 18 => Icon::FreezingRain,
        9 | 11 | 12 | 35 | 40 => Icon::Rain,
        7 | 13 | 14 | 15 | 16 | 41 | 42 | 43 | 46 => Icon::Snow,
        19..=22 => Icon::Fog,
        23 | 24 => Icon::Windy,
        25 => Icon::Cold,
        26..=28 => Icon::Cloudy,
        29 | 30 | 44 => {
            day_or_night(Icon::PartlyCloudyDay, Icon::PartlyCloudyNight)
        }
        31..=34 => day_or_night(Icon::ClearDay, Icon::ClearNight),
        36 => Icon::Hot,
        _ => Icon::Unknown,
    }
}

/// Formatted temperature. Anything that won't fit in three digits is blanked
/// out, which also covers the "unknown" sentinel the phone sends on errors.
pub fn temperature_text(temperature: i32) -> String {
    if (-999..=999).contains(&temperature) {
        format!("{temperature}°")
    } else {
        String::new()
    }
}
