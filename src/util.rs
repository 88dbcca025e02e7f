use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// 24-bit Red-Green-Blue color. Serializes/deserializes as HTML format
/// (#rrggbb), so config files stay readable.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn from_hex(value: u32) -> Self {
        // Casting will truncate everything above the low 24 bits
        Self {
            red: (value >> 16) as u8,
            green: (value >> 8) as u8,
            blue: value as u8,
        }
    }

    pub fn to_hex(self) -> u32 {
        ((self.red as u32) << 16)
            | ((self.green as u32) << 8)
            | self.blue as u32
    }
}

// This is lossy, since we throw away the top 8 bits. Hope it wasn't RGBA!
impl From<u32> for Color {
    fn from(value: u32) -> Self {
        Self::from_hex(value)
    }
}

impl From<Color> for u32 {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Accepts `#rrggbb` (HTML) and `0xrrggbb` (what the config page sends)
impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix('#')
            .or_else(|| s.strip_prefix("0x"))
            .or_else(|| s.strip_prefix("0X"))
            .filter(|digits| !digits.is_empty() && digits.len() <= 6)
            .ok_or_else(|| anyhow!("Invalid color string: {}", s))?;
        let value = u32::from_str_radix(digits, 16)?;
        Ok(value.into())
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:0>2x}{:0>2x}{:0>2x}", self.red, self.green, self.blue)
    }
}

// These impls are needed for serde
impl TryFrom<String> for Color {
    type Error = <Color as FromStr>::Err;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Parse an integer the way C's `atoi` does: skip leading whitespace, accept
/// one sign, then consume digits until the first non-digit. No digits at all
/// gives 0. Out-of-range values saturate instead of wrapping.
pub fn parse_int(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value * 10 + i64::from(byte - b'0');
        // Anything past this is going to saturate anyway
        if value > i64::from(i32::MAX) + 1 {
            break;
        }
    }
    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Truncate to at most `max_chars` characters, respecting char boundaries
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
