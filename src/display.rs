use crate::{
    state::{FontSize, HandStyle, Theme},
    view::{Layer, Surface, TextField},
};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{info, trace};
use std::mem;

/// Stands in for the watch screen. Everything the face asks for is buffered,
/// and [Self::flush] prints a summary, but only if something visible changed.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    /// The text currently "on the screen"
    text_buffer: IndexMap<TextField, String>,
    /// Text to be shown on the next flush. Starts as a copy of the current
    /// text so fields that weren't touched carry over.
    next_text_buffer: IndexMap<TextField, String>,
    fonts: IndexMap<TextField, FontSize>,
    theme: Option<Theme>,
    hand_style: HandStyle,
    seconds_visible: bool,
    battery_level: Option<u8>,
    /// Layers marked dirty since the last flush
    dirty: IndexSet<Layer>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently shown in a field
    pub fn text(&self, field: TextField) -> &str {
        self.text_buffer
            .get(&field)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// If anything changed since the last flush, write the face out. Return
    /// whether anything was written.
    pub fn flush(&mut self) -> bool {
        let text_changed = self.next_text_buffer != self.text_buffer;
        let dirty = mem::take(&mut self.dirty);
        if !text_changed && dirty.is_empty() {
            return false;
        }

        if text_changed {
            trace!(
                "Text changed: old={:?}; new={:?}",
                self.text_buffer,
                self.next_text_buffer
            );
            self.text_buffer = self.next_text_buffer.clone();
        }

        let text = self
            .text_buffer
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .format_with(" ", |(field, text), f| {
                f(&format_args!("{field:?}={text:?}"))
            });
        info!(
            "[{}] hands={:?} seconds={} battery={} dirty={}",
            text,
            self.hand_style,
            if self.seconds_visible { "on" } else { "off" },
            self.battery_level
                .map(|level| format!("{}%", u32::from(level) * 10))
                .unwrap_or_else(|| "hidden".into()),
            dirty.iter().map(|layer| format!("{layer:?}")).join(","),
        );
        true
    }
}

impl Surface for TerminalSurface {
    fn set_text(&mut self, field: TextField, text: &str) {
        self.next_text_buffer.insert(field, text.to_owned());
    }

    fn set_font(&mut self, field: TextField, size: FontSize) {
        if self.fonts.insert(field, size) != Some(size) {
            info!("{field:?} font is now {size:?}");
        }
    }

    fn set_theme(&mut self, theme: Theme) {
        if self.theme != Some(theme) {
            info!(
                "Theme: background {}, foreground {} {} {}",
                theme.background,
                theme.foreground_1,
                theme.foreground_2,
                theme.foreground_3
            );
            self.theme = Some(theme);
        }
    }

    fn set_hand_style(&mut self, style: HandStyle) {
        self.hand_style = style;
    }

    fn set_seconds_visible(&mut self, visible: bool) {
        self.seconds_visible = visible;
    }

    fn set_battery_level(&mut self, level: Option<u8>) {
        self.battery_level = level;
    }

    fn mark_dirty(&mut self, layer: Layer) {
        self.dirty.insert(layer);
    }
}
