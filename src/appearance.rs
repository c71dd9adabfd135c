use serde::{Deserialize, Serialize};

use crate::config::AppearanceConfig;

pub const FONT_SIZE_MIN: u8 = 8;
pub const FONT_SIZE_MAX: u8 = 24;
pub const REFRESH_RATE_MIN_MS: u32 = 100;
pub const REFRESH_RATE_MAX_MS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Custom,
}

impl Theme {
    /// Unknown names map to `Custom` so a hand-edited palette still renders.
    pub fn from_str_config(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "dark" => Theme::Dark,
            "light" => Theme::Light,
            _ => Theme::Custom,
        }
    }
}

/// Viewer skin echoed into every published document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,
    pub tile_text_color: String,
    pub font_size: u8,
    pub theme: Theme,
    pub show_graphs: bool,
    pub refresh_rate_ms: u32,
}

impl Default for Appearance {
    fn default() -> Self {
        Appearance::from_config(&AppearanceConfig::default())
    }
}

impl Appearance {
    /// Validate raw settings. Out-of-range numbers are clamped into their
    /// documented bounds and malformed colors revert to the defaults.
    pub fn from_config(raw: &AppearanceConfig) -> Self {
        let defaults = AppearanceConfig::default();

        let font_size = clamp_font_size(raw.font_size);
        if u32::from(font_size) != raw.font_size {
            tracing::warn!(requested = raw.font_size, used = font_size, "font_size clamped");
        }
        let refresh_rate_ms = clamp_refresh_rate(raw.refresh_rate_ms);
        if u64::from(refresh_rate_ms) != raw.refresh_rate_ms {
            tracing::warn!(
                requested = raw.refresh_rate_ms,
                used = refresh_rate_ms,
                "refresh_rate_ms clamped"
            );
        }

        let text_color = color_or_default("text_color", &raw.text_color, &defaults.text_color);
        // Tiles inherit the body text color until one is set explicitly.
        let tile_text_color = match raw.tile_text_color.as_deref() {
            Some(value) => color_or_default("tile_text_color", value, &text_color),
            None => text_color.clone(),
        };

        Appearance {
            background_color: color_or_default(
                "background_color",
                &raw.background_color,
                &defaults.background_color,
            ),
            text_color,
            accent_color: color_or_default(
                "accent_color",
                &raw.accent_color,
                &defaults.accent_color,
            ),
            tile_text_color,
            font_size,
            theme: Theme::from_str_config(&raw.theme),
            show_graphs: raw.show_graphs,
            refresh_rate_ms,
        }
    }
}

/// Normalizes the appearance once per distinct raw config, so clamp and
/// color warnings are logged when the settings change instead of on every
/// tick.
#[derive(Debug, Default)]
pub struct AppearanceCache {
    last: Option<(AppearanceConfig, Appearance)>,
}

impl AppearanceCache {
    pub fn resolve(&mut self, raw: &AppearanceConfig) -> Appearance {
        match &self.last {
            Some((previous, appearance)) if previous == raw => appearance.clone(),
            _ => {
                let appearance = Appearance::from_config(raw);
                self.last = Some((raw.clone(), appearance.clone()));
                appearance
            }
        }
    }
}

pub fn clamp_font_size(size: u32) -> u8 {
    size.clamp(u32::from(FONT_SIZE_MIN), u32::from(FONT_SIZE_MAX)) as u8
}

pub fn clamp_refresh_rate(ms: u64) -> u32 {
    ms.clamp(u64::from(REFRESH_RATE_MIN_MS), u64::from(REFRESH_RATE_MAX_MS)) as u32
}

/// `#rrggbb` or `#aarrggbb`, the two forms Android's color parser accepts.
pub fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn color_or_default(field: &'static str, value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if is_hex_color(trimmed) {
        trimmed.to_lowercase()
    } else {
        tracing::warn!(field, value, "invalid color, using default");
        default.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn raw() -> AppearanceConfig {
        AppearanceConfig::default()
    }

    #[test]
    fn refresh_rate_at_minimum_is_accepted() {
        let appearance = Appearance::from_config(&AppearanceConfig {
            refresh_rate_ms: 100,
            ..raw()
        });
        assert_eq!(appearance.refresh_rate_ms, 100);
    }

    #[test]
    fn refresh_rate_below_minimum_is_clamped() {
        let appearance = Appearance::from_config(&AppearanceConfig {
            refresh_rate_ms: 50,
            ..raw()
        });
        assert_eq!(appearance.refresh_rate_ms, REFRESH_RATE_MIN_MS);
    }

    #[test]
    fn refresh_rate_above_maximum_is_clamped() {
        assert_eq!(clamp_refresh_rate(60_000), REFRESH_RATE_MAX_MS);
        assert_eq!(clamp_refresh_rate(10_000), 10_000);
    }

    #[test]
    fn font_size_bounds() {
        assert_eq!(clamp_font_size(0), 8);
        assert_eq!(clamp_font_size(8), 8);
        assert_eq!(clamp_font_size(24), 24);
        assert_eq!(clamp_font_size(300), 24);
    }

    #[test]
    fn invalid_colors_revert_to_defaults() {
        let appearance = Appearance::from_config(&AppearanceConfig {
            background_color: "black".to_string(),
            text_color: "#FFF".to_string(),
            accent_color: " #FF8800 ".to_string(),
            ..raw()
        });
        assert_eq!(appearance.background_color, "#1e1e1e");
        assert_eq!(appearance.text_color, "#ffffff");
        assert_eq!(appearance.accent_color, "#ff8800");
    }

    #[test]
    fn hex_color_forms() {
        assert!(is_hex_color("#1e1e1e"));
        assert!(is_hex_color("#801e1e1e"));
        assert!(!is_hex_color("1e1e1e"));
        assert!(!is_hex_color("#1e1e1"));
        assert!(!is_hex_color("#gggggg"));
    }

    #[test]
    fn theme_names() {
        assert_eq!(Theme::from_str_config("Dark"), Theme::Dark);
        assert_eq!(Theme::from_str_config("light"), Theme::Light);
        assert_eq!(Theme::from_str_config("solarized"), Theme::Custom);
        assert_eq!(serde_json::to_string(&Theme::Custom).unwrap(), "\"custom\"");
    }

    #[test]
    fn tile_text_color_follows_text_color_when_unset() {
        let appearance = Appearance::from_config(&AppearanceConfig {
            text_color: "#EEEEEE".to_string(),
            ..raw()
        });
        assert_eq!(appearance.tile_text_color, "#eeeeee");

        let appearance = Appearance::from_config(&AppearanceConfig {
            tile_text_color: Some("#102030".to_string()),
            ..raw()
        });
        assert_eq!(appearance.tile_text_color, "#102030");
        assert_eq!(appearance.text_color, "#ffffff");
    }

    #[test]
    fn invalid_tile_text_color_falls_back_to_text_color() {
        let appearance = Appearance::from_config(&AppearanceConfig {
            text_color: "#cccccc".to_string(),
            tile_text_color: Some("white".to_string()),
            ..raw()
        });
        assert_eq!(appearance.tile_text_color, "#cccccc");
    }

    #[test]
    fn cache_warns_once_per_distinct_setting() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let too_fast = AppearanceConfig {
            refresh_rate_ms: 50,
            ..raw()
        };
        let still_too_fast = AppearanceConfig {
            refresh_rate_ms: 20,
            ..raw()
        };
        tracing::subscriber::with_default(subscriber, || {
            let mut cache = AppearanceCache::default();
            for _ in 0..5 {
                assert_eq!(cache.resolve(&too_fast).refresh_rate_ms, REFRESH_RATE_MIN_MS);
            }
            assert_eq!(cache.resolve(&still_too_fast).refresh_rate_ms, REFRESH_RATE_MIN_MS);
            assert_eq!(cache.resolve(&still_too_fast).refresh_rate_ms, REFRESH_RATE_MIN_MS);
        });

        assert_eq!(logs.contents().matches("refresh_rate_ms clamped").count(), 2);
    }

    #[test]
    fn cache_picks_up_edits() {
        let mut cache = AppearanceCache::default();
        assert_eq!(cache.resolve(&raw()).font_size, 14);
        let edited = AppearanceConfig {
            font_size: 20,
            ..raw()
        };
        assert_eq!(cache.resolve(&edited).font_size, 20);
        assert_eq!(cache.resolve(&raw()).font_size, 14);
    }
}
