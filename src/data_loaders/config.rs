use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::yaml::load_yaml;

pub const DEFAULT_ROTATION_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ScreensaverConfig {
    pub debug: bool,
    pub log_level: String,
    pub settings: ScreensaverSettings,
    pub screens: Vec<ScreenSection>,
}

#[derive(Debug, Clone)]
pub struct ScreensaverSettings {
    pub close_on_activity: bool,
    pub multi_screen: MultiScreenMode,
    pub defaults: ScreenDefaults,
    pub runtime: RuntimeSettings,
    pub development: DevelopmentSettings,
}

#[derive(Debug, Clone)]
pub struct ScreenDefaults {
    pub randomize: bool,
    pub rotation_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub tick_sleep_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DevelopmentSettings {
    pub debug: bool,
    pub log_level: String,
}

/// One `screenN` block. `index` is zero-based; the YAML key is one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSection {
    pub section: String,
    pub index: usize,
    pub urls: Vec<String>,
    pub randomize: bool,
    pub rotation_interval_secs: u64,
}

impl Default for ScreensaverConfig {
    fn default() -> Self {
        let settings = ScreensaverSettings::default();
        Self {
            debug: settings.development.debug,
            log_level: settings.development.log_level.clone(),
            settings,
            screens: Vec::new(),
        }
    }
}

impl Default for ScreensaverSettings {
    fn default() -> Self {
        Self {
            close_on_activity: true,
            multi_screen: MultiScreenMode::Separate,
            defaults: ScreenDefaults::default(),
            runtime: RuntimeSettings::default(),
            development: DevelopmentSettings::default(),
        }
    }
}

impl Default for ScreenDefaults {
    fn default() -> Self {
        Self {
            randomize: false,
            rotation_interval_secs: DEFAULT_ROTATION_INTERVAL_SECS,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { tick_sleep_ms: 8 }
    }
}

impl Default for DevelopmentSettings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiScreenMode {
    /// Every monitor runs its own section.
    Separate,
    /// Every monitor runs the first section.
    Mirror,
    /// One window stretched over all monitors, running the first section.
    Span,
}

impl MultiScreenMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "separate" | "independent" | "per-monitor" | "per_monitor" => Some(Self::Separate),
            "mirror" | "same" | "duplicate" => Some(Self::Mirror),
            "span" | "spanned" | "stretch" => Some(Self::Span),
            _ => None,
        }
    }
}

impl ScreensaverConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let value = load_yaml(path)?;
        Self::from_yaml(&value)
    }

    pub fn from_yaml(root: &Value) -> Result<Self, String> {
        if root.is_null() {
            return Ok(Self::default());
        }

        let map = root
            .as_mapping()
            .ok_or_else(|| "config root is not a mapping".to_string())?;

        let settings = parse_settings(map);
        let debug = settings.development.debug;
        let log_level = settings.development.log_level.clone();

        let mut screens = parse_screen_sections(map, &settings.defaults);
        screens.sort_by_key(|s| s.index);
        screens.dedup_by_key(|s| s.index);

        Ok(Self {
            debug,
            log_level,
            settings,
            screens,
        })
    }

    pub fn screen(&self, index: usize) -> Option<&ScreenSection> {
        self.screens.iter().find(|s| s.index == index)
    }
}

fn parse_screen_sections(map: &Mapping, defaults: &ScreenDefaults) -> Vec<ScreenSection> {
    let mut screens = Vec::<ScreenSection>::new();

    let nested = mapping_at(map, "screens");
    let all_entries = map.iter().chain(nested.into_iter().flat_map(|m| m.iter()));

    for (k, v) in all_entries {
        let Some(section) = k.as_str() else {
            continue;
        };

        let Some(index) = section_index(section) else {
            continue;
        };

        if let Some(section_map) = v.as_mapping() {
            screens.push(parse_screen_section(section, index, section_map, defaults));
        }
    }

    screens
}

fn parse_screen_section(
    section: &str,
    index: usize,
    section_map: &Mapping,
    defaults: &ScreenDefaults,
) -> ScreenSection {
    let urls = url_list_any(section_map, &["urls", "url", "pages"]).unwrap_or_default();
    let randomize = bool_any(section_map, &["randomize", "shuffle", "random"])
        .unwrap_or(defaults.randomize);
    let rotation_interval_secs = u64_any(
        section_map,
        &["rotation_interval_secs", "rotation_interval", "interval_secs", "interval"],
    )
    .unwrap_or(defaults.rotation_interval_secs)
    .max(1);

    ScreenSection {
        section: section.to_string(),
        index,
        urls,
        randomize,
        rotation_interval_secs,
    }
}

fn parse_settings(root: &Mapping) -> ScreensaverSettings {
    let mut settings = ScreensaverSettings::default();

    settings.development.debug = bool_at(root, "debug").unwrap_or(settings.development.debug);
    settings.development.log_level = str_at(root, "log_level")
        .unwrap_or(&settings.development.log_level)
        .to_lowercase();

    let Some(settings_map) = mapping_at(root, "settings") else {
        return settings;
    };

    settings.close_on_activity = bool_any(settings_map, &["close_on_activity", "exit_on_activity"])
        .unwrap_or(settings.close_on_activity);
    settings.multi_screen = str_any(settings_map, &["multi_screen", "multi_screen_mode"])
        .and_then(MultiScreenMode::parse)
        .unwrap_or(settings.multi_screen);

    if let Some(defaults) = mapping_at(settings_map, "defaults") {
        settings.defaults.randomize = bool_any(defaults, &["randomize", "shuffle", "random"])
            .unwrap_or(settings.defaults.randomize);
        settings.defaults.rotation_interval_secs = u64_any(
            defaults,
            &["rotation_interval_secs", "rotation_interval", "interval_secs", "interval"],
        )
        .unwrap_or(settings.defaults.rotation_interval_secs)
        .max(1);
    }

    if let Some(runtime) = mapping_at(settings_map, "runtime") {
        settings.runtime.tick_sleep_ms = u64_at(runtime, "tick_sleep_ms")
            .unwrap_or(settings.runtime.tick_sleep_ms)
            .max(1);
    }

    if let Some(dev) = mapping_at(settings_map, "development") {
        settings.development.debug =
            bool_any(dev, &["debug", "debug_mode"]).unwrap_or(settings.development.debug);
        settings.development.log_level = str_any(dev, &["log_level", "logging"])
            .unwrap_or(&settings.development.log_level)
            .to_lowercase();
    }

    settings
}

/// `screen` and `screen1` are the first screen, `screen2` the second and so on.
fn section_index(section: &str) -> Option<usize> {
    let suffix = section.strip_prefix("screen")?;
    if suffix.is_empty() {
        return Some(0);
    }

    match suffix.parse::<usize>() {
        Ok(number) if number > 0 => Some(number - 1),
        _ => None,
    }
}

fn bool_at(map: &Mapping, key: &str) -> Option<bool> {
    map.get(Value::String(key.to_string()))?.as_bool()
}

fn bool_any(map: &Mapping, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| bool_at(map, k))
}

fn str_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(Value::String(key.to_string()))?.as_str()
}

fn str_any<'a>(map: &'a Mapping, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| str_at(map, k))
}

fn mapping_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    map.get(Value::String(key.to_string()))?.as_mapping()
}

fn u64_at(map: &Mapping, key: &str) -> Option<u64> {
    map.get(Value::String(key.to_string()))?
        .as_i64()
        .and_then(|v| if v >= 0 { Some(v as u64) } else { None })
}

fn u64_any(map: &Mapping, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| u64_at(map, k))
}

/// A sequence keeps its order and blanks (null entries become ""); a plain
/// string is split on whitespace, matching the old single-field format.
fn url_list_at(map: &Mapping, key: &str) -> Option<Vec<String>> {
    match map.get(Value::String(key.to_string()))? {
        Value::Sequence(list) => Some(
            list.iter()
                .filter_map(|v| match v {
                    Value::Null => Some(String::new()),
                    Value::String(s) => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect(),
        ),
        Value::String(s) => Some(s.split_whitespace().map(str::to_string).collect()),
        _ => None,
    }
}

fn url_list_any(map: &Mapping, keys: &[&str]) -> Option<Vec<String>> {
    keys.iter().find_map(|k| url_list_at(map, k))
}
