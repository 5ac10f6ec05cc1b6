use std::time::Duration;

use crate::data_loaders::config::{MultiScreenMode, ScreensaverConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenBounds {
    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn union(&self, other: &ScreenBounds) -> ScreenBounds {
        ScreenBounds {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// A physical monitor as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub index: usize,
    pub primary: bool,
    pub bounds: ScreenBounds,
}

/// A screen the screensaver draws on. In span mode one of these covers every
/// monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveScreen {
    pub id: usize,
    pub primary: bool,
    pub bounds: ScreenBounds,
}

pub trait PreferencesProvider {
    fn effective_screens(&self) -> Vec<EffectiveScreen>;
    fn urls(&self, screen: usize) -> Vec<String>;
    fn randomize(&self, screen: usize) -> bool;
    fn rotation_interval_secs(&self, screen: usize) -> u64;
    fn close_on_activity(&self) -> bool;
}

/// Per-screen settings snapshot taken once when a session activates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenConfig {
    pub screen: usize,
    pub urls: Vec<String>,
    pub randomize: bool,
    pub rotation_interval: Duration,
}

impl ScreenConfig {
    pub fn resolve<P: PreferencesProvider + ?Sized>(prefs: &P, screen: usize) -> Self {
        Self {
            screen,
            urls: prefs.urls(screen),
            randomize: prefs.randomize(screen),
            rotation_interval: Duration::from_secs(prefs.rotation_interval_secs(screen).max(1)),
        }
    }
}

/// Index of the primary effective screen, falling back to the first one.
pub fn primary_screen<P: PreferencesProvider + ?Sized>(prefs: &P) -> usize {
    let screens = prefs.effective_screens();
    screens
        .iter()
        .find(|s| s.primary)
        .or_else(|| screens.first())
        .map(|s| s.id)
        .unwrap_or(0)
}

/// Preferences backed by the YAML config and the current monitor layout.
#[derive(Debug, Clone)]
pub struct ConfigPreferences {
    config: ScreensaverConfig,
    displays: Vec<DisplayInfo>,
}

impl ConfigPreferences {
    pub fn new(config: ScreensaverConfig, displays: Vec<DisplayInfo>) -> Self {
        Self { config, displays }
    }

    /// Which config section drives `screen`.
    fn section_index(&self, screen: usize) -> usize {
        match self.config.settings.multi_screen {
            MultiScreenMode::Separate => screen,
            MultiScreenMode::Mirror | MultiScreenMode::Span => 0,
        }
    }
}

impl PreferencesProvider for ConfigPreferences {
    fn effective_screens(&self) -> Vec<EffectiveScreen> {
        match self.config.settings.multi_screen {
            MultiScreenMode::Separate | MultiScreenMode::Mirror => self
                .displays
                .iter()
                .map(|d| EffectiveScreen {
                    id: d.index,
                    primary: d.primary,
                    bounds: d.bounds,
                })
                .collect(),
            MultiScreenMode::Span => {
                let mut iter = self.displays.iter();
                let Some(first) = iter.next() else {
                    return Vec::new();
                };
                let bounds = iter.fold(first.bounds, |acc, d| acc.union(&d.bounds));
                vec![EffectiveScreen {
                    id: 0,
                    primary: true,
                    bounds,
                }]
            }
        }
    }

    fn urls(&self, screen: usize) -> Vec<String> {
        self.config
            .screen(self.section_index(screen))
            .map(|s| s.urls.clone())
            .unwrap_or_default()
    }

    fn randomize(&self, screen: usize) -> bool {
        self.config
            .screen(self.section_index(screen))
            .map(|s| s.randomize)
            .unwrap_or(self.config.settings.defaults.randomize)
    }

    fn rotation_interval_secs(&self, screen: usize) -> u64 {
        self.config
            .screen(self.section_index(screen))
            .map(|s| s.rotation_interval_secs)
            .unwrap_or(self.config.settings.defaults.rotation_interval_secs)
            .max(1)
    }

    fn close_on_activity(&self) -> bool {
        self.config.settings.close_on_activity
    }
}

impl Default for ConfigPreferences {
    fn default() -> Self {
        Self::new(ScreensaverConfig::default(), Vec::new())
    }
}
