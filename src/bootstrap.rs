use std::{fs, path::Path};

use crate::{info, warn};

pub const DEFAULT_CONFIG_YAML: &str = r#"settings:
  # Exit as soon as the mouse moves or a key is pressed. When false, a Close
  # button appears instead and the pages keep rotating.
  close_on_activity: true
  # separate: each monitor uses its own screenN section
  # mirror:   every monitor uses screen1
  # span:     one window across all monitors, using screen1
  multi_screen: separate
  defaults:
    randomize: false
    rotation_interval_secs: 30
  runtime:
    tick_sleep_ms: 8
  development:
    debug: false
    log_level: warn

screen1:
  urls:
    - "https://www.rust-lang.org"
    - "https://en.wikipedia.org/wiki/Special:Random"
  randomize: false
  rotation_interval_secs: 30
"#;

/// Writes the default config unless one already exists. Returns true when a
/// file was created.
pub fn scaffold_config_yaml(path: &Path) -> bool {
    if path.exists() {
        return false;
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("[SCREENSAVER][CONFIG] Failed to create {}: {e}", parent.display());
            return false;
        }
    }

    match fs::write(path, DEFAULT_CONFIG_YAML) {
        Ok(_) => {
            info!("[SCREENSAVER][CONFIG] Created {}", path.display());
            true
        }
        Err(e) => {
            warn!("[SCREENSAVER][CONFIG] Failed to create {}: {e}", path.display());
            false
        }
    }
}

/// `/c` mode: there is no settings dialog, the YAML file is the settings.
pub fn open_config_for_editing(path: &Path) {
    scaffold_config_yaml(path);

    let editor = if cfg!(windows) { "notepad.exe" } else { "xdg-open" };
    match std::process::Command::new(editor).arg(path).spawn() {
        Ok(_) => info!("[SCREENSAVER][CONFIG] Opened {} in {}", path.display(), editor),
        Err(e) => warn!("[SCREENSAVER][CONFIG] Failed to open {} in {}: {e}", path.display(), editor),
    }
}

/// Best-effort removal of the per-run browser profile.
pub fn remove_isolated_storage(dir: &Path) {
    if !dir.exists() {
        return;
    }

    match fs::remove_dir_all(dir) {
        Ok(_) => info!("[SCREENSAVER] Removed browser profile {}", dir.display()),
        Err(e) => warn!(
            "[SCREENSAVER] Could not remove browser profile {}: {e}",
            dir.display()
        ),
    }
}
