use std::{
    env,
    path::{Path, PathBuf},
};

pub const APP_DIR_NAME: &str = "Web-Page-Screensaver";

#[cfg(windows)]
pub fn to_wstring(s: &str) -> Vec<u16> {
    use std::{ffi::OsStr, os::windows::ffi::OsStrExt};

    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

#[cfg(windows)]
pub fn path_to_wstring(path: &Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;

    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

pub fn exe_dir() -> Option<PathBuf> {
    let exe_path = env::current_exe().ok()?;
    exe_path.parent().map(Path::to_path_buf)
}

/// `%APPDATA%\Web-Page-Screensaver`, or the executable's directory when the
/// roaming profile can't be resolved.
pub fn app_root_dir() -> Option<PathBuf> {
    if let Ok(appdata) = env::var("APPDATA") {
        if !appdata.trim().is_empty() {
            return Some(PathBuf::from(appdata).join(APP_DIR_NAME));
        }
    }

    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home).join(".config").join(APP_DIR_NAME));
        }
    }

    exe_dir()
}

pub fn config_path() -> PathBuf {
    if let Some(root) = app_root_dir() {
        return root.join("config.yaml");
    }

    PathBuf::from("config.yaml")
}

/// Browser profile directory private to this process. Removed on exit so no
/// cookies or cache survive between runs.
pub fn isolated_storage_dir() -> PathBuf {
    env::temp_dir()
        .join(APP_DIR_NAME)
        .join(std::process::id().to_string())
}
