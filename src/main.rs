#![windows_subsystem = "windows"]
#![cfg_attr(not(windows), allow(dead_code))]

mod activity;
mod bootstrap;
mod cli;
mod data_loaders;
mod logging;
mod preferences;
mod rotation;
mod session;
mod utility;

#[cfg(windows)]
mod input_hooks;
#[cfg(windows)]
mod screensaver_engine;
#[cfg(windows)]
mod webview_surface;

use crate::{cli::Invocation, data_loaders::config::ScreensaverConfig};

pub const DEBUG_NAME: &str = "SCREENSAVER";

fn load_config(path: &std::path::Path) -> ScreensaverConfig {
	match ScreensaverConfig::load(path) {
		Ok(config) => config,
		Err(e) => {
			warn!("[{}][CONFIG] {}; using defaults", DEBUG_NAME, e);
			ScreensaverConfig::default()
		}
	}
}

fn main() {
	logging::init(false, "warn");

	let config_path = utility::config_path();
	bootstrap::scaffold_config_yaml(&config_path);
	let config = load_config(&config_path);

	logging::set_debug(config.debug);
	logging::set_level(&config.log_level);
	std::panic::set_hook(Box::new(|panic_info| {
		error!("[{}] Panic: {}", DEBUG_NAME, panic_info);
	}));

	let invocation = Invocation::from_env();
	info!("!---------- [{}] Starting ({:?}) ----------!", DEBUG_NAME, invocation);
	info!("[{}] Config loaded from {}", DEBUG_NAME, config_path.display());

	match invocation {
		Invocation::Configure { .. } => bootstrap::open_config_for_editing(&config_path),
		Invocation::Preview { parent } => {
			info!("[{}] Preview requested (parent={:?}); nothing to draw", DEBUG_NAME, parent);
		}
		Invocation::Show => run_screensaver(config),
	}
}

#[cfg(windows)]
fn run_screensaver(config: ScreensaverConfig) {
	use std::time::Duration;

	use crate::{preferences::ConfigPreferences, screensaver_engine::ScreensaverRuntime};

	screensaver_engine::enable_per_monitor_dpi_awareness();
	let displays = screensaver_engine::enumerate_displays();
	let tick_sleep = Duration::from_millis(config.settings.runtime.tick_sleep_ms.max(1));
	let prefs = ConfigPreferences::new(config, displays);
	let storage_dir = utility::isolated_storage_dir();

	{
		let mut runtime = ScreensaverRuntime::new(storage_dir.clone());
		runtime.start(&prefs, &mut rand::thread_rng());
		runtime.run(tick_sleep);
	}

	bootstrap::remove_isolated_storage(&storage_dir);
	info!("[{}] Exited", DEBUG_NAME);
}

#[cfg(not(windows))]
fn run_screensaver(_config: ScreensaverConfig) {
	error!("[{}] Full-screen mode needs WebView2 and only runs on Windows", DEBUG_NAME);
}
