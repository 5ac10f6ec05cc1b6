use std::{cell::RefCell, fs, path::Path};

use webview2_com::{
    CoreWebView2EnvironmentOptions, CreateCoreWebView2ControllerCompletedHandler,
    CreateCoreWebView2EnvironmentCompletedHandler,
    Microsoft::Web::WebView2::Win32::*,
};
use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{HWND, LPARAM, RECT, WPARAM},
        UI::WindowsAndMessaging::PostMessageW,
    },
};

use crate::{
    error, info,
    preferences::ScreenBounds,
    session::DisplaySurface,
    utility::{path_to_wstring, to_wstring},
    warn,
};

/// Posted to the host window once setup finished, successfully or not.
pub const WM_APP_DISPLAY_SETTLED: u32 = windows::Win32::UI::WindowsAndMessaging::WM_APP + 1;

thread_local! {
    static READY_CONTROLLERS: RefCell<Vec<(isize, ICoreWebView2Controller)>> =
        const { RefCell::new(Vec::new()) };
}

/// Parks the controller, if any, and wakes the host window. No controller
/// means setup failed.
fn settle(hwnd_raw: isize, controller: Option<ICoreWebView2Controller>) {
    if let Some(controller) = controller {
        READY_CONTROLLERS.with(|ready| ready.borrow_mut().push((hwnd_raw, controller)));
    }

    unsafe {
        if let Err(e) = PostMessageW(
            Some(HWND(hwnd_raw as _)),
            WM_APP_DISPLAY_SETTLED,
            WPARAM(0),
            LPARAM(0),
        ) {
            error!("[SCREENSAVER][WEBVIEW] Failed to post ready message: {e:?}");
        }
    }
}

fn take_parked_controller(hwnd_raw: isize) -> Option<ICoreWebView2Controller> {
    READY_CONTROLLERS.with(|ready| {
        let mut ready = ready.borrow_mut();
        let pos = ready.iter().position(|(owner, _)| *owner == hwnd_raw)?;
        Some(ready.remove(pos).1)
    })
}

pub struct WebViewSurface {
    hwnd: HWND,
    width: i32,
    height: i32,
    visible: bool,
    controller: Option<ICoreWebView2Controller>,
    webview: Option<ICoreWebView2>,
}

impl WebViewSurface {
    pub fn new(hwnd: HWND, bounds: ScreenBounds) -> Self {
        Self {
            hwnd,
            width: bounds.width(),
            height: bounds.height(),
            visible: false,
            controller: None,
            webview: None,
        }
    }

    /// Picks up the controller parked for this window. Returns false when
    /// nothing usable was waiting.
    pub fn attach_ready_controller(&mut self) -> bool {
        let Some(controller) = take_parked_controller(self.hwnd.0 as isize) else {
            return false;
        };

        unsafe {
            if let Err(e) = controller.SetBounds(RECT {
                left: 0,
                top: 0,
                right: self.width,
                bottom: self.height,
            }) {
                warn!("[SCREENSAVER][WEBVIEW] SetBounds failed: {e:?}");
            }

            if let Err(e) = controller.SetIsVisible(self.visible) {
                warn!("[SCREENSAVER][WEBVIEW] SetIsVisible failed: {e:?}");
            }

            match controller.CoreWebView2() {
                Ok(webview) => self.webview = Some(webview),
                Err(e) => {
                    error!("[SCREENSAVER][WEBVIEW] CoreWebView2 unavailable: {e:?}");
                    let _ = controller.Close();
                    return false;
                }
            }
        }

        info!(
            "[SCREENSAVER][WEBVIEW] Controller ready for hwnd={:?} ({}x{})",
            self.hwnd, self.width, self.height
        );
        self.controller = Some(controller);
        true
    }

    /// Closes the controller. Must run before the host window is destroyed.
    pub fn shutdown(&mut self) {
        self.webview = None;
        if let Some(controller) = self.controller.take() {
            unsafe {
                let _ = controller.Close();
            }
        }
        // A controller that finished after we gave up would otherwise leak.
        if let Some(late) = take_parked_controller(self.hwnd.0 as isize) {
            unsafe {
                let _ = late.Close();
            }
        }
    }
}

impl DisplaySurface for WebViewSurface {
    fn initialize(&mut self, storage_dir: &Path) -> Result<(), String> {
        fs::create_dir_all(storage_dir)
            .map_err(|e| format!("Failed to create {}: {e}", storage_dir.display()))?;

        let hwnd_raw = self.hwnd.0 as isize;
        let user_data = path_to_wstring(storage_dir);
        let options: ICoreWebView2EnvironmentOptions =
            CoreWebView2EnvironmentOptions::default().into();

        let handler = CreateCoreWebView2EnvironmentCompletedHandler::create(Box::new(
            move |error_code, environment| {
                if let Err(e) = error_code {
                    error!("[SCREENSAVER][WEBVIEW] Environment creation failed: {e:?}");
                    settle(hwnd_raw, None);
                    return Ok(());
                }
                let Some(environment) = environment else {
                    error!("[SCREENSAVER][WEBVIEW] Environment creation returned nothing");
                    settle(hwnd_raw, None);
                    return Ok(());
                };

                let controller_handler = CreateCoreWebView2ControllerCompletedHandler::create(
                    Box::new(move |error_code, controller| {
                        match (error_code, controller) {
                            (Ok(()), Some(controller)) => settle(hwnd_raw, Some(controller)),
                            (Err(e), _) => {
                                error!("[SCREENSAVER][WEBVIEW] Controller creation failed: {e:?}");
                                settle(hwnd_raw, None);
                            }
                            (Ok(()), None) => {
                                error!("[SCREENSAVER][WEBVIEW] Controller creation returned nothing");
                                settle(hwnd_raw, None);
                            }
                        }
                        Ok(())
                    }),
                );

                let created = unsafe {
                    environment.CreateCoreWebView2Controller(HWND(hwnd_raw as _), &controller_handler)
                };
                if let Err(e) = created {
                    error!("[SCREENSAVER][WEBVIEW] CreateCoreWebView2Controller failed: {e:?}");
                    settle(hwnd_raw, None);
                }
                Ok(())
            },
        ));

        unsafe {
            CreateCoreWebView2EnvironmentWithOptions(
                PCWSTR::null(),
                PCWSTR(user_data.as_ptr()),
                &options,
                &handler,
            )
        }
        .map_err(|e| format!("CreateCoreWebView2EnvironmentWithOptions failed: {e:?}"))?;

        info!(
            "[SCREENSAVER][WEBVIEW] Environment requested for hwnd={:?} profile={}",
            self.hwnd,
            storage_dir.display()
        );
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if let Some(controller) = self.controller.as_ref() {
            unsafe {
                if let Err(e) = controller.SetIsVisible(visible) {
                    warn!("[SCREENSAVER][WEBVIEW] SetIsVisible({}) failed: {e:?}", visible);
                }
            }
        }
    }

    fn navigate(&mut self, url: &str) -> Result<(), String> {
        let webview = self
            .webview
            .as_ref()
            .ok_or_else(|| "WebView2 is not ready".to_string())?;

        let url_wide = to_wstring(url);
        unsafe {
            webview
                .Navigate(PCWSTR(url_wide.as_ptr()))
                .map_err(|e| format!("WebView2 Navigate failed for '{}': {e:?}", url))
        }
    }
}

impl Drop for WebViewSurface {
    fn drop(&mut self) {
        self.shutdown();
    }
}
