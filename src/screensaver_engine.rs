use std::{
    mem,
    path::{Path, PathBuf},
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};

use rand::Rng;
use windows::{
    core::{w, BOOL, PCWSTR},
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM},
        Graphics::Gdi::{
            EnumDisplayMonitors, GetMonitorInfoW, GetStockObject, BLACK_BRUSH, HBRUSH, HDC,
            HMONITOR, MONITORINFOEXW,
        },
        System::{Com::*, LibraryLoader::GetModuleHandleW},
        UI::{
            HiDpi::{SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2},
            WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, KillTimer,
                PeekMessageW, PostMessageW, RegisterClassW, SetTimer, SetWindowPos, ShowCursor,
                ShowWindow, TranslateMessage, HMENU, HWND_TOP, MONITORINFOF_PRIMARY, MSG,
                PM_REMOVE, SWP_NOMOVE, SWP_NOSIZE, SWP_SHOWWINDOW, SW_SHOW, WINDOW_EX_STYLE,
                WM_APP, WM_CLOSE, WM_COMMAND, WM_QUIT, WM_TIMER, WNDCLASSW, WS_CHILD,
                WS_CLIPCHILDREN, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP, WS_TABSTOP,
                WS_VISIBLE,
            },
        },
    },
};

use crate::{
    activity::InputEvent,
    error, info,
    input_hooks::{drain_hook_events, translate_message, HookGuard},
    preferences::{DisplayInfo, EffectiveScreen, PreferencesProvider, ScreenBounds},
    session::{ScreensaverSession, SessionWindow},
    warn,
    webview_surface::{WebViewSurface, WM_APP_DISPLAY_SETTLED},
};

const HOST_CLASS_NAME: PCWSTR = w!("WebPageScreensaverWindow");
const WM_APP_CLOSE_REQUESTED: u32 = WM_APP + 2;
const ROTATION_TIMER_ID: usize = 1;
const CLOSE_BUTTON_ID: usize = 1001;
const CLOSE_BUTTON_WIDTH: i32 = 100;
const CLOSE_BUTTON_HEIGHT: i32 = 32;
const CLOSE_BUTTON_MARGIN: i32 = 12;

type HostedSession = ScreensaverSession<WebViewSurface, Win32Window>;

/// The top-level window for one screen.
pub struct Win32Window {
    hwnd: HWND,
    close_button: Option<HWND>,
    pointer_hidden: bool,
    timer_running: bool,
    closed: bool,
}

impl Win32Window {
    fn new(hwnd: HWND, close_button: Option<HWND>) -> Self {
        Self {
            hwnd,
            close_button,
            pointer_hidden: false,
            timer_running: false,
            closed: false,
        }
    }
}

impl SessionWindow for Win32Window {
    // ShowCursor keeps a counter, so only flip it on a real change.
    fn set_pointer_visible(&mut self, visible: bool) {
        if visible == !self.pointer_hidden {
            return;
        }
        unsafe {
            let _ = ShowCursor(visible);
        }
        self.pointer_hidden = !visible;
    }

    fn show_close_control(&mut self) {
        let Some(button) = self.close_button else {
            warn!("[SCREENSAVER][HOST] hwnd={:?} has no close button", self.hwnd);
            return;
        };

        unsafe {
            let _ = ShowWindow(button, SW_SHOW);
            let _ = SetWindowPos(
                button,
                Some(HWND_TOP),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_SHOWWINDOW,
            );
        }
    }

    fn start_rotation_timer(&mut self, period: Duration) {
        let millis = period.as_millis().clamp(1, u32::MAX as u128) as u32;
        let id = unsafe { SetTimer(Some(self.hwnd), ROTATION_TIMER_ID, millis, None) };
        if id == 0 {
            error!("[SCREENSAVER][ROTATION] SetTimer failed for hwnd={:?}", self.hwnd);
            return;
        }
        self.timer_running = true;
        info!(
            "[SCREENSAVER][ROTATION] Timer started for hwnd={:?} every {}ms",
            self.hwnd, millis
        );
    }

    fn stop_rotation_timer(&mut self) {
        if !self.timer_running {
            return;
        }
        unsafe {
            let _ = KillTimer(Some(self.hwnd), ROTATION_TIMER_ID);
        }
        self.timer_running = false;
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

impl Drop for Win32Window {
    fn drop(&mut self) {
        self.stop_rotation_timer();
        self.set_pointer_visible(true);
    }
}

struct HostedScreen {
    hwnd: HWND,
    screen: usize,
    session: HostedSession,
}

impl Drop for HostedScreen {
    fn drop(&mut self) {
        self.session.display_mut().shutdown();
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
        info!("[SCREENSAVER][HOST] Screen {} window destroyed", self.screen + 1);
    }
}

pub struct ScreensaverRuntime {
    screens: Vec<HostedScreen>,
    hooks: Vec<HookGuard>,
    storage_dir: PathBuf,
}

impl ScreensaverRuntime {
    pub fn new(storage_dir: PathBuf) -> Self {
        if let Err(e) = ensure_host_class() {
            error!("[SCREENSAVER][HOST] {}", e);
        }
        unsafe {
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        }

        Self {
            screens: Vec::new(),
            hooks: Vec::new(),
            storage_dir,
        }
    }

    /// Opens a window per effective screen and activates its session.
    pub fn start<P, R>(&mut self, prefs: &P, rng: &mut R)
    where
        P: PreferencesProvider + ?Sized,
        R: Rng + ?Sized,
    {
        for screen in prefs.effective_screens() {
            match launch_screen(&screen, &self.storage_dir) {
                Ok(hosted) => self.screens.push(hosted),
                Err(e) => error!("[SCREENSAVER][HOST] Screen {} failed: {}", screen.id + 1, e),
            }
        }

        for hosted in &mut self.screens {
            hosted
                .session
                .activate(prefs, Some(hosted.screen), &mut *rng, Instant::now());
        }

        let installers: [fn() -> windows::core::Result<HookGuard>; 2] =
            [HookGuard::install_mouse_hook, HookGuard::install_keyboard_hook];
        for install in installers {
            match install() {
                Ok(guard) => self.hooks.push(guard),
                Err(e) => warn!("[SCREENSAVER][ACTIVITY] Hook install failed: {e:?}"),
            }
        }

        info!("[SCREENSAVER] {} screen(s) running", self.screens.len());
    }

    pub fn run(&mut self, tick_sleep: Duration) {
        while !self.screens.is_empty() {
            unsafe {
                let mut msg = MSG::default();
                while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                    if msg.message == WM_QUIT {
                        warn!("[SCREENSAVER] WM_QUIT received, shutting down");
                        self.shutdown();
                        return;
                    }
                    self.route_message(&msg);
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }

            for event in drain_hook_events() {
                self.broadcast(event);
            }

            self.reap_closed();
            if !self.screens.is_empty() {
                thread::sleep(tick_sleep);
            }
        }

        info!("[SCREENSAVER] All screens closed");
        self.shutdown();
    }

    fn route_message(&mut self, msg: &MSG) {
        if let Some(event) = translate_message(msg) {
            self.broadcast(event);
        }

        let Some(hosted) = self.screens.iter_mut().find(|s| s.hwnd == msg.hwnd) else {
            return;
        };

        match msg.message {
            WM_TIMER if msg.wParam.0 == ROTATION_TIMER_ID => hosted.session.on_rotation_tick(),
            WM_APP_DISPLAY_SETTLED => {
                if hosted.session.display_mut().attach_ready_controller() {
                    hosted.session.on_display_ready();
                } else {
                    hosted.session.on_display_failed();
                }
            }
            WM_APP_CLOSE_REQUESTED => hosted.session.on_close_clicked(),
            _ => {}
        }
    }

    fn broadcast(&mut self, event: InputEvent) {
        let now = Instant::now();
        for hosted in &mut self.screens {
            hosted.session.on_input_event(event, now);
        }
    }

    fn reap_closed(&mut self) {
        self.screens
            .retain(|s| !(s.session.is_closing() || s.session.window().closed));
    }

    fn shutdown(&mut self) {
        for hosted in &mut self.screens {
            hosted.session.close();
        }
        self.screens.clear();
        self.hooks.clear();
    }
}

impl Drop for ScreensaverRuntime {
    fn drop(&mut self) {
        self.shutdown();
        unsafe {
            CoUninitialize();
        }
    }
}

fn launch_screen(screen: &EffectiveScreen, storage_dir: &Path) -> Result<HostedScreen, String> {
    let bounds = screen.bounds;
    info!(
        "[SCREENSAVER][HOST] screen={} primary={} rect=[l={},t={},r={},b={}]",
        screen.id + 1,
        screen.primary,
        bounds.left,
        bounds.top,
        bounds.right,
        bounds.bottom
    );

    let hwnd = create_screen_window(bounds)?;
    let close_button = match create_close_button(hwnd, bounds) {
        Ok(button) => Some(button),
        Err(e) => {
            warn!("[SCREENSAVER][HOST] {}", e);
            None
        }
    };

    let session = ScreensaverSession::new(
        WebViewSurface::new(hwnd, bounds),
        Win32Window::new(hwnd, close_button),
        storage_dir.to_path_buf(),
    );

    Ok(HostedScreen {
        hwnd,
        screen: screen.id,
        session,
    })
}

fn module_instance() -> Result<HINSTANCE, String> {
    unsafe {
        GetModuleHandleW(None)
            .map(|h| HINSTANCE(h.0))
            .map_err(|e| format!("GetModuleHandleW failed: {e:?}"))
    }
}

fn ensure_host_class() -> Result<(), String> {
    static CLASS_ONCE: OnceLock<bool> = OnceLock::new();
    if CLASS_ONCE.get().is_some() {
        return Ok(());
    }

    let hinstance = module_instance()?;
    let wc = WNDCLASSW {
        lpfnWndProc: Some(screen_window_proc),
        hInstance: hinstance,
        lpszClassName: HOST_CLASS_NAME,
        hbrBackground: HBRUSH(unsafe { GetStockObject(BLACK_BRUSH) }.0),
        ..Default::default()
    };

    if unsafe { RegisterClassW(&wc) } == 0 {
        return Err("RegisterClassW failed".to_string());
    }

    let _ = CLASS_ONCE.set(true);
    Ok(())
}

/// Closing goes through the message loop so the session sees it.
unsafe extern "system" fn screen_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_COMMAND if (wparam.0 & 0xFFFF) == CLOSE_BUTTON_ID => {
            let _ = PostMessageW(Some(hwnd), WM_APP_CLOSE_REQUESTED, WPARAM(0), LPARAM(0));
            LRESULT(0)
        }
        WM_CLOSE => {
            let _ = PostMessageW(Some(hwnd), WM_APP_CLOSE_REQUESTED, WPARAM(0), LPARAM(0));
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn create_screen_window(bounds: ScreenBounds) -> Result<HWND, String> {
    let hinstance = module_instance()?;

    unsafe {
        CreateWindowExW(
            WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
            HOST_CLASS_NAME,
            w!("Web Page Screensaver"),
            WS_POPUP | WS_VISIBLE | WS_CLIPCHILDREN,
            bounds.left,
            bounds.top,
            bounds.width(),
            bounds.height(),
            None,
            None,
            Some(hinstance),
            None,
        )
    }
    .map_err(|e| format!("CreateWindowExW failed: {e:?}"))
}

/// Hidden until activity is seen with close-on-activity off.
fn create_close_button(parent: HWND, bounds: ScreenBounds) -> Result<HWND, String> {
    let hinstance = module_instance()?;
    let x = (bounds.width() - CLOSE_BUTTON_WIDTH - CLOSE_BUTTON_MARGIN).max(0);

    unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            w!("BUTTON"),
            w!("Close"),
            WS_CHILD | WS_TABSTOP,
            x,
            CLOSE_BUTTON_MARGIN,
            CLOSE_BUTTON_WIDTH,
            CLOSE_BUTTON_HEIGHT,
            Some(parent),
            Some(HMENU(CLOSE_BUTTON_ID as _)),
            Some(hinstance),
            None,
        )
    }
    .map_err(|e| format!("Close button creation failed: {e:?}"))
}

pub fn enable_per_monitor_dpi_awareness() {
    unsafe {
        if SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2).is_err() {
            warn!("[SCREENSAVER] Failed to set PerMonitorV2 DPI awareness; windows may be scaled");
        }
    }
}

/// Monitors in enumeration order; indices start at 0.
pub fn enumerate_displays() -> Vec<DisplayInfo> {
    unsafe extern "system" fn enum_monitor_proc(
        monitor: HMONITOR,
        _hdc: HDC,
        _rect: *mut RECT,
        lparam: LPARAM,
    ) -> BOOL {
        let vec = &mut *(lparam.0 as *mut Vec<DisplayInfo>);

        let mut info: MONITORINFOEXW = mem::zeroed();
        info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;

        if GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut _).as_bool() {
            let rect = info.monitorInfo.rcMonitor;
            vec.push(DisplayInfo {
                index: vec.len(),
                primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
                bounds: ScreenBounds {
                    left: rect.left,
                    top: rect.top,
                    right: rect.right,
                    bottom: rect.bottom,
                },
            });
        }

        BOOL(1)
    }

    let mut displays = Vec::<DisplayInfo>::new();
    unsafe {
        let _ = EnumDisplayMonitors(
            None,
            None,
            Some(enum_monitor_proc),
            LPARAM((&mut displays as *mut Vec<DisplayInfo>) as isize),
        );
    }

    info!("[SCREENSAVER][MONITORS] {} display(s) found", displays.len());
    displays
}
