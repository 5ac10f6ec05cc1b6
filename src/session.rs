//! One screensaver window: rotation, browser surface and idle policy.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use rand::Rng;

use crate::{
    activity::{ActivityMonitor, InputEvent},
    info,
    preferences::{primary_screen, PreferencesProvider, ScreenConfig},
    rotation::{Destination, RotationController},
    warn,
};

/// Input during the first seconds is leftover from whatever launched us.
pub const STARTUP_GRACE: Duration = Duration::from_secs(5);

/// The embedded browser.
pub trait DisplaySurface {
    /// Starts asynchronous setup against a private profile directory. The
    /// platform calls [`ScreensaverSession::on_display_ready`] once it is done.
    fn initialize(&mut self, storage_dir: &Path) -> Result<(), String>;
    fn set_visible(&mut self, visible: bool);
    fn navigate(&mut self, url: &str) -> Result<(), String>;
}

/// The window hosting the surface.
pub trait SessionWindow {
    fn set_pointer_visible(&mut self, visible: bool);
    fn show_close_control(&mut self);
    fn start_rotation_timer(&mut self, period: Duration);
    fn stop_rotation_timer(&mut self);
    fn close(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationRequest {
    Hide,
    Navigate(String),
}

impl From<Destination<'_>> for NavigationRequest {
    fn from(destination: Destination<'_>) -> Self {
        match destination {
            Destination::Blank => Self::Hide,
            Destination::Page(url) => Self::Navigate(url.to_string()),
        }
    }
}

/// Most requests held while the surface starts. Older ones are dropped first.
pub const MAX_QUEUED_NAVIGATIONS: usize = 4;

/// Holds navigation back until the surface reports ready, then replays it in
/// order. A surface that failed to start swallows requests.
#[derive(Debug, Default)]
pub enum NavigationGate {
    #[default]
    Pending,
    Queued(VecDeque<NavigationRequest>),
    Ready,
    Failed,
}

impl NavigationGate {
    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    #[cfg(test)]
    pub fn queued(&self) -> usize {
        match self {
            Self::Queued(queue) => queue.len(),
            _ => 0,
        }
    }

    /// Returns the request back when it can go through immediately.
    fn submit(&mut self, request: NavigationRequest) -> Option<NavigationRequest> {
        match self {
            Self::Ready => Some(request),
            Self::Failed => None,
            Self::Pending => {
                *self = Self::Queued(VecDeque::from([request]));
                None
            }
            Self::Queued(queue) => {
                if queue.len() >= MAX_QUEUED_NAVIGATIONS {
                    queue.pop_front();
                }
                queue.push_back(request);
                None
            }
        }
    }

    fn open(&mut self) -> VecDeque<NavigationRequest> {
        match std::mem::replace(self, Self::Ready) {
            Self::Queued(queue) => queue,
            Self::Pending | Self::Ready | Self::Failed => VecDeque::new(),
        }
    }

    /// Returns how many queued requests were dropped.
    fn fail(&mut self) -> usize {
        match std::mem::replace(self, Self::Failed) {
            Self::Queued(queue) => queue.len(),
            _ => 0,
        }
    }
}

pub struct ScreensaverSession<D: DisplaySurface, W: SessionWindow> {
    display: D,
    window: W,
    storage_dir: PathBuf,
    monitor: ActivityMonitor,
    gate: NavigationGate,
    screen: Option<ScreenConfig>,
    rotation: Option<RotationController>,
    started_at: Option<Instant>,
    close_on_activity: bool,
    close_control_visible: bool,
    closing: bool,
}

impl<D: DisplaySurface, W: SessionWindow> ScreensaverSession<D, W> {
    pub fn new(display: D, window: W, storage_dir: PathBuf) -> Self {
        Self {
            display,
            window,
            storage_dir,
            monitor: ActivityMonitor::new(),
            gate: NavigationGate::default(),
            screen: None,
            rotation: None,
            started_at: None,
            close_on_activity: true,
            close_control_visible: false,
            closing: false,
        }
    }

    /// Resolves the screen (explicit, or the primary), reads its settings and
    /// shows the first destination. Calling it twice is a no-op.
    pub fn activate<P, R>(&mut self, prefs: &P, screen: Option<usize>, rng: &mut R, now: Instant)
    where
        P: PreferencesProvider + ?Sized,
        R: Rng + ?Sized,
    {
        if self.started_at.is_some() || self.closing {
            return;
        }

        let screen = screen.unwrap_or_else(|| primary_screen(prefs));
        self.monitor.attach();

        let config = ScreenConfig::resolve(prefs, screen);
        self.close_on_activity = prefs.close_on_activity();
        info!(
            "[SCREENSAVER] Screen {} activating: {} url(s), randomize={}, interval={}s, close_on_activity={}",
            screen + 1,
            config.urls.len(),
            config.randomize,
            config.rotation_interval.as_secs(),
            self.close_on_activity
        );

        if let Err(e) = self.display.initialize(&self.storage_dir) {
            warn!("[SCREENSAVER][WEBVIEW] Screen {} surface init failed: {}", screen + 1, e);
            self.gate.fail();
        }

        self.window.set_pointer_visible(false);

        self.rotation = RotationController::new(
            &config.urls,
            config.randomize,
            config.rotation_interval,
            rng,
        );
        self.screen = Some(config);

        match self.rotation.as_ref().and_then(RotationController::timer_period) {
            Some(period) => self.window.start_rotation_timer(period),
            None => info!("[SCREENSAVER][ROTATION] Screen {} does not rotate", screen + 1),
        }

        self.advance();
        self.started_at = Some(now);
    }

    /// The surface finished its async setup; flush anything queued.
    pub fn on_display_ready(&mut self) {
        let queued = self.gate.open();
        if !queued.is_empty() {
            info!("[SCREENSAVER][WEBVIEW] Replaying {} queued navigation(s)", queued.len());
        }

        for request in queued {
            self.dispatch(request);
        }
    }

    /// The surface gave up during async setup. Rotation keeps its place but
    /// nothing is shown.
    pub fn on_display_failed(&mut self) {
        let dropped = self.gate.fail();
        warn!(
            "[SCREENSAVER][WEBVIEW] Surface unavailable, dropped {} queued navigation(s)",
            dropped
        );
    }

    pub fn on_rotation_tick(&mut self) {
        if self.closing {
            return;
        }
        self.advance();
    }

    pub fn on_input_event(&mut self, event: InputEvent, now: Instant) {
        if self.closing {
            return;
        }

        if self.monitor.on_event(event) {
            self.on_activity(now);
        }
    }

    pub fn on_activity(&mut self, now: Instant) {
        if self.closing {
            return;
        }

        let Some(started_at) = self.started_at else {
            return;
        };

        if now.saturating_duration_since(started_at) < STARTUP_GRACE {
            return;
        }

        if self.close_on_activity {
            info!("[SCREENSAVER][ACTIVITY] User activity, closing");
            self.close();
        } else if !self.close_control_visible {
            info!("[SCREENSAVER][ACTIVITY] User activity, revealing close control");
            self.close_control_visible = true;
            self.window.show_close_control();
            self.window.set_pointer_visible(true);
        }
    }

    pub fn on_close_clicked(&mut self) {
        self.close();
    }

    pub fn close(&mut self) {
        if self.closing {
            return;
        }

        self.closing = true;
        self.monitor.detach();
        self.window.stop_rotation_timer();
        self.rotation = None;
        self.window.close();
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    #[cfg(test)]
    pub fn display_ready(&self) -> bool {
        self.gate.is_ready()
    }

    #[cfg(test)]
    pub fn close_control_visible(&self) -> bool {
        self.close_control_visible
    }

    #[cfg(test)]
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    #[cfg(test)]
    pub fn screen(&self) -> Option<&ScreenConfig> {
        self.screen.as_ref()
    }

    #[cfg(test)]
    pub fn rotation(&self) -> Option<&RotationController> {
        self.rotation.as_ref()
    }

    #[cfg(test)]
    pub fn monitor(&self) -> &ActivityMonitor {
        &self.monitor
    }

    #[cfg(test)]
    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    fn advance(&mut self) {
        let Some(rotation) = self.rotation.as_mut() else {
            return;
        };

        let request = NavigationRequest::from(rotation.advance());
        self.navigate(request);
    }

    fn navigate(&mut self, request: NavigationRequest) {
        if self.closing {
            return;
        }

        if let Some(request) = self.gate.submit(request) {
            self.dispatch(request);
        }
    }

    /// Navigation can synthesize window messages, so the monitor is detached
    /// while it runs. Only input delivered synchronously inside `navigate` is
    /// skipped; queued input is classified after the reattach.
    fn dispatch(&mut self, request: NavigationRequest) {
        if self.closing {
            return;
        }

        self.monitor.detach();
        match request {
            NavigationRequest::Hide => self.display.set_visible(false),
            NavigationRequest::Navigate(url) => {
                self.display.set_visible(true);
                info!("[SCREENSAVER][ROTATION] Navigating: {}", url);
                if let Err(e) = self.display.navigate(&url) {
                    warn!("[SCREENSAVER][ROTATION] Navigation to '{}' failed: {}", url, e);
                }
            }
        }
        self.monitor.attach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::PointerPosition;
    use crate::preferences::{EffectiveScreen, ScreenBounds};
    use rand::{rngs::StdRng, SeedableRng};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SurfaceCall {
        Initialize(PathBuf),
        Visible(bool),
        Navigate(String),
    }

    #[derive(Default)]
    struct FakeSurface {
        calls: Vec<SurfaceCall>,
        fail_navigation: bool,
        fail_init: bool,
    }

    impl FakeSurface {
        fn navigations(&self) -> Vec<String> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    SurfaceCall::Navigate(url) => Some(url.clone()),
                    _ => None,
                })
                .collect()
        }

        fn last_visibility(&self) -> Option<bool> {
            self.calls.iter().rev().find_map(|c| match c {
                SurfaceCall::Visible(v) => Some(*v),
                _ => None,
            })
        }
    }

    impl DisplaySurface for FakeSurface {
        fn initialize(&mut self, storage_dir: &Path) -> Result<(), String> {
            self.calls.push(SurfaceCall::Initialize(storage_dir.to_path_buf()));
            if self.fail_init {
                return Err("no runtime".to_string());
            }
            Ok(())
        }

        fn set_visible(&mut self, visible: bool) {
            self.calls.push(SurfaceCall::Visible(visible));
        }

        fn navigate(&mut self, url: &str) -> Result<(), String> {
            self.calls.push(SurfaceCall::Navigate(url.to_string()));
            if self.fail_navigation {
                return Err("popup in the way".to_string());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeWindow {
        pointer_visible: Option<bool>,
        close_control: bool,
        timer: Option<Duration>,
        timer_starts: usize,
        closed: usize,
    }

    impl SessionWindow for FakeWindow {
        fn set_pointer_visible(&mut self, visible: bool) {
            self.pointer_visible = Some(visible);
        }

        fn show_close_control(&mut self) {
            self.close_control = true;
        }

        fn start_rotation_timer(&mut self, period: Duration) {
            self.timer = Some(period);
            self.timer_starts += 1;
        }

        fn stop_rotation_timer(&mut self) {
            self.timer = None;
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    struct FakePrefs {
        screens: Vec<(Vec<String>, bool, u64)>,
        primary: usize,
        close_on_activity: bool,
    }

    impl FakePrefs {
        fn single(urls: &[&str], randomize: bool, interval: u64, close_on_activity: bool) -> Self {
            Self {
                screens: vec![(urls.iter().map(|s| s.to_string()).collect(), randomize, interval)],
                primary: 0,
                close_on_activity,
            }
        }
    }

    impl PreferencesProvider for FakePrefs {
        fn effective_screens(&self) -> Vec<EffectiveScreen> {
            (0..self.screens.len())
                .map(|id| EffectiveScreen {
                    id,
                    primary: id == self.primary,
                    bounds: ScreenBounds::default(),
                })
                .collect()
        }

        fn urls(&self, screen: usize) -> Vec<String> {
            self.screens[screen].0.clone()
        }

        fn randomize(&self, screen: usize) -> bool {
            self.screens[screen].1
        }

        fn rotation_interval_secs(&self, screen: usize) -> u64 {
            self.screens[screen].2
        }

        fn close_on_activity(&self) -> bool {
            self.close_on_activity
        }
    }

    type TestSession = ScreensaverSession<FakeSurface, FakeWindow>;

    fn session() -> TestSession {
        ScreensaverSession::new(
            FakeSurface::default(),
            FakeWindow::default(),
            PathBuf::from("isolated-profile"),
        )
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn started(prefs: &FakePrefs) -> (TestSession, Instant) {
        let mut session = session();
        let start = Instant::now();
        session.activate(prefs, None, &mut rng(), start);
        session.on_display_ready();
        (session, start)
    }

    #[test]
    fn test_rotates_in_order_and_wraps() {
        let prefs = FakePrefs::single(&["a", "b", "c"], false, 10, true);
        let (mut session, _) = started(&prefs);

        assert_eq!(session.window().timer, Some(Duration::from_millis(10_000)));
        assert_eq!(session.display().navigations(), vec!["a"]);

        session.on_rotation_tick();
        session.on_rotation_tick();
        session.on_rotation_tick();
        assert_eq!(session.display().navigations(), vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_activation_order_and_isolated_storage() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let (session, start) = started(&prefs);

        assert_eq!(
            session.display().calls[0],
            SurfaceCall::Initialize(PathBuf::from("isolated-profile"))
        );
        assert_eq!(session.window().pointer_visible, Some(false));
        assert_eq!(session.started_at(), Some(start));
        assert!(session.monitor().is_attached());
        assert_eq!(session.screen().map(|s| s.screen), Some(0));
    }

    #[test]
    fn test_single_url_shows_once_without_timer() {
        let prefs = FakePrefs::single(&["https://only.example"], true, 10, true);
        let (session, _) = started(&prefs);

        assert_eq!(session.window().timer_starts, 0);
        assert_eq!(session.display().navigations(), vec!["https://only.example"]);
        assert_eq!(session.rotation().and_then(|r| r.index()), Some(0));
    }

    #[test]
    fn test_empty_list_displays_nothing() {
        let prefs = FakePrefs::single(&[], false, 10, true);
        let (mut session, _) = started(&prefs);

        assert!(session.rotation().is_none());
        assert_eq!(session.window().timer_starts, 0);
        session.on_rotation_tick();
        assert!(session.display().navigations().is_empty());
        assert!(session.started_at().is_some());
    }

    #[test]
    fn test_blank_entry_hides_surface() {
        let prefs = FakePrefs::single(&["", "http://example.com"], false, 10, true);
        let (mut session, _) = started(&prefs);

        assert_eq!(session.display().last_visibility(), Some(false));
        assert!(session.display().navigations().is_empty());

        session.on_rotation_tick();
        assert_eq!(session.display().last_visibility(), Some(true));
        assert_eq!(session.display().navigations(), vec!["http://example.com"]);
    }

    #[test]
    fn test_activity_inside_grace_period_is_ignored() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let (mut session, start) = started(&prefs);

        session.on_activity(start + Duration::from_secs(3));
        assert!(!session.is_closing());
        assert_eq!(session.window().closed, 0);
    }

    #[test]
    fn test_activity_after_grace_closes() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let (mut session, start) = started(&prefs);

        session.on_activity(start + Duration::from_secs(6));
        assert!(session.is_closing());
        assert_eq!(session.window().closed, 1);
        assert_eq!(session.window().timer, None);
        assert!(!session.monitor().is_attached());
    }

    #[test]
    fn test_activity_reveals_close_control_when_not_closing_on_activity() {
        let prefs = FakePrefs::single(&["a", "b", "c"], false, 10, false);
        let (mut session, start) = started(&prefs);

        session.on_activity(start + Duration::from_secs(6));
        assert!(!session.is_closing());
        assert!(session.close_control_visible());
        assert!(session.window().close_control);
        assert_eq!(session.window().pointer_visible, Some(true));

        session.on_rotation_tick();
        assert_eq!(session.display().navigations(), vec!["a", "b"]);

        session.on_close_clicked();
        assert!(session.is_closing());
        assert_eq!(session.window().closed, 1);
    }

    #[test]
    fn test_input_events_flow_through_monitor() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let (mut session, start) = started(&prefs);
        let later = start + Duration::from_secs(10);

        session.on_input_event(InputEvent::PointerMoved(PointerPosition::new(4, 4)), later);
        session.on_input_event(InputEvent::PointerMoved(PointerPosition::new(4, 4)), later);
        session.on_input_event(InputEvent::Timer, later);
        assert!(!session.is_closing());

        session.on_input_event(InputEvent::PointerMoved(PointerPosition::new(5, 4)), later);
        assert!(session.is_closing());
    }

    #[test]
    fn test_key_press_closes_after_grace() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let (mut session, start) = started(&prefs);

        session.on_input_event(InputEvent::KeyDown, start + Duration::from_secs(1));
        assert!(!session.is_closing());
        session.on_input_event(InputEvent::KeyUp, start + Duration::from_secs(5));
        assert!(session.is_closing());
    }

    #[test]
    fn test_no_navigation_after_close() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let (mut session, _) = started(&prefs);

        session.on_close_clicked();
        session.on_rotation_tick();
        session.on_activity(Instant::now() + Duration::from_secs(60));
        session.on_close_clicked();

        assert_eq!(session.display().navigations(), vec!["a"]);
        assert_eq!(session.window().closed, 1);
    }

    #[test]
    fn test_navigation_before_ready_is_queued_and_replayed() {
        let prefs = FakePrefs::single(&["a", "b", "c"], false, 10, true);
        let mut session = session();
        session.activate(&prefs, None, &mut rng(), Instant::now());
        session.on_rotation_tick();

        assert!(session.display().navigations().is_empty());
        assert!(!session.display_ready());

        session.on_display_ready();
        assert!(session.display_ready());
        assert_eq!(session.display().navigations(), vec!["a", "b"]);

        session.on_rotation_tick();
        assert_eq!(session.display().navigations(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_queued_navigation_dropped_once_closing() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let mut session = session();
        session.activate(&prefs, None, &mut rng(), Instant::now());
        session.close();
        session.on_display_ready();

        assert!(session.display().navigations().is_empty());
    }

    #[test]
    fn test_navigation_failure_keeps_rotating() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let mut session = ScreensaverSession::new(
            FakeSurface {
                fail_navigation: true,
                ..FakeSurface::default()
            },
            FakeWindow::default(),
            PathBuf::from("p"),
        );
        session.activate(&prefs, None, &mut rng(), Instant::now());
        session.on_display_ready();
        session.on_rotation_tick();
        session.on_rotation_tick();

        assert_eq!(session.display().navigations(), vec!["a", "b", "a"]);
        assert!(!session.is_closing());
        assert!(session.monitor().is_attached());
    }

    #[test]
    fn test_init_failure_is_not_fatal() {
        let prefs = FakePrefs::single(&["a"], false, 10, true);
        let mut session = failing_surface_session();
        session.activate(&prefs, None, &mut rng(), Instant::now());

        assert!(!session.is_closing());
        assert!(session.started_at().is_some());
    }

    fn failing_surface_session() -> TestSession {
        ScreensaverSession::new(
            FakeSurface {
                fail_init: true,
                ..FakeSurface::default()
            },
            FakeWindow::default(),
            PathBuf::from("p"),
        )
    }

    #[test]
    fn test_failed_init_drops_navigation_instead_of_queueing() {
        let prefs = FakePrefs::single(&["a", "b", "c"], false, 10, true);
        let mut session = failing_surface_session();
        session.activate(&prefs, None, &mut rng(), Instant::now());

        for _ in 0..100_000 {
            session.on_rotation_tick();
        }

        assert_eq!(session.gate.queued(), 0);
        assert!(matches!(session.gate, NavigationGate::Failed));
        assert!(session.display().navigations().is_empty());
        assert_eq!(session.rotation().and_then(|r| r.index()), Some(100_000 % 3));
        assert!(!session.is_closing());
    }

    #[test]
    fn test_pending_queue_keeps_newest_requests() {
        let prefs = FakePrefs::single(&["a", "b", "c"], false, 10, true);
        let mut session = session();
        session.activate(&prefs, None, &mut rng(), Instant::now());

        for _ in 0..1000 {
            session.on_rotation_tick();
            assert!(session.gate.queued() <= MAX_QUEUED_NAVIGATIONS);
        }

        session.on_display_ready();
        assert_eq!(session.display().navigations(), vec!["b", "c", "a", "b"]);
    }

    #[test]
    fn test_async_surface_failure_discards_queue() {
        let prefs = FakePrefs::single(&["a", "b", "c"], false, 10, true);
        let mut session = session();
        session.activate(&prefs, None, &mut rng(), Instant::now());
        session.on_rotation_tick();

        session.on_display_failed();
        session.on_rotation_tick();
        session.on_rotation_tick();

        assert_eq!(session.gate.queued(), 0);
        assert!(session.display().navigations().is_empty());
    }

    #[test]
    fn test_navigation_keeps_pointer_baseline() {
        let prefs = FakePrefs::single(&["a", "b"], false, 10, true);
        let (mut session, start) = started(&prefs);
        let later = start + Duration::from_secs(10);
        let still = PointerPosition::new(30, 40);

        session.on_input_event(InputEvent::PointerMoved(still), later);
        session.on_rotation_tick();
        session.on_rotation_tick();

        assert!(session.monitor().is_attached());
        session.on_input_event(InputEvent::PointerMoved(still), later);
        assert!(!session.is_closing());
        assert_eq!(session.display().navigations(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_explicit_screen_and_primary_resolution() {
        let prefs = FakePrefs {
            screens: vec![
                (vec!["left".to_string()], false, 5),
                (vec!["right".to_string()], false, 5),
            ],
            primary: 1,
            close_on_activity: true,
        };

        let (primary, _) = started(&prefs);
        assert_eq!(primary.screen().map(|s| s.screen), Some(1));
        assert_eq!(primary.display().navigations(), vec!["right"]);

        let mut explicit = session();
        explicit.activate(&prefs, Some(0), &mut rng(), Instant::now());
        explicit.on_display_ready();
        assert_eq!(explicit.display().navigations(), vec!["left"]);
    }

    #[test]
    fn test_shuffled_session_uses_injected_rng() {
        let urls: Vec<&str> = vec!["a", "b", "c", "d", "e", "f"];
        let prefs = FakePrefs::single(&urls, true, 10, true);

        let (first, _) = started(&prefs);
        let (second, _) = started(&prefs);
        assert_eq!(
            first.rotation().map(|r| r.order().to_vec()),
            second.rotation().map(|r| r.order().to_vec())
        );
    }

    #[test]
    fn test_activity_before_activation_is_ignored() {
        let mut session = session();
        session.on_activity(Instant::now() + Duration::from_secs(60));
        assert!(!session.is_closing());
    }
}
