#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

impl PointerPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerMoved(PointerPosition),
    /// Button press/release, double click or wheel.
    PointerAction,
    KeyDown,
    KeyUp,
    /// Timer ticks, including our own rotation timer.
    Timer,
    /// Messages the application posts to itself.
    Application,
    /// Any other input-class system event the platform layer recognised.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerBaseline {
    #[default]
    NoBaseline,
    Baseline(PointerPosition),
}

impl PointerBaseline {
    /// Pure transition: returns the next baseline and whether `event` counts
    /// as user activity.
    pub fn observe(self, event: InputEvent) -> (Self, bool) {
        match (self, event) {
            (Self::NoBaseline, InputEvent::PointerMoved(pos)) => (Self::Baseline(pos), false),
            (Self::Baseline(last), InputEvent::PointerMoved(pos)) => {
                if last == pos {
                    (self, false)
                } else {
                    (Self::Baseline(pos), true)
                }
            }
            (_, InputEvent::PointerAction | InputEvent::KeyDown | InputEvent::KeyUp) => (self, true),
            (_, InputEvent::Timer | InputEvent::Application) => (self, false),
            (_, InputEvent::System) => (self, true),
        }
    }
}

/// Pointer moves only count when the position changed since the last one
/// seen. While detached, events are neither classified nor recorded.
#[derive(Debug, Default)]
pub struct ActivityMonitor {
    baseline: PointerBaseline,
    attached: bool,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    #[cfg(test)]
    pub fn baseline(&self) -> PointerBaseline {
        self.baseline
    }

    /// Returns true when `event` is genuine user activity.
    pub fn on_event(&mut self, event: InputEvent) -> bool {
        if !self.attached {
            return false;
        }

        let (next, is_activity) = self.baseline.observe(event);
        self.baseline = next;
        is_activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached() -> ActivityMonitor {
        let mut monitor = ActivityMonitor::new();
        monitor.attach();
        monitor
    }

    #[test]
    fn test_first_move_sets_baseline_without_activity() {
        let (state, active) =
            PointerBaseline::NoBaseline.observe(InputEvent::PointerMoved(PointerPosition::new(10, 20)));
        assert!(!active);
        assert_eq!(state, PointerBaseline::Baseline(PointerPosition::new(10, 20)));
    }

    #[test]
    fn test_move_to_new_position_is_activity() {
        let mut monitor = attached();
        assert!(!monitor.on_event(InputEvent::PointerMoved(PointerPosition::new(5, 5))));
        assert!(monitor.on_event(InputEvent::PointerMoved(PointerPosition::new(6, 5))));
        assert_eq!(
            monitor.baseline(),
            PointerBaseline::Baseline(PointerPosition::new(6, 5))
        );
    }

    #[test]
    fn test_repeated_position_is_noise() {
        let mut monitor = attached();
        let pos = PointerPosition::new(100, 200);
        assert!(!monitor.on_event(InputEvent::PointerMoved(pos)));
        assert!(!monitor.on_event(InputEvent::PointerMoved(pos)));
        assert!(!monitor.on_event(InputEvent::PointerMoved(pos)));
    }

    #[test]
    fn test_baseline_follows_movement() {
        let mut monitor = attached();
        monitor.on_event(InputEvent::PointerMoved(PointerPosition::new(0, 0)));
        assert!(monitor.on_event(InputEvent::PointerMoved(PointerPosition::new(1, 1))));
        assert!(!monitor.on_event(InputEvent::PointerMoved(PointerPosition::new(1, 1))));
        assert!(monitor.on_event(InputEvent::PointerMoved(PointerPosition::new(0, 0))));
    }

    #[test]
    fn test_buttons_and_keys_always_signal() {
        for baseline in [
            PointerBaseline::NoBaseline,
            PointerBaseline::Baseline(PointerPosition::new(3, 4)),
        ] {
            for event in [InputEvent::PointerAction, InputEvent::KeyDown, InputEvent::KeyUp] {
                let (next, active) = baseline.observe(event);
                assert!(active, "{event:?} should be activity");
                assert_eq!(next, baseline);
            }
        }
    }

    #[test]
    fn test_timer_and_application_are_ignored() {
        let mut monitor = attached();
        assert!(!monitor.on_event(InputEvent::Timer));
        assert!(!monitor.on_event(InputEvent::Application));
    }

    #[test]
    fn test_other_system_input_is_activity() {
        let mut monitor = attached();
        assert!(monitor.on_event(InputEvent::System));
    }

    #[test]
    fn test_detached_monitor_sees_nothing() {
        let mut monitor = ActivityMonitor::new();
        assert!(!monitor.is_attached());
        assert!(!monitor.on_event(InputEvent::KeyDown));
        assert!(!monitor.on_event(InputEvent::PointerMoved(PointerPosition::new(1, 2))));
        assert_eq!(monitor.baseline(), PointerBaseline::NoBaseline);

        monitor.attach();
        assert!(monitor.on_event(InputEvent::KeyDown));
        monitor.detach();
        assert!(!monitor.on_event(InputEvent::KeyUp));
    }
}
