use std::cell::RefCell;

use windows::Win32::{
    Foundation::{LPARAM, LRESULT, POINT, WPARAM},
    UI::WindowsAndMessaging::{
        CallNextHookEx, GetCursorPos, SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK,
        HOOKPROC, MSG, MSLLHOOKSTRUCT, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_INPUT, WM_KEYDOWN,
        WM_KEYFIRST, WM_KEYLAST, WM_KEYUP, WM_MOUSEFIRST, WM_MOUSELAST, WM_MOUSEMOVE,
        WM_NCMOUSEMOVE, WM_NCXBUTTONDBLCLK, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_TIMER, WM_USER,
    },
};

use crate::{
    activity::{InputEvent, PointerPosition},
    error, info,
};

// Hook callbacks run on the installing thread while it pumps messages.
thread_local! {
    static HOOK_EVENTS: RefCell<Vec<InputEvent>> = const { RefCell::new(Vec::new()) };
}

/// Unhooks on drop so the process never leaves a dangling global hook.
pub struct HookGuard {
    handle: HHOOK,
    hook_type: &'static str,
}

impl HookGuard {
    fn install(
        hook_id: windows::Win32::UI::WindowsAndMessaging::WINDOWS_HOOK_ID,
        callback: HOOKPROC,
        hook_type: &'static str,
    ) -> windows::core::Result<Self> {
        let handle = unsafe { SetWindowsHookExW(hook_id, callback, None, 0)? };
        info!("[SCREENSAVER][ACTIVITY] {} hook installed", hook_type);
        Ok(Self { handle, hook_type })
    }

    pub fn install_mouse_hook() -> windows::core::Result<Self> {
        Self::install(WH_MOUSE_LL, Some(mouse_hook_proc), "mouse_ll")
    }

    pub fn install_keyboard_hook() -> windows::core::Result<Self> {
        Self::install(WH_KEYBOARD_LL, Some(keyboard_hook_proc), "keyboard_ll")
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        match unsafe { UnhookWindowsHookEx(self.handle) } {
            Ok(_) => info!("[SCREENSAVER][ACTIVITY] {} hook removed", self.hook_type),
            Err(e) => error!(
                "[SCREENSAVER][ACTIVITY] Failed to remove {} hook: {e:?}",
                self.hook_type
            ),
        }
    }
}

fn push_hook_event(event: InputEvent) {
    HOOK_EVENTS.with(|queue| {
        if let Ok(mut queue) = queue.try_borrow_mut() {
            queue.push(event);
        }
    });
}

/// Everything the hooks saw since the last call, oldest first.
pub fn drain_hook_events() -> Vec<InputEvent> {
    HOOK_EVENTS.with(|queue| std::mem::take(&mut *queue.borrow_mut()))
}

unsafe extern "system" fn mouse_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let msg = wparam.0 as u32;
        let event = if msg == WM_MOUSEMOVE {
            let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
            InputEvent::PointerMoved(PointerPosition::new(info.pt.x, info.pt.y))
        } else {
            InputEvent::PointerAction
        };
        push_hook_event(event);
    }

    CallNextHookEx(None, code, wparam, lparam)
}

unsafe extern "system" fn keyboard_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        match wparam.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => push_hook_event(InputEvent::KeyDown),
            WM_KEYUP | WM_SYSKEYUP => push_hook_event(InputEvent::KeyUp),
            _ => {}
        }
    }

    CallNextHookEx(None, code, wparam, lparam)
}

fn cursor_position() -> Option<PointerPosition> {
    let mut point = POINT::default();
    unsafe { GetCursorPos(&mut point).ok()? };
    Some(PointerPosition::new(point.x, point.y))
}

/// Classifies a message from our own queue. Paint, sizing and other
/// housekeeping messages are not input and map to `None`.
pub fn translate_message(msg: &MSG) -> Option<InputEvent> {
    match msg.message {
        WM_MOUSEMOVE => cursor_position().map(InputEvent::PointerMoved),
        m if (WM_MOUSEFIRST..=WM_MOUSELAST).contains(&m) => Some(InputEvent::PointerAction),
        WM_KEYDOWN | WM_SYSKEYDOWN => Some(InputEvent::KeyDown),
        WM_KEYUP | WM_SYSKEYUP => Some(InputEvent::KeyUp),
        WM_TIMER => Some(InputEvent::Timer),
        m if m >= WM_USER => Some(InputEvent::Application),
        m if (WM_KEYFIRST..=WM_KEYLAST).contains(&m)
            || (WM_NCMOUSEMOVE..=WM_NCXBUTTONDBLCLK).contains(&m)
            || m == WM_INPUT =>
        {
            Some(InputEvent::System)
        }
        _ => None,
    }
}
