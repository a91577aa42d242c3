//! Game window activation

/// Brings the target application to the foreground
pub trait WindowActivator {
    /// Find the window titled `title`, restore it if minimized and focus it.
    /// Returns false when the window does not exist or could not be focused.
    fn activate(&self, title: &str) -> bool;
}

/// Win32-backed activator
#[derive(Debug, Default)]
pub struct GameWindow;

impl GameWindow {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl WindowActivator for GameWindow {
    fn activate(&self, title: &str) -> bool {
        use std::thread;
        use std::time::Duration;

        use windows::core::PCWSTR;
        use windows::Win32::UI::WindowsAndMessaging::{
            FindWindowW, IsIconic, SetForegroundWindow, ShowWindow, SW_RESTORE,
        };

        let title_wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();

        unsafe {
            let hwnd = match FindWindowW(PCWSTR::null(), PCWSTR(title_wide.as_ptr())) {
                Ok(hwnd) if !hwnd.0.is_null() => hwnd,
                _ => {
                    tracing::debug!("[WINDOW] Window '{}' not found", title);
                    return false;
                }
            };

            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            if !SetForegroundWindow(hwnd).as_bool() {
                tracing::warn!("[WINDOW] SetForegroundWindow refused for '{}'", title);
                return false;
            }
        }

        // Let the window finish coming to the front before input is sent
        thread::sleep(Duration::from_millis(200));
        true
    }
}

#[cfg(not(windows))]
impl WindowActivator for GameWindow {
    fn activate(&self, title: &str) -> bool {
        tracing::warn!("[WINDOW] Window activation not implemented on this platform ('{}')", title);
        false
    }
}
