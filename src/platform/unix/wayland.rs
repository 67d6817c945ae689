// piglit-framework/src/platform/unix/wayland.rs
//
//! A connection to the Wayland compositor.

use crate::Error;

use std::ptr;
use wayland_sys::client::{wayland_client_option, wl_display, wayland_client_handle};

/// An owned `wl_display`. Disconnected on drop.
pub(crate) struct WaylandDisplay {
    pub(crate) display: *mut wl_display,
}

impl Drop for WaylandDisplay {
    fn drop(&mut self) {
        unsafe {
            (wayland_client_handle().wl_display_disconnect)(self.display);
        }
    }
}

impl WaylandDisplay {
    /// Connects to the compositor named by `WAYLAND_DISPLAY`.
    pub(crate) fn connect() -> Result<WaylandDisplay, Error> {
        if wayland_client_option().is_none() {
            error!("libwayland-client is not available");
            return Err(Error::UnsupportedOnThisPlatform);
        }
        unsafe {
            let display = (wayland_client_handle().wl_display_connect)(ptr::null());
            if display.is_null() {
                error!("failed to connect to the Wayland compositor");
                return Err(Error::ConnectionFailed);
            }
            Ok(WaylandDisplay { display })
        }
    }
}
