// piglit-framework/src/platform/unix/x11.rs
//
//! Xlib displays, windows and events shared by the GLX and X11 EGL platforms.

use crate::platform::WindowEvent;
use crate::{Error, WindowingApiError};

use euclid::default::Size2D;
use std::cell::Cell;
use std::mem;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;
use x11_dl::keysym;
use x11_dl::xlib::{self, Display, XErrorEvent, Xlib};

thread_local! {
    static LAST_X_ERROR_CODE: Cell<u8> = const { Cell::new(0) };
}

/// A top-level window and the colormap created for its visual.
#[derive(Clone, Copy, Debug)]
pub(crate) struct XlibWindow {
    pub(crate) window: xlib::Window,
    pub(crate) colormap: xlib::Colormap,
}

/// An open Xlib display. Closed on drop.
pub(crate) struct XlibDisplay {
    pub(crate) xlib: Xlib,
    pub(crate) display: *mut Display,
    wm_delete_window: xlib::Atom,
}

impl Drop for XlibDisplay {
    fn drop(&mut self) {
        unsafe {
            (self.xlib.XCloseDisplay)(self.display);
        }
    }
}

impl XlibDisplay {
    /// Connects to the server named by `DISPLAY`.
    pub(crate) fn open() -> Result<XlibDisplay, Error> {
        let xlib = Xlib::open().map_err(|err| {
            error!("failed to load Xlib: {}", err);
            Error::UnsupportedOnThisPlatform
        })?;
        unsafe {
            let display = (xlib.XOpenDisplay)(ptr::null());
            if display.is_null() {
                error!("failed to open the X display");
                return Err(Error::ConnectionFailed);
            }
            let wm_delete_window = (xlib.XInternAtom)(
                display,
                c"WM_DELETE_WINDOW".as_ptr(),
                xlib::False,
            );
            Ok(XlibDisplay { xlib, display, wm_delete_window })
        }
    }

    #[inline]
    pub(crate) fn default_screen(&self) -> c_int {
        unsafe { (self.xlib.XDefaultScreen)(self.display) }
    }

    /// Looks up the visual with the given ID on the default screen.
    pub(crate) fn visual_info(&self, visual_id: xlib::VisualID) -> Option<xlib::XVisualInfo> {
        unsafe {
            let mut template: xlib::XVisualInfo = mem::zeroed();
            template.visualid = visual_id;
            template.screen = self.default_screen();
            let mut count = 0;
            let infos = (self.xlib.XGetVisualInfo)(
                self.display,
                xlib::VisualIDMask | xlib::VisualScreenMask,
                &mut template,
                &mut count,
            );
            if infos.is_null() {
                return None;
            }
            let info = if count > 0 { Some(*infos) } else { None };
            (self.xlib.XFree)(infos as *mut _);
            info
        }
    }

    /// Creates an unmapped top-level window with the given visual.
    pub(crate) fn create_window(
        &self,
        visual_info: &xlib::XVisualInfo,
        size: Size2D<i32>,
    ) -> Result<XlibWindow, Error> {
        unsafe {
            let root = (self.xlib.XRootWindow)(self.display, visual_info.screen);
            let colormap =
                (self.xlib.XCreateColormap)(self.display, root, visual_info.visual, xlib::AllocNone);

            let mut attributes: xlib::XSetWindowAttributes = mem::zeroed();
            attributes.colormap = colormap;
            attributes.background_pixel = 0;
            attributes.border_pixel = 0;
            attributes.event_mask = xlib::StructureNotifyMask | xlib::ExposureMask | xlib::KeyPressMask;

            let window = (self.xlib.XCreateWindow)(
                self.display,
                root,
                0,
                0,
                size.width as c_uint,
                size.height as c_uint,
                0,
                visual_info.depth,
                xlib::InputOutput as c_uint,
                visual_info.visual,
                xlib::CWBackPixel | xlib::CWBorderPixel | xlib::CWColormap | xlib::CWEventMask,
                &mut attributes,
            );
            if window == 0 {
                (self.xlib.XFreeColormap)(self.display, colormap);
                return Err(Error::SurfaceCreationFailed(WindowingApiError::BadWindow));
            }

            let mut protocols = [self.wm_delete_window];
            (self.xlib.XSetWMProtocols)(self.display, window, protocols.as_mut_ptr(), 1);
            (self.xlib.XStoreName)(self.display, window, c"piglit".as_ptr() as *mut c_char);
            Ok(XlibWindow { window, colormap })
        }
    }

    pub(crate) fn map_window(&self, window: xlib::Window) {
        unsafe {
            (self.xlib.XMapWindow)(self.display, window);
            (self.xlib.XFlush)(self.display);
        }
    }

    /// Destroys the window, then frees its colormap.
    pub(crate) fn destroy_window(&self, window: XlibWindow) {
        unsafe {
            (self.xlib.XDestroyWindow)(self.display, window.window);
            (self.xlib.XFreeColormap)(self.display, window.colormap);
            (self.xlib.XFlush)(self.display);
        }
    }

    /// Blocks until an event for `window` arrives that the harness cares about.
    pub(crate) fn next_event(&self, window: xlib::Window) -> WindowEvent {
        unsafe {
            loop {
                let mut event: xlib::XEvent = mem::zeroed();
                (self.xlib.XNextEvent)(self.display, &mut event);
                if event.any.window != window {
                    continue;
                }

                match event.get_type() {
                    xlib::Expose => {
                        // Only the last of a run of expose events matters.
                        if event.expose.count == 0 {
                            return WindowEvent::Expose;
                        }
                    }
                    xlib::ConfigureNotify => {
                        let configure = event.configure;
                        return WindowEvent::Resize(Size2D::new(configure.width, configure.height));
                    }
                    xlib::KeyPress => {
                        let mut key_event = event.key;
                        let mut buffer = [0 as c_char; 8];
                        let mut keysym = 0;
                        let length = (self.xlib.XLookupString)(
                            &mut key_event,
                            buffer.as_mut_ptr(),
                            buffer.len() as c_int,
                            &mut keysym,
                            ptr::null_mut(),
                        );
                        let key = if keysym == keysym::XK_Escape as xlib::KeySym {
                            27
                        } else if length > 0 {
                            buffer[0] as u8
                        } else {
                            continue;
                        };
                        return WindowEvent::Key { key, x: key_event.x, y: key_event.y };
                    }
                    xlib::ClientMessage => {
                        let atom = event.client_message.data.get_long(0) as xlib::Atom;
                        if atom == self.wm_delete_window {
                            return WindowEvent::Close;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Runs `f` with an error handler installed that records the last X error instead of
    /// aborting, and syncs so asynchronous errors arrive before it's removed.
    pub(crate) fn with_error_trap<T, F>(&self, f: F) -> (T, Option<WindowingApiError>)
    where
        F: FnOnce() -> T,
    {
        unsafe {
            LAST_X_ERROR_CODE.with(|code| code.set(0));
            let previous = (self.xlib.XSetErrorHandler)(Some(xlib_error_handler));
            let result = f();
            (self.xlib.XSync)(self.display, xlib::False);
            (self.xlib.XSetErrorHandler)(previous);

            let code = LAST_X_ERROR_CODE.with(|code| code.get());
            let error = if code == 0 { None } else { Some(self.error_code_to_windowing_api_error(code)) };
            (result, error)
        }
    }

    fn error_code_to_windowing_api_error(&self, code: u8) -> WindowingApiError {
        unsafe {
            let mut error_text = [0 as c_char; 256];
            (self.xlib.XGetErrorText)(
                self.display,
                code as c_int,
                error_text.as_mut_ptr(),
                error_text.len() as c_int - 1,
            );
            let text = std::ffi::CStr::from_ptr(error_text.as_ptr()).to_string_lossy();
            debug!("X error {}: {}", code, text);
            if text.starts_with("GLXBadFBConfig") {
                return WindowingApiError::BadPixelFormat;
            }
        }
        match code {
            xlib::BadAlloc => WindowingApiError::BadAlloc,
            xlib::BadMatch => WindowingApiError::BadMatch,
            xlib::BadValue => WindowingApiError::BadValue,
            xlib::BadWindow => WindowingApiError::BadWindow,
            xlib::BadDrawable => WindowingApiError::BadDrawable,
            _ => WindowingApiError::Failed,
        }
    }
}

unsafe extern "C" fn xlib_error_handler(_: *mut Display, event: *mut XErrorEvent) -> c_int {
    LAST_X_ERROR_CODE.with(|error_code| error_code.set((*event).error_code));
    0
}
