// piglit-framework/src/platform/toolkit.rs
//
//! A `winit` window with an EGL context on it.
//!
//! `winit` decides between X11 and Wayland; the EGL display is opened on whichever display
//! server its event loop connected to. Events are pumped one batch at a time so the harness
//! keeps control of the loop.

use super::egl::device::{egl_library_available, EglProcLoader};
use super::egl::display::EglDisplay;
use super::egl::ffi::{EGL_PLATFORM_WAYLAND_KHR, EGL_PLATFORM_X11_KHR};
use super::{ConfigRequest, Platform, PlatformKind, WindowEvent};
use crate::dispatch::ProcLoader;
use crate::egl;
use crate::egl::types::{EGLConfig, EGLContext, EGLNativeWindowType, EGLSurface, EGLint};
use crate::info::DispatchApi;
use crate::Error;

use euclid::default::Size2D;
use rwh_06::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use std::collections::VecDeque;
use std::os::raw::c_void;
use std::rc::Rc;
use wayland_sys::client::wl_proxy;
use wayland_sys::egl::{wl_egl_window, wayland_egl_handle};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent as WinitWindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::platform::x11::WindowBuilderExtX11;
use winit::window::{Window, WindowBuilder};

#[derive(Clone, Copy, PartialEq)]
enum DisplayServer {
    X11,
    Wayland,
}

/// The process-wide `winit` event loop and the EGL display on the same server.
pub struct ToolkitPlatform {
    // Terminated before the event loop closes the connection underneath it.
    display: EglDisplay,
    display_server: DisplayServer,
    event_loop: EventLoop<()>,
    pending_events: VecDeque<WindowEvent>,
    cursor_position: (i32, i32),
}

pub struct ToolkitConfig {
    egl_config: EGLConfig,
}

pub struct ToolkitContext {
    egl_context: EGLContext,
}

pub struct ToolkitWindow {
    surface: EGLSurface,
    egl_window: Option<*mut wl_egl_window>,
    window: Window,
}

impl ToolkitPlatform {
    pub fn new() -> Result<ToolkitPlatform, Error> {
        if !egl_library_available() {
            error!("failed to load libEGL");
            return Err(Error::NoGLLibraryFound);
        }

        let event_loop = EventLoop::new().map_err(|err| {
            error!("failed to create the winit event loop: {}", err);
            Error::ConnectionFailed
        })?;

        let display_handle = event_loop.display_handle().map_err(|err| {
            error!("winit event loop has no display handle: {}", err);
            Error::ConnectionFailed
        })?;
        let (display_server, platform, native_display) = match display_handle.as_raw() {
            RawDisplayHandle::Xlib(handle) => match handle.display {
                Some(display) => (DisplayServer::X11, EGL_PLATFORM_X11_KHR, display.as_ptr()),
                None => return Err(Error::ConnectionFailed),
            },
            RawDisplayHandle::Wayland(handle) => {
                (DisplayServer::Wayland, EGL_PLATFORM_WAYLAND_KHR, handle.display.as_ptr())
            }
            _ => {
                error!("winit connected to a display server EGL can't use");
                return Err(Error::UnsupportedOnThisPlatform);
            }
        };

        let display = unsafe { EglDisplay::from_platform(platform, native_display)? };
        Ok(ToolkitPlatform {
            display,
            display_server,
            event_loop,
            pending_events: VecDeque::new(),
            cursor_position: (0, 0),
        })
    }

    fn native_visual_id(&self, config: EGLConfig) -> EGLint {
        self.display.config_attr(config, egl::NATIVE_VISUAL_ID as EGLint)
    }
}

impl Platform for ToolkitPlatform {
    type Config = ToolkitConfig;
    type Context = ToolkitContext;
    type Drawable = ToolkitWindow;

    #[inline]
    fn kind(&self) -> PlatformKind {
        PlatformKind::Winit
    }

    fn choose_config(&mut self, request: &ConfigRequest) -> Result<ToolkitConfig, Error> {
        let display_server = self.display_server;
        let egl_config =
            self.display.choose_config(request, egl::WINDOW_BIT as EGLint, |display, config| {
                display_server == DisplayServer::Wayland
                    || display.config_attr(config, egl::NATIVE_VISUAL_ID as EGLint) != 0
            })?;
        Ok(ToolkitConfig { egl_config })
    }

    fn create_context(
        &mut self,
        config: &ToolkitConfig,
        request: &ConfigRequest,
    ) -> Result<ToolkitContext, Error> {
        let egl_context = self.display.create_context(config.egl_config, request)?;
        Ok(ToolkitContext { egl_context })
    }

    fn create_drawable(
        &mut self,
        config: &ToolkitConfig,
        size: Size2D<i32>,
    ) -> Result<ToolkitWindow, Error> {
        let mut builder = WindowBuilder::new()
            .with_title("piglit")
            .with_visible(false)
            .with_inner_size(PhysicalSize::new(size.width, size.height));
        if self.display_server == DisplayServer::X11 {
            builder = builder.with_x11_visual(self.native_visual_id(config.egl_config) as _);
        }
        let window = builder.build(&self.event_loop).map_err(|err| {
            error!("failed to create a winit window: {}", err);
            Error::SurfaceCreationFailed(crate::WindowingApiError::BadWindow)
        })?;

        let window_handle = window.window_handle().map_err(|err| {
            error!("winit window has no window handle: {}", err);
            Error::SurfaceCreationFailed(crate::WindowingApiError::BadNativeWindow)
        })?;
        let (native_window, egl_window) = match window_handle.as_raw() {
            RawWindowHandle::Xlib(handle) => (handle.window as usize as EGLNativeWindowType, None),
            RawWindowHandle::Wayland(handle) => unsafe {
                let egl_window = (wayland_egl_handle().wl_egl_window_create)(
                    handle.surface.as_ptr() as *mut wl_proxy,
                    size.width,
                    size.height,
                );
                if egl_window.is_null() {
                    return Err(Error::SurfaceCreationFailed(crate::WindowingApiError::BadAlloc));
                }
                (egl_window as *const c_void, Some(egl_window))
            },
            _ => {
                return Err(Error::SurfaceCreationFailed(
                    crate::WindowingApiError::BadNativeWindow,
                ))
            }
        };

        match self.display.create_window_surface(config.egl_config, native_window) {
            Ok(surface) => Ok(ToolkitWindow { surface, egl_window, window }),
            Err(err) => {
                if let Some(egl_window) = egl_window {
                    unsafe { (wayland_egl_handle().wl_egl_window_destroy)(egl_window) };
                }
                Err(err)
            }
        }
    }

    fn make_current(&mut self, context: &ToolkitContext, drawable: &ToolkitWindow) -> Result<(), Error> {
        self.display.make_current(drawable.surface, context.egl_context)
    }

    fn swap_buffers(&mut self, drawable: &ToolkitWindow) -> Result<(), Error> {
        drawable.window.pre_present_notify();
        self.display.swap_buffers(drawable.surface)
    }

    fn destroy_drawable(&mut self, drawable: ToolkitWindow) {
        self.display.destroy_surface(drawable.surface);
        if let Some(egl_window) = drawable.egl_window {
            unsafe { (wayland_egl_handle().wl_egl_window_destroy)(egl_window) };
        }
        drop(drawable.window);
    }

    fn destroy_context(&mut self, context: ToolkitContext) {
        self.display.destroy_context(context.egl_context);
    }

    fn destroy_config(&mut self, _: ToolkitConfig) {}

    fn proc_loader(&self, api: DispatchApi) -> Rc<dyn ProcLoader> {
        Rc::new(EglProcLoader::new(api))
    }

    fn show_window(&mut self, drawable: &ToolkitWindow) -> Result<(), Error> {
        drawable.window.set_visible(true);
        drawable.window.request_redraw();
        Ok(())
    }

    fn next_event(&mut self, drawable: &ToolkitWindow) -> Option<WindowEvent> {
        let window_id = drawable.window.id();
        let egl_window = drawable.egl_window;
        loop {
            if let Some(event) = self.pending_events.pop_front() {
                return Some(event);
            }

            let pending_events = &mut self.pending_events;
            let cursor_position = &mut self.cursor_position;
            let status = self.event_loop.pump_events(None, |event, target| {
                target.set_control_flow(ControlFlow::Wait);
                let event = match event {
                    Event::WindowEvent { window_id: id, event } if id == window_id => event,
                    _ => return,
                };
                match event {
                    WinitWindowEvent::RedrawRequested => {
                        pending_events.push_back(WindowEvent::Expose)
                    }
                    WinitWindowEvent::Resized(size) => {
                        if let Some(egl_window) = egl_window {
                            unsafe {
                                (wayland_egl_handle().wl_egl_window_resize)(
                                    egl_window,
                                    size.width as i32,
                                    size.height as i32,
                                    0,
                                    0,
                                )
                            };
                        }
                        pending_events.push_back(WindowEvent::Resize(Size2D::new(
                            size.width as i32,
                            size.height as i32,
                        )));
                    }
                    WinitWindowEvent::CursorMoved { position, .. } => {
                        *cursor_position = (position.x as i32, position.y as i32);
                    }
                    WinitWindowEvent::KeyboardInput {
                        event: KeyEvent { state: ElementState::Pressed, logical_key, .. },
                        ..
                    } => {
                        let key = match logical_key {
                            Key::Named(NamedKey::Escape) => Some(27),
                            Key::Character(ref string) => string.as_bytes().first().copied(),
                            _ => None,
                        };
                        if let Some(key) = key {
                            let (x, y) = *cursor_position;
                            pending_events.push_back(WindowEvent::Key { key, x, y });
                        }
                    }
                    WinitWindowEvent::CloseRequested => pending_events.push_back(WindowEvent::Close),
                    _ => {}
                }
            });

            if let PumpStatus::Exit(_) = status {
                return Some(WindowEvent::Close);
            }
        }
    }
}
