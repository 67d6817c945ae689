// piglit-framework/src/platform/egl/mod.rs
//
//! EGL on X11, Wayland and GBM.
//!
//! X11 gets real windows with an event stream. Wayland renders to a pbuffer, since a visible
//! surface would need a shell protocol, and GBM renders to a GBM surface on a DRM node; neither
//! of those has events.

pub(crate) mod device;
pub(crate) mod display;
pub(crate) mod error;
pub(crate) mod ffi;

use self::device::{egl_library_available, EglProcLoader};
use self::display::EglDisplay;
use self::ffi::{EGL_PLATFORM_GBM_KHR, EGL_PLATFORM_WAYLAND_KHR, GBM_FORMAT_ARGB8888};
use self::ffi::GBM_FORMAT_XRGB8888;
use super::unix::gbm::{GbmDevice, GbmSurface};
use super::unix::wayland::WaylandDisplay;
#[cfg(x11)]
use super::unix::x11::{XlibDisplay, XlibWindow};
use super::{ConfigRequest, DmaBuf, Platform, PlatformKind, WindowEvent};
use crate::dispatch::ProcLoader;
use crate::egl;
use crate::egl::types::{EGLConfig, EGLContext, EGLNativeWindowType, EGLSurface, EGLint};
use crate::info::DispatchApi;
use crate::result::TestResult;
use crate::{Error, WindowingApiError};

use euclid::default::Size2D;
use std::os::raw::c_void;
use std::rc::Rc;

enum NativeDisplay {
    #[cfg(x11)]
    X11(XlibDisplay),
    // Only held so the Wayland connection outlives the EGL display.
    #[allow(dead_code)]
    Wayland(WaylandDisplay),
    Gbm(GbmDevice),
}

/// An EGL display on one of the native window systems.
pub struct EglPlatform {
    kind: PlatformKind,
    // Declared before `native`, so EGL lets go of the native display before it closes.
    display: EglDisplay,
    native: NativeDisplay,
}

pub struct EglPlatformConfig {
    egl_config: EGLConfig,
}

pub struct EglPlatformContext {
    egl_context: EGLContext,
}

pub struct EglPlatformDrawable {
    surface: EGLSurface,
    native: NativeDrawable,
}

enum NativeDrawable {
    #[cfg(x11)]
    Window(XlibWindow),
    Pbuffer,
    Gbm(GbmSurface),
}

impl EglPlatform {
    /// EGL on the X server named by `DISPLAY`.
    #[cfg(x11)]
    pub fn x11() -> Result<EglPlatform, Error> {
        use self::ffi::EGL_PLATFORM_X11_KHR;

        let xlib_display = XlibDisplay::open()?;
        let display = EglPlatform::open_display(
            EGL_PLATFORM_X11_KHR,
            xlib_display.display as *mut c_void,
        )?;
        Ok(EglPlatform {
            kind: PlatformKind::X11Egl,
            display,
            native: NativeDisplay::X11(xlib_display),
        })
    }

    /// EGL on the Wayland compositor named by `WAYLAND_DISPLAY`.
    pub fn wayland() -> Result<EglPlatform, Error> {
        let wayland_display = WaylandDisplay::connect()?;
        let display = EglPlatform::open_display(
            EGL_PLATFORM_WAYLAND_KHR,
            wayland_display.display as *mut c_void,
        )?;
        Ok(EglPlatform {
            kind: PlatformKind::Wayland,
            display,
            native: NativeDisplay::Wayland(wayland_display),
        })
    }

    /// EGL on a GBM device.
    pub fn gbm() -> Result<EglPlatform, Error> {
        let gbm_device = GbmDevice::open()?;
        let display =
            EglPlatform::open_display(EGL_PLATFORM_GBM_KHR, gbm_device.device as *mut c_void)?;
        Ok(EglPlatform { kind: PlatformKind::Gbm, display, native: NativeDisplay::Gbm(gbm_device) })
    }

    fn open_display(
        platform: egl::types::EGLenum,
        native_display: *mut c_void,
    ) -> Result<EglDisplay, Error> {
        if !egl_library_available() {
            error!("failed to load libEGL");
            return Err(Error::NoGLLibraryFound);
        }
        unsafe { EglDisplay::from_platform(platform, native_display) }
    }

    fn surface_type(&self) -> EGLint {
        match self.native {
            NativeDisplay::Wayland(_) => egl::PBUFFER_BIT as EGLint,
            _ => egl::WINDOW_BIT as EGLint,
        }
    }

    fn gbm_format(&self, config: EGLConfig) -> u32 {
        self.display.config_attr(config, egl::NATIVE_VISUAL_ID as EGLint) as u32
    }
}

impl Platform for EglPlatform {
    type Config = EglPlatformConfig;
    type Context = EglPlatformContext;
    type Drawable = EglPlatformDrawable;

    #[inline]
    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn choose_config(&mut self, request: &ConfigRequest) -> Result<EglPlatformConfig, Error> {
        let surface_type = self.surface_type();
        let egl_config = match self.native {
            #[cfg(x11)]
            NativeDisplay::X11(ref xlib_display) => {
                self.display.choose_config(request, surface_type, |display, config| {
                    let visual_id = display.config_attr(config, egl::NATIVE_VISUAL_ID as EGLint);
                    visual_id != 0 && xlib_display.visual_info(visual_id as _).is_some()
                })?
            }
            NativeDisplay::Wayland(_) => {
                self.display.choose_config(request, surface_type, |_, _| true)?
            }
            NativeDisplay::Gbm(_) => {
                self.display.choose_config(request, surface_type, |display, config| {
                    let format = display.config_attr(config, egl::NATIVE_VISUAL_ID as EGLint) as u32;
                    format == GBM_FORMAT_XRGB8888
                        || (format == GBM_FORMAT_ARGB8888 && request.alpha_size > 0)
                })?
            }
        };
        Ok(EglPlatformConfig { egl_config })
    }

    fn create_context(
        &mut self,
        config: &EglPlatformConfig,
        request: &ConfigRequest,
    ) -> Result<EglPlatformContext, Error> {
        let egl_context = self.display.create_context(config.egl_config, request)?;
        Ok(EglPlatformContext { egl_context })
    }

    fn create_drawable(
        &mut self,
        config: &EglPlatformConfig,
        size: Size2D<i32>,
    ) -> Result<EglPlatformDrawable, Error> {
        match self.native {
            #[cfg(x11)]
            NativeDisplay::X11(ref xlib_display) => {
                let visual_id =
                    self.display.config_attr(config.egl_config, egl::NATIVE_VISUAL_ID as EGLint);
                let visual_info = xlib_display
                    .visual_info(visual_id as _)
                    .ok_or(Error::SurfaceCreationFailed(WindowingApiError::BadMatch))?;
                let window = xlib_display.create_window(&visual_info, size)?;
                match self
                    .display
                    .create_window_surface(config.egl_config, window.window as usize as EGLNativeWindowType)
                {
                    Ok(surface) => Ok(EglPlatformDrawable { surface, native: NativeDrawable::Window(window) }),
                    Err(err) => {
                        xlib_display.destroy_window(window);
                        Err(err)
                    }
                }
            }
            NativeDisplay::Wayland(_) => {
                let surface = self.display.create_pbuffer_surface(config.egl_config, size)?;
                Ok(EglPlatformDrawable { surface, native: NativeDrawable::Pbuffer })
            }
            NativeDisplay::Gbm(ref gbm_device) => {
                let format = self.gbm_format(config.egl_config);
                let gbm_surface = gbm_device.create_surface(size, format)?;
                match self.display.create_window_surface(
                    config.egl_config,
                    gbm_surface.surface as EGLNativeWindowType,
                ) {
                    Ok(surface) => {
                        Ok(EglPlatformDrawable { surface, native: NativeDrawable::Gbm(gbm_surface) })
                    }
                    Err(err) => {
                        gbm_device.destroy_surface(gbm_surface);
                        Err(err)
                    }
                }
            }
        }
    }

    fn make_current(
        &mut self,
        context: &EglPlatformContext,
        drawable: &EglPlatformDrawable,
    ) -> Result<(), Error> {
        self.display.make_current(drawable.surface, context.egl_context)
    }

    fn swap_buffers(&mut self, drawable: &EglPlatformDrawable) -> Result<(), Error> {
        self.display.swap_buffers(drawable.surface)?;
        if let (NativeDisplay::Gbm(ref gbm_device), NativeDrawable::Gbm(ref gbm_surface)) =
            (&self.native, &drawable.native)
        {
            gbm_device.advance_front_buffer(gbm_surface);
        }
        Ok(())
    }

    fn destroy_drawable(&mut self, drawable: EglPlatformDrawable) {
        self.display.destroy_surface(drawable.surface);
        match (&self.native, drawable.native) {
            #[cfg(x11)]
            (NativeDisplay::X11(ref xlib_display), NativeDrawable::Window(window)) => {
                xlib_display.destroy_window(window);
            }
            (NativeDisplay::Gbm(ref gbm_device), NativeDrawable::Gbm(gbm_surface)) => {
                gbm_device.destroy_surface(gbm_surface);
            }
            _ => {}
        }
    }

    fn destroy_context(&mut self, context: EglPlatformContext) {
        self.display.destroy_context(context.egl_context);
    }

    fn destroy_config(&mut self, _: EglPlatformConfig) {
        // EGL configs belong to the display.
    }

    fn proc_loader(&self, api: DispatchApi) -> Rc<dyn ProcLoader> {
        Rc::new(EglProcLoader::new(api))
    }

    fn show_window(&mut self, drawable: &EglPlatformDrawable) -> Result<(), Error> {
        #[cfg(x11)]
        {
            if let (NativeDisplay::X11(ref xlib_display), NativeDrawable::Window(window)) =
                (&self.native, &drawable.native)
            {
                xlib_display.map_window(window.window);
            }
        }
        let _ = drawable;
        Ok(())
    }

    fn next_event(&mut self, drawable: &EglPlatformDrawable) -> Option<WindowEvent> {
        match (&self.native, &drawable.native) {
            #[cfg(x11)]
            (NativeDisplay::X11(ref xlib_display), NativeDrawable::Window(window)) => {
                Some(xlib_display.next_event(window.window))
            }
            _ => None,
        }
    }

    fn create_dma_buf(
        &mut self,
        width: u32,
        height: u32,
        fourcc: u32,
        data: &[u8],
        stride: u32,
    ) -> Result<DmaBuf, TestResult> {
        match self.native {
            NativeDisplay::Gbm(ref gbm_device) => {
                gbm_device.create_dma_buf(width, height, fourcc, data, stride)
            }
            _ => Err(TestResult::Skip),
        }
    }

    fn destroy_dma_buf(&mut self, buffer: DmaBuf) {
        if let NativeDisplay::Gbm(ref gbm_device) = self.native {
            gbm_device.destroy_dma_buf(buffer);
        }
    }
}
