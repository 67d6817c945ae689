// piglit-framework/src/platform/glx/mod.rs
//
//! GLX on Xlib.
//!
//! Contexts are always created through `glXCreateContextAttribsARB`, so the exact version,
//! profile and flags of a flavor can be asked for.

use super::unix::x11::{XlibDisplay, XlibWindow};
use super::{ClientApi, ConfigRequest, Platform, PlatformKind, Profile, WindowEvent};
use crate::dispatch::ProcLoader;
use crate::glx;
use crate::glx::types::{GLXContext, GLXFBConfig};
use crate::glx::Glx;
use crate::info::{is_extension_in_string, DispatchApi};
use crate::platform::egl::device::LibraryWrapper;
use crate::{Error, WindowingApiError};

use euclid::default::Size2D;
use std::ffi::{CStr, CString};
use std::mem;
use std::os::raw::{c_int, c_void};
use std::ptr;
use std::rc::Rc;
use std::sync::LazyLock;
use x11_dl::xlib;

static GLX_LIBRARY: LazyLock<LibraryWrapper> =
    LazyLock::new(|| LibraryWrapper::open(&[c"libGL.so.1", c"libGL.so"]));

type GetProcAddressFn = unsafe extern "C" fn(name: *const u8) -> *const c_void;

static GET_PROC_ADDRESS: LazyLock<Option<GetProcAddressFn>> = LazyLock::new(|| {
    let symbol = GLX_LIBRARY.symbol("glXGetProcAddressARB");
    if symbol.is_null() {
        None
    } else {
        Some(unsafe { mem::transmute::<*const c_void, GetProcAddressFn>(symbol) })
    }
});

fn glx_get_proc_address(symbol_name: &str) -> *const c_void {
    let get_proc_address = match *GET_PROC_ADDRESS {
        Some(get_proc_address) => get_proc_address,
        None => return ptr::null(),
    };
    let symbol_name = match CString::new(symbol_name) {
        Ok(symbol_name) => symbol_name,
        Err(_) => return ptr::null(),
    };
    unsafe { get_proc_address(symbol_name.as_ptr() as *const u8) }
}

/// An Xlib display with GLX loaded on it.
pub struct GlxPlatform {
    glx: Glx,
    extensions: String,
    xlib_display: XlibDisplay,
}

pub struct GlxConfig {
    fb_config: GLXFBConfig,
    visual_id: xlib::VisualID,
}

pub struct GlxPlatformContext {
    glx_context: GLXContext,
}

pub struct GlxDrawable {
    xlib_window: XlibWindow,
}

impl GlxPlatform {
    pub fn new() -> Result<GlxPlatform, Error> {
        if GET_PROC_ADDRESS.is_none() {
            error!("failed to load libGL");
            return Err(Error::NoGLLibraryFound);
        }
        let xlib_display = XlibDisplay::open()?;
        let glx = Glx::load_with(|symbol_name| {
            let address = GLX_LIBRARY.symbol(symbol_name);
            if !address.is_null() {
                return address;
            }
            glx_get_proc_address(symbol_name)
        });

        let extensions = unsafe {
            let extensions =
                glx.QueryExtensionsString(xlib_display.glx_display(), xlib_display.default_screen());
            if extensions.is_null() {
                String::new()
            } else {
                CStr::from_ptr(extensions).to_string_lossy().into_owned()
            }
        };
        debug!("GLX extensions: {}", extensions);

        Ok(GlxPlatform { glx, extensions, xlib_display })
    }

    #[inline]
    fn has_extension(&self, name: &str) -> bool {
        is_extension_in_string(&self.extensions, name)
    }

    fn fb_config_attr(&self, fb_config: GLXFBConfig, attribute: u32) -> Option<c_int> {
        unsafe {
            let mut value = 0;
            // GLX's `Success` is 0.
            let result = self.glx.GetFBConfigAttrib(
                self.xlib_display.glx_display(),
                fb_config,
                attribute as c_int,
                &mut value,
            );
            if result != 0 {
                None
            } else {
                Some(value)
            }
        }
    }

    fn context_attributes(&self, request: &ConfigRequest) -> Result<Vec<c_int>, Error> {
        let mut attributes = vec![
            glx::CONTEXT_MAJOR_VERSION_ARB as c_int, request.version.major as c_int,
            glx::CONTEXT_MINOR_VERSION_ARB as c_int, request.version.minor as c_int,
        ];

        let profile_mask = match (request.client_api, request.profile) {
            (ClientApi::OpenGL, Some(Profile::Core)) => {
                Some(glx::CONTEXT_CORE_PROFILE_BIT_ARB as c_int)
            }
            (ClientApi::OpenGL, Some(Profile::Compatibility)) => {
                Some(glx::CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB as c_int)
            }
            (ClientApi::OpenGL, None) => None,
            (ClientApi::OpenGLES1, _) => {
                if !self.has_extension("GLX_EXT_create_context_es_profile") {
                    return Err(Error::RequiredExtensionUnavailable(
                        "GLX_EXT_create_context_es_profile",
                    ));
                }
                // Same bit as GLX_CONTEXT_ES_PROFILE_BIT_EXT.
                Some(glx::CONTEXT_ES2_PROFILE_BIT_EXT as c_int)
            }
            (ClientApi::OpenGLES2, _) | (ClientApi::OpenGLES3, _) => {
                if !self.has_extension("GLX_EXT_create_context_es2_profile") {
                    return Err(Error::RequiredExtensionUnavailable(
                        "GLX_EXT_create_context_es2_profile",
                    ));
                }
                Some(glx::CONTEXT_ES2_PROFILE_BIT_EXT as c_int)
            }
        };
        if let Some(profile_mask) = profile_mask {
            if !self.has_extension("GLX_ARB_create_context_profile") {
                return Err(Error::RequiredExtensionUnavailable("GLX_ARB_create_context_profile"));
            }
            attributes.extend_from_slice(&[glx::CONTEXT_PROFILE_MASK_ARB as c_int, profile_mask]);
        }

        let mut flags = 0;
        if request.debug {
            flags |= glx::CONTEXT_DEBUG_BIT_ARB as c_int;
        }
        if request.forward_compatible {
            flags |= glx::CONTEXT_FORWARD_COMPATIBLE_BIT_ARB as c_int;
        }
        if flags != 0 {
            attributes.extend_from_slice(&[glx::CONTEXT_FLAGS_ARB as c_int, flags]);
        }

        attributes.extend_from_slice(&[glx::NONE as c_int, 0]);
        Ok(attributes)
    }
}

impl XlibDisplay {
    #[inline]
    fn glx_display(&self) -> *mut glx::types::Display {
        self.display as *mut glx::types::Display
    }
}

impl Platform for GlxPlatform {
    type Config = GlxConfig;
    type Context = GlxPlatformContext;
    type Drawable = GlxDrawable;

    #[inline]
    fn kind(&self) -> PlatformKind {
        PlatformKind::Glx
    }

    fn choose_config(&mut self, request: &ConfigRequest) -> Result<GlxConfig, Error> {
        let accum_size = if request.accum { 1 } else { 0 };
        // Left out, GLX_DOUBLEBUFFER is "don't care" and may hand back a double-buffered config.
        let double_buffered = if request.double_buffered { xlib::True } else { xlib::False };
        let mut attributes = vec![
            glx::X_RENDERABLE as c_int,     xlib::True,
            glx::RENDER_TYPE as c_int,      glx::RGBA_BIT as c_int,
            glx::DRAWABLE_TYPE as c_int,    glx::WINDOW_BIT as c_int,
            glx::RED_SIZE as c_int,         request.red_size,
            glx::GREEN_SIZE as c_int,       request.green_size,
            glx::BLUE_SIZE as c_int,        request.blue_size,
            glx::ALPHA_SIZE as c_int,       request.alpha_size,
            glx::DEPTH_SIZE as c_int,       request.depth_size,
            glx::STENCIL_SIZE as c_int,     request.stencil_size,
            glx::ACCUM_RED_SIZE as c_int,   accum_size,
            glx::ACCUM_GREEN_SIZE as c_int, accum_size,
            glx::ACCUM_BLUE_SIZE as c_int,  accum_size,
            glx::ACCUM_ALPHA_SIZE as c_int, accum_size,
            glx::DOUBLEBUFFER as c_int,     double_buffered,
        ];
        if request.samples > 0 {
            attributes.extend_from_slice(&[
                glx::SAMPLE_BUFFERS_ARB as c_int, 1,
                glx::SAMPLES_ARB as c_int,        request.samples as c_int,
            ]);
        }
        attributes.extend_from_slice(&[glx::NONE as c_int, 0]);

        unsafe {
            let mut config_count = 0;
            let configs = self.glx.ChooseFBConfig(
                self.xlib_display.glx_display(),
                self.xlib_display.default_screen(),
                attributes.as_ptr(),
                &mut config_count,
            );
            if configs.is_null() || config_count == 0 {
                if !configs.is_null() {
                    (self.xlib_display.xlib.XFree)(configs as *mut c_void);
                }
                return Err(Error::NoPixelFormatFound);
            }

            // Take the first config with a visual the screen actually has.
            let mut chosen = None;
            for index in 0..config_count as usize {
                let fb_config = *configs.add(index);
                let visual_id = match self.fb_config_attr(fb_config, glx::VISUAL_ID) {
                    Some(visual_id) if visual_id != 0 => visual_id as xlib::VisualID,
                    _ => continue,
                };
                if self.xlib_display.visual_info(visual_id).is_some() {
                    chosen = Some(GlxConfig { fb_config, visual_id });
                    break;
                }
            }
            (self.xlib_display.xlib.XFree)(configs as *mut c_void);
            chosen.ok_or(Error::NoPixelFormatFound)
        }
    }

    fn create_context(
        &mut self,
        config: &GlxConfig,
        request: &ConfigRequest,
    ) -> Result<GlxPlatformContext, Error> {
        if !self.has_extension("GLX_ARB_create_context")
            || !self.glx.CreateContextAttribsARB.is_loaded()
        {
            return Err(Error::RequiredExtensionUnavailable("GLX_ARB_create_context"));
        }
        let attributes = self.context_attributes(request)?;

        let glx = &self.glx;
        let glx_display = self.xlib_display.glx_display();
        let (glx_context, x_error) = self.xlib_display.with_error_trap(|| unsafe {
            glx.CreateContextAttribsARB(
                glx_display,
                config.fb_config,
                ptr::null(),
                xlib::True,
                attributes.as_ptr(),
            )
        });
        if let Some(x_error) = x_error {
            if !glx_context.is_null() {
                unsafe { self.glx.DestroyContext(glx_display, glx_context) };
            }
            return Err(Error::ContextCreationFailed(x_error));
        }
        if glx_context.is_null() {
            return Err(Error::ContextCreationFailed(WindowingApiError::Failed));
        }
        Ok(GlxPlatformContext { glx_context })
    }

    fn create_drawable(&mut self, config: &GlxConfig, size: Size2D<i32>) -> Result<GlxDrawable, Error> {
        let visual_info = self
            .xlib_display
            .visual_info(config.visual_id)
            .ok_or(Error::SurfaceCreationFailed(WindowingApiError::BadMatch))?;
        let xlib_window = self.xlib_display.create_window(&visual_info, size)?;
        Ok(GlxDrawable { xlib_window })
    }

    fn make_current(
        &mut self,
        context: &GlxPlatformContext,
        drawable: &GlxDrawable,
    ) -> Result<(), Error> {
        let glx = &self.glx;
        let glx_display = self.xlib_display.glx_display();
        let (ok, x_error) = self.xlib_display.with_error_trap(|| unsafe {
            let window = drawable.xlib_window.window;
            glx.MakeCurrent(glx_display, window, context.glx_context) != xlib::False
        });
        match x_error {
            Some(x_error) => Err(Error::MakeCurrentFailed(x_error)),
            None if !ok => Err(Error::MakeCurrentFailed(WindowingApiError::Failed)),
            None => Ok(()),
        }
    }

    fn swap_buffers(&mut self, drawable: &GlxDrawable) -> Result<(), Error> {
        unsafe {
            self.glx.SwapBuffers(self.xlib_display.glx_display(), drawable.xlib_window.window);
        }
        Ok(())
    }

    fn destroy_drawable(&mut self, drawable: GlxDrawable) {
        self.xlib_display.destroy_window(drawable.xlib_window);
    }

    fn destroy_context(&mut self, context: GlxPlatformContext) {
        unsafe {
            let glx_display = self.xlib_display.glx_display();
            if self.glx.GetCurrentContext() == context.glx_context {
                self.glx.MakeCurrent(glx_display, 0, ptr::null());
            }
            self.glx.DestroyContext(glx_display, context.glx_context);
        }
    }

    fn destroy_config(&mut self, _: GlxConfig) {
        // FB configs belong to the display.
    }

    fn proc_loader(&self, _: DispatchApi) -> Rc<dyn ProcLoader> {
        Rc::new(GlxProcLoader)
    }

    fn show_window(&mut self, drawable: &GlxDrawable) -> Result<(), Error> {
        self.xlib_display.map_window(drawable.xlib_window.window);
        Ok(())
    }

    fn next_event(&mut self, drawable: &GlxDrawable) -> Option<WindowEvent> {
        Some(self.xlib_display.next_event(drawable.xlib_window.window))
    }
}

/// Resolves every entry point through `glXGetProcAddressARB`, falling back to `libGL`'s exports.
struct GlxProcLoader;

impl ProcLoader for GlxProcLoader {
    fn get_core_proc(&self, name: &str, _: u32) -> *const c_void {
        let address = GLX_LIBRARY.symbol(name);
        if !address.is_null() {
            return address;
        }
        glx_get_proc_address(name)
    }

    fn get_ext_proc(&self, name: &str) -> *const c_void {
        glx_get_proc_address(name)
    }
}
