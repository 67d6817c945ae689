// piglit-framework/src/platform/egl/display.rs
//
//! EGL displays, and the configs, contexts and surfaces made from them.

use super::device::EGL_FUNCTIONS;
use super::error::last_egl_error;
use super::ffi::{EGL_CONTEXT_FLAGS_KHR, EGL_CONTEXT_MAJOR_VERSION_KHR};
use super::ffi::{EGL_CONTEXT_MINOR_VERSION_KHR, EGL_CONTEXT_OPENGL_COMPATIBILITY_PROFILE_BIT_KHR};
use super::ffi::{EGL_CONTEXT_OPENGL_CORE_PROFILE_BIT_KHR, EGL_CONTEXT_OPENGL_DEBUG_BIT_KHR};
use super::ffi::{EGL_CONTEXT_OPENGL_FORWARD_COMPATIBLE_BIT_KHR, EGL_CONTEXT_OPENGL_PROFILE_MASK_KHR};
use super::ffi::{EGL_OPENGL_BIT, EGL_OPENGL_ES2_BIT, EGL_OPENGL_ES3_BIT_KHR, EGL_OPENGL_ES_BIT};
use crate::egl;
use crate::egl::types::{EGLAttrib, EGLConfig, EGLContext, EGLDisplay, EGLNativeWindowType};
use crate::egl::types::{EGLSurface, EGLenum, EGLint};
use crate::info::is_extension_in_string;
use crate::platform::{ClientApi, ConfigRequest, Profile};
use crate::Error;

use euclid::default::Size2D;
use std::ffi::CStr;
use std::os::raw::c_void;
use std::ptr;

/// An initialized EGL display. Terminated on drop.
pub(crate) struct EglDisplay {
    pub(crate) egl_display: EGLDisplay,
    version: (EGLint, EGLint),
    extensions: String,
}

impl Drop for EglDisplay {
    fn drop(&mut self) {
        EGL_FUNCTIONS.with(|egl| unsafe {
            egl.MakeCurrent(self.egl_display, egl::NO_SURFACE, egl::NO_SURFACE, egl::NO_CONTEXT);
            egl.Terminate(self.egl_display);
        })
    }
}

impl EglDisplay {
    /// Opens the EGL display for a native display on the given `EGL_PLATFORM_*`.
    pub(crate) unsafe fn from_platform(
        platform: EGLenum,
        native_display: *mut c_void,
    ) -> Result<EglDisplay, Error> {
        EGL_FUNCTIONS.with(|egl| {
            let egl_display = if egl.GetPlatformDisplay.is_loaded() {
                let display_attributes = [egl::NONE as EGLAttrib];
                egl.GetPlatformDisplay(platform, native_display, display_attributes.as_ptr())
            } else if egl.GetPlatformDisplayEXT.is_loaded() {
                let display_attributes = [egl::NONE as EGLint];
                egl.GetPlatformDisplayEXT(platform, native_display, display_attributes.as_ptr())
            } else {
                return Err(Error::RequiredExtensionUnavailable("EGL_EXT_platform_base"));
            };
            if egl_display == egl::NO_DISPLAY {
                return Err(Error::DeviceOpenFailed);
            }

            let (mut major, mut minor) = (0, 0);
            if egl.Initialize(egl_display, &mut major, &mut minor) == egl::FALSE {
                error!("eglInitialize failed: {:?}", last_egl_error());
                return Err(Error::DeviceOpenFailed);
            }

            let extensions = egl.QueryString(egl_display, egl::EXTENSIONS as EGLint);
            let extensions = if extensions.is_null() {
                String::new()
            } else {
                CStr::from_ptr(extensions).to_string_lossy().into_owned()
            };
            debug!("EGL {}.{} display, extensions: {}", major, minor, extensions);

            Ok(EglDisplay { egl_display, version: (major, minor), extensions })
        })
    }

    pub(crate) fn has_extension(&self, name: &str) -> bool {
        is_extension_in_string(&self.extensions, name)
    }

    fn has_create_context(&self) -> bool {
        self.version >= (1, 5) || self.has_extension("EGL_KHR_create_context")
    }

    /// Chooses a config for the request. `accept` can veto configs the native side can't use.
    pub(crate) fn choose_config<F>(
        &self,
        request: &ConfigRequest,
        surface_type: EGLint,
        accept: F,
    ) -> Result<EGLConfig, Error>
    where
        F: Fn(&EglDisplay, EGLConfig) -> bool,
    {
        if request.accum {
            error!("EGL configs never have an accumulation buffer");
            return Err(Error::UnsupportedVisual("accumulation buffer"));
        }

        let renderable_type = match request.client_api {
            ClientApi::OpenGL => EGL_OPENGL_BIT,
            ClientApi::OpenGLES1 => EGL_OPENGL_ES_BIT,
            ClientApi::OpenGLES2 => EGL_OPENGL_ES2_BIT,
            ClientApi::OpenGLES3 if self.has_create_context() => EGL_OPENGL_ES3_BIT_KHR,
            ClientApi::OpenGLES3 => {
                return Err(Error::RequiredExtensionUnavailable("EGL_KHR_create_context"));
            }
        };

        let mut config_attributes = vec![
            egl::RED_SIZE as EGLint,        request.red_size,
            egl::GREEN_SIZE as EGLint,      request.green_size,
            egl::BLUE_SIZE as EGLint,       request.blue_size,
            egl::ALPHA_SIZE as EGLint,      request.alpha_size,
            egl::DEPTH_SIZE as EGLint,      request.depth_size,
            egl::STENCIL_SIZE as EGLint,    request.stencil_size,
            egl::RENDERABLE_TYPE as EGLint, renderable_type,
            egl::SURFACE_TYPE as EGLint,    surface_type,
        ];
        if request.samples > 0 {
            config_attributes.extend_from_slice(&[
                egl::SAMPLE_BUFFERS as EGLint, 1,
                egl::SAMPLES as EGLint,        request.samples as EGLint,
            ]);
        }
        config_attributes.extend_from_slice(&[egl::NONE as EGLint, 0, 0, 0]);

        EGL_FUNCTIONS.with(|egl| unsafe {
            // See how many applicable configs there are.
            let mut config_count = 0;
            let result = egl.ChooseConfig(
                self.egl_display,
                config_attributes.as_ptr(),
                ptr::null_mut(),
                0,
                &mut config_count,
            );
            if result == egl::FALSE {
                return Err(Error::PixelFormatSelectionFailed(last_egl_error()));
            }
            if config_count == 0 {
                return Err(Error::NoPixelFormatFound);
            }

            // Enumerate all those configs.
            let mut configs = vec![ptr::null(); config_count as usize];
            let mut real_config_count = config_count;
            let result = egl.ChooseConfig(
                self.egl_display,
                config_attributes.as_ptr(),
                configs.as_mut_ptr(),
                config_count,
                &mut real_config_count,
            );
            if result == egl::FALSE {
                return Err(Error::PixelFormatSelectionFailed(last_egl_error()));
            }
            configs.truncate(real_config_count as usize);

            configs
                .into_iter()
                .find(|&config| accept(self, config))
                .ok_or(Error::NoPixelFormatFound)
        })
    }

    pub(crate) fn config_attr(&self, config: EGLConfig, attribute: EGLint) -> EGLint {
        EGL_FUNCTIONS.with(|egl| unsafe {
            let mut value = 0;
            egl.GetConfigAttrib(self.egl_display, config, attribute, &mut value);
            value
        })
    }

    /// Creates a context for the request's API, version, profile and flags.
    pub(crate) fn create_context(
        &self,
        config: EGLConfig,
        request: &ConfigRequest,
    ) -> Result<EGLContext, Error> {
        let api = match request.client_api {
            ClientApi::OpenGL => egl::OPENGL_API,
            _ => egl::OPENGL_ES_API,
        };

        let mut flags = 0;
        if request.debug {
            flags |= EGL_CONTEXT_OPENGL_DEBUG_BIT_KHR;
        }
        if request.forward_compatible {
            flags |= EGL_CONTEXT_OPENGL_FORWARD_COMPATIBLE_BIT_KHR;
        }

        let mut context_attributes = vec![];
        if self.has_create_context() {
            context_attributes.extend_from_slice(&[
                EGL_CONTEXT_MAJOR_VERSION_KHR, request.version.major as EGLint,
                EGL_CONTEXT_MINOR_VERSION_KHR, request.version.minor as EGLint,
            ]);
            match request.profile {
                Some(Profile::Core) => context_attributes.extend_from_slice(&[
                    EGL_CONTEXT_OPENGL_PROFILE_MASK_KHR,
                    EGL_CONTEXT_OPENGL_CORE_PROFILE_BIT_KHR,
                ]),
                Some(Profile::Compatibility) => context_attributes.extend_from_slice(&[
                    EGL_CONTEXT_OPENGL_PROFILE_MASK_KHR,
                    EGL_CONTEXT_OPENGL_COMPATIBILITY_PROFILE_BIT_KHR,
                ]),
                None => {}
            }
            if flags != 0 {
                context_attributes.extend_from_slice(&[EGL_CONTEXT_FLAGS_KHR, flags]);
            }
        } else {
            let needs_extension = flags != 0
                || request.profile.is_some()
                || request.client_api == ClientApi::OpenGLES3;
            if needs_extension {
                return Err(Error::RequiredExtensionUnavailable("EGL_KHR_create_context"));
            }
            if request.client_api != ClientApi::OpenGL {
                context_attributes.extend_from_slice(&[
                    egl::CONTEXT_CLIENT_VERSION as EGLint,
                    request.version.major as EGLint,
                ]);
            }
        }
        context_attributes.extend_from_slice(&[egl::NONE as EGLint, 0, 0, 0]);

        EGL_FUNCTIONS.with(|egl| unsafe {
            if egl.BindAPI(api) == egl::FALSE {
                return Err(Error::UnsupportedGLType);
            }
            let egl_context = egl.CreateContext(
                self.egl_display,
                config,
                egl::NO_CONTEXT,
                context_attributes.as_ptr(),
            );
            if egl_context == egl::NO_CONTEXT {
                return Err(Error::ContextCreationFailed(last_egl_error()));
            }
            Ok(egl_context)
        })
    }

    pub(crate) fn create_window_surface(
        &self,
        config: EGLConfig,
        native_window: EGLNativeWindowType,
    ) -> Result<EGLSurface, Error> {
        let surface_attributes = [egl::NONE as EGLint, 0, 0, 0];
        EGL_FUNCTIONS.with(|egl| unsafe {
            let surface = egl.CreateWindowSurface(
                self.egl_display,
                config,
                native_window,
                surface_attributes.as_ptr(),
            );
            if surface == egl::NO_SURFACE {
                return Err(Error::SurfaceCreationFailed(last_egl_error()));
            }
            Ok(surface)
        })
    }

    pub(crate) fn create_pbuffer_surface(
        &self,
        config: EGLConfig,
        size: Size2D<i32>,
    ) -> Result<EGLSurface, Error> {
        let pbuffer_attributes = [
            egl::WIDTH as EGLint,   size.width,
            egl::HEIGHT as EGLint,  size.height,
            egl::NONE as EGLint,    0,
            0,                      0,
        ];
        EGL_FUNCTIONS.with(|egl| unsafe {
            let surface =
                egl.CreatePbufferSurface(self.egl_display, config, pbuffer_attributes.as_ptr());
            if surface == egl::NO_SURFACE {
                return Err(Error::SurfaceCreationFailed(last_egl_error()));
            }
            Ok(surface)
        })
    }

    pub(crate) fn make_current(&self, surface: EGLSurface, context: EGLContext) -> Result<(), Error> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            if egl.MakeCurrent(self.egl_display, surface, surface, context) == egl::FALSE {
                return Err(Error::MakeCurrentFailed(last_egl_error()));
            }
            Ok(())
        })
    }

    pub(crate) fn swap_buffers(&self, surface: EGLSurface) -> Result<(), Error> {
        EGL_FUNCTIONS.with(|egl| unsafe {
            if egl.SwapBuffers(self.egl_display, surface) == egl::FALSE {
                return Err(Error::PresentFailed(last_egl_error()));
            }
            Ok(())
        })
    }

    pub(crate) fn destroy_surface(&self, surface: EGLSurface) {
        EGL_FUNCTIONS.with(|egl| unsafe {
            if egl.GetCurrentSurface(egl::DRAW as EGLint) == surface {
                egl.MakeCurrent(self.egl_display, egl::NO_SURFACE, egl::NO_SURFACE, egl::NO_CONTEXT);
            }
            egl.DestroySurface(self.egl_display, surface);
        })
    }

    pub(crate) fn destroy_context(&self, context: EGLContext) {
        EGL_FUNCTIONS.with(|egl| unsafe {
            if egl.GetCurrentContext() == context {
                egl.MakeCurrent(self.egl_display, egl::NO_SURFACE, egl::NO_SURFACE, egl::NO_CONTEXT);
            }
            egl.DestroyContext(self.egl_display, context);
        })
    }
}
