// piglit-framework/src/error.rs
//
//! Various errors that methods can produce.

use crate::platform::PlatformKind;

use std::fmt::{self, Display, Formatter};

/// Various errors that methods can produce.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The method failed for a miscellaneous reason.
    Failed,
    /// The test declared a context flavor that can never be satisfied.
    ///
    /// Carries the human-readable name of the offending flavor.
    InvalidFlavor(String),
    /// The test declared support for no context flavor at all.
    NoFlavorDeclared,
    /// A harness command-line argument was missing or malformed.
    BadArgument(String),
    /// `PIGLIT_PLATFORM` named a platform that doesn't exist.
    BadPlatformSelection(String),
    /// `PIGLIT_FORCE_WINDOW` held something other than `0` or `1`.
    BadForceWindow(String),
    /// A second platform was requested after the process already opened one.
    PlatformMismatch {
        /// The platform the process is bound to.
        current: PlatformKind,
        /// The platform that was asked for afterwards.
        requested: PlatformKind,
    },
    /// The selected platform isn't compiled in or can't exist on this system.
    UnsupportedOnThisPlatform,
    /// A connection to the display server could not be opened.
    ConnectionFailed,
    /// The rendering device couldn't be opened.
    DeviceOpenFailed,
    /// The system OpenGL or EGL library couldn't be located.
    NoGLLibraryFound,
    /// A window-system extension necessary for the request isn't supported.
    RequiredExtensionUnavailable(&'static str),
    /// The window system can't create contexts for the requested client API.
    UnsupportedGLType,
    /// The context came back with a lower version than the one requested.
    UnsupportedGLVersion {
        /// Requested version, `major * 10 + minor`.
        requested: u32,
        /// Version the context reports, `major * 10 + minor`.
        actual: u32,
    },
    /// The context came back with a different profile than the one requested.
    UnsupportedGLProfile,
    /// The window system can't provide the named framebuffer attribute.
    UnsupportedVisual(&'static str),
    /// Choosing a framebuffer configuration failed.
    PixelFormatSelectionFailed(WindowingApiError),
    /// No framebuffer configuration matched the request.
    NoPixelFormatFound,
    /// The system couldn't create an OpenGL context.
    ContextCreationFailed(WindowingApiError),
    /// The system couldn't create a window or other drawable.
    SurfaceCreationFailed(WindowingApiError),
    /// The system couldn't make the context current.
    MakeCurrentFailed(WindowingApiError),
    /// The system couldn't present the drawable.
    PresentFailed(WindowingApiError),
    /// Looking up an OpenGL function address failed.
    GLFunctionNotFound(String),
    /// The off-screen framebuffer object isn't complete.
    FramebufferIncomplete(u32),
    /// GL entry points were requested before a context was made current.
    DispatchNotInitialized,
}

impl Error {
    /// Returns true if the error must fail the whole run instead of moving on to the next
    /// context flavor.
    ///
    /// Configuration errors and unexpected platform failures are fatal. Errors that only say the
    /// environment can't satisfy one flavor are not.
    pub fn is_fatal(&self) -> bool {
        match *self {
            Error::InvalidFlavor(_)
            | Error::NoFlavorDeclared
            | Error::BadArgument(_)
            | Error::BadPlatformSelection(_)
            | Error::BadForceWindow(_)
            | Error::PlatformMismatch { .. }
            | Error::UnsupportedOnThisPlatform
            | Error::ConnectionFailed
            | Error::NoGLLibraryFound
            | Error::MakeCurrentFailed(_)
            | Error::PresentFailed(_)
            | Error::DispatchNotInitialized => true,
            Error::Failed
            | Error::DeviceOpenFailed
            | Error::RequiredExtensionUnavailable(_)
            | Error::UnsupportedGLType
            | Error::UnsupportedGLVersion { .. }
            | Error::UnsupportedGLProfile
            | Error::UnsupportedVisual(_)
            | Error::PixelFormatSelectionFailed(_)
            | Error::NoPixelFormatFound
            | Error::ContextCreationFailed(_)
            | Error::SurfaceCreationFailed(_)
            | Error::GLFunctionNotFound(_)
            | Error::FramebufferIncomplete(_) => false,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            Error::Failed => f.write_str("operation failed"),
            Error::InvalidFlavor(ref name) => write!(f, "invalid context flavor: {}", name),
            Error::NoFlavorDeclared => {
                f.write_str("test declares support for no context flavor")
            }
            Error::BadArgument(ref message) => f.write_str(message),
            Error::BadPlatformSelection(ref value) => {
                write!(f, "environment var PIGLIT_PLATFORM has bad value \"{}\"", value)
            }
            Error::BadForceWindow(ref value) => {
                write!(f, "environment var PIGLIT_FORCE_WINDOW has bad value \"{}\"", value)
            }
            Error::PlatformMismatch { current, requested } => write!(
                f,
                "platform {} requested, but the process is bound to {}",
                requested, current
            ),
            Error::UnsupportedOnThisPlatform => {
                f.write_str("platform is not supported on this system")
            }
            Error::ConnectionFailed => f.write_str("failed to connect to the display server"),
            Error::DeviceOpenFailed => f.write_str("failed to open the rendering device"),
            Error::NoGLLibraryFound => f.write_str("failed to load the GL library"),
            Error::RequiredExtensionUnavailable(name) => {
                write!(f, "required extension {} is unavailable", name)
            }
            Error::UnsupportedGLType => f.write_str("client API is unsupported"),
            Error::UnsupportedGLVersion { requested, actual } => write!(
                f,
                "requested version {}.{}, but actual context version is {}.{}",
                requested / 10,
                requested % 10,
                actual / 10,
                actual % 10
            ),
            Error::UnsupportedGLProfile => f.write_str("context has the wrong profile"),
            Error::UnsupportedVisual(attribute) => {
                write!(f, "window system does not support {}", attribute)
            }
            Error::PixelFormatSelectionFailed(err) => {
                write!(f, "failed to choose a config: {:?}", err)
            }
            Error::NoPixelFormatFound => f.write_str("no matching config"),
            Error::ContextCreationFailed(err) => {
                write!(f, "failed to create a context: {:?}", err)
            }
            Error::SurfaceCreationFailed(err) => {
                write!(f, "failed to create a drawable: {:?}", err)
            }
            Error::MakeCurrentFailed(err) => {
                write!(f, "failed to make the context current: {:?}", err)
            }
            Error::PresentFailed(err) => write!(f, "failed to swap buffers: {:?}", err),
            Error::GLFunctionNotFound(ref name) => write!(f, "failed to resolve {}", name),
            Error::FramebufferIncomplete(status) => {
                write!(f, "framebuffer is incomplete (status 0x{:04x})", status)
            }
            Error::DispatchNotInitialized => {
                f.write_str("GL function requested before the dispatch table was initialized")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Abstraction of the errors that EGL, GLX and Xlib return.
///
/// They all tend to follow similar patterns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowingApiError {
    /// Miscellaneous error.
    Failed,
    /// EGL: An unrecognized attribute or attribute value was passed in the attribute list.
    /// X11: Attribute to get is bad.
    BadAttribute,
    /// X11: Invalid framebuffer configuration, including an unsupported OpenGL version.
    BadPixelFormat,
    /// EGL: An EGLContext argument does not name a valid EGL rendering context.
    /// X11: The context is invalid.
    BadContext,
    /// Invalid drawable.
    BadDrawable,
    /// EGL: An EGLDisplay argument does not name a valid EGL display connection.
    BadDisplay,
    /// X11: Invalid value.
    BadValue,
    /// EGL: Arguments are inconsistent (for example, a valid context requires
    /// buffers not supplied by a valid surface).
    /// X11: Parameters don't match.
    BadMatch,
    /// X11: Invalid enum value.
    BadEnumeration,
    /// X11: Invalid window.
    BadWindow,
    /// EGL: EGL failed to allocate resources for the requested operation.
    /// X11: The server failed to allocate the resource.
    BadAlloc,
    /// EGL: EGL is not initialized, or could not be initialized, for the
    /// specified EGL display connection.
    NotInitialized,
    /// EGL: EGL cannot access a requested resource (for example a context is
    /// bound in another thread).
    BadAccess,
    /// EGL: The current surface of the calling thread is a window, pixel
    /// buffer or pixmap that is no longer valid.
    BadCurrentSurface,
    /// EGL: An EGLSurface argument does not name a valid surface (window,
    /// pixel buffer or pixmap) configured for GL rendering.
    BadSurface,
    /// EGL: One or more argument values are invalid.
    BadParameter,
    /// EGL: A NativePixmapType argument does not refer to a valid native
    /// pixmap.
    BadNativePixmap,
    /// EGL: A NativeWindowType argument does not refer to a valid native
    /// window.
    BadNativeWindow,
    /// EGL: A power management event has occurred.
    ContextLost,
    /// X11: The GLX extension is unavailable on the server.
    NoExtension,
    /// EGL: The EGL configuration is unsupported.
    BadConfig,
}
