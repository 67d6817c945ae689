// piglit-framework/src/platform/mod.rs
//
//! Window-system platforms.
//!
//! A platform owns the connection to the window system and hands out configs, contexts and
//! drawables. Negotiation is written once against the `Platform` trait; the concrete platforms
//! are GLX, EGL on X11, Wayland and GBM, and a `winit` toolkit window.

use crate::config::{Visual, WindowConfig};
use crate::dispatch::ProcLoader;
use crate::flavor::ContextFlavor;
use crate::info::{DispatchApi, GLApi, GLVersion};
use crate::result::TestResult;
use crate::Error;

use euclid::default::Size2D;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

#[cfg(linux)]
pub mod egl;
#[cfg(x11)]
pub mod glx;
#[cfg(linux)]
pub mod unix;
#[cfg(toolkit)]
pub mod toolkit;

/// Which window system a process talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    Glx,
    X11Egl,
    Wayland,
    Gbm,
    /// A `winit` window on whatever display server `winit` picks.
    Winit,
}

impl PlatformKind {
    /// The value `PIGLIT_PLATFORM` uses for this platform.
    pub fn name(self) -> &'static str {
        match self {
            PlatformKind::Glx => "glx",
            PlatformKind::X11Egl => "x11_egl",
            PlatformKind::Wayland => "wayland",
            PlatformKind::Gbm => "gbm",
            PlatformKind::Winit => "winit",
        }
    }
}

impl Display for PlatformKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Picks a platform from the value of `PIGLIT_PLATFORM`.
///
/// When the variable is unset, ES flavors go to EGL on X11 and desktop flavors go to GLX.
pub fn choose_platform(
    env_value: Option<&str>,
    flavor: &ContextFlavor,
) -> Result<PlatformKind, Error> {
    match env_value {
        None => {
            if flavor.api().is_es() {
                Ok(PlatformKind::X11Egl)
            } else {
                Ok(PlatformKind::Glx)
            }
        }
        Some("glx") => Ok(PlatformKind::Glx),
        Some("x11_egl") => Ok(PlatformKind::X11Egl),
        Some("wayland") => Ok(PlatformKind::Wayland),
        Some("gbm") => Ok(PlatformKind::Gbm),
        Some("winit") => Ok(PlatformKind::Winit),
        Some(other) => {
            error!("environment var PIGLIT_PLATFORM has bad value \"{}\"", other);
            Err(Error::BadPlatformSelection(other.to_owned()))
        }
    }
}

/// The client API a context is created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientApi {
    OpenGL,
    OpenGLES1,
    OpenGLES2,
    OpenGLES3,
}

/// The desktop profile a context is created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Core,
    Compatibility,
}

/// Everything a platform needs to choose a config and create a context for one flavor.
///
/// Channel sizes are minimums; zero means "don't care".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfigRequest {
    pub api: GLApi,
    pub client_api: ClientApi,
    pub version: GLVersion,
    pub profile: Option<Profile>,
    pub forward_compatible: bool,
    pub debug: bool,
    pub red_size: i32,
    pub green_size: i32,
    pub blue_size: i32,
    pub alpha_size: i32,
    pub depth_size: i32,
    pub stencil_size: i32,
    pub double_buffered: bool,
    pub accum: bool,
    pub samples: u32,
}

impl ConfigRequest {
    /// Translates a flavor and the test's window description into a request.
    ///
    /// Without `use_window_attribs` the visual and sample count are left out, which is what
    /// an off-screen run wants. Profiles only exist from 3.2 on, and only core flavors ask for
    /// the core profile.
    pub fn new(
        flavor: &ContextFlavor,
        window: &WindowConfig,
        use_window_attribs: bool,
    ) -> ConfigRequest {
        let version = flavor.version();
        let (client_api, profile) = match flavor.api() {
            GLApi::Core => {
                assert!(version >= 31);
                let profile = if version >= 32 { Some(Profile::Core) } else { None };
                (ClientApi::OpenGL, profile)
            }
            GLApi::Compatibility => {
                let profile = if version >= 32 { Some(Profile::Compatibility) } else { None };
                (ClientApi::OpenGL, profile)
            }
            GLApi::Es1 => (ClientApi::OpenGLES1, None),
            GLApi::Es2 if version >= 30 => (ClientApi::OpenGLES3, None),
            GLApi::Es2 => (ClientApi::OpenGLES2, None),
        };

        let (visual, samples) = if use_window_attribs {
            (window.visual, window.samples)
        } else {
            (Visual::empty(), 0)
        };
        let color = if visual.intersects(Visual::RGB | Visual::RGBA) { 1 } else { 0 };

        ConfigRequest {
            api: flavor.api(),
            client_api,
            version: GLVersion::from_10x(version),
            profile,
            forward_compatible: flavor.is_forward_compatible(),
            debug: flavor.is_debug(),
            red_size: color,
            green_size: color,
            blue_size: color,
            alpha_size: if visual.contains(Visual::RGBA) { 1 } else { 0 },
            depth_size: if visual.contains(Visual::DEPTH) { 1 } else { 0 },
            stencil_size: if visual.contains(Visual::STENCIL) { 1 } else { 0 },
            double_buffered: visual.contains(Visual::DOUBLE),
            accum: visual.contains(Visual::ACCUM),
            samples: if samples > 1 { samples } else { 0 },
        }
    }
}

/// Something that happened to the test window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowEvent {
    /// The window needs to be redrawn.
    Expose,
    /// The window changed size.
    Resize(Size2D<i32>),
    /// A key was pressed at the given pointer position.
    Key { key: u8, x: i32, y: i32 },
    /// The window manager asked the window to close.
    Close,
}

/// A buffer exported as a DMA-BUF file descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DmaBuf {
    pub fd: i32,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub offset: u32,
    /// DRM fourcc code of the pixel format.
    pub fourcc: u32,
    /// Platform handle used to release the buffer.
    pub(crate) handle: usize,
}

/// A connection to a window system that can produce GL contexts.
///
/// Acquisition goes config, context, drawable; teardown goes the other way.
pub trait Platform {
    type Config;
    type Context;
    type Drawable;

    fn kind(&self) -> PlatformKind;

    /// Chooses a framebuffer configuration for the request.
    fn choose_config(&mut self, request: &ConfigRequest) -> Result<Self::Config, Error>;

    /// Creates a context with the request's API, version, profile and flags.
    fn create_context(
        &mut self,
        config: &Self::Config,
        request: &ConfigRequest,
    ) -> Result<Self::Context, Error>;

    /// Creates the window (or window stand-in) rendering goes to. It isn't shown yet.
    fn create_drawable(
        &mut self,
        config: &Self::Config,
        size: Size2D<i32>,
    ) -> Result<Self::Drawable, Error>;

    fn make_current(
        &mut self,
        context: &Self::Context,
        drawable: &Self::Drawable,
    ) -> Result<(), Error>;

    fn swap_buffers(&mut self, drawable: &Self::Drawable) -> Result<(), Error>;

    fn destroy_drawable(&mut self, drawable: Self::Drawable);
    fn destroy_context(&mut self, context: Self::Context);
    fn destroy_config(&mut self, config: Self::Config);

    /// Returns the entry-point loader for the given API family.
    fn proc_loader(&self, api: DispatchApi) -> Rc<dyn ProcLoader>;

    /// Maps the drawable on screen.
    fn show_window(&mut self, _: &Self::Drawable) -> Result<(), Error> {
        Ok(())
    }

    /// Waits for the next window event.
    ///
    /// Platforms that have no event source return `None` right away; the event loop treats
    /// that as "draw once and finish".
    fn next_event(&mut self, _: &Self::Drawable) -> Option<WindowEvent> {
        None
    }

    /// Allocates a buffer, fills it from `data` and exports it as a DMA-BUF.
    ///
    /// Platforms without buffer export answer `Skip`.
    fn create_dma_buf(
        &mut self,
        _width: u32,
        _height: u32,
        _fourcc: u32,
        _data: &[u8],
        _stride: u32,
    ) -> Result<DmaBuf, TestResult> {
        Err(TestResult::Skip)
    }

    fn destroy_dma_buf(&mut self, _: DmaBuf) {}
}

/// The single window-system connection a process uses.
pub enum Connection {
    #[cfg(x11)]
    Glx(glx::GlxPlatform),
    #[cfg(linux)]
    Egl(egl::EglPlatform),
    #[cfg(toolkit)]
    Toolkit(toolkit::ToolkitPlatform),
}

impl Connection {
    /// Connects to the window system `kind` names.
    pub fn open(kind: PlatformKind) -> Result<Connection, Error> {
        match kind {
            #[cfg(x11)]
            PlatformKind::Glx => Ok(Connection::Glx(glx::GlxPlatform::new()?)),
            #[cfg(x11)]
            PlatformKind::X11Egl => Ok(Connection::Egl(egl::EglPlatform::x11()?)),
            #[cfg(linux)]
            PlatformKind::Wayland => Ok(Connection::Egl(egl::EglPlatform::wayland()?)),
            #[cfg(linux)]
            PlatformKind::Gbm => Ok(Connection::Egl(egl::EglPlatform::gbm()?)),
            #[cfg(toolkit)]
            PlatformKind::Winit => Ok(Connection::Toolkit(toolkit::ToolkitPlatform::new()?)),
            #[allow(unreachable_patterns)]
            _ => {
                error!("platform {} is not available in this build", kind);
                Err(Error::UnsupportedOnThisPlatform)
            }
        }
    }

    pub fn kind(&self) -> PlatformKind {
        match *self {
            #[cfg(x11)]
            Connection::Glx(ref platform) => platform.kind(),
            #[cfg(linux)]
            Connection::Egl(ref platform) => platform.kind(),
            #[cfg(toolkit)]
            Connection::Toolkit(ref platform) => platform.kind(),
        }
    }
}
