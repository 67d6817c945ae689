// piglit-framework/src/config.rs
//
//! The declarative description a test hands to the harness.

use crate::framework::TestEnv;
use crate::result::TestResult;

use euclid::default::Size2D;

bitflags! {
    /// Framebuffer attributes a test wants on its window.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Visual: u8 {
        /// Red, green and blue channels.
        const RGB     = 0x01;
        /// Red, green, blue and alpha channels.
        const RGBA    = 0x02;
        /// A back buffer.
        const DOUBLE  = 0x04;
        /// An accumulation buffer.
        const ACCUM   = 0x08;
        /// A depth buffer.
        const DEPTH   = 0x10;
        /// A stencil buffer.
        const STENCIL = 0x20;
    }
}

/// Runs once after a context is current. An `Err` ends the test with that result.
pub type InitFunc = Box<dyn FnMut(&mut TestEnv<'_>, &[String]) -> Result<(), TestResult>>;
/// Draws one frame and returns its verdict.
pub type DisplayFunc = Box<dyn FnMut(&mut TestEnv<'_>) -> TestResult>;
/// Receives the new window width and height.
pub type ReshapeFunc = Box<dyn FnMut(&mut TestEnv<'_>, i32, i32)>;
/// Receives a key and the pointer position.
pub type KeyboardFunc = Box<dyn FnMut(&mut TestEnv<'_>, u8, i32, i32)>;

/// Default window edge length in pixels.
pub const DEFAULT_WINDOW_SIZE: i32 = 160;

/// Everything a test declares about itself before the harness runs it.
///
/// Versions are `major * 10 + minor`; zero means the API isn't supported.
pub struct TestConfig {
    pub supports_gl_core_version: u32,
    pub supports_gl_compat_version: u32,
    pub supports_gl_es_version: u32,
    pub require_debug_context: bool,
    pub require_forward_compatible_context: bool,
    pub window_size: Size2D<i32>,
    pub window_visual: Visual,
    pub window_samples: u32,
    /// The test only makes sense on a visible window; never run it off-screen.
    pub requires_displayed_window: bool,
    /// Names accepted by `-subtest` and printed by `-list-subtests`.
    pub subtests: Vec<String>,
    pub init: Option<InitFunc>,
    pub display: Option<DisplayFunc>,
    pub reshape: Option<ReshapeFunc>,
    pub keyboard: Option<KeyboardFunc>,
}

impl Default for TestConfig {
    fn default() -> TestConfig {
        TestConfig {
            supports_gl_core_version: 0,
            supports_gl_compat_version: 0,
            supports_gl_es_version: 0,
            require_debug_context: false,
            require_forward_compatible_context: false,
            window_size: Size2D::new(DEFAULT_WINDOW_SIZE, DEFAULT_WINDOW_SIZE),
            window_visual: Visual::RGB,
            window_samples: 1,
            requires_displayed_window: false,
            subtests: vec![],
            init: None,
            display: None,
            reshape: None,
            keyboard: None,
        }
    }
}

impl TestConfig {
    /// Returns the callbacks, leaving `None` behind.
    pub(crate) fn take_callbacks(&mut self) -> Callbacks {
        Callbacks {
            init: self.init.take(),
            display: self.display.take(),
            reshape: self.reshape.take(),
            keyboard: self.keyboard.take(),
        }
    }

    /// The declarative part of the configuration, without callbacks.
    pub(crate) fn window(&self) -> WindowConfig {
        WindowConfig {
            size: self.window_size,
            visual: self.window_visual,
            samples: self.window_samples,
            requires_displayed_window: self.requires_displayed_window,
        }
    }
}

/// The window part of a `TestConfig`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowConfig {
    pub size: Size2D<i32>,
    pub visual: Visual,
    pub samples: u32,
    pub requires_displayed_window: bool,
}

pub(crate) struct Callbacks {
    pub(crate) init: Option<InitFunc>,
    pub(crate) display: Option<DisplayFunc>,
    pub(crate) reshape: Option<ReshapeFunc>,
    pub(crate) keyboard: Option<KeyboardFunc>,
}
