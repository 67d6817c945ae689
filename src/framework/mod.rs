// piglit-framework/src/framework/mod.rs
//
//! Frameworks: the live backend a test runs on.
//!
//! A framework is created for one negotiated flavor and owns the session on its platform. There
//! are three: the window-system framework, which renders to a window or window stand-in; the
//! FBO framework, which renders off-screen; and the toolkit framework, which drives a `winit`
//! window the way GLUT drove its own.

use crate::args::{force_window_from_env, HarnessOptions};
use crate::config::{Callbacks, KeyboardFunc, ReshapeFunc, WindowConfig};
use crate::dispatch::DispatchTable;
use crate::flavor::ContextFlavor;
use crate::gl_utils::{self, WinsysFbo};
use crate::info::{GLInfo, GLVersion};
use crate::negotiation::Session;
use crate::platform::{DmaBuf, Platform, WindowEvent};
use crate::result::TestResult;
use crate::Error;

use euclid::default::Size2D;
use std::env;

pub mod fbo;
pub mod toolkit;
pub mod winsys;

/// A running backend bound to one negotiated flavor.
pub(crate) trait Framework {
    /// Runs the test's init callback and then its display loop, returning the verdict.
    fn run_test(
        &mut self,
        callbacks: &mut Callbacks,
        options: &HarnessOptions,
        dispatch: &mut DispatchTable,
        args: &[String],
    ) -> TestResult;

    /// Tears the session down: drawable, context, config.
    fn destroy(self: Box<Self>, dispatch: &mut DispatchTable);
}

/// Picks and creates the framework for one flavor.
///
/// `-fbo` asks for the FBO framework, unless the test needs a visible window or the flavor is
/// GL ES 1, which has no framebuffer objects; if the off-screen framebuffer can't be built the
/// window-system framework is used instead. The toolkit framework is used whenever the platform
/// is the `winit` one.
pub(crate) fn create_framework<'p, P>(
    platform: &'p mut P,
    dispatch: &mut DispatchTable,
    flavor: &ContextFlavor,
    options: &HarnessOptions,
    window: &WindowConfig,
    toolkit: bool,
) -> Result<Box<dyn Framework + 'p>, Error>
where
    P: Platform + 'p,
    P::Config: 'p,
    P::Context: 'p,
    P::Drawable: 'p,
{
    if toolkit {
        let framework = toolkit::ToolkitFramework::new(platform, dispatch, flavor, window)?;
        return Ok(Box::new(framework));
    }

    let fbo_usable = !window.requires_displayed_window && flavor.api() != crate::info::GLApi::Es1;
    let platform = if options.use_fbo && fbo_usable {
        match fbo::FboFramework::new(platform, dispatch, flavor, window) {
            Ok(framework) => return Ok(Box::new(framework)),
            Err((err, platform)) => {
                if err.is_fatal() {
                    return Err(err);
                }
                info!("falling back to a window for {}: {}", flavor, err);
                platform
            }
        }
    } else {
        platform
    };

    let framework = winsys::WinsysFramework::new(platform, dispatch, flavor, window)?;
    Ok(Box::new(framework))
}

/// Presentation and buffer export for whatever the test draws to.
pub(crate) trait Surface {
    fn swap_buffers(&mut self) -> Result<(), Error>;
    fn winsys_fbo(&self) -> Option<&WinsysFbo>;
    fn create_dma_buf(
        &mut self,
        width: u32,
        height: u32,
        fourcc: u32,
        data: &[u8],
        stride: u32,
    ) -> Result<DmaBuf, TestResult>;
    fn destroy_dma_buf(&mut self, buffer: DmaBuf);
}

/// A platform and the session negotiated on it, optionally drawing to an off-screen FBO.
pub(crate) struct Drawing<'p, P: Platform> {
    pub(crate) platform: &'p mut P,
    pub(crate) session: Session<P>,
    pub(crate) fbo: Option<WinsysFbo>,
}

impl<'p, P: Platform> Drawing<'p, P> {
    pub(crate) fn new(platform: &'p mut P, session: Session<P>) -> Drawing<'p, P> {
        Drawing { platform, session, fbo: None }
    }

    #[inline]
    pub(crate) fn next_event(&mut self) -> Option<WindowEvent> {
        self.platform.next_event(self.session.drawable())
    }

    #[inline]
    pub(crate) fn show_window(&mut self) -> Result<(), Error> {
        self.platform.show_window(self.session.drawable())
    }

    pub(crate) fn destroy(self, dispatch: &mut DispatchTable) {
        if let Some(fbo) = self.fbo {
            fbo.destroy();
        }
        self.session.destroy(self.platform, dispatch);
    }
}

impl<'p, P: Platform> Surface for Drawing<'p, P> {
    fn swap_buffers(&mut self) -> Result<(), Error> {
        if self.fbo.is_some() {
            // Nothing is on screen.
            return Ok(());
        }
        self.platform.swap_buffers(self.session.drawable())
    }

    #[inline]
    fn winsys_fbo(&self) -> Option<&WinsysFbo> {
        self.fbo.as_ref()
    }

    fn create_dma_buf(
        &mut self,
        width: u32,
        height: u32,
        fourcc: u32,
        data: &[u8],
        stride: u32,
    ) -> Result<DmaBuf, TestResult> {
        self.platform.create_dma_buf(width, height, fourcc, data, stride)
    }

    fn destroy_dma_buf(&mut self, buffer: DmaBuf) {
        self.platform.destroy_dma_buf(buffer)
    }
}

/// Window state the callbacks can change.
pub(crate) struct WindowState {
    pub(crate) size: Size2D<i32>,
    pub(crate) redisplay: bool,
    pub(crate) quit: bool,
    /// A verdict that ends the run regardless of what display returns.
    pub(crate) forced_result: Option<TestResult>,
    pub(crate) keyboard_replacement: Option<KeyboardFunc>,
    pub(crate) reshape_replacement: Option<ReshapeFunc>,
}

impl WindowState {
    pub(crate) fn new(size: Size2D<i32>) -> WindowState {
        WindowState {
            size,
            redisplay: false,
            quit: false,
            forced_result: None,
            keyboard_replacement: None,
            reshape_replacement: None,
        }
    }

    /// Moves callbacks replaced through `TestEnv` into place.
    fn apply_replacements(&mut self, callbacks: &mut Callbacks) {
        if let Some(keyboard) = self.keyboard_replacement.take() {
            callbacks.keyboard = Some(keyboard);
        }
        if let Some(reshape) = self.reshape_replacement.take() {
            callbacks.reshape = Some(reshape);
        }
    }
}

/// What a test's callbacks can see and do.
pub struct TestEnv<'a> {
    options: &'a HarnessOptions,
    dispatch: &'a mut DispatchTable,
    surface: &'a mut dyn Surface,
    window: &'a mut WindowState,
}

impl<'a> TestEnv<'a> {
    pub(crate) fn new(
        options: &'a HarnessOptions,
        dispatch: &'a mut DispatchTable,
        surface: &'a mut dyn Surface,
        window: &'a mut WindowState,
    ) -> TestEnv<'a> {
        TestEnv { options, dispatch, surface, window }
    }

    /// True under `-auto`.
    #[inline]
    pub fn automatic(&self) -> bool {
        self.options.automatic
    }

    /// True when rendering goes to an off-screen framebuffer.
    #[inline]
    pub fn use_fbo(&self) -> bool {
        self.surface.winsys_fbo().is_some()
    }

    #[inline]
    pub fn window_size(&self) -> Size2D<i32> {
        self.window.size
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.window.size.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.window.size.height
    }

    /// The GL name of the framebuffer standing in for the window, or 0 for the window itself.
    pub fn winsys_fbo(&self) -> u32 {
        self.surface.winsys_fbo().map_or(0, WinsysFbo::name)
    }

    /// Binds the framebuffer standing in for the window, or does nothing when there is none.
    pub fn bind_winsys_fbo(&self) {
        if let Some(fbo) = self.surface.winsys_fbo() {
            fbo.bind();
        }
    }

    /// Subtests named on the command line; empty means all of them.
    #[inline]
    pub fn selected_subtests(&self) -> &[String] {
        &self.options.selected_subtests
    }

    #[inline]
    pub fn dispatch(&mut self) -> &mut DispatchTable {
        self.dispatch
    }

    /// What the current context reports about itself.
    pub fn gl_info(&mut self) -> Result<&GLInfo, TestResult> {
        self.dispatch.info().map_err(|err| {
            error!("failed to query the current context: {}", err);
            TestResult::Fail
        })
    }

    /// Skips the test unless the context advertises `name`.
    pub fn require_extension(&mut self, name: &str) -> Result<(), TestResult> {
        if self.gl_info()?.has_extension(name) {
            return Ok(());
        }
        info!("Test requires {}", name);
        Err(TestResult::Skip)
    }

    /// Skips the test unless the context is desktop GL of at least `version`.
    pub fn require_gl_version(&mut self, version: u32) -> Result<(), TestResult> {
        let info = self.gl_info()?;
        if info.is_es || info.version < version {
            info!(
                "Test requires GL version {}, but actual version is {}{}",
                GLVersion::from_10x(version),
                if info.is_es { "ES " } else { "" },
                GLVersion::from_10x(info.version)
            );
            return Err(TestResult::Skip);
        }
        Ok(())
    }

    /// Skips the test unless the context is GL ES of at least `version`.
    pub fn require_es_version(&mut self, version: u32) -> Result<(), TestResult> {
        let info = self.gl_info()?;
        if !info.is_es || info.version < version {
            info!(
                "Test requires GL ES version {}, but actual version is {}{}",
                GLVersion::from_10x(version),
                if info.is_es { "ES " } else { "" },
                GLVersion::from_10x(info.version)
            );
            return Err(TestResult::Skip);
        }
        Ok(())
    }

    /// Skips the test unless the context is a core profile.
    pub fn require_core_profile(&mut self) -> Result<(), TestResult> {
        if self.gl_info()?.is_core_profile {
            return Ok(());
        }
        info!("Test requires a core profile context");
        Err(TestResult::Skip)
    }

    /// Presents what was drawn. A failed present fails the test.
    pub fn swap_buffers(&mut self) -> Result<(), TestResult> {
        self.surface.swap_buffers().map_err(|err| {
            error!("failed to present: {}", err);
            TestResult::Fail
        })
    }

    #[inline]
    pub fn post_redisplay(&mut self) {
        self.window.redisplay = true;
    }

    /// Ends the event loop after the current callback.
    #[inline]
    pub fn quit(&mut self) {
        self.window.quit = true;
    }

    pub fn set_keyboard_func<F>(&mut self, func: F)
    where
        F: FnMut(&mut TestEnv<'_>, u8, i32, i32) + 'static,
    {
        self.window.keyboard_replacement = Some(Box::new(func));
    }

    pub fn set_reshape_func<F>(&mut self, func: F)
    where
        F: FnMut(&mut TestEnv<'_>, i32, i32) + 'static,
    {
        self.window.reshape_replacement = Some(Box::new(func));
    }

    /// Allocates a buffer holding `data` and exports it as a DMA-BUF.
    pub fn create_dma_buf(
        &mut self,
        width: u32,
        height: u32,
        fourcc: u32,
        data: &[u8],
        stride: u32,
    ) -> Result<DmaBuf, TestResult> {
        self.surface.create_dma_buf(width, height, fourcc, data, stride)
    }

    pub fn destroy_dma_buf(&mut self, buffer: DmaBuf) {
        self.surface.destroy_dma_buf(buffer)
    }
}

/// Resizes the window state and the viewport. Used when the test installs no reshape callback.
///
/// In an automatic run the window should never change size; when it does the run ends with
/// `Warn`.
pub fn default_reshape(env: &mut TestEnv<'_>, width: i32, height: i32) {
    let size = Size2D::new(width, height);
    if env.automatic() && size != env.window.size {
        warn!(
            "Got spurious window resize in automatic run ({},{} to {},{})",
            env.window.size.width, env.window.size.height, width, height
        );
        env.window.forced_result = Some(TestResult::Warn);
        env.window.quit = true;
    }
    env.window.size = size;
    if let Err(result) = gl_utils::viewport(env.dispatch, size) {
        env.window.forced_result = Some(result);
        env.window.quit = true;
    }
}

/// Quits on Escape. Used when the test installs no keyboard callback.
pub fn default_keyboard(env: &mut TestEnv<'_>, key: u8, _: i32, _: i32) {
    if key == 27 {
        env.quit();
    }
}

/// Reads `PIGLIT_FORCE_WINDOW` from the environment.
pub(crate) fn force_window() -> Result<bool, Error> {
    force_window_from_env(env::var("PIGLIT_FORCE_WINDOW").ok().as_deref())
}

/// Runs the init callback, if any.
pub(crate) fn call_init(
    callbacks: &mut Callbacks,
    options: &HarnessOptions,
    dispatch: &mut DispatchTable,
    surface: &mut dyn Surface,
    window: &mut WindowState,
    args: &[String],
) -> Result<(), TestResult> {
    let mut init = match callbacks.init.take() {
        Some(init) => init,
        None => return Ok(()),
    };
    let result = {
        let mut env = TestEnv::new(options, dispatch, surface, window);
        init(&mut env, args)
    };
    callbacks.init = Some(init);
    window.apply_replacements(callbacks);
    result
}

/// Runs the display callback once. The off-screen framebuffer is bound first when there is one.
pub(crate) fn call_display(
    callbacks: &mut Callbacks,
    options: &HarnessOptions,
    dispatch: &mut DispatchTable,
    surface: &mut dyn Surface,
    window: &mut WindowState,
) -> TestResult {
    let mut display = match callbacks.display.take() {
        Some(display) => display,
        None => {
            error!("test has no display callback");
            return TestResult::Fail;
        }
    };
    if let Some(fbo) = surface.winsys_fbo() {
        fbo.bind();
    }
    let result = {
        let mut env = TestEnv::new(options, dispatch, surface, window);
        display(&mut env)
    };
    callbacks.display = Some(display);
    window.apply_replacements(callbacks);
    result
}

fn call_reshape(
    callbacks: &mut Callbacks,
    options: &HarnessOptions,
    dispatch: &mut DispatchTable,
    surface: &mut dyn Surface,
    window: &mut WindowState,
    size: Size2D<i32>,
) {
    let reshape = callbacks.reshape.take();
    {
        let mut env = TestEnv::new(options, dispatch, surface, window);
        match reshape {
            Some(mut reshape) => {
                reshape(&mut env, size.width, size.height);
                callbacks.reshape = Some(reshape);
            }
            None => default_reshape(&mut env, size.width, size.height),
        }
    }
    window.apply_replacements(callbacks);
}

fn call_keyboard(
    callbacks: &mut Callbacks,
    options: &HarnessOptions,
    dispatch: &mut DispatchTable,
    surface: &mut dyn Surface,
    window: &mut WindowState,
    key: u8,
    x: i32,
    y: i32,
) {
    let keyboard = callbacks.keyboard.take();
    {
        let mut env = TestEnv::new(options, dispatch, surface, window);
        match keyboard {
            Some(mut keyboard) => {
                keyboard(&mut env, key, x, y);
                callbacks.keyboard = Some(keyboard);
            }
            None => default_keyboard(&mut env, key, x, y),
        }
    }
    window.apply_replacements(callbacks);
}

/// Delivers window events to the callbacks until the test quits or the window closes.
///
/// In an automatic run the first display ends the loop with its verdict. A platform without an
/// event source gets exactly one display.
pub(crate) fn run_event_loop<P: Platform>(
    drawing: &mut Drawing<'_, P>,
    window: &mut WindowState,
    callbacks: &mut Callbacks,
    options: &HarnessOptions,
    dispatch: &mut DispatchTable,
) -> TestResult {
    let mut last_result = None;
    loop {
        window.apply_replacements(callbacks);
        if let Some(result) = window.forced_result {
            return result;
        }
        if window.redisplay {
            window.redisplay = false;
            let result = call_display(callbacks, options, dispatch, drawing, window);
            if let Some(forced) = window.forced_result {
                return forced;
            }
            if options.automatic {
                return result;
            }
            last_result = Some(result);
        }
        if window.quit {
            break;
        }

        match drawing.next_event() {
            Some(WindowEvent::Expose) => window.redisplay = true,
            Some(WindowEvent::Resize(size)) => {
                call_reshape(callbacks, options, dispatch, drawing, window, size);
                window.redisplay = true;
            }
            Some(WindowEvent::Key { key, x, y }) => {
                call_keyboard(callbacks, options, dispatch, drawing, window, key, x, y);
            }
            Some(WindowEvent::Close) => break,
            None if last_result.is_none() => window.redisplay = true,
            None => break,
        }
    }
    window.forced_result.or(last_result).unwrap_or(TestResult::Pass)
}
