// piglit-framework/src/framework/winsys.rs
//
//! Rendering to a window-system drawable: GLX, EGL on X11, Wayland and GBM.

use super::{call_display, call_init, force_window, run_event_loop, Drawing, Framework};
use super::WindowState;
use crate::args::HarnessOptions;
use crate::config::{Callbacks, WindowConfig};
use crate::dispatch::DispatchTable;
use crate::flavor::ContextFlavor;
use crate::gl_utils;
use crate::negotiation::setup_gl;
use crate::platform::Platform;
use crate::result::TestResult;
use crate::Error;

pub(crate) struct WinsysFramework<'p, P: Platform> {
    drawing: Drawing<'p, P>,
    window: WindowState,
    requires_displayed_window: bool,
}

impl<'p, P: Platform> WinsysFramework<'p, P> {
    pub(crate) fn new(
        platform: &'p mut P,
        dispatch: &mut DispatchTable,
        flavor: &ContextFlavor,
        window: &WindowConfig,
    ) -> Result<WinsysFramework<'p, P>, Error> {
        let session = setup_gl(platform, dispatch, flavor, window, true)?;
        if let Err(result) = gl_utils::viewport(dispatch, window.size) {
            warn!("failed to set the viewport: {}", result);
        }
        Ok(WinsysFramework {
            drawing: Drawing::new(platform, session),
            window: WindowState::new(window.size),
            requires_displayed_window: window.requires_displayed_window,
        })
    }
}

impl<'p, P: Platform> Framework for WinsysFramework<'p, P> {
    /// Runs init, then either one display or the event loop.
    ///
    /// An automatic run of a test that doesn't need a visible window displays once, off screen,
    /// unless `PIGLIT_FORCE_WINDOW=1`. Everything else maps the window and runs the event loop.
    fn run_test(
        &mut self,
        callbacks: &mut Callbacks,
        options: &HarnessOptions,
        dispatch: &mut DispatchTable,
        args: &[String],
    ) -> TestResult {
        let force_window = match force_window() {
            Ok(force_window) => force_window,
            Err(_) => return TestResult::Fail,
        };

        if let Err(result) =
            call_init(callbacks, options, dispatch, &mut self.drawing, &mut self.window, args)
        {
            return result;
        }

        if !self.requires_displayed_window && options.automatic && !force_window {
            let result =
                call_display(callbacks, options, dispatch, &mut self.drawing, &mut self.window);
            return self.window.forced_result.unwrap_or(result);
        }

        if let Err(err) = self.drawing.show_window() {
            error!("failed to show the window: {}", err);
            return TestResult::Fail;
        }
        run_event_loop(&mut self.drawing, &mut self.window, callbacks, options, dispatch)
    }

    fn destroy(self: Box<Self>, dispatch: &mut DispatchTable) {
        self.drawing.destroy(dispatch);
    }
}
