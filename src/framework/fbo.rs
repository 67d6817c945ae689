// piglit-framework/src/framework/fbo.rs
//
//! Off-screen rendering to a framebuffer object (`-fbo`).

use super::{call_display, call_init, Drawing, Framework, WindowState};
use crate::args::HarnessOptions;
use crate::config::{Callbacks, WindowConfig};
use crate::dispatch::DispatchTable;
use crate::flavor::ContextFlavor;
use crate::gl_utils::{self, WinsysFbo};
use crate::negotiation::setup_gl;
use crate::platform::Platform;
use crate::result::TestResult;
use crate::Error;

/// Draws into an FBO matching the test's visual instead of a window, and displays once.
pub(crate) struct FboFramework<'p, P: Platform> {
    drawing: Drawing<'p, P>,
    window: WindowState,
}

impl<'p, P: Platform> FboFramework<'p, P> {
    /// Negotiates without the window's visual, then builds the FBO the test draws to.
    ///
    /// On failure everything is torn down and the platform is handed back for the fallback.
    pub(crate) fn new(
        platform: &'p mut P,
        dispatch: &mut DispatchTable,
        flavor: &ContextFlavor,
        window: &WindowConfig,
    ) -> Result<FboFramework<'p, P>, (Error, &'p mut P)> {
        let session = match setup_gl(platform, dispatch, flavor, window, false) {
            Ok(session) => session,
            Err(err) => return Err((err, platform)),
        };

        let fbo = match dispatch.proc_loader() {
            Some(loader) => WinsysFbo::new(
                &*loader,
                session.info(),
                window.size,
                window.visual,
                window.samples,
            ),
            None => Err(Error::DispatchNotInitialized),
        };
        let fbo = match fbo {
            Ok(fbo) => fbo,
            Err(err) => {
                info!("failed to create an off-screen framebuffer: {}", err);
                session.destroy(platform, dispatch);
                return Err((err, platform));
            }
        };

        let mut drawing = Drawing::new(platform, session);
        drawing.fbo = Some(fbo);
        if let Err(result) = gl_utils::viewport(dispatch, window.size) {
            warn!("failed to set the viewport: {}", result);
        }
        Ok(FboFramework { drawing, window: WindowState::new(window.size) })
    }
}

impl<'p, P: Platform> Framework for FboFramework<'p, P> {
    fn run_test(
        &mut self,
        callbacks: &mut Callbacks,
        options: &HarnessOptions,
        dispatch: &mut DispatchTable,
        args: &[String],
    ) -> TestResult {
        if let Err(result) =
            call_init(callbacks, options, dispatch, &mut self.drawing, &mut self.window, args)
        {
            return result;
        }
        let result = call_display(callbacks, options, dispatch, &mut self.drawing, &mut self.window);
        self.window.forced_result.unwrap_or(result)
    }

    fn destroy(self: Box<Self>, dispatch: &mut DispatchTable) {
        self.drawing.destroy(dispatch);
    }
}
