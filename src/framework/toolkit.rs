// piglit-framework/src/framework/toolkit.rs
//
//! A toolkit-managed window, always shown, driven by the toolkit's event loop.
//!
//! The toolkit only does desktop GL and can't ask for a profile by itself, so the context it
//! returns is checked afterwards.

use super::{call_init, run_event_loop, Drawing, Framework, WindowState};
use crate::args::HarnessOptions;
use crate::config::{Callbacks, WindowConfig};
use crate::dispatch::DispatchTable;
use crate::flavor::ContextFlavor;
use crate::gl_utils;
use crate::info::{GLApi, GLVersion};
use crate::negotiation::setup_gl;
use crate::platform::Platform;
use crate::result::TestResult;
use crate::Error;

pub(crate) struct ToolkitFramework<'p, P: Platform> {
    drawing: Drawing<'p, P>,
    window: WindowState,
}

impl<'p, P: Platform> ToolkitFramework<'p, P> {
    pub(crate) fn new(
        platform: &'p mut P,
        dispatch: &mut DispatchTable,
        flavor: &ContextFlavor,
        window: &WindowConfig,
    ) -> Result<ToolkitFramework<'p, P>, Error> {
        if flavor.api().is_es() {
            info!("the toolkit window doesn't support {}", flavor);
            return Err(Error::UnsupportedGLType);
        }

        let session = setup_gl(platform, dispatch, flavor, window, true)?;
        let info = session.info();
        if info.version < flavor.version() {
            info!(
                "Test requires GL version {}, but actual version is {}",
                GLVersion::from_10x(flavor.version()),
                GLVersion::from_10x(info.version)
            );
            let err = Error::UnsupportedGLVersion {
                requested: flavor.version(),
                actual: info.version,
            };
            session.destroy(platform, dispatch);
            return Err(err);
        }
        if flavor.api() == GLApi::Compatibility && info.is_core_profile {
            info!("Test requires compat profile, but got a core profile context");
            session.destroy(platform, dispatch);
            return Err(Error::UnsupportedGLProfile);
        }

        if let Err(result) = gl_utils::viewport(dispatch, window.size) {
            warn!("failed to set the viewport: {}", result);
        }
        Ok(ToolkitFramework {
            drawing: Drawing::new(platform, session),
            window: WindowState::new(window.size),
        })
    }
}

impl<'p, P: Platform> Framework for ToolkitFramework<'p, P> {
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
