// piglit-framework/src/harness.rs
//
//! The top-level driver: arguments, flavors, platform, framework, verdict.

use crate::args::{self, HarnessOptions};
use crate::config::{Callbacks, TestConfig, WindowConfig};
use crate::dispatch::DispatchTable;
use crate::flavor::{extract_flavors, ContextFlavor};
use crate::framework::create_framework;
use crate::platform::{self, Connection, Platform, PlatformKind};
use crate::result::{report, TestResult};
use crate::subtest;
use crate::Error;

use std::env;

/// Process-wide harness state: the options, the dispatch table and the one platform connection.
///
/// A process talks to a single window system. Once a connection is open, asking for another
/// platform kind is an error.
#[derive(Default)]
pub struct Harness {
    options: HarnessOptions,
    dispatch: DispatchTable,
    connection: Option<Connection>,
}

impl Harness {
    #[inline]
    pub fn new() -> Harness {
        Harness::default()
    }

    #[inline]
    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }

    #[inline]
    pub fn dispatch(&mut self) -> &mut DispatchTable {
        &mut self.dispatch
    }

    /// Runs a test to its verdict without exiting.
    ///
    /// `args` is the full command line with the program name first. Every declared flavor is
    /// tried in order; the first that negotiates runs the test. If none does the verdict is
    /// `Skip`. Configuration errors and unexpected platform failures give `Fail` right away.
    pub fn run(&mut self, mut config: TestConfig, mut args: Vec<String>) -> TestResult {
        self.options = match args::process_args(&mut args, &mut config) {
            Ok(options) => options,
            Err(_) => return TestResult::Fail,
        };

        if self.options.list_subtests {
            subtest::list_subtests(&config.subtests);
            return TestResult::Pass;
        }
        if let Some(limit) = self.options.rlimit {
            args::set_rlimit(limit);
        }

        let flavors = match extract_flavors(&config) {
            Ok(flavors) => flavors,
            Err(_) => return TestResult::Fail,
        };
        let window = config.window();
        let mut callbacks = config.take_callbacks();
        let platform_selection = env::var("PIGLIT_PLATFORM").ok();

        try_flavors(&flavors, |flavor| {
            let kind = platform::choose_platform(platform_selection.as_deref(), flavor)?;
            self.run_flavor(kind, flavor, &window, &mut callbacks, &args)
        })
    }

    fn connect(&mut self, kind: PlatformKind) -> Result<&mut Connection, Error> {
        check_platform_kind(self.connection.as_ref().map(Connection::kind), kind)?;
        if self.connection.is_none() {
            self.connection = Some(Connection::open(kind)?);
        }
        self.connection.as_mut().ok_or(Error::Failed)
    }

    fn run_flavor(
        &mut self,
        kind: PlatformKind,
        flavor: &ContextFlavor,
        window: &WindowConfig,
        callbacks: &mut Callbacks,
        args: &[String],
    ) -> Result<TestResult, Error> {
        self.connect(kind)?;
        let (options, dispatch) = (&self.options, &mut self.dispatch);
        let connection = match self.connection {
            Some(ref mut connection) => connection,
            None => return Err(Error::Failed),
        };
        match *connection {
            #[cfg(x11)]
            Connection::Glx(ref mut platform) => {
                run_on_platform(platform, dispatch, flavor, options, window, callbacks, args)
            }
            #[cfg(linux)]
            Connection::Egl(ref mut platform) => {
                run_on_platform(platform, dispatch, flavor, options, window, callbacks, args)
            }
            #[cfg(toolkit)]
            Connection::Toolkit(ref mut platform) => {
                run_on_platform(platform, dispatch, flavor, options, window, callbacks, args)
            }
        }
    }
}

/// Checks that a process already bound to `current` isn't asked for another platform.
pub(crate) fn check_platform_kind(
    current: Option<PlatformKind>,
    requested: PlatformKind,
) -> Result<(), Error> {
    match current {
        Some(current) if current != requested => {
            error!(
                "internal error: process is already bound to platform {}, can't use {}",
                current, requested
            );
            Err(Error::PlatformMismatch { current, requested })
        }
        _ => Ok(()),
    }
}

/// Runs `run` on each flavor in order and returns the first verdict.
///
/// A fatal error ends the run with `Fail`. Any other error moves on to the next flavor, and
/// when none is left the verdict is `Skip`.
pub(crate) fn try_flavors<F>(flavors: &[ContextFlavor], mut run: F) -> TestResult
where
    F: FnMut(&ContextFlavor) -> Result<TestResult, Error>,
{
    for flavor in flavors {
        match run(flavor) {
            Ok(result) => return result,
            Err(err) if err.is_fatal() => {
                error!("{}: {}", flavor, err);
                return TestResult::Fail;
            }
            Err(err) => info!("{} is unavailable: {}", flavor, err),
        }
    }

    info!("no context flavor declared by the test could be created");
    TestResult::Skip
}

/// Creates the framework for `flavor` on `platform`, runs the test on it and tears it down.
pub(crate) fn run_on_platform<P: Platform>(
    platform: &mut P,
    dispatch: &mut DispatchTable,
    flavor: &ContextFlavor,
    options: &HarnessOptions,
    window: &WindowConfig,
    callbacks: &mut Callbacks,
    args: &[String],
) -> Result<TestResult, Error> {
    let toolkit = platform.kind() == PlatformKind::Winit;
    let mut framework = create_framework(platform, dispatch, flavor, options, window, toolkit)?;
    let result = framework.run_test(callbacks, options, dispatch, args);
    framework.destroy(dispatch);
    Ok(result)
}

/// Runs a test with the process's command line and exits with its verdict.
pub fn run_test(config: TestConfig) -> ! {
    let args = env::args().collect();
    let result = Harness::new().run(config, args);
    report(result)
}
