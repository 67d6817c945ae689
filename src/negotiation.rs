// piglit-framework/src/negotiation.rs
//
//! Negotiating a working context for one flavor.
//!
//! Resources are acquired config, context, drawable, and released in the opposite order. A
//! failed attempt releases everything it acquired before it reports the failure, so the next
//! flavor starts from a clean platform.

use crate::config::WindowConfig;
use crate::dispatch::DispatchTable;
use crate::flavor::ContextFlavor;
use crate::info::{GLApi, GLInfo, GLVersion};
use crate::platform::{ConfigRequest, Platform};
use crate::Error;

/// Where a negotiation attempt is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationState {
    NoContext,
    ConfigChosen,
    ContextCreated,
    WindowCreated,
    Current,
    /// The context is current and checked; the test may run.
    Running,
    Failed,
}

/// A config, context and drawable that were negotiated together.
pub struct Session<P: Platform> {
    config: P::Config,
    context: P::Context,
    drawable: P::Drawable,
    flavor: ContextFlavor,
    info: GLInfo,
}

impl<P: Platform> Session<P> {
    /// The flavor the context was created for. Differs from the requested flavor after the
    /// GL 3.1 profile retry.
    #[inline]
    pub fn flavor(&self) -> &ContextFlavor {
        &self.flavor
    }

    #[inline]
    pub fn info(&self) -> &GLInfo {
        &self.info
    }

    #[inline]
    pub fn drawable(&self) -> &P::Drawable {
        &self.drawable
    }

    #[inline]
    pub fn context(&self) -> &P::Context {
        &self.context
    }

    /// Releases the drawable, the context and the config, in that order.
    pub fn destroy(self, platform: &mut P, dispatch: &mut DispatchTable) {
        platform.destroy_drawable(self.drawable);
        platform.destroy_context(self.context);
        platform.destroy_config(self.config);
        dispatch.reinitialize_extensions();
    }
}

/// One attempt at one flavor, holding whatever it has acquired so far.
struct Attempt<P: Platform> {
    state: NegotiationState,
    config: Option<P::Config>,
    context: Option<P::Context>,
    drawable: Option<P::Drawable>,
}

impl<P: Platform> Attempt<P> {
    fn new() -> Attempt<P> {
        Attempt { state: NegotiationState::NoContext, config: None, context: None, drawable: None }
    }

    fn advance(&mut self, state: NegotiationState) {
        trace!("negotiation: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Releases everything in reverse order of acquisition and returns `error`.
    fn abandon(mut self, platform: &mut P, dispatch: &mut DispatchTable, error: Error) -> Error {
        if let Some(drawable) = self.drawable.take() {
            platform.destroy_drawable(drawable);
        }
        if let Some(context) = self.context.take() {
            platform.destroy_context(context);
        }
        if let Some(config) = self.config.take() {
            platform.destroy_config(config);
        }
        dispatch.reinitialize_extensions();
        self.advance(NegotiationState::Failed);
        error
    }
}

enum Outcome<P: Platform> {
    Ready(Session<P>),
    /// A 3.1 context came back with the other profile; ask for 3.2 instead.
    RetryAt32,
}

/// Negotiates a current context for `flavor` and checks it meets the request.
///
/// On success the context is current on a drawable the size of the window and the dispatch
/// table is bound to the flavor's API. A desktop 3.1 request whose context disagrees with the
/// requested profile about `GL_ARB_compatibility` is retried once at 3.2, where profiles can be
/// asked for.
pub fn setup_gl<P: Platform>(
    platform: &mut P,
    dispatch: &mut DispatchTable,
    flavor: &ContextFlavor,
    window: &WindowConfig,
    use_window_attribs: bool,
) -> Result<Session<P>, Error> {
    match try_flavor(platform, dispatch, flavor, window, use_window_attribs)? {
        Outcome::Ready(session) => Ok(session),
        Outcome::RetryAt32 => {
            let flavor = flavor.with_version(32)?;
            info!("retrying as {}", flavor);
            match try_flavor(platform, dispatch, &flavor, window, use_window_attribs)? {
                Outcome::Ready(session) => Ok(session),
                Outcome::RetryAt32 => Err(Error::UnsupportedGLProfile),
            }
        }
    }
}

fn try_flavor<P: Platform>(
    platform: &mut P,
    dispatch: &mut DispatchTable,
    flavor: &ContextFlavor,
    window: &WindowConfig,
    use_window_attribs: bool,
) -> Result<Outcome<P>, Error> {
    let request = ConfigRequest::new(flavor, window, use_window_attribs);
    let mut attempt = Attempt::new();

    match platform.choose_config(&request) {
        Ok(config) => attempt.config = Some(config),
        Err(err) => {
            info!("failed to create config for {}: {}", flavor, err);
            return Err(attempt.abandon(platform, dispatch, err));
        }
    }
    attempt.advance(NegotiationState::ConfigChosen);

    let created = match attempt.config {
        Some(ref config) => platform.create_context(config, &request),
        None => Err(Error::Failed),
    };
    match created {
        Ok(context) => attempt.context = Some(context),
        Err(err) => {
            info!("failed to create context for {}: {}", flavor, err);
            return Err(attempt.abandon(platform, dispatch, err));
        }
    }
    attempt.advance(NegotiationState::ContextCreated);

    let created = match attempt.config {
        Some(ref config) => platform.create_drawable(config, window.size),
        None => Err(Error::Failed),
    };
    match created {
        Ok(drawable) => attempt.drawable = Some(drawable),
        Err(err) => {
            info!("failed to create window for {}: {}", flavor, err);
            return Err(attempt.abandon(platform, dispatch, err));
        }
    }
    attempt.advance(NegotiationState::WindowCreated);

    let made_current = match (&attempt.context, &attempt.drawable) {
        (Some(context), Some(drawable)) => platform.make_current(context, drawable),
        _ => Err(Error::Failed),
    };
    if let Err(err) = made_current {
        error!("failed to make context current for {}: {}", flavor, err);
        return Err(attempt.abandon(platform, dispatch, err));
    }
    attempt.advance(NegotiationState::Current);

    let api = flavor.api().dispatch_api();
    dispatch.init(api, platform.proc_loader(api));
    dispatch.reinitialize_extensions();
    let info = match dispatch.info() {
        Ok(info) => info.clone(),
        Err(err) => {
            error!("failed to query the context for {}: {}", flavor, err);
            return Err(attempt.abandon(platform, dispatch, err));
        }
    };

    if info.version < flavor.version() {
        info!(
            "requested an {}, but actual context version is {}",
            flavor,
            GLVersion::from_10x(info.version)
        );
        let err = Error::UnsupportedGLVersion { requested: flavor.version(), actual: info.version };
        return Err(attempt.abandon(platform, dispatch, err));
    }

    if flavor.version() == 31 && info.version == 31 {
        let requested_core = match flavor.api() {
            GLApi::Core => Some(true),
            GLApi::Compatibility => Some(false),
            GLApi::Es1 | GLApi::Es2 => None,
        };
        if let Some(requested_core) = requested_core {
            if requested_core == info.has_extension("GL_ARB_compatibility") {
                info!(
                    "requested an {}, but GL_ARB_compatibility {} advertised",
                    flavor,
                    if requested_core { "is" } else { "isn't" }
                );
                attempt.abandon(platform, dispatch, Error::UnsupportedGLProfile);
                return Ok(Outcome::RetryAt32);
            }
        }
    }

    let (config, context, drawable) =
        match (attempt.config.take(), attempt.context.take(), attempt.drawable.take()) {
            (Some(config), Some(context), Some(drawable)) => (config, context, drawable),
            _ => return Err(Error::Failed),
        };
    attempt.advance(NegotiationState::Running);
    debug!("negotiated {} (GL {})", flavor, GLVersion::from_10x(info.version));

    Ok(Outcome::Ready(Session { config, context, drawable, flavor: *flavor, info }))
}
