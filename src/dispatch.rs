// piglit-framework/src/dispatch.rs
//
//! Runtime resolution of GL entry points.
//!
//! Entry points are gated either on a core version or on an extension. A request that fails
//! its gate is *unsupported*; a request that passes its gate but can't be looked up is a
//! *resolve failure*. Each of the two has its own `FailurePolicy`.

use crate::info::{DispatchApi, GLInfo};
use crate::result::TestResult;
use crate::Error;

use fnv::FnvHashMap;
use std::mem;
use std::os::raw::c_void;
use std::ptr;
use std::rc::Rc;

/// Looks up GL entry points for the current window system.
pub trait ProcLoader {
    /// Looks up a function that is core in GL (or GL ES) version `gl_10x_version`.
    ///
    /// Old enough versions may be exported statically by the client library, in which case
    /// the dynamic lookup isn't reliable.
    fn get_core_proc(&self, name: &str, gl_10x_version: u32) -> *const c_void;

    /// Looks up a function provided by an extension.
    fn get_ext_proc(&self, name: &str) -> *const c_void;
}

/// What a requested entry point is gated on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gate<'a> {
    /// Core since the given `major * 10 + minor` version.
    Core(u32),
    /// Provided by the named extension.
    Extension(&'a str),
}

/// What to do when an entry point can't be handed out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FailurePolicy {
    /// Return a null pointer and let the caller cope.
    ReturnNull,
    /// End the test with `Skip`.
    Skip,
    /// End the test with `Fail`.
    Fail,
}

/// Called with the function name before a failure policy is applied.
pub type FailureHook = Box<dyn Fn(&str)>;

/// The pair of failure policies a dispatch table applies.
pub struct DispatchPolicy {
    /// Applied when the entry point's version or extension isn't available.
    pub unsupported: FailurePolicy,
    /// Applied when the entry point should exist but the lookup returned nothing.
    pub resolve_failure: FailurePolicy,
    pub unsupported_hook: Option<FailureHook>,
    pub resolve_failure_hook: Option<FailureHook>,
}

impl Default for DispatchPolicy {
    fn default() -> DispatchPolicy {
        DispatchPolicy {
            unsupported: FailurePolicy::Skip,
            resolve_failure: FailurePolicy::Fail,
            unsupported_hook: None,
            resolve_failure_hook: None,
        }
    }
}

/// Resolved entry points for the current context, split into core and extension entries.
///
/// Initialization is latched per `DispatchApi`: initializing again with the same API does
/// nothing, initializing with another API rebinds the table.
#[derive(Default)]
pub struct DispatchTable {
    api: Option<DispatchApi>,
    loader: Option<Rc<dyn ProcLoader>>,
    info: Option<GLInfo>,
    core: FnvHashMap<String, usize>,
    extensions: FnvHashMap<String, usize>,
    policy: DispatchPolicy,
}

impl DispatchTable {
    #[inline]
    pub fn new() -> DispatchTable {
        DispatchTable::default()
    }

    pub fn with_policy(policy: DispatchPolicy) -> DispatchTable {
        DispatchTable { policy, ..DispatchTable::default() }
    }

    #[inline]
    pub fn set_policy(&mut self, policy: DispatchPolicy) {
        self.policy = policy;
    }

    /// Binds the table to `api`, resolving through `loader` from now on.
    ///
    /// Must be called with a context current. Returns true if the table was (re)bound and
    /// false if it was already bound to `api`.
    pub fn init(&mut self, api: DispatchApi, loader: Rc<dyn ProcLoader>) -> bool {
        if self.api == Some(api) {
            return false;
        }
        if let Some(previous) = self.api {
            debug!("rebinding dispatch table from {:?} to {:?}", previous, api);
        }
        self.api = Some(api);
        self.loader = Some(loader);
        self.info = None;
        self.core.clear();
        self.extensions.clear();
        true
    }

    #[inline]
    pub fn api(&self) -> Option<DispatchApi> {
        self.api
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.api.is_some()
    }

    /// The loader the table resolves through.
    pub fn proc_loader(&self) -> Option<Rc<dyn ProcLoader>> {
        self.loader.clone()
    }

    /// Forgets the GL info and every extension entry point.
    ///
    /// Called whenever the current context goes away, so the next query sees the next
    /// context's extensions.
    pub fn reinitialize_extensions(&mut self) {
        self.info = None;
        self.extensions.clear();
    }

    /// Returns what the current context reports about itself, querying it on first use.
    pub fn info(&mut self) -> Result<&GLInfo, Error> {
        if self.info.is_none() {
            let loader = self.loader.clone().ok_or(Error::DispatchNotInitialized)?;
            self.info = Some(GLInfo::current(&*loader)?);
        }
        self.info.as_ref().ok_or(Error::DispatchNotInitialized)
    }

    /// Returns the entry point `name`, or the verdict its failure policy calls for.
    pub fn resolve(&mut self, name: &str, gate: Gate) -> Result<*const c_void, TestResult> {
        let loader = match self.loader {
            Some(ref loader) => loader.clone(),
            None => {
                error!("{}: {}", name, Error::DispatchNotInitialized);
                return Err(TestResult::Fail);
            }
        };

        let supported = match self.info() {
            Ok(info) => match gate {
                Gate::Core(min_version) => info.version >= min_version,
                Gate::Extension(extension) => info.has_extension(extension),
            },
            Err(err) => {
                error!("failed to query the current context: {}", err);
                return Err(TestResult::Fail);
            }
        };
        if !supported {
            info!("Function \"{}\" not supported on this implementation", name);
            return apply_policy(
                self.policy.unsupported,
                self.policy.unsupported_hook.as_deref(),
                name,
            );
        }

        let cache = match gate {
            Gate::Core(_) => &mut self.core,
            Gate::Extension(_) => &mut self.extensions,
        };
        if let Some(&address) = cache.get(name) {
            return Ok(address as *const c_void);
        }

        let address = match gate {
            Gate::Core(min_version) => loader.get_core_proc(name, min_version),
            Gate::Extension(_) => loader.get_ext_proc(name),
        };
        if address.is_null() {
            error!("failed to look up \"{}\"", name);
            return apply_policy(
                self.policy.resolve_failure,
                self.policy.resolve_failure_hook.as_deref(),
                name,
            );
        }

        cache.insert(name.to_owned(), address as usize);
        Ok(address)
    }

    /// Resolves the first of a set of aliases whose gate passes.
    ///
    /// Aliases are listed in order of preference, usually the core name first and the ARB or
    /// EXT names after it. If no gate passes, the unsupported policy applies to the first name.
    pub fn resolve_any(&mut self, aliases: &[(&str, Gate)]) -> Result<*const c_void, TestResult> {
        for &(name, gate) in aliases {
            let supported = match self.info() {
                Ok(info) => match gate {
                    Gate::Core(min_version) => info.version >= min_version,
                    Gate::Extension(extension) => info.has_extension(extension),
                },
                Err(_) => break,
            };
            if supported {
                return self.resolve(name, gate);
            }
        }

        match aliases.first() {
            Some(&(name, gate)) => self.resolve(name, gate),
            None => Ok(ptr::null()),
        }
    }

    /// Resolves `name` and casts it to the function pointer type `F`.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the entry point's real signature. A null
    /// pointer from the `ReturnNull` policy is reported as `Err(Skip)` here, since `F` can't
    /// hold it.
    pub unsafe fn resolve_as<F: Copy>(&mut self, name: &str, gate: Gate) -> Result<F, TestResult> {
        assert_eq!(mem::size_of::<F>(), mem::size_of::<*const c_void>());
        let address = self.resolve(name, gate)?;
        if address.is_null() {
            return Err(TestResult::Skip);
        }
        Ok(mem::transmute_copy::<*const c_void, F>(&address))
    }
}

fn apply_policy(
    policy: FailurePolicy,
    hook: Option<&dyn Fn(&str)>,
    name: &str,
) -> Result<*const c_void, TestResult> {
    if let Some(hook) = hook {
        hook(name);
    }
    match policy {
        FailurePolicy::ReturnNull => Ok(ptr::null()),
        FailurePolicy::Skip => Err(TestResult::Skip),
        FailurePolicy::Fail => Err(TestResult::Fail),
    }
}
