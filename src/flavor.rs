// piglit-framework/src/flavor.rs
//
//! Context flavors: the (API, version, attributes) triples a test can run under.

use crate::config::TestConfig;
use crate::info::{GLApi, GLVersion};
use crate::Error;

use std::fmt::{self, Display, Formatter};

bitflags! {
    /// Extra attributes requested on a context.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ContextFlavorFlags: u8 {
        /// Request a debug context.
        const DEBUG              = 0x01;
        /// Request a forward-compatible context.
        const FORWARD_COMPATIBLE = 0x02;
    }
}

/// One candidate (API, version, attributes) combination.
///
/// Flavors are checked when they are built and never change afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextFlavor {
    api: GLApi,
    version: u32,
    flags: ContextFlavorFlags,
}

impl ContextFlavor {
    /// Builds a flavor and checks it.
    ///
    /// `version` is `major * 10 + minor`.
    pub fn new(api: GLApi, version: u32, flags: ContextFlavorFlags) -> Result<ContextFlavor, Error> {
        let flavor = ContextFlavor { api, version, flags };
        if !flavor.is_valid() {
            error!("invalid context flavor: {}", flavor);
            return Err(Error::InvalidFlavor(flavor.to_string()));
        }
        Ok(flavor)
    }

    #[inline]
    pub fn api(&self) -> GLApi {
        self.api
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn flags(&self) -> ContextFlavorFlags {
        self.flags
    }

    #[inline]
    pub fn is_debug(&self) -> bool {
        self.flags.contains(ContextFlavorFlags::DEBUG)
    }

    #[inline]
    pub fn is_forward_compatible(&self) -> bool {
        self.flags.contains(ContextFlavorFlags::FORWARD_COMPATIBLE)
    }

    /// Returns the same flavor asking for a different version.
    ///
    /// Used by the GL 3.1 profile retry, which asks for 3.2 under identical attributes.
    pub fn with_version(&self, version: u32) -> Result<ContextFlavor, Error> {
        ContextFlavor::new(self.api, version, self.flags)
    }

    /// Checks the flavor against the versions and attributes each API allows.
    ///
    /// Every rejection is logged with the reason.
    pub fn is_valid(&self) -> bool {
        let (min, max) = self.api.version_range();
        if self.version < min || self.version > max {
            debug!(
                "context flavor has invalid version ({}) for the OpenGL {} API; version must be \
                 in range [{}, {}]",
                GLVersion::from_10x(self.version),
                self.api.description(),
                GLVersion::from_10x(min),
                GLVersion::from_10x(max)
            );
            return false;
        }

        if !self.is_forward_compatible() {
            return true;
        }

        let forward_compatible_allowed = match self.api {
            GLApi::Es1 | GLApi::Es2 => false,
            GLApi::Compatibility => self.version >= 30,
            GLApi::Core => true,
        };
        if !forward_compatible_allowed {
            debug!(
                "context attribute \"Forward-Compatible\" is illegal for the OpenGL {} {} API",
                self.api.description(),
                GLVersion::from_10x(self.version)
            );
        }
        forward_compatible_allowed
    }
}

impl Display for ContextFlavor {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let api = match self.api {
            GLApi::Core => "Core ",
            GLApi::Compatibility => "Compatibility ",
            GLApi::Es1 | GLApi::Es2 => "ES ",
        };
        write!(f, "OpenGL {}{} ", api, GLVersion::from_10x(self.version))?;
        if self.is_forward_compatible() {
            f.write_str("Forward-Compatible ")?;
        }
        if self.is_debug() {
            f.write_str("Debug ")?;
        }
        f.write_str("Context")
    }
}

/// Lists the flavors a test may run under, in the order they should be tried.
///
/// The order is core, compatibility, then ES2 (ES version 2.0 or later) or ES1. The debug and
/// forward-compatible requests of the configuration apply to every flavor.
pub fn extract_flavors(config: &TestConfig) -> Result<Vec<ContextFlavor>, Error> {
    let mut flags = ContextFlavorFlags::empty();
    flags.set(ContextFlavorFlags::DEBUG, config.require_debug_context);
    flags.set(
        ContextFlavorFlags::FORWARD_COMPATIBLE,
        config.require_forward_compatible_context,
    );

    let mut flavors = vec![];
    if config.supports_gl_core_version > 0 {
        flavors.push(ContextFlavor::new(GLApi::Core, config.supports_gl_core_version, flags)?);
    }
    if config.supports_gl_compat_version > 0 {
        flavors.push(ContextFlavor::new(
            GLApi::Compatibility,
            config.supports_gl_compat_version,
            flags,
        )?);
    }
    if config.supports_gl_es_version >= 20 {
        flavors.push(ContextFlavor::new(GLApi::Es2, config.supports_gl_es_version, flags)?);
    } else if config.supports_gl_es_version > 0 {
        flavors.push(ContextFlavor::new(GLApi::Es1, config.supports_gl_es_version, flags)?);
    }

    if flavors.is_empty() {
        error!("test declares support for no context flavor");
        return Err(Error::NoFlavorDeclared);
    }
    Ok(flavors)
}
