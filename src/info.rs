// piglit-framework/src/info.rs
//
//! OpenGL information.

use crate::dispatch::ProcLoader;
use crate::Error;

use std::ffi::CStr;
use std::fmt::{self, Display, Formatter};
use std::os::raw::{c_char, c_int, c_uint};

/// The API a context flavor asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GLApi {
    /// Desktop OpenGL, core profile.
    Core,
    /// Desktop OpenGL, compatibility profile.
    Compatibility,
    /// OpenGL ES 1.x.
    Es1,
    /// OpenGL ES 2.0 and later.
    Es2,
}

impl GLApi {
    /// Converts a raw API code (`0` core, `1` compatibility, `2` ES1, `3` ES2) into a `GLApi`.
    ///
    /// Unknown codes are logged and rejected.
    pub fn from_raw(raw: u32) -> Option<GLApi> {
        match raw {
            0 => Some(GLApi::Core),
            1 => Some(GLApi::Compatibility),
            2 => Some(GLApi::Es1),
            3 => Some(GLApi::Es2),
            _ => {
                error!("context flavor has invalid api ({})", raw);
                None
            }
        }
    }

    /// The inclusive range of `major * 10 + minor` versions that exist for this API.
    pub fn version_range(self) -> (u32, u32) {
        match self {
            GLApi::Core => (31, 43),
            GLApi::Compatibility => (10, 43),
            GLApi::Es1 => (10, 11),
            GLApi::Es2 => (20, 31),
        }
    }

    /// Returns the dispatch family that entry points for this API are resolved against.
    #[inline]
    pub fn dispatch_api(self) -> DispatchApi {
        match self {
            GLApi::Core | GLApi::Compatibility => DispatchApi::GL,
            GLApi::Es1 => DispatchApi::ES1,
            GLApi::Es2 => DispatchApi::ES2,
        }
    }

    #[inline]
    pub fn is_es(self) -> bool {
        matches!(self, GLApi::Es1 | GLApi::Es2)
    }

    pub(crate) fn description(self) -> &'static str {
        match self {
            GLApi::Core => "Core",
            GLApi::Compatibility => "Compatibility",
            GLApi::Es1 => "ES1",
            GLApi::Es2 => "ES2",
        }
    }
}

/// The family of entry points a dispatch table is built for.
///
/// Desktop core and compatibility contexts share a family; the two ES generations don't.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchApi {
    /// Desktop OpenGL.
    GL,
    /// OpenGL ES 1.x.
    ES1,
    /// OpenGL ES 2.0 and later.
    ES2,
}

/// An OpenGL version number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct GLVersion {
    /// The major OpenGL version (e.g. 4 in 4.2).
    pub major: u8,
    /// The minor OpenGL version (e.g. 2 in 4.2).
    pub minor: u8,
}

impl GLVersion {
    /// Creates a GL version structure with the given major and minor version numbers.
    #[inline]
    pub fn new(major: u8, minor: u8) -> GLVersion {
        GLVersion { major, minor }
    }

    /// Splits a `major * 10 + minor` number into its parts.
    #[inline]
    pub fn from_10x(version: u32) -> GLVersion {
        GLVersion { major: (version / 10) as u8, minor: (version % 10) as u8 }
    }

    /// Packs the version into `major * 10 + minor`.
    #[inline]
    pub fn to_10x(self) -> u32 {
        self.major as u32 * 10 + self.minor as u32
    }

    /// Parses a `GL_VERSION` string.
    ///
    /// Returns the version and whether the string describes an OpenGL ES context. Handles the
    /// `OpenGL ES-CM 1.1` and `OpenGL ES 3.2` forms as well as plain desktop strings such as
    /// `4.6 (Core Profile) Mesa 23.1.0`.
    pub fn parse(version_string: &str) -> Option<(GLVersion, bool)> {
        let mut rest = version_string.trim_start();
        let mut is_es = false;
        if let Some(stripped) = rest.strip_prefix("OpenGL ES") {
            is_es = true;
            rest = stripped
                .trim_start_matches(|c: char| c == '-' || c.is_ascii_alphabetic())
                .trim_start();
        }

        let number = rest.split(|c: char| c == ' ' || c == '\t').next()?;
        let mut parts = number.split('.');
        let major: u8 = parts.next()?.parse().ok()?;
        let minor_digits: String = parts
            .next()?
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let minor: u8 = minor_digits.parse().ok()?;
        Some((GLVersion { major, minor }, is_es))
    }
}

impl Display for GLVersion {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A snapshot of what the current context reports about itself.
#[derive(Clone, Debug, PartialEq)]
pub struct GLInfo {
    /// `major * 10 + minor`.
    pub version: u32,
    /// True if the context is OpenGL ES.
    pub is_es: bool,
    /// True if the context is a desktop 3.1+ context without `GL_ARB_compatibility`.
    pub is_core_profile: bool,
    /// Advertised extensions.
    pub extensions: Vec<String>,
}

impl GLInfo {
    /// Builds a snapshot from a version string and a list of extensions.
    pub fn new(version_string: &str, extensions: Vec<String>) -> Option<GLInfo> {
        let (version, is_es) = GLVersion::parse(version_string)?;
        let version = version.to_10x();
        let is_core_profile = !is_es
            && version >= 31
            && !extensions.iter().any(|extension| extension == "GL_ARB_compatibility");
        Some(GLInfo { version, is_es, is_core_profile, extensions })
    }

    /// Returns true if the context advertises the named extension.
    pub fn has_extension(&self, name: &str) -> bool {
        !name.is_empty() && self.extensions.iter().any(|extension| extension == name)
    }

    /// Queries the current context through the given loader.
    ///
    /// Desktop 3.0+ contexts list extensions through `glGetStringi`; everything else returns one
    /// space-separated `GL_EXTENSIONS` string.
    pub fn current(loader: &dyn ProcLoader) -> Result<GLInfo, Error> {
        type GetString = unsafe extern "C" fn(c_uint) -> *const u8;
        type GetIntegerv = unsafe extern "C" fn(c_uint, *mut c_int);
        type GetStringi = unsafe extern "C" fn(c_uint, c_uint) -> *const u8;

        unsafe {
            let get_string = loader.get_core_proc("glGetString", 10);
            if get_string.is_null() {
                return Err(Error::GLFunctionNotFound("glGetString".to_owned()));
            }
            let get_string: GetString = std::mem::transmute(get_string);

            let version_string = string_from_gl(get_string(glow::VERSION))
                .ok_or_else(|| Error::GLFunctionNotFound("glGetString".to_owned()))?;
            let (version, is_es) = match GLVersion::parse(&version_string) {
                Some(parsed) => parsed,
                None => {
                    error!("failed to parse GL_VERSION string \"{}\"", version_string);
                    return Err(Error::Failed);
                }
            };

            let mut extensions = vec![];
            if is_es || version.to_10x() < 30 {
                if let Some(list) = string_from_gl(get_string(glow::EXTENSIONS)) {
                    extensions.extend(list.split_whitespace().map(str::to_owned));
                }
            } else {
                let get_integerv = loader.get_core_proc("glGetIntegerv", 10);
                let get_stringi = loader.get_core_proc("glGetStringi", 30);
                if get_integerv.is_null() || get_stringi.is_null() {
                    return Err(Error::GLFunctionNotFound("glGetStringi".to_owned()));
                }
                let get_integerv: GetIntegerv = std::mem::transmute(get_integerv);
                let get_stringi: GetStringi = std::mem::transmute(get_stringi);

                let mut count = 0;
                get_integerv(glow::NUM_EXTENSIONS, &mut count);
                for index in 0..count.max(0) as c_uint {
                    if let Some(name) = string_from_gl(get_stringi(glow::EXTENSIONS, index)) {
                        extensions.push(name);
                    }
                }
            }

            GLInfo::new(&version_string, extensions).ok_or(Error::Failed)
        }
    }
}

unsafe fn string_from_gl(string: *const u8) -> Option<String> {
    if string.is_null() {
        return None;
    }
    Some(CStr::from_ptr(string as *const c_char).to_string_lossy().into_owned())
}

/// Returns true if `name` appears as a whole space-delimited word in `extensions`.
///
/// An empty name never matches.
pub fn is_extension_in_string(extensions: &str, name: &str) -> bool {
    !name.is_empty() && extensions.split(' ').any(|extension| extension == name)
}
