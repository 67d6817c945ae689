// piglit-framework/src/platform/egl/device.rs
//
//! Loading of libEGL and of the GL client libraries behind it.

use crate::dispatch::ProcLoader;
use crate::egl::Egl;
use crate::info::DispatchApi;

use libc::{dlopen, dlsym, RTLD_LAZY};
use std::ffi::{CStr, CString};
use std::os::raw::c_void;
use std::ptr;
use std::sync::LazyLock;

thread_local! {
    pub static EGL_FUNCTIONS: Egl = Egl::load_with(get_proc_address);
}

static EGL_LIBRARY: LazyLock<LibraryWrapper> =
    LazyLock::new(|| LibraryWrapper::open(&[c"libEGL.so.1", c"libEGL.so"]));

static GL_LIBRARY: LazyLock<LibraryWrapper> =
    LazyLock::new(|| LibraryWrapper::open(&[c"libOpenGL.so.0", c"libGL.so.1", c"libGL.so"]));

static GLES1_LIBRARY: LazyLock<LibraryWrapper> =
    LazyLock::new(|| LibraryWrapper::open(&[c"libGLESv1_CM.so.1", c"libGLESv1_CM.so"]));

static GLES2_LIBRARY: LazyLock<LibraryWrapper> =
    LazyLock::new(|| LibraryWrapper::open(&[c"libGLESv2.so.2", c"libGLESv2.so"]));

/// A `dlopen` handle, or null if none of the names could be opened.
pub(crate) struct LibraryWrapper(*mut c_void);

unsafe impl Send for LibraryWrapper {}
unsafe impl Sync for LibraryWrapper {}

impl LibraryWrapper {
    pub(crate) fn open(sonames: &[&CStr]) -> LibraryWrapper {
        for soname in sonames {
            unsafe {
                let handle = dlopen(soname.as_ptr(), RTLD_LAZY);
                if !handle.is_null() {
                    return LibraryWrapper(handle);
                }
            }
        }
        debug!("failed to open any of {:?}", sonames);
        LibraryWrapper(ptr::null_mut())
    }

    #[inline]
    pub(crate) fn is_loaded(&self) -> bool {
        !self.0.is_null()
    }

    pub(crate) fn symbol(&self, symbol_name: &str) -> *const c_void {
        if self.0.is_null() {
            return ptr::null();
        }
        let symbol_name = match CString::new(symbol_name) {
            Ok(symbol_name) => symbol_name,
            Err(_) => return ptr::null(),
        };
        unsafe { dlsym(self.0, symbol_name.as_ptr()).cast_const() }
    }
}

/// Returns true if libEGL could be opened.
pub(crate) fn egl_library_available() -> bool {
    EGL_LIBRARY.is_loaded()
}

fn get_proc_address(symbol_name: &str) -> *const c_void {
    EGL_LIBRARY.symbol(symbol_name)
}

/// `eglGetProcAddress`.
pub(crate) fn egl_get_proc_address(symbol_name: &str) -> *const c_void {
    let symbol_name = match CString::new(symbol_name) {
        Ok(symbol_name) => symbol_name,
        Err(_) => return ptr::null(),
    };
    EGL_FUNCTIONS.with(|egl| unsafe { egl.GetProcAddress(symbol_name.as_ptr()) as *const c_void })
}

/// Resolves GL entry points behind an EGL display.
///
/// Functions old enough to be exported by the client library are taken from it directly, since
/// `eglGetProcAddress` isn't required to return core functions before EGL 1.5.
pub(crate) struct EglProcLoader {
    api: DispatchApi,
}

impl EglProcLoader {
    pub(crate) fn new(api: DispatchApi) -> EglProcLoader {
        EglProcLoader { api }
    }

    fn client_library(&self) -> &'static LibraryWrapper {
        match self.api {
            DispatchApi::GL => &*GL_LIBRARY,
            DispatchApi::ES1 => &*GLES1_LIBRARY,
            DispatchApi::ES2 => &*GLES2_LIBRARY,
        }
    }

    fn static_version_limit(&self) -> u32 {
        match self.api {
            DispatchApi::GL | DispatchApi::ES1 => 11,
            DispatchApi::ES2 => 20,
        }
    }
}

impl ProcLoader for EglProcLoader {
    fn get_core_proc(&self, name: &str, gl_10x_version: u32) -> *const c_void {
        let library = self.client_library();
        if gl_10x_version <= self.static_version_limit() {
            let address = library.symbol(name);
            if !address.is_null() {
                return address;
            }
        }
        let address = egl_get_proc_address(name);
        if !address.is_null() {
            return address;
        }
        library.symbol(name)
    }

    fn get_ext_proc(&self, name: &str) -> *const c_void {
        egl_get_proc_address(name)
    }
}
