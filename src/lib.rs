// piglit-framework/src/lib.rs
//
//! The runtime under GL conformance tests.
//!
//! A test declares which context flavors it can run under, and callbacks for init and display.
//! This crate negotiates a context with the window system, loads GL entry points, drives the
//! callbacks and reports a single verdict to the runner that spawned the process.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

pub mod platform;
pub use crate::platform::{choose_platform, PlatformKind};

pub mod error;
pub use crate::error::{Error, WindowingApiError};

pub mod result;
pub use crate::result::{report, report_subtest_result, TestResult};

mod args;
pub use crate::args::HarnessOptions;

mod config;
pub use crate::config::{DisplayFunc, InitFunc, KeyboardFunc, ReshapeFunc};
pub use crate::config::{TestConfig, Visual, WindowConfig, DEFAULT_WINDOW_SIZE};

mod flavor;
pub use crate::flavor::{extract_flavors, ContextFlavor, ContextFlavorFlags};

pub mod dispatch;
pub use crate::dispatch::{DispatchPolicy, DispatchTable, FailurePolicy, Gate, ProcLoader};

mod info;
pub use crate::info::{DispatchApi, GLApi, GLInfo, GLVersion};

mod negotiation;
pub use crate::negotiation::{setup_gl, NegotiationState, Session};

mod framework;
pub use crate::framework::{default_keyboard, default_reshape, TestEnv};

mod subtest;
pub use crate::subtest::{run_subtests, Subtest};

mod harness;
pub use crate::harness::{run_test, Harness};

mod gl_utils;

#[cfg(x11)]
mod glx {
    include!(concat!(env!("OUT_DIR"), "/glx_bindings.rs"));
}

#[cfg(linux)]
#[allow(non_camel_case_types)]
mod egl {
    use std::os::raw::{c_long, c_void};
    pub type khronos_utime_nanoseconds_t = khronos_uint64_t;
    pub type khronos_uint64_t = u64;
    pub type khronos_ssize_t = c_long;
    pub type EGLint = i32;
    pub type EGLNativeDisplayType = *const c_void;
    pub type EGLNativePixmapType = *const c_void;
    pub type EGLNativeWindowType = *const c_void;
    pub type NativeDisplayType = EGLNativeDisplayType;
    pub type NativePixmapType = EGLNativePixmapType;
    pub type NativeWindowType = EGLNativeWindowType;
    include!(concat!(env!("OUT_DIR"), "/egl_bindings.rs"));
}

#[cfg(test)]
mod tests;
