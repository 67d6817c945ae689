// piglit-framework/src/platform/egl/ffi.rs
//
//! EGL tokens used by the harness that the 1.5 core bindings spell differently or lack.

#![allow(dead_code)]

use crate::egl::types::{EGLenum, EGLint};

pub const EGL_PLATFORM_GBM_KHR:          EGLenum = 0x31d7;
pub const EGL_PLATFORM_X11_KHR:          EGLenum = 0x31d5;
pub const EGL_PLATFORM_WAYLAND_KHR:      EGLenum = 0x31d8;

pub const EGL_OPENGL_ES_BIT:             EGLint = 0x0001;
pub const EGL_OPENGL_ES2_BIT:            EGLint = 0x0004;
pub const EGL_OPENGL_BIT:                EGLint = 0x0008;
pub const EGL_OPENGL_ES3_BIT_KHR:        EGLint = 0x0040;

pub const EGL_CONTEXT_MAJOR_VERSION_KHR: EGLint = 0x3098;
pub const EGL_CONTEXT_MINOR_VERSION_KHR: EGLint = 0x30fb;
pub const EGL_CONTEXT_FLAGS_KHR:         EGLint = 0x30fc;
pub const EGL_CONTEXT_OPENGL_PROFILE_MASK_KHR: EGLint = 0x30fd;

pub const EGL_CONTEXT_OPENGL_DEBUG_BIT_KHR:              EGLint = 0x0001;
pub const EGL_CONTEXT_OPENGL_FORWARD_COMPATIBLE_BIT_KHR: EGLint = 0x0002;
pub const EGL_CONTEXT_OPENGL_CORE_PROFILE_BIT_KHR:          EGLint = 0x0001;
pub const EGL_CONTEXT_OPENGL_COMPATIBILITY_PROFILE_BIT_KHR: EGLint = 0x0002;

// DRM fourcc codes, which GBM reuses as its format codes.
pub const GBM_FORMAT_XRGB8888: u32 = 0x3432_5258;
pub const GBM_FORMAT_ARGB8888: u32 = 0x3432_5241;
