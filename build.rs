// piglit-framework/build.rs
//
//! The `piglit-framework` build script.

use cfg_aliases::cfg_aliases;
use gl_generator::{Api, Fallbacks, Profile, Registry, StructGenerator};
use std::env;
use std::fs::File;
use std::path::PathBuf;

fn main() {
    // Setup aliases for #[cfg] checks
    cfg_aliases! {
        // Platforms
        macos: { target_os = "macos" },
        android: { target_os = "android" },
        linux: { all(unix, not(any(macos, android, target_env = "ohos"))) },

        // Features that only make sense on certain platforms.
        x11: { all(linux, feature = "pf-x11") },
        toolkit: { all(linux, feature = "pf-winit") },
    }

    let target_family = env::var("CARGO_CFG_TARGET_FAMILY").ok();
    let dest = PathBuf::from(&env::var("OUT_DIR").unwrap());

    if target_family.as_ref().map_or(false, |f| f == "unix") {
        // Generate EGL bindings.
        let mut file = File::create(dest.join("egl_bindings.rs")).unwrap();
        let registry = Registry::new(
            Api::Egl,
            (1, 5),
            Profile::Core,
            Fallbacks::All,
            ["EGL_KHR_create_context", "EGL_EXT_platform_base"],
        );
        registry.write_bindings(StructGenerator, &mut file).unwrap();

        // Generate GLX bindings.
        let mut file = File::create(dest.join("glx_bindings.rs")).unwrap();
        let registry = Registry::new(
            Api::Glx,
            (1, 4),
            Profile::Core,
            Fallbacks::All,
            [
                "GLX_ARB_create_context",
                "GLX_ARB_create_context_profile",
                "GLX_ARB_get_proc_address",
                "GLX_ARB_multisample",
                "GLX_EXT_create_context_es2_profile",
            ],
        );
        registry.write_bindings(StructGenerator, &mut file).unwrap();
    }
}
