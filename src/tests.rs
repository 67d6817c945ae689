// piglit-framework/src/tests.rs
//
//! Unit tests.

mod mock;

use self::mock::{last_viewport, make_current, MockLoader, MockPlatform};
use crate::args::{force_window_from_env, parse_c_ulong, process_args, HarnessOptions};
use crate::config::{TestConfig, Visual, WindowConfig};
use crate::dispatch::{DispatchPolicy, DispatchTable, FailurePolicy, Gate};
use crate::framework::TestEnv;
use crate::flavor::{extract_flavors, ContextFlavor, ContextFlavorFlags};
use crate::harness::{check_platform_kind, run_on_platform, try_flavors, Harness};
use crate::info::{DispatchApi, GLApi, GLInfo, GLVersion};
use crate::negotiation::setup_gl;
use crate::platform::{choose_platform, ConfigRequest, PlatformKind, WindowEvent};
use crate::result::{report, subtest_report_line, TestResult};
use crate::subtest::{run_subtests, Subtest};
use crate::Error;

use euclid::default::Size2D;
use serial_test::serial;
use std::cell::{Cell, RefCell};
use std::env;
use std::process::Command;
use std::rc::Rc;

const REPORT_CHILD_VAR: &str = "PIGLIT_FRAMEWORK_TEST_REPORT";

fn flavor(api: GLApi, version: u32) -> ContextFlavor {
    ContextFlavor::new(api, version, ContextFlavorFlags::empty()).unwrap()
}

fn default_window() -> WindowConfig {
    TestConfig::default().window()
}

fn automatic() -> HarnessOptions {
    HarnessOptions { automatic: true, ..HarnessOptions::default() }
}

fn args() -> Vec<String> {
    vec!["test".to_owned()]
}

// Every display call bumps the returned counter and answers `result`.
fn counting_display(config: &mut TestConfig, result: TestResult) -> Rc<Cell<usize>> {
    let displays = Rc::new(Cell::new(0));
    let counter = displays.clone();
    config.display = Some(Box::new(move |_: &mut TestEnv<'_>| {
        counter.set(counter.get() + 1);
        result
    }));
    displays
}

#[test]
fn test_flavor_version_ranges() {
    let cases = [
        (GLApi::Core, 30, false),
        (GLApi::Core, 31, true),
        (GLApi::Core, 43, true),
        (GLApi::Core, 44, false),
        (GLApi::Compatibility, 9, false),
        (GLApi::Compatibility, 10, true),
        (GLApi::Compatibility, 43, true),
        (GLApi::Compatibility, 44, false),
        (GLApi::Es1, 10, true),
        (GLApi::Es1, 11, true),
        (GLApi::Es1, 12, false),
        (GLApi::Es1, 20, false),
        (GLApi::Es2, 11, false),
        (GLApi::Es2, 20, true),
        (GLApi::Es2, 31, true),
        (GLApi::Es2, 32, false),
    ];
    for &(api, version, valid) in &cases {
        let result = ContextFlavor::new(api, version, ContextFlavorFlags::empty());
        assert_eq!(result.is_ok(), valid, "{:?} {}", api, version);
        if let Err(err) = result {
            assert!(matches!(err, Error::InvalidFlavor(_)));
            assert!(err.is_fatal());
        }
    }
}

#[test]
fn test_forward_compatible_flavors() {
    let forward = ContextFlavorFlags::FORWARD_COMPATIBLE;
    assert!(ContextFlavor::new(GLApi::Core, 31, forward).is_ok());
    assert!(ContextFlavor::new(GLApi::Compatibility, 30, forward).is_ok());
    assert!(ContextFlavor::new(GLApi::Compatibility, 21, forward).is_err());
    assert!(ContextFlavor::new(GLApi::Es1, 11, forward).is_err());
    assert!(ContextFlavor::new(GLApi::Es2, 20, forward).is_err());
    assert!(ContextFlavor::new(GLApi::Es2, 30, forward).is_err());

    // Debug is legal everywhere.
    assert!(ContextFlavor::new(GLApi::Es1, 11, ContextFlavorFlags::DEBUG).is_ok());
    assert!(ContextFlavor::new(GLApi::Compatibility, 10, ContextFlavorFlags::DEBUG).is_ok());
}

#[test]
fn test_flavor_names() {
    let flags = ContextFlavorFlags::FORWARD_COMPATIBLE | ContextFlavorFlags::DEBUG;
    let core = ContextFlavor::new(GLApi::Core, 32, flags).unwrap();
    assert_eq!(core.to_string(), "OpenGL Core 3.2 Forward-Compatible Debug Context");
    assert_eq!(
        flavor(GLApi::Compatibility, 21).to_string(),
        "OpenGL Compatibility 2.1 Context"
    );
    assert_eq!(flavor(GLApi::Es2, 20).to_string(), "OpenGL ES 2.0 Context");
    let es1 = ContextFlavor::new(GLApi::Es1, 11, ContextFlavorFlags::DEBUG).unwrap();
    assert_eq!(es1.to_string(), "OpenGL ES 1.1 Debug Context");
}

#[test]
fn test_extract_flavors_order() {
    let mut config = TestConfig::default();
    config.supports_gl_es_version = 20;
    config.supports_gl_compat_version = 21;
    config.supports_gl_core_version = 32;
    config.require_debug_context = true;
    let flavors = extract_flavors(&config).unwrap();
    let apis: Vec<GLApi> = flavors.iter().map(ContextFlavor::api).collect();
    assert_eq!(apis, vec![GLApi::Core, GLApi::Compatibility, GLApi::Es2]);
    assert!(flavors.iter().all(ContextFlavor::is_debug));

    config.supports_gl_core_version = 0;
    config.supports_gl_es_version = 11;
    let flavors = extract_flavors(&config).unwrap();
    let apis: Vec<GLApi> = flavors.iter().map(ContextFlavor::api).collect();
    assert_eq!(apis, vec![GLApi::Compatibility, GLApi::Es1]);

    let mut config = TestConfig::default();
    config.supports_gl_core_version = 31;
    let flavors = extract_flavors(&config).unwrap();
    assert_eq!(flavors.len(), 1);
    assert_eq!(flavors[0].api(), GLApi::Core);
}

#[test]
fn test_extract_flavors_errors() {
    assert_eq!(extract_flavors(&TestConfig::default()), Err(Error::NoFlavorDeclared));

    let mut config = TestConfig::default();
    config.supports_gl_core_version = 30;
    assert!(matches!(extract_flavors(&config), Err(Error::InvalidFlavor(_))));

    let mut config = TestConfig::default();
    config.supports_gl_compat_version = 20;
    config.require_forward_compatible_context = true;
    assert!(matches!(extract_flavors(&config), Err(Error::InvalidFlavor(_))));
}

#[test]
fn test_gl_version_parse() {
    let cases = [
        ("4.6 (Core Profile) Mesa 23.1.0", GLVersion::new(4, 6), false),
        ("3.0 Mesa 10.1", GLVersion::new(3, 0), false),
        ("2.1.2 NVIDIA 340.108", GLVersion::new(2, 1), false),
        ("OpenGL ES 3.2 Mesa 23.1.0", GLVersion::new(3, 2), true),
        ("OpenGL ES-CM 1.1 Mesa", GLVersion::new(1, 1), true),
        ("OpenGL ES 2.0", GLVersion::new(2, 0), true),
    ];
    for &(string, version, is_es) in &cases {
        assert_eq!(GLVersion::parse(string), Some((version, is_es)), "{}", string);
    }
    assert_eq!(GLVersion::parse("garbage"), None);
    assert_eq!(GLVersion::parse(""), None);
}

#[test]
fn test_gl_info_core_profile() {
    assert!(GLInfo::new("3.2 Mock", vec![]).unwrap().is_core_profile);
    assert!(GLInfo::new("3.1 Mock", vec![]).unwrap().is_core_profile);
    let compat = GLInfo::new("3.2 Mock", vec!["GL_ARB_compatibility".to_owned()]).unwrap();
    assert!(!compat.is_core_profile);
    assert!(compat.has_extension("GL_ARB_compatibility"));
    assert!(!compat.has_extension(""));
    assert!(!GLInfo::new("3.0 Mock", vec![]).unwrap().is_core_profile);
    assert!(!GLInfo::new("OpenGL ES 3.1", vec![]).unwrap().is_core_profile);
}

#[test]
fn test_merge_results() {
    let mut overall = TestResult::Skip;
    overall.merge(TestResult::Skip);
    assert_eq!(overall, TestResult::Skip);
    overall.merge(TestResult::Pass);
    assert_eq!(overall, TestResult::Pass);
    overall.merge(TestResult::Skip);
    assert_eq!(overall, TestResult::Pass);
    overall.merge(TestResult::Warn);
    assert_eq!(overall, TestResult::Warn);
    overall.merge(TestResult::Pass);
    assert_eq!(overall, TestResult::Warn);
    overall.merge(TestResult::Fail);
    assert_eq!(overall, TestResult::Fail);
    overall.merge(TestResult::Warn);
    overall.merge(TestResult::Pass);
    overall.merge(TestResult::Skip);
    assert_eq!(overall, TestResult::Fail);
}

#[test]
fn test_report_lines() {
    assert_eq!(TestResult::Pass.report_line(), "PIGLIT: {'result': 'pass' }");
    assert_eq!(TestResult::Fail.report_line(), "PIGLIT: {'result': 'fail' }");
    assert_eq!(TestResult::Skip.report_line(), "PIGLIT: {'result': 'skip' }");
    assert_eq!(TestResult::Warn.report_line(), "PIGLIT: {'result': 'warn' }");
    assert_eq!(subtest_report_line("foo", TestResult::Pass), "PIGLIT: {'subtest': {'foo' : 'pass'}}");

    assert_eq!(TestResult::Fail.exit_code(), 1);
    for &result in &[TestResult::Pass, TestResult::Skip, TestResult::Warn] {
        assert_eq!(result.exit_code(), 0);
    }
}

// Re-runs this test in a child process, which reports the verdict named in the environment.
#[test]
fn test_report_exits_with_verdict() {
    if let Ok(verdict) = env::var(REPORT_CHILD_VAR) {
        let result = match &*verdict {
            "fail" => TestResult::Fail,
            "skip" => TestResult::Skip,
            "warn" => TestResult::Warn,
            _ => TestResult::Pass,
        };
        report(result);
    }

    for &(verdict, code) in &[("pass", 0), ("fail", 1), ("skip", 0), ("warn", 0)] {
        let output = Command::new(env::current_exe().unwrap())
            .args(["tests::test_report_exits_with_verdict", "--exact", "--nocapture"])
            .env(REPORT_CHILD_VAR, verdict)
            .output()
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = format!("PIGLIT: {{'result': '{}' }}", verdict);
        assert!(stdout.contains(&line), "no result line in {:?}", stdout);
        assert_eq!(output.status.code(), Some(code));
    }
}

#[test]
fn test_process_args() {
    let mut config = TestConfig::default();
    config.subtests = vec!["a".to_owned(), "b".to_owned()];
    let mut args: Vec<String> =
        ["test", "-auto", "-fbo", "-rlimit", "0x1000", "-samples=4", "-subtest", "b", "extra"]
            .iter()
            .map(|arg| arg.to_string())
            .collect();
    let options = process_args(&mut args, &mut config).unwrap();

    assert!(options.automatic);
    assert!(options.use_fbo);
    assert_eq!(options.rlimit, Some(4096));
    assert_eq!(options.force_samples, 4);
    assert_eq!(options.selected_subtests, vec!["b".to_owned()]);
    assert!(!options.list_subtests);
    assert_eq!(args, vec!["test".to_owned(), "extra".to_owned()]);
    assert_eq!(config.window_samples, 4);
}

#[test]
fn test_process_args_errors() {
    let run = |list: &[&str], subtests: &[&str]| {
        let mut config = TestConfig::default();
        config.subtests = subtests.iter().map(|name| name.to_string()).collect();
        let mut args: Vec<String> = list.iter().map(|arg| arg.to_string()).collect();
        process_args(&mut args, &mut config)
    };

    let err = run(&["test", "-rlimit"], &[]).unwrap_err();
    assert!(matches!(err, Error::BadArgument(_)));
    assert!(err.is_fatal());
    assert!(run(&["test", "-rlimit", "lots"], &[]).is_err());
    assert!(run(&["test", "-subtest"], &["a"]).is_err());
    assert!(run(&["test", "-subtest", "c"], &["a", "b"]).is_err());
    assert!(run(&["test", "-subtest", "a"], &[]).is_err());

    // A sample count of one leaves the configuration alone.
    let mut config = TestConfig::default();
    config.window_samples = 2;
    let mut args = vec!["test".to_owned(), "-samples=1".to_owned()];
    process_args(&mut args, &mut config).unwrap();
    assert_eq!(config.window_samples, 2);
}

#[test]
fn test_parse_c_ulong() {
    assert_eq!(parse_c_ulong("123"), Some(123));
    assert_eq!(parse_c_ulong("0x1F"), Some(31));
    assert_eq!(parse_c_ulong("017"), Some(15));
    assert_eq!(parse_c_ulong("  42abc"), Some(42));
    assert_eq!(parse_c_ulong("+7"), Some(7));
    assert_eq!(parse_c_ulong("0x"), Some(0));
    assert_eq!(parse_c_ulong("abc"), None);
    assert_eq!(parse_c_ulong(""), None);
}

#[test]
fn test_choose_platform() {
    let core = flavor(GLApi::Core, 31);
    let es = flavor(GLApi::Es2, 20);
    assert_eq!(choose_platform(None, &core), Ok(PlatformKind::Glx));
    assert_eq!(choose_platform(None, &es), Ok(PlatformKind::X11Egl));
    assert_eq!(choose_platform(Some("glx"), &es), Ok(PlatformKind::Glx));
    assert_eq!(choose_platform(Some("x11_egl"), &core), Ok(PlatformKind::X11Egl));
    assert_eq!(choose_platform(Some("wayland"), &core), Ok(PlatformKind::Wayland));
    assert_eq!(choose_platform(Some("gbm"), &core), Ok(PlatformKind::Gbm));
    assert_eq!(choose_platform(Some("winit"), &core), Ok(PlatformKind::Winit));

    let err = choose_platform(Some("bogus"), &core).unwrap_err();
    assert_eq!(err, Error::BadPlatformSelection("bogus".to_owned()));
    assert!(err.is_fatal());
}

#[test]
fn test_force_window_from_env() {
    assert_eq!(force_window_from_env(None), Ok(false));
    assert_eq!(force_window_from_env(Some("0")), Ok(false));
    assert_eq!(force_window_from_env(Some("1")), Ok(true));
    assert!(force_window_from_env(Some("yes")).unwrap_err().is_fatal());
    assert!(force_window_from_env(Some("")).is_err());
}

#[test]
fn test_config_request_profiles() {
    let window = default_window();
    let request = ConfigRequest::new(&flavor(GLApi::Core, 31), &window, true);
    assert_eq!(request.profile, None);
    let request = ConfigRequest::new(&flavor(GLApi::Core, 32), &window, true);
    assert_eq!(request.profile, Some(crate::platform::Profile::Core));
    let request = ConfigRequest::new(&flavor(GLApi::Compatibility, 33), &window, true);
    assert_eq!(request.profile, Some(crate::platform::Profile::Compatibility));
    let request = ConfigRequest::new(&flavor(GLApi::Es2, 30), &window, true);
    assert_eq!(request.client_api, crate::platform::ClientApi::OpenGLES3);

    // Without DOUBLE in the visual the request is explicitly single-buffered.
    let request = ConfigRequest::new(&flavor(GLApi::Compatibility, 20), &window, true);
    assert!(!request.double_buffered);
    let mut double = window;
    double.visual = Visual::RGB | Visual::DOUBLE;
    let request = ConfigRequest::new(&flavor(GLApi::Compatibility, 20), &double, true);
    assert!(request.double_buffered);
    let request = ConfigRequest::new(&flavor(GLApi::Compatibility, 20), &double, false);
    assert!(!request.double_buffered);

    // Off-screen requests don't carry the window's visual.
    let mut window = window;
    window.samples = 4;
    let request = ConfigRequest::new(&flavor(GLApi::Compatibility, 20), &window, true);
    assert_eq!((request.red_size, request.samples), (1, 4));
    let request = ConfigRequest::new(&flavor(GLApi::Compatibility, 20), &window, false);
    assert_eq!((request.red_size, request.samples), (0, 0));
}

fn current_dispatch(version: &str, extensions: &[&str]) -> DispatchTable {
    let extensions: Vec<String> = extensions.iter().map(|name| name.to_string()).collect();
    make_current(version, &extensions);
    let mut dispatch = DispatchTable::new();
    assert!(dispatch.init(DispatchApi::GL, Rc::new(MockLoader)));
    dispatch
}

#[test]
fn test_unsupported_function_skips() {
    let mut dispatch = current_dispatch("2.1 Mock", &[]);
    assert_eq!(dispatch.resolve("glGetStringi", Gate::Core(30)), Err(TestResult::Skip));
    assert_eq!(
        dispatch.resolve("glDebugMessageInsertARB", Gate::Extension("GL_ARB_debug_output")),
        Err(TestResult::Skip)
    );
    assert!(!dispatch.resolve("glViewport", Gate::Core(10)).unwrap().is_null());
}

#[test]
fn test_resolve_failure_fails() {
    let mut dispatch = current_dispatch("3.0 Mock", &["GL_EXT_missing"]);
    assert_eq!(dispatch.resolve("glNotAFunction", Gate::Core(20)), Err(TestResult::Fail));
    assert_eq!(
        dispatch.resolve("glMissingEXT", Gate::Extension("GL_EXT_missing")),
        Err(TestResult::Fail)
    );
}

#[test]
fn test_resolve_supported_functions() {
    let mut dispatch = current_dispatch("3.0 Mock", &["GL_ARB_debug_output"]);
    assert!(!dispatch.resolve("glGetStringi", Gate::Core(30)).unwrap().is_null());
    let address = dispatch
        .resolve("glDebugMessageInsertARB", Gate::Extension("GL_ARB_debug_output"))
        .unwrap();
    assert!(!address.is_null());
    // Cached the second time around.
    assert_eq!(
        dispatch.resolve("glDebugMessageInsertARB", Gate::Extension("GL_ARB_debug_output")),
        Ok(address)
    );
}

#[test]
fn test_failure_policies_and_hooks() {
    let seen = Rc::new(RefCell::new(vec![]));
    let unsupported = seen.clone();
    let mut dispatch = current_dispatch("2.0 Mock", &[]);
    dispatch.set_policy(DispatchPolicy {
        unsupported: FailurePolicy::ReturnNull,
        resolve_failure: FailurePolicy::Skip,
        unsupported_hook: Some(Box::new(move |name: &str| {
            unsupported.borrow_mut().push(name.to_owned())
        })),
        resolve_failure_hook: None,
    });

    assert!(dispatch.resolve("glGetStringi", Gate::Core(30)).unwrap().is_null());
    assert_eq!(*seen.borrow(), vec!["glGetStringi".to_owned()]);
    assert_eq!(dispatch.resolve("glNotAFunction", Gate::Core(10)), Err(TestResult::Skip));
    assert_eq!(seen.borrow().len(), 1);

    type GetStringi = unsafe extern "C" fn(u32, u32) -> *const u8;
    let result = unsafe { dispatch.resolve_as::<GetStringi>("glGetStringi", Gate::Core(30)) };
    assert_eq!(result.err(), Some(TestResult::Skip));
}

#[test]
fn test_resolve_any_prefers_supported_alias() {
    let mut dispatch = current_dispatch("2.1 Mock", &["GL_ARB_debug_output"]);
    let aliases = [
        ("glDebugMessageInsert", Gate::Core(43)),
        ("glDebugMessageInsertARB", Gate::Extension("GL_ARB_debug_output")),
    ];
    assert!(!dispatch.resolve_any(&aliases).unwrap().is_null());

    let mut dispatch = current_dispatch("2.1 Mock", &[]);
    assert_eq!(dispatch.resolve_any(&aliases), Err(TestResult::Skip));
}

#[test]
fn test_dispatch_init_latches_per_api() {
    let mut dispatch = DispatchTable::new();
    assert_eq!(dispatch.info().err(), Some(Error::DispatchNotInitialized));
    assert_eq!(dispatch.resolve("glViewport", Gate::Core(10)), Err(TestResult::Fail));

    make_current("OpenGL ES 2.0 Mock", &["GL_OES_mapbuffer".to_owned()]);
    assert!(dispatch.init(DispatchApi::ES2, Rc::new(MockLoader)));
    assert!(!dispatch.init(DispatchApi::ES2, Rc::new(MockLoader)));
    let info = dispatch.info().unwrap();
    assert!(info.is_es);
    assert_eq!(info.version, 20);
    assert!(info.has_extension("GL_OES_mapbuffer"));

    assert!(dispatch.init(DispatchApi::GL, Rc::new(MockLoader)));
    assert_eq!(dispatch.api(), Some(DispatchApi::GL));
}

#[test]
fn test_reinitialize_extensions_requeries() {
    let mut dispatch = current_dispatch("3.0 Mock", &[]);
    assert!(!dispatch.info().unwrap().has_extension("GL_ARB_debug_output"));

    make_current("3.0 Mock", &["GL_ARB_debug_output".to_owned()]);
    assert!(!dispatch.info().unwrap().has_extension("GL_ARB_debug_output"));
    dispatch.reinitialize_extensions();
    assert!(dispatch.info().unwrap().has_extension("GL_ARB_debug_output"));
}

#[test]
fn test_setup_gl_and_teardown() {
    let mut platform = MockPlatform::new();
    let mut dispatch = DispatchTable::new();
    let session =
        setup_gl(&mut platform, &mut dispatch, &flavor(GLApi::Core, 32), &default_window(), true)
            .unwrap();
    assert_eq!(session.info().version, 32);
    assert!(session.info().is_core_profile);
    assert_eq!(session.flavor().version(), 32);
    assert_eq!((platform.live_configs, platform.live_contexts, platform.live_drawables), (1, 1, 1));
    assert_eq!(dispatch.api(), Some(DispatchApi::GL));

    session.destroy(&mut platform, &mut dispatch);
    assert_eq!(platform.live_resources(), 0);
}

#[test]
fn test_failed_steps_leak_nothing() {
    let window = default_window();

    let mut platform = MockPlatform::new();
    platform.fail_config_for = vec![GLApi::Core];
    let mut dispatch = DispatchTable::new();
    let result = setup_gl(&mut platform, &mut dispatch, &flavor(GLApi::Core, 31), &window, true);
    assert_eq!(result.err(), Some(Error::NoPixelFormatFound));
    assert!(platform.requests.is_empty());
    assert_eq!(platform.live_resources(), 0);

    let mut platform = MockPlatform::new();
    platform.fail_context = true;
    let result = setup_gl(&mut platform, &mut dispatch, &flavor(GLApi::Core, 31), &window, true);
    assert!(matches!(result.err(), Some(Error::ContextCreationFailed(_))));
    assert_eq!(platform.live_resources(), 0);

    let mut platform = MockPlatform::new();
    platform.fail_drawable = true;
    let result = setup_gl(&mut platform, &mut dispatch, &flavor(GLApi::Es2, 20), &window, true);
    let err = result.err().unwrap();
    assert!(matches!(err, Error::SurfaceCreationFailed(_)));
    assert!(!err.is_fatal());
    assert_eq!(platform.live_resources(), 0);

    let mut platform = MockPlatform::new();
    platform.fail_make_current = true;
    let result = setup_gl(&mut platform, &mut dispatch, &flavor(GLApi::Es2, 20), &window, true);
    assert!(result.err().unwrap().is_fatal());
    assert_eq!(platform.live_resources(), 0);
}

#[test]
fn test_version_downgrade_is_rejected() {
    let mut platform = MockPlatform::with_responder(Box::new(|_: &ConfigRequest| {
        ("2.1 Mock".to_owned(), vec![])
    }));
    let mut dispatch = DispatchTable::new();
    let flavor = flavor(GLApi::Compatibility, 30);
    let err = setup_gl(&mut platform, &mut dispatch, &flavor, &default_window(), true)
        .err()
        .unwrap();
    assert_eq!(err, Error::UnsupportedGLVersion { requested: 30, actual: 21 });
    assert!(!err.is_fatal());
    assert_eq!(platform.live_resources(), 0);
}

#[test]
fn test_gl31_profile_retry() {
    // 3.1 comes back with GL_ARB_compatibility, which a core request can't accept.
    let mut platform = MockPlatform::with_responder(Box::new(|request: &ConfigRequest| {
        if request.version == GLVersion::new(3, 1) {
            ("3.1 Mock".to_owned(), vec!["GL_ARB_compatibility".to_owned()])
        } else {
            ("3.2 (Core Profile) Mock".to_owned(), vec![])
        }
    }));
    let mut dispatch = DispatchTable::new();
    let session =
        setup_gl(&mut platform, &mut dispatch, &flavor(GLApi::Core, 31), &default_window(), true)
            .unwrap();

    let versions: Vec<GLVersion> = platform.requests.iter().map(|request| request.version).collect();
    assert_eq!(versions, vec![GLVersion::new(3, 1), GLVersion::new(3, 2)]);
    // The first context was gone before the second was asked for.
    assert_eq!(platform.requests[1].live_contexts, 0);
    assert_eq!(session.flavor().version(), 32);
    assert_eq!(session.flavor().api(), GLApi::Core);
    assert!(session.info().is_core_profile);
    assert_eq!((platform.live_configs, platform.live_contexts, platform.live_drawables), (1, 1, 1));

    session.destroy(&mut platform, &mut dispatch);
    assert_eq!(platform.live_resources(), 0);
}

#[test]
fn test_gl31_compat_retry() {
    let mut platform = MockPlatform::with_responder(Box::new(|request: &ConfigRequest| {
        if request.version == GLVersion::new(3, 1) {
            ("3.1 Mock".to_owned(), vec![])
        } else {
            ("3.2 Mock".to_owned(), vec!["GL_ARB_compatibility".to_owned()])
        }
    }));
    let mut dispatch = DispatchTable::new();
    let flavor = flavor(GLApi::Compatibility, 31);
    let session = setup_gl(&mut platform, &mut dispatch, &flavor, &default_window(), true).unwrap();
    assert_eq!(platform.requests.len(), 2);
    assert_eq!(session.flavor().api(), GLApi::Compatibility);
    assert!(!session.info().is_core_profile);
    session.destroy(&mut platform, &mut dispatch);
}

#[test]
fn test_gl31_profile_retry_happens_once() {
    let mut platform = MockPlatform::with_responder(Box::new(|_: &ConfigRequest| {
        ("3.1 Mock".to_owned(), vec!["GL_ARB_compatibility".to_owned()])
    }));
    let mut dispatch = DispatchTable::new();
    let err =
        setup_gl(&mut platform, &mut dispatch, &flavor(GLApi::Core, 31), &default_window(), true)
            .err()
            .unwrap();
    assert_eq!(err, Error::UnsupportedGLVersion { requested: 32, actual: 31 });
    assert_eq!(platform.requests.len(), 2);
    assert_eq!(platform.live_resources(), 0);
}

#[test]
#[serial]
fn test_unavailable_flavor_falls_through() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    config.supports_gl_core_version = 31;
    config.supports_gl_compat_version = 20;
    let displays = counting_display(&mut config, TestResult::Pass);
    let flavors = extract_flavors(&config).unwrap();
    let window = config.window();
    let mut callbacks = config.take_callbacks();

    let mut platform = MockPlatform::new();
    platform.fail_config_for = vec![GLApi::Core];
    let mut dispatch = DispatchTable::new();
    let (options, args) = (automatic(), args());
    let result = try_flavors(&flavors, |flavor| {
        run_on_platform(&mut platform, &mut dispatch, flavor, &options, &window, &mut callbacks, &args)
    });

    assert_eq!(result, TestResult::Pass);
    assert_eq!(displays.get(), 1);
    assert_eq!(platform.requests.len(), 1);
    assert_eq!(platform.requests[0].api, GLApi::Compatibility);
    assert!(!platform.shown);
    assert_eq!(platform.live_resources(), 0);
}

#[test]
fn test_no_available_flavor_skips() {
    let mut config = TestConfig::default();
    config.supports_gl_core_version = 31;
    config.supports_gl_compat_version = 20;
    let displays = counting_display(&mut config, TestResult::Pass);
    let flavors = extract_flavors(&config).unwrap();
    let window = config.window();
    let mut callbacks = config.take_callbacks();

    let mut platform = MockPlatform::new();
    platform.fail_config_for = vec![GLApi::Core, GLApi::Compatibility];
    let mut dispatch = DispatchTable::new();
    let (options, args) = (automatic(), args());
    let result = try_flavors(&flavors, |flavor| {
        run_on_platform(&mut platform, &mut dispatch, flavor, &options, &window, &mut callbacks, &args)
    });

    assert_eq!(result, TestResult::Skip);
    assert_eq!(displays.get(), 0);
    assert_eq!(platform.live_resources(), 0);
}

#[test]
fn test_fatal_error_stops_flavor_loop() {
    let mut config = TestConfig::default();
    config.supports_gl_core_version = 31;
    config.supports_gl_compat_version = 20;
    let flavors = extract_flavors(&config).unwrap();
    let window = config.window();
    let mut callbacks = config.take_callbacks();

    let mut platform = MockPlatform::new();
    platform.fail_make_current = true;
    let mut dispatch = DispatchTable::new();
    let (options, args) = (automatic(), args());
    let result = try_flavors(&flavors, |flavor| {
        run_on_platform(&mut platform, &mut dispatch, flavor, &options, &window, &mut callbacks, &args)
    });

    assert_eq!(result, TestResult::Fail);
    assert_eq!(platform.requests.len(), 1);
    assert_eq!(platform.live_resources(), 0);
}

#[test]
fn test_check_platform_kind() {
    assert_eq!(check_platform_kind(None, PlatformKind::Wayland), Ok(()));
    assert_eq!(check_platform_kind(Some(PlatformKind::Glx), PlatformKind::Glx), Ok(()));
    let err = check_platform_kind(Some(PlatformKind::Glx), PlatformKind::X11Egl).unwrap_err();
    assert_eq!(
        err,
        Error::PlatformMismatch { current: PlatformKind::Glx, requested: PlatformKind::X11Egl }
    );
    assert!(err.is_fatal());
}

#[test]
fn test_second_platform_kind_fails() {
    let mut config = TestConfig::default();
    config.supports_gl_compat_version = 20;
    config.supports_gl_es_version = 20;
    let displays = counting_display(&mut config, TestResult::Pass);
    let flavors = extract_flavors(&config).unwrap();
    let window = config.window();
    let mut callbacks = config.take_callbacks();

    // The desktop flavor binds the process to GLX and then fails; the ES flavor wants EGL.
    let mut platform = MockPlatform::new();
    platform.fail_config_for = vec![GLApi::Compatibility];
    let mut dispatch = DispatchTable::new();
    let (options, args) = (automatic(), args());
    let mut bound = None;
    let result = try_flavors(&flavors, |flavor| {
        let kind = choose_platform(None, flavor)?;
        check_platform_kind(bound, kind)?;
        bound = Some(kind);
        platform.kind = kind;
        run_on_platform(&mut platform, &mut dispatch, flavor, &options, &window, &mut callbacks, &args)
    });

    assert_eq!(result, TestResult::Fail);
    assert_eq!(bound, Some(PlatformKind::Glx));
    assert_eq!(displays.get(), 0);
    assert!(platform.requests.is_empty());
    assert_eq!(platform.live_resources(), 0);
}

#[cfg(x11)]
#[test]
fn test_destroyed_window_frees_colormap() {
    use crate::platform::unix::x11::XlibDisplay;

    // Needs a running X server.
    let display = match XlibDisplay::open() {
        Ok(display) => display,
        Err(_) => return,
    };
    let visual_id = unsafe {
        let visual = (display.xlib.XDefaultVisual)(display.display, display.default_screen());
        (display.xlib.XVisualIDFromVisual)(visual)
    };
    let visual_info = display.visual_info(visual_id).unwrap();
    let window = display.create_window(&visual_info, Size2D::new(32, 32)).unwrap();
    display.destroy_window(window);

    // Freeing the colormap a second time must fail: it's already gone.
    let ((), x_error) = display.with_error_trap(|| unsafe {
        (display.xlib.XFreeColormap)(display.display, window.colormap);
    });
    assert!(x_error.is_some());
}

#[test]
#[serial]
fn test_harness_configuration_errors_fail() {
    env::remove_var("PIGLIT_PLATFORM");
    let mut config = TestConfig::default();
    config.supports_gl_core_version = 31;
    let args = vec!["test".to_owned(), "-rlimit".to_owned()];
    assert_eq!(Harness::new().run(config, args), TestResult::Fail);

    assert_eq!(Harness::new().run(TestConfig::default(), vec!["test".to_owned()]), TestResult::Fail);

    env::set_var("PIGLIT_PLATFORM", "bogus");
    let mut config = TestConfig::default();
    config.supports_gl_core_version = 31;
    let result = Harness::new().run(config, vec!["test".to_owned()]);
    env::remove_var("PIGLIT_PLATFORM");
    assert_eq!(result, TestResult::Fail);
}

#[test]
fn test_harness_lists_subtests() {
    let mut config = TestConfig::default();
    config.subtests = vec!["first".to_owned(), "second".to_owned()];
    let args = vec!["test".to_owned(), "-list-subtests".to_owned()];
    assert_eq!(Harness::new().run(config, args), TestResult::Pass);
}

fn run_one(
    platform: &mut MockPlatform,
    config: TestConfig,
    options: &HarnessOptions,
    flavor: ContextFlavor,
) -> Result<TestResult, Error> {
    let mut config = config;
    let window = config.window();
    let mut callbacks = config.take_callbacks();
    let mut dispatch = DispatchTable::new();
    run_on_platform(platform, &mut dispatch, &flavor, options, &window, &mut callbacks, &args())
}

#[test]
#[serial]
fn test_automatic_run_displays_once_offscreen() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    let displays = counting_display(&mut config, TestResult::Warn);
    let init_args = Rc::new(RefCell::new(vec![]));
    let seen_args = init_args.clone();
    config.init = Some(Box::new(move |_: &mut TestEnv<'_>, args: &[String]| {
        *seen_args.borrow_mut() = args.to_vec();
        Ok(())
    }));

    let mut platform = MockPlatform::new();
    platform.events.push_back(WindowEvent::Expose);
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Compatibility, 20));

    assert_eq!(result, Ok(TestResult::Warn));
    assert_eq!(displays.get(), 1);
    assert_eq!(*init_args.borrow(), vec!["test".to_owned()]);
    assert!(!platform.shown);
    assert_eq!(platform.events.len(), 1);
    assert_eq!(last_viewport(), Some((0, 0, 160, 160)));
    assert_eq!(platform.live_resources(), 0);
}

#[test]
#[serial]
fn test_forced_window_runs_event_loop() {
    env::set_var("PIGLIT_FORCE_WINDOW", "1");
    let mut config = TestConfig::default();
    let displays = counting_display(&mut config, TestResult::Pass);
    let mut platform = MockPlatform::new();
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Compatibility, 20));
    env::remove_var("PIGLIT_FORCE_WINDOW");

    assert_eq!(result, Ok(TestResult::Pass));
    assert!(platform.shown);
    assert_eq!(displays.get(), 1);
}

#[test]
#[serial]
fn test_bad_force_window_fails() {
    env::set_var("PIGLIT_FORCE_WINDOW", "maybe");
    let mut config = TestConfig::default();
    let displays = counting_display(&mut config, TestResult::Pass);
    let mut platform = MockPlatform::new();
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Compatibility, 20));
    env::remove_var("PIGLIT_FORCE_WINDOW");

    assert_eq!(result, Ok(TestResult::Fail));
    assert_eq!(displays.get(), 0);
    assert_eq!(platform.live_resources(), 0);
}

#[test]
#[serial]
fn test_interactive_run_delivers_events() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    let displays = Rc::new(Cell::new(0));
    let counter = displays.clone();
    config.display = Some(Box::new(move |env: &mut TestEnv<'_>| {
        counter.set(counter.get() + 1);
        match env.swap_buffers() {
            Ok(()) => TestResult::Pass,
            Err(result) => result,
        }
    }));

    let mut platform = MockPlatform::new();
    platform.events.extend(vec![
        WindowEvent::Resize(Size2D::new(200, 100)),
        WindowEvent::Key { key: b'a', x: 1, y: 2 },
        WindowEvent::Key { key: 27, x: 1, y: 2 },
    ]);
    let options = HarnessOptions::default();
    let result = run_one(&mut platform, config, &options, flavor(GLApi::Compatibility, 20));

    assert_eq!(result, Ok(TestResult::Pass));
    assert!(platform.shown);
    assert_eq!(displays.get(), 1);
    assert_eq!(platform.swaps, 1);
    assert!(platform.events.is_empty());
    assert_eq!(last_viewport(), Some((0, 0, 200, 100)));
    assert_eq!(platform.live_resources(), 0);
}

#[test]
#[serial]
fn test_spurious_resize_in_automatic_run_warns() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    config.requires_displayed_window = true;
    let displays = counting_display(&mut config, TestResult::Pass);

    let mut platform = MockPlatform::new();
    platform.events.push_back(WindowEvent::Resize(Size2D::new(300, 300)));
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Compatibility, 20));

    assert_eq!(result, Ok(TestResult::Warn));
    assert_eq!(displays.get(), 0);
    assert!(platform.shown);
}

#[test]
#[serial]
fn test_keyboard_callback_replaced_from_init() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    let displays = counting_display(&mut config, TestResult::Pass);
    let keys = Rc::new(RefCell::new(vec![]));
    let pressed = keys.clone();
    config.init = Some(Box::new(move |env: &mut TestEnv<'_>, _: &[String]| {
        let pressed = pressed.clone();
        env.set_keyboard_func(move |env, key, _, _| {
            pressed.borrow_mut().push(key);
            if key == b'q' {
                env.quit();
            }
        });
        Ok(())
    }));

    let mut platform = MockPlatform::new();
    platform.events.extend(vec![
        WindowEvent::Key { key: 27, x: 0, y: 0 },
        WindowEvent::Key { key: b'q', x: 0, y: 0 },
        WindowEvent::Expose,
    ]);
    let options = HarnessOptions::default();
    let result = run_one(&mut platform, config, &options, flavor(GLApi::Compatibility, 20));

    // Escape no longer quits; `q` does, before the expose is seen.
    assert_eq!(result, Ok(TestResult::Pass));
    assert_eq!(*keys.borrow(), vec![27, b'q']);
    assert_eq!(displays.get(), 0);
    assert_eq!(platform.events.len(), 1);
}

#[test]
#[serial]
fn test_init_and_display_verdicts() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    let displays = counting_display(&mut config, TestResult::Pass);
    config.init = Some(Box::new(|_: &mut TestEnv<'_>, _: &[String]| Err(TestResult::Skip)));
    let mut platform = MockPlatform::new();
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Compatibility, 20));
    assert_eq!(result, Ok(TestResult::Skip));
    assert_eq!(displays.get(), 0);

    // No display callback at all.
    let mut platform = MockPlatform::new();
    let result =
        run_one(&mut platform, TestConfig::default(), &automatic(), flavor(GLApi::Compatibility, 20));
    assert_eq!(result, Ok(TestResult::Fail));
    assert_eq!(platform.live_resources(), 0);
}

#[test]
#[serial]
fn test_subtests_merge_in_display() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let ran = Rc::new(RefCell::new(vec![]));
    let make_config = |ran: Rc<RefCell<Vec<String>>>| {
        let mut config = TestConfig::default();
        let record = |ran: &Rc<RefCell<Vec<String>>>, name: &'static str, result: TestResult| {
            let ran = ran.clone();
            Subtest::new(name, move |_| {
                ran.borrow_mut().push(name.to_owned());
                result
            })
        };
        let mut subtests = vec![
            record(&ran, "a", TestResult::Pass),
            record(&ran, "b", TestResult::Skip),
            record(&ran, "c", TestResult::Warn),
        ];
        config.subtests = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        config.display = Some(Box::new(move |env: &mut TestEnv<'_>| {
            let selected = env.selected_subtests().to_vec();
            run_subtests(env, &mut subtests, &selected)
        }));
        config
    };

    let mut platform = MockPlatform::new();
    let config = make_config(ran.clone());
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Compatibility, 20));
    assert_eq!(result, Ok(TestResult::Warn));
    assert_eq!(*ran.borrow(), vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]);

    ran.borrow_mut().clear();
    let options = HarnessOptions {
        selected_subtests: vec!["a".to_owned(), "b".to_owned()],
        ..automatic()
    };
    let config = make_config(ran.clone());
    let result = run_one(&mut platform, config, &options, flavor(GLApi::Compatibility, 20));
    assert_eq!(result, Ok(TestResult::Pass));
    assert_eq!(*ran.borrow(), vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
#[serial]
fn test_requirement_helpers() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    config.display = Some(Box::new(|env: &mut TestEnv<'_>| {
        let checks = [
            env.require_gl_version(30) == Ok(()),
            env.require_gl_version(33) == Err(TestResult::Skip),
            env.require_es_version(20) == Err(TestResult::Skip),
            env.require_core_profile() == Ok(()),
            env.require_extension("GL_ARB_compatibility") == Err(TestResult::Skip),
            env.winsys_fbo() == 0,
            env.window_size() == Size2D::new(160, 160),
        ];
        if checks.iter().all(|&check| check) {
            TestResult::Pass
        } else {
            TestResult::Fail
        }
    }));
    let mut platform = MockPlatform::new();
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Core, 32));
    assert_eq!(result, Ok(TestResult::Pass));
}

#[test]
#[serial]
fn test_fbo_falls_back_to_window() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    let displays = counting_display(&mut config, TestResult::Pass);
    let options = HarnessOptions { use_fbo: true, ..automatic() };

    // A 2.1 context without GL_ARB_framebuffer_object can't build the off-screen framebuffer.
    let mut platform = MockPlatform::new();
    let result = run_one(&mut platform, config, &options, flavor(GLApi::Compatibility, 21));

    assert_eq!(result, Ok(TestResult::Pass));
    assert_eq!(displays.get(), 1);
    assert_eq!(platform.requests.len(), 2);
    assert_eq!(platform.requests[1].live_contexts, 0);
    assert_eq!(platform.live_resources(), 0);
}

#[test]
#[serial]
fn test_fbo_is_skipped_for_es1() {
    env::remove_var("PIGLIT_FORCE_WINDOW");
    let mut config = TestConfig::default();
    let displays = counting_display(&mut config, TestResult::Pass);
    let options = HarnessOptions { use_fbo: true, ..automatic() };
    let mut platform = MockPlatform::new();
    let result = run_one(&mut platform, config, &options, flavor(GLApi::Es1, 11));

    assert_eq!(result, Ok(TestResult::Pass));
    assert_eq!(displays.get(), 1);
    assert_eq!(platform.requests.len(), 1);
}

#[test]
fn test_toolkit_framework_checks_context() {
    let mut platform = MockPlatform::new();
    platform.kind = PlatformKind::Winit;
    let mut config = TestConfig::default();
    counting_display(&mut config, TestResult::Pass);
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Es2, 20));
    assert_eq!(result, Err(Error::UnsupportedGLType));
    assert!(platform.requests.is_empty());

    // A compatibility request answered with a core profile.
    let mut platform = MockPlatform::with_responder(Box::new(|_: &ConfigRequest| {
        ("3.2 (Core Profile) Mock".to_owned(), vec![])
    }));
    platform.kind = PlatformKind::Winit;
    let mut config = TestConfig::default();
    counting_display(&mut config, TestResult::Pass);
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Compatibility, 32));
    assert_eq!(result, Err(Error::UnsupportedGLProfile));
    assert_eq!(platform.live_resources(), 0);

    let mut platform = MockPlatform::new();
    platform.kind = PlatformKind::Winit;
    let mut config = TestConfig::default();
    let displays = counting_display(&mut config, TestResult::Pass);
    let result = run_one(&mut platform, config, &automatic(), flavor(GLApi::Compatibility, 20));
    assert_eq!(result, Ok(TestResult::Pass));
    assert_eq!(displays.get(), 1);
    assert!(platform.shown);
    assert_eq!(platform.live_resources(), 0);
}
