// piglit-framework/demos/triangle.rs
//
//! Draws a red triangle with fixed-function GL and probes the pixel in its middle.
//!
//! Run with `-auto` to get a single verdict, or without to keep the window open until Escape.
//! `-subtest clear` and `-subtest triangle` pick one half.

use piglit_framework::{run_subtests, run_test, Gate, Subtest, TestConfig, TestEnv, TestResult};
use piglit_framework::Visual;
use std::os::raw::{c_float, c_int, c_uint, c_void};

const GL_COLOR_BUFFER_BIT: c_uint = 0x4000;
const GL_TRIANGLES: c_uint = 0x0004;
const GL_RGBA: c_uint = 0x1908;
const GL_FLOAT: c_uint = 0x1406;

type ClearColor = unsafe extern "C" fn(c_float, c_float, c_float, c_float);
type Clear = unsafe extern "C" fn(c_uint);
type Begin = unsafe extern "C" fn(c_uint);
type End = unsafe extern "C" fn();
type Color3f = unsafe extern "C" fn(c_float, c_float, c_float);
type Vertex2f = unsafe extern "C" fn(c_float, c_float);
type ReadPixels = unsafe extern "C" fn(c_int, c_int, c_int, c_int, c_uint, c_uint, *mut c_void);

fn probe_center(env: &mut TestEnv<'_>, expected: [f32; 4]) -> Result<bool, TestResult> {
    let (x, y) = (env.width() / 2, env.height() / 2);
    let mut pixel = [0.0f32; 4];
    unsafe {
        let read_pixels: ReadPixels = env.dispatch().resolve_as("glReadPixels", Gate::Core(10))?;
        read_pixels(x, y, 1, 1, GL_RGBA, GL_FLOAT, pixel.as_mut_ptr() as *mut c_void);
    }
    let matches = pixel.iter().zip(expected.iter()).all(|(a, b)| (a - b).abs() < 0.01);
    if !matches {
        println!("Probe at ({}, {})", x, y);
        println!("  Expected: {:?}", expected);
        println!("  Observed: {:?}", pixel);
    }
    Ok(matches)
}

fn clear(env: &mut TestEnv<'_>) -> Result<TestResult, TestResult> {
    unsafe {
        let clear_color: ClearColor = env.dispatch().resolve_as("glClearColor", Gate::Core(10))?;
        let clear: Clear = env.dispatch().resolve_as("glClear", Gate::Core(10))?;
        clear_color(0.0, 0.0, 1.0, 1.0);
        clear(GL_COLOR_BUFFER_BIT);
    }
    let passed = probe_center(env, [0.0, 0.0, 1.0, 1.0])?;
    Ok(if passed { TestResult::Pass } else { TestResult::Fail })
}

fn triangle(env: &mut TestEnv<'_>) -> Result<TestResult, TestResult> {
    unsafe {
        let begin: Begin = env.dispatch().resolve_as("glBegin", Gate::Core(10))?;
        let end: End = env.dispatch().resolve_as("glEnd", Gate::Core(10))?;
        let color: Color3f = env.dispatch().resolve_as("glColor3f", Gate::Core(10))?;
        let vertex: Vertex2f = env.dispatch().resolve_as("glVertex2f", Gate::Core(10))?;
        begin(GL_TRIANGLES);
        color(1.0, 0.0, 0.0);
        vertex(-0.9, -0.9);
        vertex(0.9, -0.9);
        vertex(0.0, 0.9);
        end();
    }
    let passed = probe_center(env, [1.0, 0.0, 0.0, 1.0])?;
    Ok(if passed { TestResult::Pass } else { TestResult::Fail })
}

fn main() {
    let mut subtests = vec![
        Subtest::new("clear", |env| clear(env).unwrap_or_else(|result| result)),
        Subtest::new("triangle", |env| triangle(env).unwrap_or_else(|result| result)),
    ];

    let mut config = TestConfig::default();
    config.supports_gl_compat_version = 10;
    config.window_visual = Visual::RGB | Visual::DOUBLE;
    config.subtests = subtests.iter().map(|subtest| subtest.name.clone()).collect();
    config.display = Some(Box::new(move |env: &mut TestEnv<'_>| {
        let selected = env.selected_subtests().to_vec();
        let result = run_subtests(env, &mut subtests, &selected);
        if let Err(result) = env.swap_buffers() {
            return result;
        }
        result
    }));

    run_test(config)
}
