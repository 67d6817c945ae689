// piglit-framework/src/result.rs
//
//! Test verdicts and the stdout protocol the test runner parses.

use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};
use std::process;

/// The verdict of a test or subtest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TestResult {
    Pass,
    Fail,
    Skip,
    Warn,
}

impl TestResult {
    /// The tag the runner expects in the result line.
    pub fn as_str(self) -> &'static str {
        match self {
            TestResult::Pass => "pass",
            TestResult::Fail => "fail",
            TestResult::Skip => "skip",
            TestResult::Warn => "warn",
        }
    }

    /// Folds a subtest verdict into an overall one.
    ///
    /// Fail beats everything, warn beats pass and skip, pass beats skip, and skip never changes
    /// anything. An overall result should start out as `Skip`.
    pub fn merge(&mut self, subtest: TestResult) {
        match subtest {
            TestResult::Fail => *self = TestResult::Fail,
            TestResult::Warn => {
                if matches!(*self, TestResult::Skip | TestResult::Pass) {
                    *self = TestResult::Warn;
                }
            }
            TestResult::Pass => {
                if *self == TestResult::Skip {
                    *self = TestResult::Pass;
                }
            }
            TestResult::Skip => {}
        }
    }

    /// Process exit status for this verdict.
    #[inline]
    pub fn exit_code(self) -> i32 {
        match self {
            TestResult::Fail => 1,
            TestResult::Pass | TestResult::Skip | TestResult::Warn => 0,
        }
    }

    /// The line written to stdout for this verdict, without the trailing newline.
    pub fn report_line(self) -> String {
        format!("PIGLIT: {{'result': '{}' }}", self.as_str())
    }
}

impl Display for TestResult {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes the verdict line and exits the process.
///
/// Stderr is flushed first so diagnostics land before the verdict. Only the top-level driver
/// calls this; everything below it returns `TestResult`.
pub fn report(result: TestResult) -> ! {
    let _ = io::stderr().flush();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let _ = writeln!(stdout, "{}", result.report_line());
    let _ = stdout.flush();
    process::exit(result.exit_code())
}

/// The line written to stdout for one subtest, without the trailing newline.
pub fn subtest_report_line(name: &str, result: TestResult) -> String {
    format!("PIGLIT: {{'subtest': {{'{}' : '{}'}}}}", name, result.as_str())
}

/// Writes one subtest verdict line. Doesn't exit.
pub fn report_subtest_result(name: &str, result: TestResult) {
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let _ = writeln!(stdout, "{}", subtest_report_line(name, result));
    let _ = stdout.flush();
}
