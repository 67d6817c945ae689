// piglit-framework/src/subtest.rs
//
//! Named subtests that share one context.

use crate::framework::TestEnv;
use crate::result::{self, TestResult};

/// A named piece of a test with its own verdict.
pub struct Subtest {
    /// The name printed in the subtest line and matched by `-subtest`.
    pub name: String,
    pub func: Box<dyn FnMut(&mut TestEnv<'_>) -> TestResult>,
}

impl Subtest {
    pub fn new<F>(name: &str, func: F) -> Subtest
    where
        F: FnMut(&mut TestEnv<'_>) -> TestResult + 'static,
    {
        Subtest { name: name.to_owned(), func: Box::new(func) }
    }
}

/// Runs the subtests `selected` names, or all of them when nothing was selected.
///
/// Each verdict is written as a subtest line and merged into the returned overall result, which
/// starts out as `Skip`.
pub fn run_subtests(env: &mut TestEnv<'_>, subtests: &mut [Subtest], selected: &[String]) -> TestResult {
    let mut overall = TestResult::Skip;
    for subtest in subtests.iter_mut() {
        if !selected.is_empty() && !selected.iter().any(|name| *name == subtest.name) {
            continue;
        }
        let verdict = (subtest.func)(env);
        result::report_subtest_result(&subtest.name, verdict);
        overall.merge(verdict);
    }
    overall
}

/// Writes one subtest name per line, as `-list-subtests` asks.
pub fn list_subtests(names: &[String]) {
    for name in names {
        println!("{}", name);
    }
}
