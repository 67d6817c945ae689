// piglit-framework/src/args.rs
//
//! Harness command-line flags.
//!
//! The harness owns `-auto`, `-fbo`, `-rlimit <N>`, `-samples=<N>`, `-subtest <name>` and
//! `-list-subtests`. They are removed from the argument vector before the test sees it.

use crate::config::TestConfig;
use crate::Error;

/// Options the harness derives from the command line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HarnessOptions {
    /// Run once without waiting for input (`-auto`).
    pub automatic: bool,
    /// Render to an off-screen framebuffer object (`-fbo`).
    pub use_fbo: bool,
    /// Sample count forced with `-samples=<N>`, or zero.
    pub force_samples: u32,
    /// Address-space limit requested with `-rlimit <N>`.
    pub rlimit: Option<u64>,
    /// Subtests named with `-subtest`.
    pub selected_subtests: Vec<String>,
    /// `-list-subtests` was given.
    pub list_subtests: bool,
}

/// Strips harness flags out of `args` and returns them as options.
///
/// `args[0]` is the program name and is kept. A forced sample count above one overrides the
/// configuration's window sample count.
pub fn process_args(
    args: &mut Vec<String>,
    config: &mut TestConfig,
) -> Result<HarnessOptions, Error> {
    let mut options = HarnessOptions::default();

    let mut index = 1;
    while index < args.len() {
        let arg = args[index].as_str();
        if arg == "-auto" {
            options.automatic = true;
            args.remove(index);
        } else if arg == "-fbo" {
            options.use_fbo = true;
            args.remove(index);
        } else if arg == "-rlimit" {
            let limit = args.get(index + 1).and_then(|value| parse_c_ulong(value));
            match limit {
                Some(limit) => options.rlimit = Some(limit),
                None => {
                    error!("-rlimit requires an argument");
                    return Err(Error::BadArgument("-rlimit requires an argument".to_owned()));
                }
            }
            args.drain(index..index + 2);
        } else if let Some(samples) = arg.strip_prefix("-samples=") {
            options.force_samples = atoi(samples);
            args.remove(index);
        } else if arg == "-subtest" {
            let name = match args.get(index + 1) {
                Some(name) => name.clone(),
                None => {
                    error!("-subtest requires an argument");
                    return Err(Error::BadArgument("-subtest requires an argument".to_owned()));
                }
            };
            if config.subtests.is_empty() {
                error!("test defines no subtests, but -subtest {} was given", name);
                return Err(Error::BadArgument(format!("unknown subtest \"{}\"", name)));
            }
            if !config.subtests.iter().any(|subtest| *subtest == name) {
                error!("test has no subtest named \"{}\"", name);
                return Err(Error::BadArgument(format!("unknown subtest \"{}\"", name)));
            }
            options.selected_subtests.push(name);
            args.drain(index..index + 2);
        } else if arg == "-list-subtests" {
            options.list_subtests = true;
            args.remove(index);
        } else {
            index += 1;
        }
    }

    if options.force_samples > 1 {
        config.window_samples = options.force_samples;
    }
    Ok(options)
}

/// Reads `PIGLIT_FORCE_WINDOW`. Unset means `false`; only `0` and `1` are accepted otherwise.
pub fn force_window_from_env(value: Option<&str>) -> Result<bool, Error> {
    match value {
        None | Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => {
            error!("environment var PIGLIT_FORCE_WINDOW has bad value \"{}\"", other);
            Err(Error::BadForceWindow(other.to_owned()))
        }
    }
}

/// Parses an unsigned number the way `strtoul(s, &end, 0)` does.
///
/// Leading whitespace and a sign are skipped, `0x` selects hex and a leading `0` selects octal.
/// Trailing garbage is ignored; `None` means no digit was consumed.
pub fn parse_c_ulong(string: &str) -> Option<u64> {
    let mut rest = string.trim_start();
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    }

    let (radix, digits) = if let Some(hex) =
        rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))
    {
        if hex.chars().next().map_or(false, |c| c.is_ascii_hexdigit()) {
            (16, hex)
        } else {
            // "0x" with no hex digit after it parses as the single digit 0.
            (10, "0")
        }
    } else if rest.starts_with('0') {
        (8, rest)
    } else {
        (10, rest)
    };

    let length = digits.chars().take_while(|c| c.is_digit(radix)).count();
    if length == 0 {
        return None;
    }

    let mut value: u64 = 0;
    for c in digits[..length].chars() {
        let digit = c.to_digit(radix)? as u64;
        value = match value.checked_mul(radix as u64).and_then(|v| v.checked_add(digit)) {
            Some(value) => value,
            None => u64::MAX,
        };
    }
    Some(if negative { value.wrapping_neg() } else { value })
}

// `atoi` semantics: leading digits only, anything unparsable is zero.
fn atoi(string: &str) -> u32 {
    let digits: String = string.trim_start().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Lowers the address-space limit of the process to `limit` bytes.
///
/// The limit is only ever lowered. Failure to apply it is logged, not fatal.
#[cfg(unix)]
pub fn set_rlimit(limit: u64) {
    unsafe {
        let mut rlimit: libc::rlimit = std::mem::zeroed();
        if libc::getrlimit(libc::RLIMIT_AS, &mut rlimit) == -1 {
            return;
        }
        info!(
            "Address space limit = {}, max = {}",
            rlimit.rlim_cur as u64, rlimit.rlim_max as u64
        );
        if rlimit.rlim_max as u64 > limit {
            info!("Resetting limit to {}.", limit);
            rlimit.rlim_cur = limit as libc::rlim_t;
            rlimit.rlim_max = limit as libc::rlim_t;
            if libc::setrlimit(libc::RLIMIT_AS, &rlimit) == -1 {
                warn!("Could not set rlimit due to: {}", std::io::Error::last_os_error());
            }
        }
    }
}

#[cfg(not(unix))]
pub fn set_rlimit(_: u64) {
    warn!("Cannot reset rlimit on this platform.");
}
