//! Lazily compiled built-in regexes.
use once_cell::sync::Lazy;
use regex::Regex;

use dispatch::HookFailure;

pub(crate) type Compiled = Lazy<Result<Regex, regex::Error>>;

/// A compile failure here is a bug in this crate, so it surfaces as a crash.
pub(crate) fn compiled(cell: &'static Compiled) -> Result<&'static Regex, HookFailure> {
    cell.as_ref()
        .map_err(|err| HookFailure::crash(format!("built-in pattern failed to compile: {err}")))
}
