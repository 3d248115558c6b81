//! `%TOKEN%` placeholder scanning and substitution.
//!
//! Substitution is single-pass: text inserted from the environment is never
//! scanned again, so an environment value containing `%X%` is kept verbatim.

use crate::environment::Environment;
use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Za-z_][A-Za-z0-9_.:\-]*)%").expect("placeholder pattern is valid")
});

/// Iterate over the token names referenced by `value`, in order.
pub fn tokens(value: &str) -> impl Iterator<Item = &str> {
    TOKEN_RE
        .captures_iter(value)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Whether `value` contains at least one placeholder.
pub fn has_placeholders(value: &str) -> bool {
    TOKEN_RE.is_match(value)
}

/// Replace every placeholder in `value` with its environment entry.
///
/// Returns [`Cow::Borrowed`] when `value` has no placeholders. On failure
/// returns every token name that has no entry, in order of appearance.
pub fn substitute<'a>(value: &'a str, env: &Environment) -> Result<Cow<'a, str>, Vec<String>> {
    if !value.contains('%') {
        return Ok(Cow::Borrowed(value));
    }

    let mut result = String::with_capacity(value.len());
    let mut missing = Vec::new();
    let mut last_end = 0;

    for cap in TOKEN_RE.captures_iter(value) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        result.push_str(&value[last_end..whole.start()]);
        match env.get(name.as_str()) {
            Some(replacement) => result.push_str(replacement),
            None => missing.push(name.as_str().to_string()),
        }
        last_end = whole.end();
    }

    if !missing.is_empty() {
        return Err(missing);
    }
    if last_end == 0 {
        return Ok(Cow::Borrowed(value));
    }
    result.push_str(&value[last_end..]);
    Ok(Cow::Owned(result))
}
