//! Username derivation for new accounts
//!
//! A derived username is the lower-cased ASCII letters and digits of the
//! name parts run together, e.g. `erikabiancaapi`. When that is taken the
//! smallest free numeric suffix from 2 upwards is appended. Bases shorter
//! than the minimum username length get `user` appended.

use std::collections::HashSet;

use auth::validation::USERNAME_MIN_LEN;

/// Longest base kept before a suffix is added
const MAX_BASE_LEN: usize = 28;
const FALLBACK: &str = "user";

/// Build the suffix-free username from name parts
pub fn derive_base(first: &str, middle: Option<&str>, last: &str) -> String {
    let base: String = [Some(first), middle, Some(last)]
        .into_iter()
        .flatten()
        .flat_map(str::chars)
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_BASE_LEN)
        .collect();

    if base.len() < USERNAME_MIN_LEN {
        format!("{base}{FALLBACK}")
    } else {
        base
    }
}

/// Pick the first candidate not present in `taken`
///
/// `skip` counts candidates already lost to a concurrent insert, so a retry
/// moves past them even before they show up in `taken`.
pub fn first_available(base: &str, taken: &[String], skip: usize) -> String {
    let taken: HashSet<&str> = taken.iter().map(String::as_str).collect();

    std::iter::once(base.to_string())
        .chain((2u64..).map(|n| format!("{base}{n}")))
        .filter(|candidate| !taken.contains(candidate.as_str()))
        .nth(skip)
        .unwrap_or_else(|| base.to_string())
}
