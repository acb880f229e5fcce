// src/config/vars.rs

//! `${name}` substitution for path-like config strings.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::{Result, SitewatchError};

static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}").expect("static regex is valid")
});

/// Replace every `${name}` in `input` with `vars[name]`.
///
/// Unknown names are a configuration error rather than being left in place,
/// since a literal `${app}` in a glob would silently never match.
pub fn substitute(input: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut missing: Option<String> = None;

    let out = VAR_RE.replace_all(input, |caps: &Captures| match vars.get(&caps[1]) {
        Some(value) => value.clone(),
        None => {
            missing.get_or_insert_with(|| caps[1].to_string());
            String::new()
        }
    });

    if let Some(name) = missing {
        return Err(SitewatchError::ConfigError(format!(
            "unknown variable '${{{name}}}' in '{input}' (declare it under [vars])"
        )));
    }

    Ok(out.into_owned())
}

pub fn substitute_all(items: &mut [String], vars: &BTreeMap<String, String>) -> Result<()> {
    for item in items.iter_mut() {
        *item = substitute(item, vars)?;
    }
    Ok(())
}

pub fn substitute_opt(item: &mut Option<String>, vars: &BTreeMap<String, String>) -> Result<()> {
    if let Some(s) = item {
        *s = substitute(s, vars)?;
    }
    Ok(())
}
