use anyhow::Result;
use std::env;
use std::str::FromStr;

use crate::error::TermError;

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// Entries are trimmed and empty entries dropped, so an unset variable yields an empty vector.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses an environment variable. Unset or blank variables yield `None`.
pub fn get_env_var_parsed<T>(var: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| TermError::invalid_input(format!("{}='{}': {}", var, value, err))),
        _ => Ok(None),
    }
}

/// Reads a boolean flag: `1`, `true`, `yes` or `on` (case-insensitive) set it.
pub fn get_env_var_as_bool(var: &str) -> Option<bool> {
    env::var(var).ok().map(|value| {
        matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}
