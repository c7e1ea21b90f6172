//! Environment variable helpers shared by the config loaders.
//!
//! Loaders take a lookup function instead of reading `std::env` directly so
//! tests can feed them a plain map.

use std::str::FromStr;

/// Source of configuration values, keyed by environment variable name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup backed by the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Trimmed, non-empty value for `key`.
pub fn string(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parsed value for `key`, falling back to `default` when missing or malformed.
pub fn parsed<T: FromStr>(lookup: Lookup<'_>, key: &str, default: T) -> T {
    string(lookup, key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Boolean flag. `None` when unset or not a recognised spelling.
pub fn flag(lookup: Lookup<'_>, key: &str) -> Option<bool> {
    string(lookup, key).and_then(|value| match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

#[cfg(test)]
pub(crate) fn map_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_trims_and_drops_blank() {
        let lookup = map_lookup(&[("A", "  value "), ("B", "   ")]);
        assert_eq!(string(&lookup, "A").as_deref(), Some("value"));
        assert_eq!(string(&lookup, "B"), None);
        assert_eq!(string(&lookup, "C"), None);
    }

    #[test]
    fn test_parsed_falls_back_on_garbage() {
        let lookup = map_lookup(&[("PORT", "eighty")]);
        assert_eq!(parsed(&lookup, "PORT", 3000u16), 3000);
    }

    #[test]
    fn test_flag_spellings() {
        let lookup = map_lookup(&[("ON", "Yes"), ("OFF", "0"), ("WEIRD", "maybe")]);
        assert_eq!(flag(&lookup, "ON"), Some(true));
        assert_eq!(flag(&lookup, "OFF"), Some(false));
        assert_eq!(flag(&lookup, "WEIRD"), None);
    }
}
