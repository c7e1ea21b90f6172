//! Ordered list of candidate API keys.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::BackendConfig;

/// Number of trailing characters left visible when a key is masked.
pub const VISIBLE_SUFFIX_LEN: usize = 4;

const MASK: &str = "***********";

/// A secret reduced to a fixed mask plus its last few characters.
///
/// This is the only representation of a key that may leave the credentials
/// module (logs, diagnostics, API responses). Secrets no longer than the
/// visible suffix are masked completely.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MaskedSecret(String);

impl MaskedSecret {
    pub fn from_secret(secret: &SecretString) -> Self {
        let exposed = secret.expose_secret();
        let len = exposed.chars().count();
        if len <= VISIBLE_SUFFIX_LEN {
            return Self(MASK.to_string());
        }
        let suffix: String = exposed.chars().skip(len - VISIBLE_SUFFIX_LEN).collect();
        Self(format!("{MASK}{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The visible part, empty for fully masked secrets.
    pub fn suffix(&self) -> &str {
        &self.0[MASK.len()..]
    }
}

impl fmt::Display for MaskedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MaskedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MaskedSecret({})", self.0)
    }
}

/// Candidate API keys, primary first, then alternates in declaration order.
///
/// Blank entries are kept as `None` so indices line up with the configured
/// order; they are skipped during traversal. The list is immutable after
/// construction.
#[derive(Clone, Default)]
pub struct CredentialCandidates {
    entries: Vec<Option<Arc<SecretString>>>,
}

impl CredentialCandidates {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| {
                entry
                    .map(Into::into)
                    .map(|raw| raw.trim().to_string())
                    .filter(|raw| !raw.is_empty())
                    .map(|raw| Arc::new(SecretString::from(raw)))
            })
            .collect();
        Self { entries }
    }

    /// Build from the backend configuration: the primary key, then alternates.
    pub fn from_config(config: &BackendConfig) -> Self {
        let primary = config.api_key.as_ref().map(copy_secret);
        let alternates = config
            .alternate_api_keys
            .iter()
            .map(|key| key.as_ref().map(copy_secret));

        Self {
            entries: std::iter::once(primary)
                .chain(alternates)
                .map(|entry| entry.map(Arc::new))
                .collect(),
        }
    }

    /// Total number of entries, blanks included. This is the retry budget.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn has_primary(&self) -> bool {
        matches!(self.entries.first(), Some(Some(_)))
    }

    pub fn get(&self, index: usize) -> Option<&Arc<SecretString>> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// First present entry at or after `from`.
    pub fn next_present(&self, from: usize) -> Option<usize> {
        (from..self.entries.len()).find(|&index| self.entries[index].is_some())
    }

    pub fn masked(&self, index: usize) -> Option<MaskedSecret> {
        self.get(index).map(|secret| MaskedSecret::from_secret(secret))
    }
}

impl fmt::Debug for CredentialCandidates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked: Vec<Option<MaskedSecret>> = (0..self.entries.len())
            .map(|index| self.masked(index))
            .collect();
        f.debug_struct("CredentialCandidates")
            .field("entries", &masked)
            .finish()
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_last_four() {
        let masked = MaskedSecret::from_secret(&SecretString::from("AIzaSyD-abcdWXYZ"));
        assert_eq!(masked.as_str(), "***********WXYZ");
        assert_eq!(masked.suffix(), "WXYZ");
        assert!(!masked.as_str().contains("AIza"));
    }

    #[test]
    fn test_short_secret_fully_masked() {
        for short in ["", "a", "abcd"] {
            let masked = MaskedSecret::from_secret(&SecretString::from(short));
            assert_eq!(masked.as_str(), "***********");
            assert_eq!(masked.suffix(), "");
        }
    }

    #[test]
    fn test_blank_entries_skipped_in_traversal() {
        let candidates =
            CredentialCandidates::new(vec![Some("KEY-PRIMARY"), Some("  "), None, Some("KEY-ALT")]);
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates.present_count(), 2);
        assert!(candidates.has_primary());
        assert_eq!(candidates.next_present(0), Some(0));
        assert_eq!(candidates.next_present(1), Some(3));
        assert_eq!(candidates.next_present(4), None);
    }

    #[test]
    fn test_missing_primary_detected() {
        let candidates = CredentialCandidates::new(vec![None, Some("KEY-ALT")]);
        assert!(!candidates.has_primary());
        assert_eq!(candidates.next_present(0), Some(1));
    }

    #[test]
    fn test_from_config_orders_primary_first() {
        let config = BackendConfig {
            api_key: Some(SecretString::from("PRIMARY-1111")),
            alternate_api_keys: vec![None, Some(SecretString::from("ALTERNATE-2222"))],
            ..Default::default()
        };
        let candidates = CredentialCandidates::from_config(&config);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates.masked(0).unwrap().suffix(), "1111");
        assert!(candidates.get(1).is_none());
        assert_eq!(candidates.masked(2).unwrap().suffix(), "2222");
    }

    #[test]
    fn test_debug_never_shows_keys() {
        let candidates = CredentialCandidates::new(vec![Some("SECRET-VALUE-9876")]);
        let debug = format!("{candidates:?}");
        assert!(!debug.contains("SECRET-VALUE"));
        assert!(debug.contains("9876"));
    }
}
