//! Merged result of one mirrored write, delete or mutate operation.

use crate::StoreError;
use std::fmt;

/// Status of a mirrored operation across both stores.
///
/// Records the error absorbed from the document-store leg (if any) and the
/// boolean result of the cache-store leg. A fresh `Outcome` is built for
/// every call and handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    document_error: Option<StoreError>,
    cache_status: bool,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::new()
    }
}

impl Outcome {
    /// An outcome with no document error and a successful cache leg.
    pub fn new() -> Self {
        Self {
            document_error: None,
            cache_status: true,
        }
    }

    pub fn with_document_error(mut self, error: Option<StoreError>) -> Self {
        self.document_error = error;
        self
    }

    pub fn with_cache_status(mut self, status: bool) -> Self {
        self.cache_status = status;
        self
    }

    /// The error absorbed from the document-store leg.
    pub fn document_error(&self) -> Option<&StoreError> {
        self.document_error.as_ref()
    }

    /// Whether the cache-store leg reported success.
    pub fn cache_status(&self) -> bool {
        self.cache_status
    }

    /// Whether the document-store leg succeeded or only reported a missing
    /// key, which is benign for deletes and mutations.
    pub fn document_ok(&self) -> bool {
        self.document_error
            .as_ref()
            .map_or(true, StoreError::is_not_found)
    }

    /// Overall success: no reportable document error and a truthy cache leg.
    pub fn success(&self) -> bool {
        self.document_ok() && self.cache_status
    }

    /// True when exactly one of the two legs succeeded.
    pub fn diverged(&self) -> bool {
        self.document_error.is_none() != self.cache_status
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document_error {
            Some(err) => write!(
                f,
                "Outcome<document_error={}, cache_status={}>",
                err, self.cache_status
            ),
            None => write!(
                f,
                "Outcome<document_error=none, cache_status={}>",
                self.cache_status
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreKey;

    fn key() -> StoreKey {
        StoreKey::from("K")
    }

    #[test]
    fn test_fresh_outcome_is_success() {
        let outcome = Outcome::new();
        assert!(outcome.success());
        assert!(outcome.document_error().is_none());
        assert!(!outcome.diverged());
    }

    #[test]
    fn test_not_found_is_benign() {
        let outcome = Outcome::new()
            .with_document_error(Some(StoreError::not_found(&key())))
            .with_cache_status(true);
        assert!(outcome.success());
        assert!(outcome.document_error().is_some());

        let outcome = outcome.with_cache_status(false);
        assert!(!outcome.success());
    }

    #[test]
    fn test_already_exists_fails_outcome() {
        let outcome = Outcome::new()
            .with_document_error(Some(StoreError::AlreadyExists { key: key() }))
            .with_cache_status(true);
        assert!(!outcome.success());
        assert!(outcome.diverged());
    }

    #[test]
    fn test_cache_failure_fails_outcome() {
        let outcome = Outcome::new().with_cache_status(false);
        assert!(!outcome.success());
        assert!(outcome.diverged());
    }

    #[test]
    fn test_display() {
        let outcome = Outcome::new().with_cache_status(false);
        assert_eq!(
            outcome.to_string(),
            "Outcome<document_error=none, cache_status=false>"
        );

        let outcome = Outcome::new().with_document_error(Some(StoreError::not_found(&key())));
        assert!(outcome.to_string().contains("Key not found: K"));
    }
}
