//! mirrorkv Test Utilities
//!
//! Shared test infrastructure for the mirrorkv workspace:
//! - Tracing setup for test output
//! - Proptest generators for keys, values and primary designations
//! - Fixtures wiring a mirror over in-memory stores
//! - Assertions for mirror outcomes and errors

pub use mirrorkv_core::{
    CasOutcome, Expiry, MirrorError, MirrorResult, Outcome, Primary, StoreError, StoreKey,
    StoreKind, StoredValue, VersionToken, Versioned,
};
pub use mirrorkv_mirror::Mirror;
pub use mirrorkv_storage::{MemoryCacheStore, MemoryDocumentStore};

use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber. Safe to call from every test.
///
/// Honors `RUST_LOG`; defaults to debug output for the mirrorkv crates.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mirrorkv=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for mirror inputs.

    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Generate a memcached-safe key: printable ASCII, no whitespace.
    pub fn arb_store_key() -> impl Strategy<Value = StoreKey> {
        "[a-zA-Z0-9:_-]{1,32}".prop_map(StoreKey::new)
    }

    /// Generate a non-empty text value.
    pub fn arb_stored_value() -> impl Strategy<Value = StoredValue> {
        "[ -~]{1,64}".prop_map(StoredValue::from_text)
    }

    /// Generate a set of distinct keys.
    pub fn arb_key_set(max: usize) -> impl Strategy<Value = Vec<StoreKey>> {
        prop::collection::btree_set("[a-z0-9]{1,12}", 1..=max.max(1))
            .prop_map(|keys: BTreeSet<String>| keys.into_iter().map(StoreKey::new).collect())
    }

    /// Generate a primary designation.
    pub fn arb_primary() -> impl Strategy<Value = Primary> {
        prop_oneof![Just(Primary::Document), Just(Primary::Cache)]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-wired mirrors for common scenarios.

    use super::*;

    /// Mirror over in-memory stores.
    pub type MemoryMirror = Mirror<MemoryDocumentStore, MemoryCacheStore>;

    /// A mirror over fresh in-memory stores, plus handles to both stores for
    /// seeding and inspection.
    pub fn memory_mirror(
        primary: Primary,
    ) -> (MemoryMirror, MemoryDocumentStore, MemoryCacheStore) {
        let document = MemoryDocumentStore::new();
        let cache = MemoryCacheStore::new();
        let mirror = Mirror::new(document.clone(), cache.clone(), primary);
        (mirror, document, cache)
    }

    pub fn key(k: &str) -> StoreKey {
        StoreKey::from(k)
    }

    pub fn value(v: &str) -> StoredValue {
        StoredValue::from(v)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for mirror results.

    use super::*;

    /// Assert that a result is a `StoreError::Unavailable` from `store`.
    #[track_caller]
    pub fn assert_unavailable<T: std::fmt::Debug>(result: &MirrorResult<T>, store: StoreKind) {
        match result {
            Err(MirrorError::Store(StoreError::Unavailable { store: s, .. })) => {
                assert_eq!(*s, store, "Wrong store in Unavailable error");
            }
            other => panic!("Expected {} store Unavailable, got: {:?}", store, other),
        }
    }

    /// Assert that an outcome recorded `NotFound` on the document leg.
    #[track_caller]
    pub fn assert_document_not_found(outcome: &Outcome) {
        let recorded = outcome.document_error();
        assert!(
            recorded.is_some_and(StoreError::is_not_found),
            "Expected recorded NotFound, got: {}",
            outcome
        );
    }

    /// Assert that an outcome has no recorded error and a truthy cache leg.
    #[track_caller]
    pub fn assert_clean(outcome: &Outcome) {
        assert!(
            outcome.document_error().is_none() && outcome.cache_status(),
            "Expected clean outcome, got: {}",
            outcome
        );
    }
}
