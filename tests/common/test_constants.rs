//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Identity endpoint used by configuration fixtures. Never contacted.
pub const AUTH_URL: &str = "http://keystone.example.test:5000/v3";

/// Cloud entry name used by `clouds.yaml` fixtures.
pub const CLOUD_NAME: &str = "lab";

