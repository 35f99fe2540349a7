//! Test utilities for Hashpost.
//!
//! - Deterministic key pairs derived from a seed string
//! - A directory pre-seeded with users and one routing server
//! - Tracing setup for tests
//!
//! ```rust,ignore
//! use hashpost_lib::test_utils::TestDirectory;
//!
//! let dir = TestDirectory::seeded(&["jane!", "john!"]).await;
//! let jane = dir.user("jane!");
//! let info = dir.resolver.resolve_address(&jane.address.hash()).await?;
//! ```

mod fixtures;

pub use fixtures::{
    init_tracing, solve_pow, test_keypair, TestDirectory, TestUser, TEST_POW_BITS,
};
