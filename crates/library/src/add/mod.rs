//! Adding images to the cache.
//!
//! [`add_or_get()`] is the only way entries come into existence. It is safe
//! to call concurrently, from any number of tasks or processes, for the same
//! or different content: the metadata store's unique digest constraint
//! decides which writer wins, and the losers clean up after themselves.

mod collision;
pub mod error;
mod file;

pub use self::file::{Addition, add_or_get};
