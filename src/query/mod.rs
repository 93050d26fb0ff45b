//! Query keys and the shared query cache.
//!
//! Inspired by TanStack Query: views ask for data by [`QueryKey`], the
//! [`QueryCache`] decides whether to serve, join or start a load, and the
//! event loop applies finished loads with [`QueryCache::poll`].

mod cache;
pub mod key;

pub use cache::{CacheEntry, QueryCache};
pub use key::QueryKey;
