//! Remote image loading with a filesystem cache.
//!
//! The loader's contract toward its caller is "always produces an image":
//! every failure class (bad URL, network error, non-2xx status, undecodable
//! body) collapses into a rendered error card instead of an error value, so
//! a broken URL never halts an image-generation pipeline.

pub mod cache;
pub mod loader;

pub use cache::{CacheEntry, CacheStatus, ImageCache};
pub use loader::{Loaded, RemoteImageLoader};
