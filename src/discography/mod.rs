// src/discography/mod.rs
pub mod index;
pub mod merge;
pub mod store;
pub mod types;

pub use index::{DuplicateMatch, ReleaseIndex};
pub use merge::{merge_release_fields, merge_releases, refetch_discography, DiscographyFetcher, RefetchResult};
pub use store::DiscographyStore;
pub use types::*;
