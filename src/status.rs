//! Repository status: the cache, the node model and the refresh that ties
//! them together.

mod aggregate;
mod cache;
mod model;

pub use aggregate::{Aggregator, DEFAULT_MAX_CONCURRENT, RefreshError, RootProvider};
pub use cache::{CachedStatus, RefreshPolicy, StatusCache};
pub use model::{
    NavigableNode, NodeList, RepositoryGroup, RepositoryNode, StatusSnapshot, TrackedRoot,
    WorktreeNode, canonical_path,
};
