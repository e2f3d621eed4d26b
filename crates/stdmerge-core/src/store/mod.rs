pub mod cache;
pub mod schema;

pub use cache::{CacheStats, SimilarityCache};
