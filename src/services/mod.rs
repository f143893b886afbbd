// Service exports
pub mod acquisition;
pub mod cache;
pub mod postgres;

pub use acquisition::HttpAcquisitionClient;
pub use cache::{CacheError, CacheKey, CacheManager};
pub use postgres::{PostgresClient, RepositoryError, StoredJobAttributes, StoredResumeAttributes};
