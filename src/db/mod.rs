pub mod catalog;
pub mod redis;

pub use self::catalog::{Catalog, CatalogEntry};
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;
