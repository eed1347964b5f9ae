pub mod connection_pool;
pub mod mappers;
pub mod rows;
pub mod sqlite_store;

pub use connection_pool::ConnectionPool;
pub use sqlite_store::{SqliteLocalStore, StoreError};
