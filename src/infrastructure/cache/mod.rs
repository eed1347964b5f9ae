pub mod eviction;

pub use eviction::{EvictionManager, EvictionReport};
