pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    CounterState, OperationResult, RedisConnection, RedisStore, StoreConnection, StoreOptions,
};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
