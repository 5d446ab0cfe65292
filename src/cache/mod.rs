// 缓存模块
// 包含限流计数的数据结构和 Redis 操作逻辑

pub mod connection;
pub mod keys;
pub mod models;
pub mod operations;
pub mod readiness;
pub mod reply;
pub mod script;

// 重新导出常用类型，方便其他模块使用
pub use connection::{Command, ConnectionStatus, RedisConnection, StoreConnection};
pub use models::{CounterState, OperationResult};
pub use operations::{RedisStore, StoreOptions};
pub use readiness::ReadinessGate;
pub use script::{ATOMIC_INCR_SCRIPT, ScriptStrategy};
