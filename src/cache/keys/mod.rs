/// 缓存键模块
/// 提供限流计数键生成函数

pub mod rate_limit_keys;

pub use rate_limit_keys::rate_limit_key;
