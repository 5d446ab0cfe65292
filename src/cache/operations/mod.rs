/// 缓存操作
/// 提供限流计数的存储操作
pub mod rate_limit;

// 重新导出常用操作
pub use rate_limit::*;
