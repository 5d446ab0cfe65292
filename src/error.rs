use thiserror::Error;

/// 计数存储操作的结果类型
pub type StoreResult<T> = Result<T, StoreError>;

/// 计数存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 开启了快速失败模式，且连接报告未就绪，未发出任何命令
    #[error("redis connection is not ready")]
    ConnectionNotReady,

    /// Redis 命令、脚本或事务返回的错误，原样向上传递
    #[error("redis command failed: {0}")]
    Command(#[from] redis::RedisError),

    /// 回复结构无法解析
    #[error("unexpected redis reply: {0}")]
    UnexpectedReply(String),

    /// 窗口秒数超出 Redis 可接受的范围，未发出任何命令
    #[error("window duration out of range: {0:?}")]
    InvalidDuration(std::time::Duration),
}

impl StoreError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, StoreError::ConnectionNotReady)
    }
}
