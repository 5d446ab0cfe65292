//! Redis 连接抽象
//!
//! 计数存储只依赖 [`StoreConnection`]，方便替换成其它客户端或测试替身。

use std::sync::atomic::{AtomicU8, Ordering};

use redis::aio::MultiplexedConnection;
use redis::{Client as RedisClient, RedisResult, Script, Value};

/// 连接自报的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Ready,
    /// 客户端自带重连时使用，恢复后由客户端改回 Ready
    Reconnecting,
    Closed,
}

impl ConnectionStatus {
    pub fn is_ready(self) -> bool {
        self == ConnectionStatus::Ready
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionStatus::Connecting,
            1 => ConnectionStatus::Ready,
            2 => ConnectionStatus::Reconnecting,
            _ => ConnectionStatus::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionStatus::Connecting => 0,
            ConnectionStatus::Ready => 1,
            ConnectionStatus::Reconnecting => 2,
            ConnectionStatus::Closed => 3,
        }
    }
}

/// 事务中可用的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SET key value [EX seconds]
    Set {
        key: String,
        value: i64,
        expire_secs: Option<u64>,
    },
    /// INCRBY key by
    IncrBy { key: String, by: i64 },
    /// PTTL key
    Pttl { key: String },
    /// GET key
    Get { key: String },
}

impl Command {
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. }
            | Command::IncrBy { key, .. }
            | Command::Pttl { key }
            | Command::Get { key } => key,
        }
    }

    fn append_to(&self, pipe: &mut redis::Pipeline) {
        match self {
            Command::Set {
                key,
                value,
                expire_secs,
            } => {
                let cmd = pipe.cmd("SET").arg(key).arg(*value);
                if let Some(secs) = expire_secs {
                    cmd.arg("EX").arg(*secs);
                }
            }
            Command::IncrBy { key, by } => {
                pipe.cmd("INCRBY").arg(key).arg(*by);
            }
            Command::Pttl { key } => {
                pipe.cmd("PTTL").arg(key);
            }
            Command::Get { key } => {
                pipe.cmd("GET").arg(key);
            }
        }
    }
}

/// 计数存储所需的连接能力
///
/// 原始回复以 [`redis::Value`] 返回，由 `cache::reply` 统一解析。
#[trait_variant::make(StoreConnection: Send)]
pub trait LocalStoreConnection {
    /// 连接状态字段，不提供时返回 None
    fn status(&self) -> Option<ConnectionStatus> {
        None
    }

    /// 就绪探测，不提供时返回 None
    fn ready_probe(&self) -> Option<bool> {
        None
    }

    /// 是否支持预先注册脚本并按名称调用
    fn supports_registered_scripts(&self) -> bool {
        false
    }

    /// 注册脚本
    async fn load_script(&self, script: &Script) -> RedisResult<()>;

    /// 按名称调用已注册的脚本
    async fn invoke_script(&self, script: &Script, key: &str, args: &[i64]) -> RedisResult<Value>;

    /// 直接发送脚本文本执行
    async fn eval(&self, source: &str, key: &str, args: &[i64]) -> RedisResult<Value>;

    /// 以 MULTI/EXEC 事务顺序执行一组命令，返回所有回复
    async fn exec_atomic(&self, commands: &[Command]) -> RedisResult<Value>;

    /// 删除键，返回删除的数量
    async fn del(&self, key: &str) -> RedisResult<i64>;
}

/// 基于多路复用连接的实现
///
/// 多路复用连接断开后不会自动重连，所以状态是单向的：出现连接类错误或调用
/// [`RedisConnection::mark_closed`] 后一直为 Closed，需要重新建立连接。
pub struct RedisConnection {
    conn: MultiplexedConnection,
    status: AtomicU8,
    register_scripts: bool,
}

impl RedisConnection {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            status: AtomicU8::new(ConnectionStatus::Ready.as_u8()),
            register_scripts: true,
        }
    }

    /// 从客户端建立连接
    pub async fn connect(client: &RedisClient) -> RedisResult<Self> {
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self::new(conn))
    }

    /// 不注册脚本，每次用 EVAL 发送脚本文本
    pub fn without_script_registration(mut self) -> Self {
        self.register_scripts = false;
        self
    }

    /// 把连接标记为已关闭，之后的快速失败检查会拒绝请求
    ///
    /// 只修改状态，底层连接在最后一个句柄释放时断开。
    pub fn mark_closed(&self) {
        self.set_status(ConnectionStatus::Closed);
    }

    fn current_status(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
    }

    fn track<T>(&self, result: RedisResult<T>) -> RedisResult<T> {
        let next = status_after(self.current_status(), &result);
        if next == ConnectionStatus::Closed && self.current_status() != ConnectionStatus::Closed {
            if let Err(e) = &result {
                tracing::warn!("redis connection lost: {}", e);
            }
        }
        self.set_status(next);
        result
    }
}

/// 命令完成后的连接状态
fn status_after<T>(current: ConnectionStatus, result: &RedisResult<T>) -> ConnectionStatus {
    match result {
        Err(e) if e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() => {
            ConnectionStatus::Closed
        }
        _ => current,
    }
}

impl StoreConnection for RedisConnection {
    fn status(&self) -> Option<ConnectionStatus> {
        Some(self.current_status())
    }

    fn supports_registered_scripts(&self) -> bool {
        self.register_scripts
    }

    async fn load_script(&self, script: &Script) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        let result = script.prepare_invoke().load_async(&mut conn).await;
        self.track(result).map(|_| ())
    }

    async fn invoke_script(&self, script: &Script, key: &str, args: &[i64]) -> RedisResult<Value> {
        let mut conn = self.conn.clone();
        let mut invocation = script.key(key);
        for arg in args {
            invocation.arg(*arg);
        }
        // EVALSHA，服务端丢失脚本时会自动重新加载
        let result = invocation.invoke_async(&mut conn).await;
        self.track(result)
    }

    async fn eval(&self, source: &str, key: &str, args: &[i64]) -> RedisResult<Value> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(source).arg(1).arg(key);
        for arg in args {
            cmd.arg(*arg);
        }
        let result = cmd.query_async(&mut conn).await;
        self.track(result)
    }

    async fn exec_atomic(&self, commands: &[Command]) -> RedisResult<Value> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in commands {
            command.append_to(&mut pipe);
        }
        let result = pipe.query_async(&mut conn).await;
        self.track(result)
    }

    async fn del(&self, key: &str) -> RedisResult<i64> {
        let mut conn = self.conn.clone();
        let result = redis::cmd("DEL").arg(key).query_async(&mut conn).await;
        self.track(result)
    }
}
