use redis::{RedisResult, Script, Value};

use crate::cache::connection::StoreConnection;

/// 原子自增脚本
///
/// KEYS[1] 计数键，ARGV[1] 增加的点数，ARGV[2] 窗口秒数。
/// 返回 {consumed, ttl_ms}。
pub const ATOMIC_INCR_SCRIPT: &str = r#"
redis.call('set', KEYS[1], 0, 'EX', ARGV[2], 'NX')
local consumed = redis.call('incrby', KEYS[1], ARGV[1])
local ttl = redis.call('pttl', KEYS[1])
if ttl == -1 then
  redis.call('expire', KEYS[1], ARGV[2])
  ttl = 1000 * ARGV[2]
end
return {consumed, ttl}
"#;

/// 脚本调用方式，构造时根据连接能力确定
#[derive(Debug, Clone)]
pub enum ScriptStrategy {
    /// 已注册到服务端，按 SHA1 调用
    Registered(Script),
    /// 每次发送脚本文本
    Eval,
}

impl ScriptStrategy {
    /// 探测连接能力，支持时注册脚本
    ///
    /// `preload` 为 false 时不发送 SCRIPT LOAD，首次调用遇到 NOSCRIPT 时再加载。
    pub async fn register<C: StoreConnection>(conn: &C, preload: bool) -> RedisResult<Self> {
        if !conn.supports_registered_scripts() {
            return Ok(ScriptStrategy::Eval);
        }
        let script = Script::new(ATOMIC_INCR_SCRIPT);
        if preload {
            conn.load_script(&script).await?;
        }
        Ok(ScriptStrategy::Registered(script))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScriptStrategy::Registered(_) => "registered",
            ScriptStrategy::Eval => "eval",
        }
    }

    /// 执行原子自增
    pub async fn incr<C: StoreConnection>(
        &self,
        conn: &C,
        key: &str,
        points: i64,
        duration_secs: i64,
    ) -> RedisResult<Value> {
        let args = [points, duration_secs];
        match self {
            ScriptStrategy::Registered(script) => conn.invoke_script(script, key, &args).await,
            ScriptStrategy::Eval => conn.eval(ATOMIC_INCR_SCRIPT, key, &args).await,
        }
    }
}
