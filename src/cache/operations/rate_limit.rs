use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::connection::{Command, StoreConnection};
use crate::cache::keys::rate_limit_key;
use crate::cache::models::CounterState;
use crate::cache::readiness::ReadinessGate;
use crate::cache::reply;
use crate::cache::script::ScriptStrategy;
use crate::config::DEFAULT_KEY_PREFIX;
use crate::error::{StoreError, StoreResult};

/// 计数存储选项
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// 键前缀，为空时使用原始键
    pub key_prefix: String,
    /// 连接未就绪时立即失败
    pub reject_if_not_ready: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            reject_if_not_ready: false,
        }
    }
}

/// Redis 固定窗口计数存储
///
/// 本身不保存计数状态，只持有连接、脚本调用方式和就绪检查。
pub struct RedisStore<C> {
    conn: C,
    strategy: ScriptStrategy,
    gate: ReadinessGate,
    key_prefix: String,
}

impl<C: StoreConnection> RedisStore<C> {
    /// 创建存储，连接支持时注册自增脚本
    ///
    /// 快速失败模式下连接未就绪时跳过预加载，创建仍然成功。
    pub async fn new(conn: C, options: StoreOptions) -> StoreResult<Self> {
        let gate = ReadinessGate::new(options.reject_if_not_ready);
        let preload = gate.is_ready(&conn);
        if !preload {
            warn!("redis connection not ready, deferring script registration");
        }
        let strategy = ScriptStrategy::register(&conn, preload).await?;
        info!(
            "rate limit store ready: strategy={}, key_prefix={:?}",
            strategy.name(),
            options.key_prefix
        );
        Ok(Self {
            conn,
            strategy,
            gate,
            key_prefix: options.key_prefix,
        })
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn strategy(&self) -> &ScriptStrategy {
        &self.strategy
    }

    /// 实际写入 Redis 的键
    pub fn key(&self, key: &str) -> String {
        rate_limit_key(&self.key_prefix, key)
    }

    fn ensure_ready(&self, op: &str, key: &str) -> StoreResult<()> {
        if self.gate.is_ready(&self.conn) {
            Ok(())
        } else {
            warn!("rejecting {} for {}: redis connection not ready", op, key);
            Err(StoreError::ConnectionNotReady)
        }
    }

    /// 增加计数并设置过期时间
    ///
    /// `force_expire` 为 true 时直接覆盖计数并重置过期时间。
    /// 窗口不足一秒时不设置过期时间。
    pub async fn upsert(
        &self,
        key: &str,
        points: i64,
        duration: Duration,
        force_expire: bool,
    ) -> StoreResult<CounterState> {
        self.ensure_ready("upsert", key)?;

        let duration_secs =
            i64::try_from(duration.as_secs()).map_err(|_| StoreError::InvalidDuration(duration))?;
        let redis_key = self.key(key);
        let expire_secs = (duration_secs > 0).then_some(duration_secs);

        if force_expire {
            debug!(
                "force set {} = {} (expire: {:?})",
                redis_key, points, expire_secs
            );
            let commands = [
                Command::Set {
                    key: redis_key.clone(),
                    value: points,
                    expire_secs: expire_secs.map(i64::unsigned_abs),
                },
                Command::Pttl { key: redis_key },
            ];
            let raw = self.conn.exec_atomic(&commands).await?;
            return reply::normalize_forced(&raw, points);
        }

        let raw = match expire_secs {
            Some(secs) => {
                debug!(
                    "incr {} by {} within {}s via {} script",
                    redis_key,
                    points,
                    secs,
                    self.strategy.name()
                );
                self.strategy
                    .incr(&self.conn, &redis_key, points, secs)
                    .await?
            }
            None => {
                // 无过期时间，计数一直保留到显式删除
                debug!("incr {} by {} without expiry", redis_key, points);
                let commands = [
                    Command::IncrBy {
                        key: redis_key.clone(),
                        by: points,
                    },
                    Command::Pttl { key: redis_key },
                ];
                self.conn.exec_atomic(&commands).await?
            }
        };
        reply::normalize(&raw)
    }

    /// 读取当前计数和剩余 TTL，键不存在时返回 None
    pub async fn get(&self, key: &str) -> StoreResult<Option<CounterState>> {
        self.ensure_ready("get", key)?;

        let redis_key = self.key(key);
        let commands = [
            Command::Get {
                key: redis_key.clone(),
            },
            Command::Pttl { key: redis_key },
        ];
        let raw = self.conn.exec_atomic(&commands).await?;
        reply::normalize_optional(&raw)
    }

    /// 删除计数，返回是否真的删除了键
    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.ensure_ready("delete", key)?;

        let redis_key = self.key(key);
        let removed = self.conn.del(&redis_key).await?;
        debug!("delete {}: removed {}", redis_key, removed);
        Ok(removed > 0)
    }
}
