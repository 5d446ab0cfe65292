//! 回复解析
//!
//! 不同客户端返回事务结果的结构不同：有的直接返回 `[consumed, ttl]`，
//! 有的把每条子命令的回复包成 `[meta, value]`。这里按位置分别识别，
//! 其余模块只接触规范化后的数值。

use redis::Value;

use crate::cache::models::CounterState;
use crate::error::{StoreError, StoreResult};

/// 解析 `(consumed, ttl)` 回复
pub fn normalize(reply: &Value) -> StoreResult<CounterState> {
    let (first, second) = split_pair(reply)?;
    let consumed = scalar(unwrap_tagged(first)?, "consumed")?;
    let ttl = scalar(unwrap_tagged(second)?, "ttl")?;
    Ok(CounterState::new(consumed, ttl))
}

/// 解析强制覆盖的回复 `(OK, ttl)`，消耗值即写入的点数
pub fn normalize_forced(reply: &Value, points: i64) -> StoreResult<CounterState> {
    let (first, second) = split_pair(reply)?;
    match unwrap_tagged(first)? {
        Value::Okay => {}
        Value::SimpleString(s) if s.eq_ignore_ascii_case("OK") => {}
        other => {
            // 个别客户端直接返回写入的值
            let value = scalar(other, "set")?;
            if value != points {
                return Err(StoreError::UnexpectedReply(format!(
                    "set acknowledged {} instead of {}",
                    value, points
                )));
            }
        }
    }
    let ttl = scalar(unwrap_tagged(second)?, "ttl")?;
    Ok(CounterState::new(points, ttl))
}

/// 解析 `(value, ttl)` 读取回复，键不存在时返回 None
pub fn normalize_optional(reply: &Value) -> StoreResult<Option<CounterState>> {
    let (first, second) = split_pair(reply)?;
    let value = unwrap_tagged(first)?;
    if matches!(value, Value::Nil) {
        return Ok(None);
    }
    let consumed = scalar(value, "value")?;
    let ttl = scalar(unwrap_tagged(second)?, "ttl")?;
    Ok(Some(CounterState::new(consumed, ttl)))
}

fn split_pair(reply: &Value) -> StoreResult<(&Value, &Value)> {
    match reply {
        Value::Array(items) | Value::Set(items) if items.len() == 2 => Ok((&items[0], &items[1])),
        other => Err(StoreError::UnexpectedReply(format!(
            "expected a two-element reply, got {:?}",
            other
        ))),
    }
}

/// 展开 `[meta, value]` 结构，标量原样返回
fn unwrap_tagged(value: &Value) -> StoreResult<&Value> {
    match value {
        Value::Array(pair) if pair.len() == 2 => {
            if let Value::ServerError(err) = &pair[0] {
                return Err(StoreError::Command(err.clone().into()));
            }
            Ok(&pair[1])
        }
        Value::Array(other) => Err(StoreError::UnexpectedReply(format!(
            "expected a [meta, value] pair, got {} elements",
            other.len()
        ))),
        other => Ok(other),
    }
}

fn scalar(value: &Value, position: &str) -> StoreResult<i64> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::BulkString(bytes) => parse_int(&String::from_utf8_lossy(bytes), position),
        Value::SimpleString(s) => parse_int(s, position),
        // 事务中单条命令失败时错误出现在对应位置
        Value::ServerError(err) => Err(StoreError::Command(err.clone().into())),
        other => Err(StoreError::UnexpectedReply(format!(
            "{} is not an integer: {:?}",
            position, other
        ))),
    }
}

fn parse_int(text: &str, position: &str) -> StoreResult<i64> {
    text.trim().parse::<i64>().map_err(|_| {
        StoreError::UnexpectedReply(format!("{} is not an integer: {:?}", position, text))
    })
}
