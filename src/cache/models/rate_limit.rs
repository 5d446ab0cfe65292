use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 没有设置过期时间时的 TTL 标记
pub const NO_EXPIRY: i64 = -1;

/// 存储层返回的计数状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    /// 当前窗口内已消耗的点数
    pub consumed: i64,
    /// 剩余 TTL（毫秒），-1 表示不过期
    pub ms_before_next: i64,
}

impl CounterState {
    pub fn new(consumed: i64, ms_before_next: i64) -> Self {
        Self {
            consumed,
            ms_before_next,
        }
    }

    pub fn has_expiry(&self) -> bool {
        self.ms_before_next >= 0
    }
}

/// 面向调用方的限流结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub consumed_points: i64,
    pub is_first_in_duration: bool,
    pub remaining_points: i64,
    pub ms_before_next: i64,
}

impl OperationResult {
    /// 由计数状态构造结果
    ///
    /// `quota` 为窗口内允许的总点数，`changed_points` 为本次调用增加的点数。
    pub fn from_state(quota: i64, changed_points: i64, state: &CounterState) -> Self {
        Self {
            consumed_points: state.consumed,
            is_first_in_duration: state.consumed == changed_points,
            remaining_points: quota.saturating_sub(state.consumed).max(0),
            ms_before_next: state.ms_before_next,
        }
    }

    /// 窗口重置的绝对时间，不过期时返回 None
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        if self.ms_before_next < 0 {
            return None;
        }
        Utc::now().checked_add_signed(Duration::milliseconds(self.ms_before_next))
    }

    /// 常用的限流响应头
    pub fn headers(&self, quota: i64) -> Vec<(&'static str, String)> {
        let retry_after_secs = if self.ms_before_next > 0 {
            // 向上取整到秒
            (self.ms_before_next + 999) / 1000
        } else {
            0
        };
        let mut headers = vec![
            ("Retry-After", retry_after_secs.to_string()),
            ("X-RateLimit-Limit", quota.to_string()),
            ("X-RateLimit-Remaining", self.remaining_points.to_string()),
        ];
        if let Some(reset_at) = self.reset_at() {
            headers.push(("X-RateLimit-Reset", reset_at.to_rfc2822()));
        }
        headers
    }
}
