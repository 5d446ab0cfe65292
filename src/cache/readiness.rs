use crate::cache::connection::StoreConnection;

/// 连接就绪检查
///
/// 开启后，连接报告未就绪时所有操作立即失败，不发出任何网络请求。
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadinessGate {
    reject_if_not_ready: bool,
}

impl ReadinessGate {
    pub fn new(reject_if_not_ready: bool) -> Self {
        Self {
            reject_if_not_ready,
        }
    }

    pub fn is_ready<C: StoreConnection>(&self, conn: &C) -> bool {
        if !self.reject_if_not_ready {
            return true;
        }
        if let Some(status) = conn.status() {
            if !status.is_ready() {
                return false;
            }
        }
        conn.ready_probe().unwrap_or(true)
    }
}
