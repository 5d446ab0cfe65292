/// 前缀与业务键之间的分隔符
const KEY_SEPARATOR: char = ':';

/// 生成限流计数键
///
/// 前缀为空时直接使用原始键。
pub fn rate_limit_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", prefix, KEY_SEPARATOR, key)
    }
}
