use ratelimit_store::{OperationResult, RedisConnection, RedisStore, StoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = StoreConfig::from_env().expect("Failed to load configuration");
    let key = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());

    // 设置 Redis 连接
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let conn = RedisConnection::connect(&redis_client)
        .await
        .expect("Failed to connect to Redis");

    let store = RedisStore::new(conn, config.store_options())
        .await
        .expect("Failed to create rate limit store");

    match store.upsert(&key, 1, config.duration(), false).await {
        Ok(state) => {
            let res = OperationResult::from_state(config.points, 1, &state);
            if res.consumed_points > config.points {
                tracing::warn!(
                    "rate limit exceeded for {}: {}/{}",
                    key,
                    res.consumed_points,
                    config.points
                );
            }
            match serde_json::to_string_pretty(&res) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::error!("Failed to serialize result: {}", e),
            }
        }
        Err(e) => {
            tracing::error!("upsert failed for {}: {}", key, e);
            std::process::exit(1);
        }
    }
}
