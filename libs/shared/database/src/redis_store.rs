use anyhow::{anyhow, Result};
use deadpool_redis::{Config, Pool, Runtime};
use tracing::info;

/// Connect the Redis pool used for slot reservation locks.
pub async fn connect_pool(redis_url: &str) -> Result<Pool> {
    let cfg = Config::from_url(redis_url);
    let pool = cfg
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| anyhow!("Failed to create Redis pool: {}", e))?;

    // Fail fast on startup rather than on the first booking.
    let mut conn = pool
        .get()
        .await
        .map_err(|e| anyhow!("Failed to connect to Redis: {}", e))?;
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Redis pool initialized");
    Ok(pool)
}
