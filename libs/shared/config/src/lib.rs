use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub bind_address: String,
    /// TTL for slot reservation locks, in seconds.
    pub slot_lock_ttl_secs: u64,
    /// Age after which an unconfirmed pending booking may be evicted, in seconds.
    pub duplicate_staleness_secs: i64,
    /// When true, new bookings start PENDING and payment confirmation flips
    /// them to SCHEDULED. When false, bookings are created SCHEDULED directly.
    pub payment_gating: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| {
                    warn!("REDIS_URL not set, using default");
                    "redis://localhost:6379".to_string()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            slot_lock_ttl_secs: env::var("SLOT_LOCK_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15 * 60),
            duplicate_staleness_secs: env::var("DUPLICATE_STALENESS_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5 * 60),
            payment_gating: env::var("PAYMENT_GATING")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty()
            && !self.redis_url.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_when_database_url_missing() {
        let config = AppConfig {
            database_url: String::new(),
            redis_url: "redis://localhost:6379".to_string(),
            jwt_secret: "secret".to_string(),
            bind_address: "0.0.0.0:3000".to_string(),
            slot_lock_ttl_secs: 900,
            duplicate_staleness_secs: 300,
            payment_gating: true,
        };
        assert!(!config.is_configured());
    }
}
