// libs/booking-cell/src/services/lock.rs
use chrono::{NaiveDate, Utc};
use deadpool_redis::Pool;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::BookingError;

/// Identity of a doctor slot reservation lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLockKey {
    pub doctor_id: Uuid,
    pub time_slot_id: Uuid,
    pub date: NaiveDate,
}

impl SlotLockKey {
    pub fn redis_key(&self) -> String {
        format!(
            "lock:doctor:{}:slot:{}:date:{}",
            self.doctor_id, self.time_slot_id, self.date
        )
    }
}

/// Short-lived advisory locks over doctor slots, backed by Redis `SET NX EX`.
///
/// A lock that is successfully converted into a booking is left to expire on
/// its own; only the failure path releases eagerly so the slot reopens without
/// waiting out the TTL.
#[derive(Clone)]
pub struct SlotLockService {
    pool: Pool,
    ttl_secs: u64,
}

impl SlotLockService {
    pub fn new(pool: Pool, ttl_secs: u64) -> Self {
        Self { pool, ttl_secs }
    }

    /// Atomically claim the slot. Returns false when another request holds it.
    pub async fn acquire(&self, key: &SlotLockKey, user_id: Uuid) -> Result<bool, BookingError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| BookingError::LockStore(e.to_string()))?;

        let value = json!({
            "user_id": user_id,
            "timestamp": Utc::now().to_rfc3339(),
        })
        .to_string();

        let reply: Option<String> = redis::cmd("SET")
            .arg(key.redis_key())
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| BookingError::LockStore(e.to_string()))?;

        let acquired = reply.is_some();
        debug!(
            key = %key.redis_key(),
            acquired,
            "Slot lock acquisition attempted"
        );
        Ok(acquired)
    }

    pub async fn release(&self, key: &SlotLockKey) -> Result<(), BookingError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| BookingError::LockStore(e.to_string()))?;

        let deleted: i64 = redis::cmd("DEL")
            .arg(key.redis_key())
            .query_async(&mut conn)
            .await
            .map_err(|e| BookingError::LockStore(e.to_string()))?;

        if deleted == 0 {
            warn!(key = %key.redis_key(), "Released a slot lock that had already expired");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_layout_is_stable() {
        let key = SlotLockKey {
            doctor_id: Uuid::nil(),
            time_slot_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        };
        assert_eq!(
            key.redis_key(),
            "lock:doctor:00000000-0000-0000-0000-000000000000:slot:00000000-0000-0000-0000-000000000000:date:2025-03-14"
        );
    }
}
