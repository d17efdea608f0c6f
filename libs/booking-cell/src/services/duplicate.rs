// libs/booking-cell/src/services/duplicate.rs
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Outcome of finding an existing PENDING reservation on the requested tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateResolution {
    /// Delete the stale or self-owned reservation and take its place.
    EvictAndProceed,
    /// A live reservation belongs to someone else; the request loses.
    Reject,
}

/// A pending reservation yields if the requester already owns it (retry after
/// an abandoned checkout) or if it has outlived the staleness window without
/// being paid for. A fresh reservation held by another user wins.
pub fn resolve(
    existing_owner: Uuid,
    existing_created_at: DateTime<Utc>,
    requester: Uuid,
    now: DateTime<Utc>,
    staleness: Duration,
) -> DuplicateResolution {
    if existing_owner == requester {
        return DuplicateResolution::EvictAndProceed;
    }
    if now - existing_created_at > staleness {
        return DuplicateResolution::EvictAndProceed;
    }
    DuplicateResolution::Reject
}
