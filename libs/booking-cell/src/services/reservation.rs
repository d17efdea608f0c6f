// libs/booking-cell/src/services/reservation.rs
use std::collections::HashSet;

use chrono::{Datelike, Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use catalog_cell::repository::CatalogRepository;

use crate::models::{
    BookDoctorRequest, BookServiceRequest, BookingError, BookingStatus, DoctorBooking,
    ServiceBooking, ServiceCartRequest,
};
use crate::repository::BookingRepository;
use crate::services::duplicate::{self, DuplicateResolution};
use crate::services::lock::{SlotLockKey, SlotLockService};

/// Creates bookings: doctor slots behind a Redis advisory lock, services and
/// service carts behind a row-locked capacity check, all inside database
/// transactions.
#[derive(Clone)]
pub struct ReservationService {
    pool: PgPool,
    locks: SlotLockService,
    catalog: CatalogRepository,
    bookings: BookingRepository,
    duplicate_staleness: Duration,
    payment_gating: bool,
}

impl ReservationService {
    pub fn new(
        pool: PgPool,
        locks: SlotLockService,
        duplicate_staleness_secs: i64,
        payment_gating: bool,
    ) -> Self {
        Self {
            pool,
            locks,
            catalog: CatalogRepository::new(),
            bookings: BookingRepository::new(),
            duplicate_staleness: Duration::seconds(duplicate_staleness_secs),
            payment_gating,
        }
    }

    /// Status stamped on freshly created bookings. With payment gating on,
    /// bookings wait in PENDING until the payment callback promotes them.
    fn initial_status(&self) -> BookingStatus {
        if self.payment_gating {
            BookingStatus::Pending
        } else {
            BookingStatus::Scheduled
        }
    }

    // ==========================================================================
    // DOCTOR BOOKINGS
    // ==========================================================================

    /// Books a doctor slot for `user_id`.
    ///
    /// The advisory lock is claimed before any database work; losing the claim
    /// means another request is mid-flight on the same slot and this one fails
    /// fast. On success the lock is left to expire with its TTL, covering the
    /// payment window; on failure it is released so the slot reopens at once.
    pub async fn book_doctor(
        &self,
        user_id: Uuid,
        req: &BookDoctorRequest,
    ) -> Result<DoctorBooking, BookingError> {
        let key = SlotLockKey {
            doctor_id: req.doctor_id,
            time_slot_id: req.time_slot_id,
            date: req.date,
        };

        if !self.locks.acquire(&key, user_id).await? {
            info!(doctor_id = %req.doctor_id, slot = %req.time_slot_id, "Slot lock contended");
            return Err(BookingError::SlotAlreadyBooked);
        }

        match self.book_doctor_locked(user_id, req).await {
            Ok(booking) => Ok(booking),
            Err(e) => {
                if let Err(release_err) = self.locks.release(&key).await {
                    warn!(error = %release_err, "Failed to release slot lock after booking error");
                }
                Err(e)
            }
        }
    }

    async fn book_doctor_locked(
        &self,
        user_id: Uuid,
        req: &BookDoctorRequest,
    ) -> Result<DoctorBooking, BookingError> {
        let mut tx = self.pool.begin().await?;

        self.catalog
            .get_active_doctor(&mut tx, req.doctor_id)
            .await?
            .ok_or(BookingError::DoctorNotFound)?;

        let slot = self
            .catalog
            .get_doctor_time_slot(&mut tx, req.time_slot_id)
            .await?
            .filter(|s| s.doctor_id == req.doctor_id)
            .ok_or(BookingError::DoctorTimeSlotNotFound)?;

        let branch = self
            .catalog
            .get_active_doctor_branch(&mut tx, req.doctor_id, req.branch_id)
            .await?
            .ok_or(BookingError::DoctorBranchNotFound)?;

        if !branch.availability()?.allows(req.date.weekday()) {
            return Err(BookingError::DoctorUnavailableOnDay);
        }

        if self
            .bookings
            .find_occupying_doctor_booking(&mut tx, req.doctor_id, slot.id, req.date, req.branch_id)
            .await?
            .is_some()
        {
            return Err(BookingError::SlotAlreadyBooked);
        }

        let vat = self.catalog.current_vat_rate(&mut tx).await?;
        let booking = self
            .bookings
            .insert_doctor_booking(
                &mut tx,
                user_id,
                req.doctor_id,
                slot.id,
                req.date,
                req.branch_id,
                vat,
                self.initial_status(),
            )
            .await?;

        tx.commit().await?;
        info!(booking_id = %booking.id, doctor_id = %req.doctor_id, "Doctor booking created");
        Ok(booking)
    }

    // ==========================================================================
    // SERVICE BOOKINGS
    // ==========================================================================

    /// Books one service slot. Capacity is enforced by counting occupying rows
    /// under a `FOR UPDATE` lock on the (service, branch) capacity binding, so
    /// concurrent requests for the same pool serialize instead of overbooking.
    pub async fn book_service(
        &self,
        user_id: Uuid,
        req: &BookServiceRequest,
    ) -> Result<ServiceBooking, BookingError> {
        let mut tx = self.pool.begin().await?;

        self.catalog
            .get_active_service(&mut tx, req.service_id)
            .await?
            .ok_or(BookingError::ServiceNotFound)?;

        let branch = self
            .catalog
            .get_active_service_branch_for_update(&mut tx, req.service_id, req.branch_id)
            .await?
            .ok_or(BookingError::ServiceBranchNotFound)?;

        self.catalog
            .get_service_time_slot(&mut tx, req.service_id, req.time_slot_id)
            .await?
            .ok_or(BookingError::ServiceTimeSlotNotFound)?;

        let occupied = self
            .bookings
            .count_occupying_service_bookings(
                &mut tx,
                req.service_id,
                req.time_slot_id,
                req.date,
                req.branch_id,
            )
            .await?;
        if occupied >= i64::from(branch.max_bookings_per_slot) {
            return Err(BookingError::CapacityExhausted);
        }

        let vat = self.catalog.current_vat_rate(&mut tx).await?;
        let booking = self
            .bookings
            .insert_service_booking(
                &mut tx,
                user_id,
                req.service_id,
                req.time_slot_id,
                req.date,
                req.branch_id,
                vat,
                self.initial_status(),
            )
            .await?;

        tx.commit().await?;
        info!(booking_id = %booking.id, service_id = %req.service_id, "Service booking created");
        Ok(booking)
    }

    /// Books a cart of service slots atomically: every item succeeds or none
    /// do. Pending collisions are resolved per item; a live reservation held
    /// by another user fails the whole cart.
    pub async fn book_service_cart(
        &self,
        user_id: Uuid,
        req: &ServiceCartRequest,
    ) -> Result<Vec<ServiceBooking>, BookingError> {
        // A cart naming the same tuple twice collapses to one reservation;
        // the pending-duplicate probe only sees committed rows, so repeats
        // within the cart have to be folded here.
        let items = dedupe_cart_items(&req.items);
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;

        // Validate every (service, slot) pair in one round trip.
        let mut pairs: Vec<(Uuid, Uuid)> = items
            .iter()
            .map(|i| (i.service_id, i.time_slot_id))
            .collect();
        pairs.sort();
        pairs.dedup();

        let valid: HashSet<(Uuid, Uuid)> = self
            .catalog
            .get_service_time_slot_pairs(&mut tx, &pairs)
            .await?;
        for pair in &pairs {
            if !valid.contains(pair) {
                return Err(BookingError::ServiceTimeSlotNotFound);
            }
        }

        let now = Utc::now();
        for item in &items {
            let existing = self
                .bookings
                .find_pending_service_booking(
                    &mut tx,
                    item.service_id,
                    item.time_slot_id,
                    item.date,
                    item.branch_id,
                )
                .await?;

            if let Some(pending) = existing {
                match duplicate::resolve(
                    pending.user_id,
                    pending.created_at,
                    user_id,
                    now,
                    self.duplicate_staleness,
                ) {
                    DuplicateResolution::EvictAndProceed => {
                        self.bookings.delete_service_booking(&mut tx, pending.id).await?;
                    }
                    DuplicateResolution::Reject => {
                        return Err(BookingError::DuplicateReservation);
                    }
                }
            }
        }

        let vat = self.catalog.current_vat_rate(&mut tx).await?;
        let mut created = Vec::with_capacity(items.len());
        for item in &items {
            let booking = self
                .bookings
                .insert_service_booking(
                    &mut tx,
                    user_id,
                    item.service_id,
                    item.time_slot_id,
                    item.date,
                    item.branch_id,
                    vat,
                    self.initial_status(),
                )
                .await?;
            created.push(booking);
        }

        tx.commit().await?;
        info!(count = created.len(), user_id = %user_id, "Service cart booked");
        Ok(created)
    }
}

/// Collapses repeated (service, slot, date, branch) tuples, keeping first
/// occurrence order.
fn dedupe_cart_items(items: &[BookServiceRequest]) -> Vec<BookServiceRequest> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|i| seen.insert((i.service_id, i.time_slot_id, i.date, i.branch_id)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(service_id: Uuid, time_slot_id: Uuid, day: u32) -> BookServiceRequest {
        BookServiceRequest {
            service_id,
            time_slot_id,
            branch_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
        }
    }

    #[test]
    fn repeated_cart_tuples_collapse_to_one() {
        let service = Uuid::new_v4();
        let slot = Uuid::new_v4();
        let items = vec![
            item(service, slot, 2),
            item(service, slot, 2),
            item(service, slot, 2),
        ];
        let deduped = dedupe_cart_items(&items);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn same_slot_on_different_dates_is_not_a_repeat() {
        let service = Uuid::new_v4();
        let slot = Uuid::new_v4();
        let items = vec![item(service, slot, 2), item(service, slot, 3)];
        assert_eq!(dedupe_cart_items(&items).len(), 2);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let a = item(Uuid::new_v4(), Uuid::new_v4(), 2);
        let b = item(Uuid::new_v4(), Uuid::new_v4(), 2);
        let items = vec![a.clone(), b.clone(), a.clone()];
        let deduped = dedupe_cart_items(&items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].service_id, a.service_id);
        assert_eq!(deduped[1].service_id, b.service_id);
    }
}
