// libs/booking-cell/src/services/lifecycle.rs
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    Actor, BookingError, BookingStatus, DoctorBooking, PaymentConfirmationRequest,
    RescheduleBookingRequest, ServiceBooking, UserSpend, UserVisits,
};
use crate::repository::{BookingRepository, LoyaltyRepository};

use catalog_cell::repository::CatalogRepository;

/// Everything that happens to a booking after it exists: reads, cancellation,
/// completion, refunds, reschedules and payment confirmation.
#[derive(Clone)]
pub struct BookingLifecycleService {
    pool: PgPool,
    bookings: BookingRepository,
    loyalty: LoyaltyRepository,
    catalog: CatalogRepository,
}

const COMPLETION_LOYALTY_POINTS: i32 = 1;

/// Edges of the status machine. Everything not listed is rejected.
fn valid_transitions(from: BookingStatus) -> &'static [BookingStatus] {
    use BookingStatus::*;
    match from {
        Pending => &[Scheduled, Canceled, Reschedule],
        Scheduled => &[Completed, Canceled, RefundInitiated, Reschedule],
        Completed => &[RefundInitiated],
        RefundInitiated => &[RefundCompleted],
        Canceled | RefundCompleted | Reschedule => &[],
    }
}

pub fn validate_status_transition(
    from: BookingStatus,
    to: BookingStatus,
) -> Result<(), BookingError> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(BookingError::InvalidStatusTransition { from, to })
    }
}

/// Owner or admin. Anyone else is told the booking does not exist, so probing
/// other users' booking ids reveals nothing.
fn authorize(owner: Uuid, actor: &Actor) -> Result<(), BookingError> {
    if actor.is_admin || actor.user_id == owner {
        Ok(())
    } else {
        Err(BookingError::BookingNotFound)
    }
}

impl BookingLifecycleService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            bookings: BookingRepository::new(),
            loyalty: LoyaltyRepository::new(),
            catalog: CatalogRepository::new(),
        }
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn get_doctor_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<DoctorBooking, BookingError> {
        let mut conn = self.pool.acquire().await?;
        let booking = self
            .bookings
            .get_doctor_booking(&mut conn, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        authorize(booking.user_id, actor)?;
        Ok(booking)
    }

    pub async fn get_service_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<ServiceBooking, BookingError> {
        let mut conn = self.pool.acquire().await?;
        let booking = self
            .bookings
            .get_service_booking(&mut conn, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        authorize(booking.user_id, actor)?;
        Ok(booking)
    }

    pub async fn list_doctor_bookings(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<DoctorBooking>, BookingError> {
        let mut conn = self.pool.acquire().await?;
        Ok(self
            .bookings
            .list_doctor_bookings_for_user(&mut conn, user_id)
            .await?)
    }

    pub async fn list_service_bookings(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ServiceBooking>, BookingError> {
        let mut conn = self.pool.acquire().await?;
        Ok(self
            .bookings
            .list_service_bookings_for_user(&mut conn, user_id)
            .await?)
    }

    // ==========================================================================
    // DOCTOR BOOKING TRANSITIONS
    // ==========================================================================

    #[instrument(skip(self, actor))]
    pub async fn cancel_doctor_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<DoctorBooking, BookingError> {
        self.transition_doctor(actor, booking_id, BookingStatus::Canceled)
            .await
    }

    /// Marks the booking COMPLETED and awards loyalty points in the same
    /// transaction; a failed award rolls the completion back.
    #[instrument(skip(self, actor))]
    pub async fn complete_doctor_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<DoctorBooking, BookingError> {
        let mut tx = self.pool.begin().await?;
        let booking = self
            .bookings
            .get_doctor_booking(&mut tx, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        authorize(booking.user_id, actor)?;
        validate_status_transition(booking.status, BookingStatus::Completed)?;

        let updated = self
            .bookings
            .set_doctor_booking_status(&mut tx, booking_id, BookingStatus::Completed)
            .await?;
        self.loyalty
            .award_point(&mut tx, booking.user_id, COMPLETION_LOYALTY_POINTS)
            .await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, "Doctor booking completed, loyalty point awarded");
        Ok(updated)
    }

    pub async fn initiate_doctor_refund(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<DoctorBooking, BookingError> {
        self.transition_doctor(actor, booking_id, BookingStatus::RefundInitiated)
            .await
    }

    pub async fn complete_doctor_refund(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<DoctorBooking, BookingError> {
        self.transition_doctor(actor, booking_id, BookingStatus::RefundCompleted)
            .await
    }

    /// Supersedes a booking with a new slot and date. The old row is stamped
    /// RESCHEDULE and a fresh row is inserted reusing the original VAT
    /// snapshot, both in one transaction.
    #[instrument(skip(self, actor, req))]
    pub async fn reschedule_doctor_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        req: &RescheduleBookingRequest,
    ) -> Result<DoctorBooking, BookingError> {
        let mut tx = self.pool.begin().await?;
        let old = self
            .bookings
            .get_doctor_booking(&mut tx, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        authorize(old.user_id, actor)?;
        validate_status_transition(old.status, BookingStatus::Reschedule)?;

        let slot = self
            .catalog
            .get_doctor_time_slot(&mut tx, req.time_slot_id)
            .await?
            .filter(|s| s.doctor_id == old.doctor_id)
            .ok_or(BookingError::DoctorTimeSlotNotFound)?;

        if self
            .bookings
            .find_occupying_doctor_booking(&mut tx, old.doctor_id, slot.id, req.date, old.branch_id)
            .await?
            .is_some()
        {
            return Err(BookingError::SlotAlreadyBooked);
        }

        self.bookings
            .set_doctor_booking_status(&mut tx, booking_id, BookingStatus::Reschedule)
            .await?;
        let replacement = self
            .bookings
            .insert_doctor_booking(
                &mut tx,
                old.user_id,
                old.doctor_id,
                slot.id,
                req.date,
                old.branch_id,
                old.vat_percentage,
                old.status,
            )
            .await?;

        tx.commit().await?;
        info!(old = %booking_id, new = %replacement.id, "Doctor booking rescheduled");
        Ok(replacement)
    }

    async fn transition_doctor(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> Result<DoctorBooking, BookingError> {
        let mut tx = self.pool.begin().await?;
        let booking = self
            .bookings
            .get_doctor_booking(&mut tx, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        authorize(booking.user_id, actor)?;
        validate_status_transition(booking.status, to)?;

        let updated = self
            .bookings
            .set_doctor_booking_status(&mut tx, booking_id, to)
            .await?;
        tx.commit().await?;
        info!(booking_id = %booking_id, status = %to, "Doctor booking transitioned");
        Ok(updated)
    }

    // ==========================================================================
    // SERVICE BOOKING TRANSITIONS
    // ==========================================================================

    #[instrument(skip(self, actor))]
    pub async fn cancel_service_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<ServiceBooking, BookingError> {
        self.transition_service(actor, booking_id, BookingStatus::Canceled)
            .await
    }

    #[instrument(skip(self, actor))]
    pub async fn complete_service_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<ServiceBooking, BookingError> {
        let mut tx = self.pool.begin().await?;
        let booking = self
            .bookings
            .get_service_booking(&mut tx, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        authorize(booking.user_id, actor)?;
        validate_status_transition(booking.status, BookingStatus::Completed)?;

        let updated = self
            .bookings
            .set_service_booking_status(&mut tx, booking_id, BookingStatus::Completed)
            .await?;
        self.loyalty
            .award_point(&mut tx, booking.user_id, COMPLETION_LOYALTY_POINTS)
            .await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, "Service booking completed, loyalty point awarded");
        Ok(updated)
    }

    pub async fn initiate_service_refund(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<ServiceBooking, BookingError> {
        self.transition_service(actor, booking_id, BookingStatus::RefundInitiated)
            .await
    }

    pub async fn complete_service_refund(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<ServiceBooking, BookingError> {
        self.transition_service(actor, booking_id, BookingStatus::RefundCompleted)
            .await
    }

    /// Service-side reschedule: the replacement slot must belong to the same
    /// service and still have capacity at the original branch.
    #[instrument(skip(self, actor, req))]
    pub async fn reschedule_service_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        req: &RescheduleBookingRequest,
    ) -> Result<ServiceBooking, BookingError> {
        let mut tx = self.pool.begin().await?;
        let old = self
            .bookings
            .get_service_booking(&mut tx, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        authorize(old.user_id, actor)?;
        validate_status_transition(old.status, BookingStatus::Reschedule)?;

        let branch = self
            .catalog
            .get_active_service_branch_for_update(&mut tx, old.service_id, old.branch_id)
            .await?
            .ok_or(BookingError::ServiceBranchNotFound)?;
        self.catalog
            .get_service_time_slot(&mut tx, old.service_id, req.time_slot_id)
            .await?
            .ok_or(BookingError::ServiceTimeSlotNotFound)?;

        let occupied = self
            .bookings
            .count_occupying_service_bookings(
                &mut tx,
                old.service_id,
                req.time_slot_id,
                req.date,
                old.branch_id,
            )
            .await?;
        if occupied >= i64::from(branch.max_bookings_per_slot) {
            return Err(BookingError::CapacityExhausted);
        }

        self.bookings
            .set_service_booking_status(&mut tx, booking_id, BookingStatus::Reschedule)
            .await?;
        let replacement = self
            .bookings
            .insert_service_booking(
                &mut tx,
                old.user_id,
                old.service_id,
                req.time_slot_id,
                req.date,
                old.branch_id,
                old.vat_percentage,
                old.status,
            )
            .await?;

        tx.commit().await?;
        info!(old = %booking_id, new = %replacement.id, "Service booking rescheduled");
        Ok(replacement)
    }

    async fn transition_service(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> Result<ServiceBooking, BookingError> {
        let mut tx = self.pool.begin().await?;
        let booking = self
            .bookings
            .get_service_booking(&mut tx, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        authorize(booking.user_id, actor)?;
        validate_status_transition(booking.status, to)?;

        let updated = self
            .bookings
            .set_service_booking_status(&mut tx, booking_id, to)
            .await?;
        tx.commit().await?;
        info!(booking_id = %booking_id, status = %to, "Service booking transitioned");
        Ok(updated)
    }

    // ==========================================================================
    // PAYMENT CONFIRMATION
    // ==========================================================================

    /// Idempotent PENDING -> SCHEDULED flip for one doctor booking. Calling
    /// again on an already-SCHEDULED row is a no-op success.
    pub async fn mark_doctor_scheduled(&self, booking_id: Uuid) -> Result<(), BookingError> {
        let mut tx = self.pool.begin().await?;
        self.mark_doctor_scheduled_in(&mut tx, booking_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn mark_service_scheduled(&self, booking_id: Uuid) -> Result<(), BookingError> {
        let mut tx = self.pool.begin().await?;
        self.mark_service_scheduled_in(&mut tx, booking_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn mark_doctor_scheduled_in(
        &self,
        conn: &mut sqlx::PgConnection,
        booking_id: Uuid,
    ) -> Result<(), BookingError> {
        let booking = self
            .bookings
            .get_doctor_booking(conn, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        match booking.status {
            BookingStatus::Scheduled => Ok(()),
            BookingStatus::Pending => {
                self.bookings
                    .set_doctor_booking_status(conn, booking_id, BookingStatus::Scheduled)
                    .await?;
                Ok(())
            }
            other => Err(BookingError::InvalidStatusTransition {
                from: other,
                to: BookingStatus::Scheduled,
            }),
        }
    }

    async fn mark_service_scheduled_in(
        &self,
        conn: &mut sqlx::PgConnection,
        booking_id: Uuid,
    ) -> Result<(), BookingError> {
        let booking = self
            .bookings
            .get_service_booking(conn, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        match booking.status {
            BookingStatus::Scheduled => Ok(()),
            BookingStatus::Pending => {
                self.bookings
                    .set_service_booking_status(conn, booking_id, BookingStatus::Scheduled)
                    .await?;
                Ok(())
            }
            other => Err(BookingError::InvalidStatusTransition {
                from: other,
                to: BookingStatus::Scheduled,
            }),
        }
    }

    /// Promotes every line item of a confirmed payment in one transaction;
    /// callback retries are harmless, anything non-PENDING/SCHEDULED fails
    /// the whole confirmation.
    #[instrument(skip(self, req))]
    pub async fn confirm_payment(
        &self,
        req: &PaymentConfirmationRequest,
    ) -> Result<(), BookingError> {
        let mut tx = self.pool.begin().await?;

        for id in &req.doctor_booking_ids {
            self.mark_doctor_scheduled_in(&mut tx, *id).await?;
        }
        for id in &req.service_booking_ids {
            self.mark_service_scheduled_in(&mut tx, *id).await?;
        }

        tx.commit().await?;
        info!(
            doctor_bookings = req.doctor_booking_ids.len(),
            service_bookings = req.service_booking_ids.len(),
            "Payment confirmed"
        );
        Ok(())
    }

    // ==========================================================================
    // METRICS
    // ==========================================================================

    pub async fn doctor_visits_per_user(&self) -> Result<Vec<UserVisits>, BookingError> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.bookings.doctor_visits_per_user(&mut conn).await?)
    }

    pub async fn service_visits_per_user(&self) -> Result<Vec<UserVisits>, BookingError> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.bookings.service_visits_per_user(&mut conn).await?)
    }

    pub async fn user_spend(&self, user_id: Uuid) -> Result<UserSpend, BookingError> {
        let mut conn = self.pool.acquire().await?;
        let doctor_spend = self.bookings.total_spend_on_doctors(&mut conn, user_id).await?;
        let service_spend = self
            .bookings
            .total_spend_on_services(&mut conn, user_id)
            .await?;
        Ok(UserSpend {
            user_id,
            doctor_spend,
            service_spend,
        })
    }

    pub async fn loyalty_balance(&self, user_id: Uuid) -> Result<i64, BookingError> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.loyalty.total_points(&mut conn, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pending_can_be_scheduled_canceled_or_rescheduled() {
        use BookingStatus::*;
        assert!(validate_status_transition(Pending, Scheduled).is_ok());
        assert!(validate_status_transition(Pending, Canceled).is_ok());
        assert!(validate_status_transition(Pending, Reschedule).is_ok());
        assert_matches!(
            validate_status_transition(Pending, Completed),
            Err(BookingError::InvalidStatusTransition { .. })
        );
    }

    #[test]
    fn completed_is_terminal_except_for_refunds() {
        use BookingStatus::*;
        assert!(validate_status_transition(Completed, RefundInitiated).is_ok());
        for to in [Pending, Scheduled, Canceled, Completed, RefundCompleted, Reschedule] {
            assert_matches!(
                validate_status_transition(Completed, to),
                Err(BookingError::InvalidStatusTransition { .. })
            );
        }
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        use BookingStatus::*;
        for from in [Canceled, RefundCompleted, Reschedule] {
            for to in [
                Pending,
                Scheduled,
                Canceled,
                RefundInitiated,
                RefundCompleted,
                Completed,
                Reschedule,
            ] {
                assert_matches!(
                    validate_status_transition(from, to),
                    Err(BookingError::InvalidStatusTransition { .. })
                );
            }
        }
    }

    #[test]
    fn refund_must_be_initiated_before_completion() {
        use BookingStatus::*;
        assert_matches!(
            validate_status_transition(Scheduled, RefundCompleted),
            Err(BookingError::InvalidStatusTransition { .. })
        );
        assert!(validate_status_transition(Scheduled, RefundInitiated).is_ok());
        assert!(validate_status_transition(RefundInitiated, RefundCompleted).is_ok());
    }

    #[test]
    fn non_owner_is_told_the_booking_does_not_exist() {
        let owner = Uuid::new_v4();
        let stranger = Actor {
            user_id: Uuid::new_v4(),
            is_admin: false,
        };
        assert_matches!(authorize(owner, &stranger), Err(BookingError::BookingNotFound));

        let admin = Actor {
            user_id: Uuid::new_v4(),
            is_admin: true,
        };
        assert!(authorize(owner, &admin).is_ok());
        let owner_actor = Actor {
            user_id: owner,
            is_admin: false,
        };
        assert!(authorize(owner, &owner_actor).is_ok());
    }
}
