// libs/booking-cell/src/repository/booking.rs
use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::debug;
use uuid::Uuid;

use crate::models::{BookingStatus, DoctorBooking, ServiceBooking, UserVisits};

/// The booking ledger: row inserts, status flips, conflict/capacity lookups and
/// derived metrics for the two parallel booking families.
///
/// Conflict and capacity queries only consider rows whose status occupies the
/// slot (PENDING, SCHEDULED, COMPLETED); canceled, refunded and superseded rows
/// free their capacity.
#[derive(Debug, Clone, Default)]
pub struct BookingRepository;

const DOCTOR_COLUMNS: &str =
    "id, user_id, doctor_id, time_slot_id, branch_id, date, vat_percentage, status, created_at";
const SERVICE_COLUMNS: &str =
    "id, user_id, service_id, time_slot_id, branch_id, date, vat_percentage, status, created_at";

impl BookingRepository {
    pub fn new() -> Self {
        Self
    }

    // ==========================================================================
    // DOCTOR BOOKINGS
    // ==========================================================================

    pub async fn find_occupying_doctor_booking(
        &self,
        conn: &mut PgConnection,
        doctor_id: Uuid,
        time_slot_id: Uuid,
        date: NaiveDate,
        branch_id: Uuid,
    ) -> Result<Option<DoctorBooking>, sqlx::Error> {
        sqlx::query_as::<_, DoctorBooking>(&format!(
            "SELECT {DOCTOR_COLUMNS} FROM booking_doctor
             WHERE doctor_id = $1 AND time_slot_id = $2 AND date = $3 AND branch_id = $4
               AND status IN ('PENDING', 'SCHEDULED', 'COMPLETED')
             LIMIT 1"
        ))
        .bind(doctor_id)
        .bind(time_slot_id)
        .bind(date)
        .bind(branch_id)
        .fetch_optional(conn)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_doctor_booking(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        doctor_id: Uuid,
        time_slot_id: Uuid,
        date: NaiveDate,
        branch_id: Uuid,
        vat_percentage: f64,
        status: BookingStatus,
    ) -> Result<DoctorBooking, sqlx::Error> {
        let booking = sqlx::query_as::<_, DoctorBooking>(&format!(
            "INSERT INTO booking_doctor
               (user_id, doctor_id, time_slot_id, date, branch_id, vat_percentage, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {DOCTOR_COLUMNS}"
        ))
        .bind(user_id)
        .bind(doctor_id)
        .bind(time_slot_id)
        .bind(date)
        .bind(branch_id)
        .bind(vat_percentage)
        .bind(status)
        .fetch_one(conn)
        .await?;

        debug!("Inserted doctor booking {}", booking.id);
        Ok(booking)
    }

    pub async fn get_doctor_booking(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<Option<DoctorBooking>, sqlx::Error> {
        sqlx::query_as::<_, DoctorBooking>(&format!(
            "SELECT {DOCTOR_COLUMNS} FROM booking_doctor WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn set_doctor_booking_status(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<DoctorBooking, sqlx::Error> {
        sqlx::query_as::<_, DoctorBooking>(&format!(
            "UPDATE booking_doctor SET status = $2 WHERE id = $1 RETURNING {DOCTOR_COLUMNS}"
        ))
        .bind(booking_id)
        .bind(status)
        .fetch_one(conn)
        .await
    }

    pub async fn list_doctor_bookings_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<DoctorBooking>, sqlx::Error> {
        sqlx::query_as::<_, DoctorBooking>(&format!(
            "SELECT {DOCTOR_COLUMNS} FROM booking_doctor
             WHERE user_id = $1 ORDER BY date DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(conn)
        .await
    }

    // ==========================================================================
    // SERVICE BOOKINGS
    // ==========================================================================

    pub async fn count_occupying_service_bookings(
        &self,
        conn: &mut PgConnection,
        service_id: Uuid,
        time_slot_id: Uuid,
        date: NaiveDate,
        branch_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM booking_service
             WHERE service_id = $1 AND time_slot_id = $2 AND date = $3 AND branch_id = $4
               AND status IN ('PENDING', 'SCHEDULED', 'COMPLETED')",
        )
        .bind(service_id)
        .bind(time_slot_id)
        .bind(date)
        .bind(branch_id)
        .fetch_one(conn)
        .await
    }

    /// A pending reservation colliding with the requested tuple, regardless of
    /// owner; the duplicate policy decides what happens to it.
    pub async fn find_pending_service_booking(
        &self,
        conn: &mut PgConnection,
        service_id: Uuid,
        time_slot_id: Uuid,
        date: NaiveDate,
        branch_id: Uuid,
    ) -> Result<Option<ServiceBooking>, sqlx::Error> {
        sqlx::query_as::<_, ServiceBooking>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM booking_service
             WHERE service_id = $1 AND time_slot_id = $2 AND date = $3 AND branch_id = $4
               AND status = 'PENDING'
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .bind(service_id)
        .bind(time_slot_id)
        .bind(date)
        .bind(branch_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn delete_service_booking(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM booking_service WHERE id = $1")
            .bind(booking_id)
            .execute(conn)
            .await?;
        debug!("Evicted service booking {}", booking_id);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_service_booking(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        service_id: Uuid,
        time_slot_id: Uuid,
        date: NaiveDate,
        branch_id: Uuid,
        vat_percentage: f64,
        status: BookingStatus,
    ) -> Result<ServiceBooking, sqlx::Error> {
        let booking = sqlx::query_as::<_, ServiceBooking>(&format!(
            "INSERT INTO booking_service
               (user_id, service_id, time_slot_id, date, branch_id, vat_percentage, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(service_id)
        .bind(time_slot_id)
        .bind(date)
        .bind(branch_id)
        .bind(vat_percentage)
        .bind(status)
        .fetch_one(conn)
        .await?;

        debug!("Inserted service booking {}", booking.id);
        Ok(booking)
    }

    pub async fn get_service_booking(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
    ) -> Result<Option<ServiceBooking>, sqlx::Error> {
        sqlx::query_as::<_, ServiceBooking>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM booking_service WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn set_service_booking_status(
        &self,
        conn: &mut PgConnection,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<ServiceBooking, sqlx::Error> {
        sqlx::query_as::<_, ServiceBooking>(&format!(
            "UPDATE booking_service SET status = $2 WHERE id = $1 RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(booking_id)
        .bind(status)
        .fetch_one(conn)
        .await
    }

    pub async fn list_service_bookings_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<ServiceBooking>, sqlx::Error> {
        sqlx::query_as::<_, ServiceBooking>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM booking_service
             WHERE user_id = $1 ORDER BY date DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(conn)
        .await
    }

    // ==========================================================================
    // DERIVED METRICS
    // ==========================================================================

    pub async fn doctor_visits_per_user(
        &self,
        conn: &mut PgConnection,
    ) -> Result<Vec<UserVisits>, sqlx::Error> {
        sqlx::query_as::<_, UserVisits>(
            "SELECT user_id, COUNT(*) AS visits FROM booking_doctor GROUP BY user_id",
        )
        .fetch_all(conn)
        .await
    }

    pub async fn service_visits_per_user(
        &self,
        conn: &mut PgConnection,
    ) -> Result<Vec<UserVisits>, sqlx::Error> {
        sqlx::query_as::<_, UserVisits>(
            "SELECT user_id, COUNT(*) AS visits FROM booking_service GROUP BY user_id",
        )
        .fetch_all(conn)
        .await
    }

    pub async fn total_spend_on_doctors(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT SUM(d.session_fee) FROM booking_doctor bd
             JOIN doctor d ON bd.doctor_id = d.id
             WHERE bd.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await
        .map(|total| total.unwrap_or(0.0))
    }

    pub async fn total_spend_on_services(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT SUM(s.discounted_price) FROM booking_service bs
             JOIN service s ON bs.service_id = s.id
             WHERE bs.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await
        .map(|total| total.unwrap_or(0.0))
    }
}
