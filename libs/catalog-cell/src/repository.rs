// libs/catalog-cell/src/repository.rs
use std::collections::HashSet;

use sqlx::PgConnection;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Doctor, DoctorBranch, DoctorTimeSlot, Service, ServiceBranch, ServiceTimeSlot};

/// Read-only lookups against the catalog tables. Absent rows are reported as
/// `None`; the booking engine decides which error that maps to.
///
/// All methods run on a caller-supplied connection so they participate in the
/// caller's transaction.
#[derive(Debug, Clone, Default)]
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_active_doctor(
        &self,
        conn: &mut PgConnection,
        doctor_id: Uuid,
    ) -> Result<Option<Doctor>, sqlx::Error> {
        sqlx::query_as::<_, Doctor>(
            "SELECT id, full_name, session_fee, is_active FROM doctor WHERE id = $1 AND is_active",
        )
        .bind(doctor_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn get_doctor_time_slot(
        &self,
        conn: &mut PgConnection,
        time_slot_id: Uuid,
    ) -> Result<Option<DoctorTimeSlot>, sqlx::Error> {
        sqlx::query_as::<_, DoctorTimeSlot>(
            "SELECT id, doctor_id, start_time, end_time, is_active
             FROM doctor_time_slot WHERE id = $1 AND is_active",
        )
        .bind(time_slot_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn get_active_doctor_branch(
        &self,
        conn: &mut PgConnection,
        doctor_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<DoctorBranch>, sqlx::Error> {
        sqlx::query_as::<_, DoctorBranch>(
            "SELECT id, doctor_id, branch_id, day_map, is_active
             FROM doctor_branch WHERE doctor_id = $1 AND branch_id = $2 AND is_active",
        )
        .bind(doctor_id)
        .bind(branch_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn get_active_service(
        &self,
        conn: &mut PgConnection,
        service_id: Uuid,
    ) -> Result<Option<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            "SELECT id, category_id, actual_price, discounted_price, is_redeemable, is_active
             FROM service WHERE id = $1 AND is_active",
        )
        .bind(service_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn get_service_time_slot(
        &self,
        conn: &mut PgConnection,
        service_id: Uuid,
        time_slot_id: Uuid,
    ) -> Result<Option<ServiceTimeSlot>, sqlx::Error> {
        sqlx::query_as::<_, ServiceTimeSlot>(
            "SELECT id, service_id, start_time, end_time, is_active
             FROM service_time_slot WHERE id = $1 AND service_id = $2 AND is_active",
        )
        .bind(time_slot_id)
        .bind(service_id)
        .fetch_optional(conn)
        .await
    }

    /// Bulk existence check for (service, time slot) pairs; one round trip for
    /// a whole cart. Returns the set of pairs that exist and are active.
    pub async fn get_service_time_slot_pairs(
        &self,
        conn: &mut PgConnection,
        pairs: &[(Uuid, Uuid)],
    ) -> Result<HashSet<(Uuid, Uuid)>, sqlx::Error> {
        if pairs.is_empty() {
            return Ok(HashSet::new());
        }

        let service_ids: Vec<Uuid> = pairs.iter().map(|(s, _)| *s).collect();
        let slot_ids: Vec<Uuid> = pairs.iter().map(|(_, t)| *t).collect();

        // ANY-filtering may return extra cross combinations; the caller only
        // probes the exact pairs it asked for.
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT service_id, id FROM service_time_slot
             WHERE service_id = ANY($1) AND id = ANY($2) AND is_active",
        )
        .bind(&service_ids)
        .bind(&slot_ids)
        .fetch_all(conn)
        .await?;

        debug!("Validated {} of {} service slot pairs", rows.len(), pairs.len());
        Ok(rows.into_iter().collect())
    }

    /// Fetches the capacity binding with a row lock so concurrent capacity
    /// checks for the same (service, branch) serialize at the database.
    pub async fn get_active_service_branch_for_update(
        &self,
        conn: &mut PgConnection,
        service_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<ServiceBranch>, sqlx::Error> {
        sqlx::query_as::<_, ServiceBranch>(
            "SELECT id, service_id, branch_id, max_bookings_per_slot, is_active
             FROM service_branch WHERE service_id = $1 AND branch_id = $2 AND is_active
             FOR UPDATE",
        )
        .bind(service_id)
        .bind(branch_id)
        .fetch_optional(conn)
        .await
    }

    /// Current global VAT rate. Read at booking-creation time and snapshotted
    /// onto the row; later VAT changes never touch historical bookings.
    pub async fn current_vat_rate(&self, conn: &mut PgConnection) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>("SELECT vat_percentage FROM vat LIMIT 1")
            .fetch_one(conn)
            .await
    }
}
