// libs/booking-cell/src/repository/loyalty.rs
use sqlx::PgConnection;
use uuid::Uuid;

/// Loyalty point ledger. `award_point` runs on the caller's connection so the
/// award commits or rolls back together with the status flip that triggered it.
#[derive(Debug, Clone, Default)]
pub struct LoyaltyRepository;

impl LoyaltyRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn award_point(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        points: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO loyalty_point (user_id, points) VALUES ($1, $2)")
            .bind(user_id)
            .bind(points)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn total_points(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT SUM(points) FROM loyalty_point WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await
        .map(|total| total.unwrap_or(0))
    }
}
