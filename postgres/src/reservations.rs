use crate::rows::{
    AuditRow, RESERVATION_COLUMNS, RESERVATION_COLUMNS_R, ReservationRow, convert_all,
};
use crate::{PostgresStore, store_error};
use chrono::NaiveDate;
use roomly_core::error::StoreResult;
use roomly_core::repository::ReservationRepository;
use roomly_core::types::{
    AmenityCategory, AmenityId, AuditEntry, CommunityId, GradeOutcome, Reservation, ReservationId,
    UserId,
};

impl ReservationRepository for PostgresStore {
    /// Slot exclusivity is enforced by `reservations_active_slot_key`.
    #[tracing::instrument(
        skip(self, reservation),
        fields(
            reservation_id = %reservation.id,
            amenity_id = %reservation.amenity_id,
            date = %reservation.date,
            time_slot = %reservation.time_slot,
        )
    )]
    async fn insert_reservation(&self, reservation: &Reservation) -> StoreResult<Reservation> {
        let row: ReservationRow = sqlx::query_as(&format!(
            "INSERT INTO reservations ({RESERVATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation.id.as_uuid())
        .bind(reservation.user_id.as_uuid())
        .bind(reservation.amenity_id.as_uuid())
        .bind(reservation.date)
        .bind(reservation.time_slot.to_string())
        .bind(reservation.status.as_str())
        .bind(reservation.grade.as_str())
        .bind(i16::from(reservation.compliance_pct))
        .bind(reservation.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert reservation"))?;

        row.try_into()
    }

    async fn get_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> StoreResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(reservation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("get reservation"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> StoreResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "UPDATE reservations SET status = 'CANCELLED' \
             WHERE id = $1 AND status = 'ACTIVE' \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("cancel reservation"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn grade_reservation(
        &self,
        reservation_id: ReservationId,
        outcome: GradeOutcome,
    ) -> StoreResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "UPDATE reservations SET status = 'FINALIZED', grade = $2, compliance_pct = $3 \
             WHERE id = $1 AND status = 'ACTIVE' AND grade = 'PENDING' \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id.as_uuid())
        .bind(outcome.grade().as_str())
        .bind(i16::from(outcome.compliance_pct()))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("grade reservation"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_user_reservations(&self, user_id: UserId) -> StoreResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE user_id = $1 \
             ORDER BY date DESC, time_slot DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list user reservations"))?;

        convert_all(rows)
    }

    async fn list_amenity_reservations(
        &self,
        amenity_id: AmenityId,
        date: NaiveDate,
    ) -> StoreResult<Vec<Reservation>> {
        // "HH:00-HH:00" sorts chronologically as text.
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE amenity_id = $1 AND date = $2 AND status <> 'CANCELLED' \
             ORDER BY time_slot ASC"
        ))
        .bind(amenity_id.as_uuid())
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list amenity reservations"))?;

        convert_all(rows)
    }

    async fn latest_active_in_category(
        &self,
        user_id: UserId,
        category: AmenityCategory,
    ) -> StoreResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS_R} FROM reservations r \
             JOIN amenities a ON a.id = r.amenity_id \
             WHERE r.user_id = $1 AND r.status = 'ACTIVE' AND a.category = $2 \
             ORDER BY r.created_at DESC \
             LIMIT 1"
        ))
        .bind(user_id.as_uuid())
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("find latest reservation in category"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn audit_reservations(
        &self,
        community_id: Option<CommunityId>,
    ) -> StoreResult<Vec<AuditEntry>> {
        let rows: Vec<AuditRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS_R}, \
                    a.name AS amenity_name, a.community_id AS amenity_community_id, \
                    u.name AS user_name, u.email AS user_email, \
                    u.community_id AS user_community_id \
             FROM reservations r \
             JOIN amenities a ON a.id = r.amenity_id \
             JOIN users u ON u.id = r.user_id \
             WHERE $1::uuid IS NULL OR a.community_id = $1 OR u.community_id = $1 \
             ORDER BY r.date DESC, r.time_slot DESC"
        ))
        .bind(community_id.map(|c| *c.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("audit reservations"))?;

        convert_all(rows)
    }
}
