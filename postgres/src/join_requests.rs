use crate::rows::{JOIN_REQUEST_COLUMNS, JoinRequestRow, convert_all};
use crate::{PostgresStore, store_error};
use roomly_core::error::StoreResult;
use roomly_core::repository::JoinRequestRepository;
use roomly_core::types::{CommunityId, JoinRequest, JoinRequestId, JoinRequestStatus};

impl JoinRequestRepository for PostgresStore {
    #[tracing::instrument(skip(self, request), fields(ticket = %request.ticket_code))]
    async fn insert_join_request(&self, request: &JoinRequest) -> StoreResult<JoinRequest> {
        let row: JoinRequestRow = sqlx::query_as(&format!(
            "INSERT INTO join_requests ({JOIN_REQUEST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {JOIN_REQUEST_COLUMNS}"
        ))
        .bind(request.id.as_uuid())
        .bind(&request.ticket_code)
        .bind(request.community_id.as_uuid())
        .bind(&request.user_email)
        .bind(&request.user_name)
        .bind(&request.unit)
        .bind(&request.tower)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert join request"))?;

        row.try_into()
    }

    async fn get_join_request(&self, request_id: JoinRequestId) -> StoreResult<Option<JoinRequest>> {
        let row: Option<JoinRequestRow> = sqlx::query_as(&format!(
            "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests WHERE id = $1"
        ))
        .bind(request_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("get join request"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn decide_join_request(
        &self,
        request_id: JoinRequestId,
        decision: JoinRequestStatus,
    ) -> StoreResult<Option<JoinRequest>> {
        let row: Option<JoinRequestRow> = sqlx::query_as(&format!(
            "UPDATE join_requests SET status = $2 \
             WHERE id = $1 AND status = 'PENDING' \
             RETURNING {JOIN_REQUEST_COLUMNS}"
        ))
        .bind(request_id.as_uuid())
        .bind(decision.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("decide join request"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_pending_join_requests(
        &self,
        community_id: CommunityId,
    ) -> StoreResult<Vec<JoinRequest>> {
        let rows: Vec<JoinRequestRow> = sqlx::query_as(&format!(
            "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests \
             WHERE community_id = $1 AND status = 'PENDING' \
             ORDER BY created_at DESC"
        ))
        .bind(community_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list pending join requests"))?;

        convert_all(rows)
    }
}
