//! Join request workflow: `PENDING → {APPROVED, REJECTED}`.

use crate::access::{ensure_community_admin, require_admin, require_admin_of, require_text};
use roomly_core::environment::Clock;
use roomly_core::error::{Result, RoomlyError};
use roomly_core::repository::DataStore;
use roomly_core::types::{
    CommunityId, JoinRequest, JoinRequestId, JoinRequestStatus, User, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A prospective resident's application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewJoinRequest {
    /// Target community
    pub community_id: CommunityId,
    /// Applicant e-mail
    pub user_email: String,
    /// Applicant name
    pub user_name: String,
    /// Requested unit
    #[serde(default)]
    pub unit: Option<String>,
    /// Requested tower
    #[serde(default)]
    pub tower: Option<String>,
}

/// Result of an approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Approval {
    /// The approved request
    pub request: JoinRequest,
    /// The account linked to the community, if one matched the e-mail
    pub linked_user: Option<User>,
}

/// Submits and decides join requests.
pub struct JoinRequestWorkflow<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: DataStore> JoinRequestWorkflow<S> {
    /// Create a new workflow
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// File a new `PENDING` request.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name or malformed e-mail, `NotFound` for an
    /// unknown community, `Store` on store failure.
    pub async fn submit(&self, request: NewJoinRequest) -> Result<JoinRequest> {
        require_text("Name", &request.user_name)?;
        let email = request.user_email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(RoomlyError::Validation(format!(
                "`{}` is not a valid e-mail address",
                request.user_email
            )));
        }
        if self.store.get_community(request.community_id).await?.is_none() {
            return Err(RoomlyError::not_found("community", request.community_id));
        }

        let id = JoinRequestId::new();
        let request = JoinRequest {
            id,
            ticket_code: ticket_code(id.as_uuid()),
            community_id: request.community_id,
            user_email: email,
            user_name: request.user_name.trim().to_string(),
            unit: request.unit,
            tower: request.tower,
            status: JoinRequestStatus::Pending,
            created_at: self.clock.now(),
        };

        let request = self.store.insert_join_request(&request).await?;
        tracing::info!(
            request_id = %request.id,
            ticket = %request.ticket_code,
            community_id = %request.community_id,
            "Join request submitted"
        );
        Ok(request)
    }

    /// Pending requests of a community, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor administers the community, `Store` on
    /// store failure.
    pub async fn pending_for(
        &self,
        actor: UserId,
        community_id: CommunityId,
    ) -> Result<Vec<JoinRequest>> {
        require_admin_of(&self.store, actor, community_id, "review join requests").await?;
        Ok(self.store.list_pending_join_requests(community_id).await?)
    }

    /// Approve a pending request and link the matching account.
    ///
    /// The account is found by e-mail. When none exists yet the request is
    /// still approved and `linked_user` is `None`.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor administers the request's community,
    /// `NotFound`, `State` if already decided, `Store` on store failure.
    pub async fn approve(&self, actor: UserId, request_id: JoinRequestId) -> Result<Approval> {
        let request = self
            .decide(actor, request_id, JoinRequestStatus::Approved, "approve join requests")
            .await?;

        let linked_user = match self.store.find_user_by_email(&request.user_email).await? {
            Some(user) => {
                let user = User {
                    community_id: Some(request.community_id),
                    tower: request.tower.clone().or(user.tower),
                    apartment: request.unit.clone().or(user.apartment),
                    ..user
                };
                let user = self.store.update_user(&user).await?;
                tracing::info!(
                    %request_id,
                    user_id = %user.id,
                    community_id = %request.community_id,
                    "Join request approved; resident linked"
                );
                Some(user)
            }
            None => {
                tracing::warn!(
                    %request_id,
                    email = %request.user_email,
                    "Join request approved but no account matches the e-mail"
                );
                None
            }
        };

        Ok(Approval {
            request,
            linked_user,
        })
    }

    /// Reject a pending request.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor administers the request's community,
    /// `NotFound`, `State` if already decided, `Store` on store failure.
    pub async fn reject(&self, actor: UserId, request_id: JoinRequestId) -> Result<JoinRequest> {
        let request = self
            .decide(actor, request_id, JoinRequestStatus::Rejected, "reject join requests")
            .await?;
        tracing::info!(%request_id, "Join request rejected");
        Ok(request)
    }

    async fn decide(
        &self,
        actor: UserId,
        request_id: JoinRequestId,
        decision: JoinRequestStatus,
        operation: &str,
    ) -> Result<JoinRequest> {
        let admin = require_admin(&self.store, actor, operation).await?;
        let current = self
            .store
            .get_join_request(request_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("join request", request_id))?;
        ensure_community_admin(&admin, current.community_id, operation)?;

        self.store
            .decide_join_request(request_id, decision)
            .await?
            .ok_or_else(|| {
                RoomlyError::State(format!("Join request was already {}", current.status))
            })
    }
}

/// `JR-` followed by the first eight hex digits of the request ID.
fn ticket_code(id: &Uuid) -> String {
    let prefix: String = id.simple().to_string().chars().take(8).collect();
    format!("JR-{}", prefix.to_uppercase())
}
