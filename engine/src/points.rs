//! Points award coordinator (saga) and ledger reconciliation.
//!
//! An award is three independent writes:
//!
//! 1. Append the ledger entry. Mandatory: on failure the award is aborted and
//!    no total is touched.
//! 2. Atomically increment the user's cached total.
//! 3. Atomically increment the community's cached total.
//!
//! Steps 2 and 3 are best effort. Their outcome is reported in
//! [`AwardOutcome`] and a failure is logged, never rolled back: the ledger is
//! the source of truth and [`PointsCoordinator::reconcile_all`] recomputes the
//! cached totals from it.

use crate::metrics;
use roomly_core::environment::Clock;
use roomly_core::error::{Result, RoomlyError, StoreResult};
use roomly_core::points::AwardReason;
use roomly_core::repository::DataStore;
use roomly_core::types::{CommunityId, PointLog, PointLogId, User, UserId};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one best-effort aggregate step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepOutcome {
    /// The total was incremented
    Applied {
        /// New cached total
        total: i64,
    },
    /// Nothing to update (no community, or the row vanished)
    Skipped,
    /// The store rejected the write; the cached total is stale
    Failed {
        /// Store error message
        reason: String,
    },
}

impl StepOutcome {
    fn from_increment(result: StoreResult<Option<i64>>) -> Self {
        match result {
            Ok(Some(total)) => Self::Applied { total },
            Ok(None) => Self::Skipped,
            Err(e) => Self::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Returns `true` if the step failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of an award: the ledger entry plus what happened to each total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardOutcome {
    /// The appended ledger entry
    pub entry: PointLog,
    /// User total step
    pub user_total: StepOutcome,
    /// Community total step
    pub community_total: StepOutcome,
}

impl AwardOutcome {
    /// Returns `true` if no aggregate step failed.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !self.user_total.is_failed() && !self.community_total.is_failed()
    }
}

/// Points attached to a primary operation (booking, post, comment, ...).
///
/// The primary operation is never undone because of its points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointsStatus {
    /// The ledger entry was written
    Awarded(AwardOutcome),
    /// The operation does not earn points (liking one's own post, or a
    /// like whose reward was already paid)
    NotEligible,
    /// The award failed; no points were recorded
    Failed {
        /// Error message
        reason: String,
    },
}

impl PointsStatus {
    /// Points recorded in the ledger by this operation.
    #[must_use]
    pub const fn points(&self) -> i64 {
        match self {
            Self::Awarded(outcome) => outcome.entry.points,
            Self::NotEligible | Self::Failed { .. } => 0,
        }
    }
}

/// A primary operation's result together with the points it earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewarded<T> {
    /// The created or updated record
    pub record: T,
    /// Points outcome
    pub points: PointsStatus,
}

/// Difference between a cached total and the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Drift {
    /// Total before reconciliation
    pub cached: i64,
    /// Sum of the ledger entries
    pub ledger: i64,
}

/// Totals corrected by a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Users examined
    pub users_checked: usize,
    /// Communities examined
    pub communities_checked: usize,
    /// Users whose cached total was corrected
    pub user_drift: Vec<(UserId, Drift)>,
    /// Communities whose cached total was corrected
    pub community_drift: Vec<(CommunityId, Drift)>,
}

impl ReconciliationReport {
    /// Returns `true` if every cached total already matched the ledger.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.user_drift.is_empty() && self.community_drift.is_empty()
    }
}

/// Writes point awards and keeps the cached totals reconcilable.
pub struct PointsCoordinator<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: DataStore> PointsCoordinator<S> {
    /// Create a new coordinator
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Award points to `user` for `reason`.
    ///
    /// The amount comes from the point schedule, never from the caller. The
    /// ledger entry is credited to the user's current community, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RoomlyError::Store`] if the ledger append fails. Aggregate
    /// step failures are reported in the outcome, not as errors.
    pub async fn award(&self, user: &User, reason: AwardReason<'_>) -> Result<AwardOutcome> {
        let action = reason.action();
        let entry = PointLog {
            id: PointLogId::new(),
            user_id: user.id,
            community_id: user.community_id,
            action: action.code().to_string(),
            points: reason.points(),
            description: Some(reason.description()),
            created_at: self.clock.now(),
        };

        let entry = self.store.append_point_log(&entry).await?;
        metrics::record_points_awarded(action.code(), entry.points);

        let user_total =
            StepOutcome::from_increment(self.store.add_user_points(user.id, entry.points).await);
        if let StepOutcome::Failed { reason } = &user_total {
            metrics::record_aggregate_step_failure("user");
            tracing::warn!(
                user_id = %user.id,
                entry_id = %entry.id,
                error = %reason,
                "User point total not updated; ledger is ahead"
            );
        }

        let community_total = match entry.community_id {
            Some(community_id) => StepOutcome::from_increment(
                self.store
                    .add_community_points(community_id, entry.points)
                    .await,
            ),
            None => StepOutcome::Skipped,
        };
        if let StepOutcome::Failed { reason } = &community_total {
            metrics::record_aggregate_step_failure("community");
            tracing::warn!(
                community_id = ?entry.community_id,
                entry_id = %entry.id,
                error = %reason,
                "Community point total not updated; ledger is ahead"
            );
        }

        tracing::info!(
            user_id = %user.id,
            action = action.code(),
            points = entry.points,
            "Points awarded"
        );

        Ok(AwardOutcome {
            entry,
            user_total,
            community_total,
        })
    }

    /// Award points to the user with `user_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist, otherwise as [`Self::award`].
    pub async fn award_to(&self, user_id: UserId, reason: AwardReason<'_>) -> Result<AwardOutcome> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("user", user_id))?;
        self.award(&user, reason).await
    }

    /// Award points as a side effect of `operation`, never failing it.
    pub(crate) async fn award_best_effort(
        &self,
        user: &User,
        reason: AwardReason<'_>,
        operation: &'static str,
    ) -> PointsStatus {
        match self.award(user, reason).await {
            Ok(outcome) => PointsStatus::Awarded(outcome),
            Err(e) => {
                tracing::warn!(
                    user_id = %user.id,
                    operation,
                    error = %e,
                    "Points award failed; keeping {operation}"
                );
                metrics::record_points_failure(operation);
                PointsStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// A user's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RoomlyError::Store`] on store failure.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<PointLog>> {
        Ok(self.store.list_user_point_logs(user_id).await?)
    }

    /// Recompute a user's cached total from the ledger.
    ///
    /// Returns the drift that was corrected, or `None` if the total matched.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist, `Store` on store failure.
    pub async fn reconcile_user(&self, user_id: UserId) -> Result<Option<Drift>> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("user", user_id))?;
        let ledger = self.store.sum_user_points(user_id).await?;
        if user.points == ledger {
            return Ok(None);
        }

        self.store.set_user_points(user_id, ledger).await?;
        tracing::warn!(%user_id, cached = user.points, ledger, "Corrected user point total");
        Ok(Some(Drift {
            cached: user.points,
            ledger,
        }))
    }

    /// Recompute a community's cached total from the ledger.
    ///
    /// Returns the drift that was corrected, or `None` if the total matched.
    ///
    /// # Errors
    ///
    /// `NotFound` if the community does not exist, `Store` on store failure.
    pub async fn reconcile_community(&self, community_id: CommunityId) -> Result<Option<Drift>> {
        let community = self
            .store
            .get_community(community_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("community", community_id))?;
        let ledger = self.store.sum_community_points(community_id).await?;
        if community.total_points == ledger {
            return Ok(None);
        }

        self.store.set_community_points(community_id, ledger).await?;
        tracing::warn!(
            %community_id,
            cached = community.total_points,
            ledger,
            "Corrected community point total"
        );
        Ok(Some(Drift {
            cached: community.total_points,
            ledger,
        }))
    }

    /// Reconcile every user and community.
    ///
    /// # Errors
    ///
    /// Stops at the first store failure.
    pub async fn reconcile_all(&self) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport::default();

        for user in self.store.list_users().await? {
            report.users_checked += 1;
            if let Some(drift) = self.reconcile_user(user.id).await? {
                report.user_drift.push((user.id, drift));
            }
        }

        for community in self.store.list_communities().await? {
            report.communities_checked += 1;
            if let Some(drift) = self.reconcile_community(community.id).await? {
                report.community_drift.push((community.id, drift));
            }
        }

        tracing::info!(
            users = report.users_checked,
            communities = report.communities_checked,
            corrected = report.user_drift.len() + report.community_drift.len(),
            "Reconciliation finished"
        );
        Ok(report)
    }
}
