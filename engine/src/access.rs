//! Actor lookups and role checks shared by the workflows.
//!
//! Admin rights are per community: an admin manages the members, amenities,
//! bookings and join requests of their own tower and nothing else.

use roomly_core::error::{Result, RoomlyError};
use roomly_core::repository::UserRepository;
use roomly_core::types::{Amenity, CommunityId, User, UserId};

/// Load a user or fail with `NotFound`.
pub(crate) async fn load_user<S: UserRepository>(store: &S, user_id: UserId) -> Result<User> {
    store
        .get_user(user_id)
        .await?
        .ok_or_else(|| RoomlyError::not_found("user", user_id))
}

/// Load the acting user and require the admin role.
///
/// This alone does not say *which* community the admin may act on; pair it
/// with [`ensure_community_admin`], [`ensure_amenity_admin`] or
/// [`admin_scope`] once the target is known.
pub(crate) async fn require_admin<S: UserRepository>(
    store: &S,
    actor: UserId,
    operation: &str,
) -> Result<User> {
    let user = load_user(store, actor).await?;
    if !user.is_admin() {
        tracing::warn!(%actor, operation, "Non-admin attempted admin operation");
        return Err(RoomlyError::Forbidden(format!("Only admins can {operation}")));
    }
    Ok(user)
}

/// Load the acting user and require them to administer `community_id`.
pub(crate) async fn require_admin_of<S: UserRepository>(
    store: &S,
    actor: UserId,
    community_id: CommunityId,
    operation: &str,
) -> Result<User> {
    let admin = require_admin(store, actor, operation).await?;
    ensure_community_admin(&admin, community_id, operation)?;
    Ok(admin)
}

/// Require `admin` to belong to `community_id`.
pub(crate) fn ensure_community_admin(
    admin: &User,
    community_id: CommunityId,
    operation: &str,
) -> Result<()> {
    if admin.community_id == Some(community_id) {
        return Ok(());
    }
    tracing::warn!(
        actor = %admin.id,
        %community_id,
        operation,
        "Admin attempted operation on another community"
    );
    Err(RoomlyError::Forbidden(format!(
        "Only admins of this community can {operation}"
    )))
}

/// Require `admin` to manage the amenity's community. Amenities shared
/// across towers belong to no community and any admin may manage them.
pub(crate) fn ensure_amenity_admin(admin: &User, amenity: &Amenity, operation: &str) -> Result<()> {
    match amenity.community_id {
        Some(community_id) => ensure_community_admin(admin, community_id, operation),
        None => Ok(()),
    }
}

/// Require `admin` to manage `member`'s community. Accounts outside any
/// community are managed by nobody.
pub(crate) fn ensure_member_admin(admin: &User, member: &User, operation: &str) -> Result<()> {
    match member.community_id {
        Some(community_id) => ensure_community_admin(admin, community_id, operation),
        None => Err(RoomlyError::Forbidden(format!(
            "Only admins of this community can {operation}"
        ))),
    }
}

/// The community an admin report covers: the admin's own, which an explicit
/// `requested` filter must match.
pub(crate) fn admin_scope(
    admin: &User,
    requested: Option<CommunityId>,
    operation: &str,
) -> Result<CommunityId> {
    let Some(own) = admin.community_id else {
        return Err(RoomlyError::Forbidden(format!(
            "Join a community before you {operation}"
        )));
    };
    if let Some(requested) = requested {
        ensure_community_admin(admin, requested, operation)?;
    }
    Ok(own)
}

/// Reject blank text fields.
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RoomlyError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roomly_core::types::{AmenityCategory, Role};

    fn admin_of(community_id: Option<CommunityId>) -> User {
        User {
            role: Role::Admin,
            community_id,
            ..User::new("admin@example.com", "Admin", Utc::now())
        }
    }

    #[test]
    fn test_admin_scope_defaults_to_own_community() {
        let own = CommunityId::new();
        let admin = admin_of(Some(own));

        assert_eq!(admin_scope(&admin, None, "audit").ok(), Some(own));
        assert_eq!(admin_scope(&admin, Some(own), "audit").ok(), Some(own));
        assert!(matches!(
            admin_scope(&admin, Some(CommunityId::new()), "audit"),
            Err(RoomlyError::Forbidden(_))
        ));
        assert!(matches!(
            admin_scope(&admin_of(None), None, "audit"),
            Err(RoomlyError::Forbidden(_))
        ));
    }

    #[test]
    fn test_shared_amenities_are_managed_by_any_admin() {
        let admin = admin_of(Some(CommunityId::new()));
        let shared = Amenity::new(None, "Parking", AmenityCategory::Parking, 40, Utc::now());
        let foreign = Amenity::new(
            Some(CommunityId::new()),
            "Pool",
            AmenityCategory::Pool,
            20,
            Utc::now(),
        );

        assert!(ensure_amenity_admin(&admin, &shared, "grade reservations").is_ok());
        assert!(matches!(
            ensure_amenity_admin(&admin, &foreign, "grade reservations"),
            Err(RoomlyError::Forbidden(_))
        ));
    }

    #[test]
    fn test_accounts_outside_any_community_are_unmanaged() {
        let own = CommunityId::new();
        let admin = admin_of(Some(own));
        let member = User {
            community_id: Some(own),
            ..User::new("res@example.com", "Resident", Utc::now())
        };
        let drifter = User::new("drifter@example.com", "Drifter", Utc::now());

        assert!(ensure_member_admin(&admin, &member, "change account status").is_ok());
        assert!(matches!(
            ensure_member_admin(&admin, &drifter, "change account status"),
            Err(RoomlyError::Forbidden(_))
        ));
    }
}
