//! Profiles, communities and amenities.

use crate::access::{
    ensure_amenity_admin, ensure_member_admin, load_user, require_admin, require_admin_of,
    require_text,
};
use crate::feed::Upload;
use crate::points::{PointsCoordinator, Rewarded};
use roomly_core::environment::Clock;
use roomly_core::error::{Result, RoomlyError, StoreError, USER_EMAIL_CONSTRAINT};
use roomly_core::points::{AwardReason, PointAction};
use roomly_core::repository::{DataStore, ObjectStorage};
use roomly_core::types::{
    Amenity, AmenityCategory, AmenityId, Community, CommunityId, Role, User, UserId, UserStatus,
};
use serde::Deserialize;
use std::sync::Arc;

/// Input for [`Directory::create_profile`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProfile {
    /// Login e-mail
    pub email: String,
    /// Display name
    pub name: String,
    /// Identity at the authentication provider
    #[serde(default)]
    pub auth_id: Option<String>,
}

/// Editable profile fields; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    /// Display name
    pub name: Option<String>,
    /// Tower
    pub tower: Option<String>,
    /// Apartment
    pub apartment: Option<String>,
}

/// Input for [`Directory::create_community`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCommunity {
    /// Name
    pub name: String,
    /// Street address
    #[serde(default)]
    pub address: Option<String>,
    /// Floors per building
    #[serde(default = "one")]
    pub total_floors: u32,
    /// Units per floor
    #[serde(default = "one")]
    pub units_per_floor: u32,
    /// Number of buildings
    #[serde(default = "one")]
    pub num_buildings: u32,
    /// Rooms per floor
    #[serde(default = "one")]
    pub rooms_per_floor: u32,
    /// The registering admin's tower
    #[serde(default)]
    pub tower: Option<String>,
    /// The registering admin's apartment
    #[serde(default)]
    pub apartment: Option<String>,
}

const fn one() -> u32 {
    1
}

/// Input for [`Directory::create_amenity`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAmenity {
    /// Owning community
    pub community_id: CommunityId,
    /// Display name
    pub name: String,
    /// Category tag
    pub category: AmenityCategory,
    /// Maximum people at once
    pub capacity: u32,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Cover image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Points per reservation (0 = default)
    #[serde(default)]
    pub points_reward: i64,
}

/// Editable amenity fields; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AmenityUpdate {
    /// Display name
    pub name: Option<String>,
    /// Category tag
    pub category: Option<AmenityCategory>,
    /// Maximum people at once
    pub capacity: Option<u32>,
    /// Description
    pub description: Option<String>,
    /// Cover image
    pub image_url: Option<String>,
    /// Points per reservation
    pub points_reward: Option<i64>,
}

/// Profile, community and amenity management.
pub struct Directory<S, O> {
    store: S,
    storage: O,
    points: Arc<PointsCoordinator<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: DataStore, O: ObjectStorage> Directory<S, O> {
    /// Create a new directory
    pub fn new(
        store: S,
        storage: O,
        points: Arc<PointsCoordinator<S>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            storage,
            points,
            clock,
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Profiles
    // ═══════════════════════════════════════════════════════════

    /// Create a resident profile.
    ///
    /// # Errors
    ///
    /// `Validation` for blank fields, `Conflict` if the e-mail is registered,
    /// `Store` on store failure.
    pub async fn create_profile(&self, profile: NewProfile) -> Result<User> {
        require_text("Name", &profile.name)?;
        let email = profile.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(RoomlyError::Validation(format!(
                "`{}` is not a valid e-mail address",
                profile.email
            )));
        }

        let user = User {
            auth_id: profile.auth_id,
            ..User::new(email, profile.name.trim(), self.clock.now())
        };
        match self.store.insert_user(&user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Profile created");
                Ok(user)
            }
            Err(e) if e.violates(USER_EMAIL_CONSTRAINT) => Err(RoomlyError::Conflict(
                "An account with this e-mail already exists".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a profile.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user, `Store` on store failure.
    pub async fn profile(&self, user_id: UserId) -> Result<User> {
        load_user(&self.store, user_id).await
    }

    /// Edit the actor's own profile.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name, `NotFound`, `Store` on store failure.
    pub async fn update_profile(&self, actor: UserId, update: ProfileUpdate) -> Result<User> {
        let user = load_user(&self.store, actor).await?;
        if let Some(name) = &update.name {
            require_text("Name", name)?;
        }

        let user = User {
            name: update.name.map_or(user.name, |n| n.trim().to_string()),
            tower: update.tower.or(user.tower),
            apartment: update.apartment.or(user.apartment),
            ..user
        };
        self.store.update_user(&user).await.map_err(missing_user(actor))
    }

    /// Upload a profile photo and award points for it.
    ///
    /// Every upload earns points.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty file, `NotFound`, `Store` on store or
    /// upload failure.
    pub async fn set_avatar(&self, actor: UserId, upload: Upload) -> Result<Rewarded<User>> {
        if upload.bytes.is_empty() {
            return Err(RoomlyError::Validation("Profile photo is empty".into()));
        }
        let user = load_user(&self.store, actor).await?;

        let url = self
            .storage
            .upload(&upload.path(&format!("avatars/{actor}")), upload.bytes)
            .await?;
        let user = self
            .store
            .update_user(&User {
                avatar_url: Some(url),
                ..user
            })
            .await
            .map_err(missing_user(actor))?;
        tracing::info!(user_id = %actor, "Profile photo updated");

        let points = self
            .points
            .award_best_effort(&user, AwardReason::Action(PointAction::ProfilePhoto), "avatar")
            .await;
        Ok(Rewarded {
            record: user,
            points,
        })
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor administers the account's community,
    /// `NotFound`, `Store` on store failure.
    pub async fn set_user_status(
        &self,
        actor: UserId,
        user_id: UserId,
        status: UserStatus,
    ) -> Result<User> {
        let admin = require_admin(&self.store, actor, "change account status").await?;
        let member = load_user(&self.store, user_id).await?;
        ensure_member_admin(&admin, &member, "change account status")?;
        let user = self
            .store
            .set_user_status(user_id, status)
            .await
            .map_err(missing_user(user_id))?;
        tracing::info!(%user_id, %status, "Account status changed");
        Ok(user)
    }

    /// Members of a community, highest points first.
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    pub async fn community_members(&self, community_id: CommunityId) -> Result<Vec<User>> {
        Ok(self.store.list_community_members(community_id, false).await?)
    }

    // ═══════════════════════════════════════════════════════════
    // Communities
    // ═══════════════════════════════════════════════════════════

    /// Register a new tower. The registering user becomes its admin.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name or zero dimensions, `NotFound` for an
    /// unknown actor, `Store` on store failure.
    pub async fn create_community(&self, actor: UserId, input: NewCommunity) -> Result<Community> {
        require_text("Community name", &input.name)?;
        if [
            input.total_floors,
            input.units_per_floor,
            input.num_buildings,
            input.rooms_per_floor,
        ]
        .contains(&0)
        {
            return Err(RoomlyError::Validation(
                "Building dimensions must be at least 1".into(),
            ));
        }
        let founder = load_user(&self.store, actor).await?;

        let community = Community {
            address: input.address,
            total_floors: input.total_floors,
            units_per_floor: input.units_per_floor,
            num_buildings: input.num_buildings,
            rooms_per_floor: input.rooms_per_floor,
            ..Community::new(input.name.trim(), founder.email.clone(), self.clock.now())
        };
        let community = self.store.insert_community(&community).await?;

        self.store
            .update_user(&User {
                role: Role::Admin,
                community_id: Some(community.id),
                tower: input.tower.or(founder.tower.clone()),
                apartment: input.apartment.or(founder.apartment.clone()),
                ..founder
            })
            .await
            .map_err(missing_user(actor))?;

        tracing::info!(community_id = %community.id, admin = %actor, "Community registered");
        Ok(community)
    }

    /// Every community, by name.
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    pub async fn list_communities(&self) -> Result<Vec<Community>> {
        Ok(self.store.list_communities().await?)
    }

    // ═══════════════════════════════════════════════════════════
    // Amenities
    // ═══════════════════════════════════════════════════════════

    /// Add an amenity to a community.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor administers the community, `Validation`
    /// for a blank name, zero capacity or an out-of-range reward, `NotFound`
    /// for an unknown community, `Store` on store failure.
    pub async fn create_amenity(&self, actor: UserId, input: NewAmenity) -> Result<Amenity> {
        require_admin_of(&self.store, actor, input.community_id, "manage amenities").await?;
        require_text("Amenity name", &input.name)?;
        validate_amenity_numbers(input.capacity, input.points_reward)?;
        if self.store.get_community(input.community_id).await?.is_none() {
            return Err(RoomlyError::not_found("community", input.community_id));
        }

        let amenity = Amenity {
            description: input.description,
            image_url: input.image_url,
            points_reward: input.points_reward,
            ..Amenity::new(
                Some(input.community_id),
                input.name.trim(),
                input.category,
                input.capacity,
                self.clock.now(),
            )
        };
        let amenity = self.store.insert_amenity(&amenity).await?;
        tracing::info!(amenity_id = %amenity.id, category = %amenity.category, "Amenity created");
        Ok(amenity)
    }

    /// Edit an amenity.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor administers the amenity's community,
    /// `Validation` for invalid values, `NotFound`, `Store` on store failure.
    pub async fn update_amenity(
        &self,
        actor: UserId,
        amenity_id: AmenityId,
        update: AmenityUpdate,
    ) -> Result<Amenity> {
        let admin = require_admin(&self.store, actor, "manage amenities").await?;
        let amenity = self
            .store
            .get_amenity(amenity_id)
            .await?
            .ok_or_else(|| RoomlyError::not_found("amenity", amenity_id))?;
        ensure_amenity_admin(&admin, &amenity, "manage amenities")?;
        if let Some(name) = &update.name {
            require_text("Amenity name", name)?;
        }

        let amenity = Amenity {
            name: update.name.map_or(amenity.name, |n| n.trim().to_string()),
            category: update.category.unwrap_or(amenity.category),
            capacity: update.capacity.unwrap_or(amenity.capacity),
            description: update.description.or(amenity.description),
            image_url: update.image_url.or(amenity.image_url),
            points_reward: update.points_reward.unwrap_or(amenity.points_reward),
            ..amenity
        };
        validate_amenity_numbers(amenity.capacity, amenity.points_reward)?;

        let amenity = self.store.update_amenity(&amenity).await.map_err(|e| match e {
            StoreError::NotFound => RoomlyError::not_found("amenity", amenity_id),
            other => other.into(),
        })?;
        tracing::info!(%amenity_id, "Amenity updated");
        Ok(amenity)
    }

    /// Amenities by name, optionally for one community.
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    pub async fn list_amenities(&self, community_id: Option<CommunityId>) -> Result<Vec<Amenity>> {
        Ok(self.store.list_amenities(community_id).await?)
    }
}

/// Highest reward an amenity booking may carry.
pub const MAX_POINTS_REWARD: i64 = 1_000;

fn validate_amenity_numbers(capacity: u32, points_reward: i64) -> Result<()> {
    if capacity == 0 {
        return Err(RoomlyError::Validation("Capacity must be at least 1".into()));
    }
    if !(0..=MAX_POINTS_REWARD).contains(&points_reward) {
        return Err(RoomlyError::Validation(format!(
            "Points reward must be between 0 and {MAX_POINTS_REWARD}"
        )));
    }
    Ok(())
}

fn missing_user(user_id: UserId) -> impl FnOnce(StoreError) -> RoomlyError {
    move |e| match e {
        StoreError::NotFound => RoomlyError::not_found("user", user_id),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roomly_core::repository::PointLedger;
    use roomly_testing::{
        FailPoint, Fixtures, InMemoryObjectStorage, InMemoryStore, test_clock,
    };

    struct Harness {
        store: InMemoryStore,
        storage: InMemoryObjectStorage,
        directory: Directory<InMemoryStore, InMemoryObjectStorage>,
        fx: Fixtures,
    }

    async fn harness() -> Harness {
        let store = InMemoryStore::new();
        let storage = InMemoryObjectStorage::new();
        let fx = Fixtures::seed(&store, &test_clock()).await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(test_clock());
        let points = Arc::new(PointsCoordinator::new(store.clone(), Arc::clone(&clock)));
        let directory = Directory::new(store.clone(), storage.clone(), points, clock);
        Harness {
            store,
            storage,
            directory,
            fx,
        }
    }

    fn photo() -> Upload {
        Upload {
            file_name: "me.png".to_string(),
            bytes: vec![0x89, 0x50],
        }
    }

    #[tokio::test]
    async fn test_create_profile_rejects_duplicate_email() {
        let h = harness().await;
        let profile = NewProfile {
            email: "Nora@Example.com".to_string(),
            name: "Nora".to_string(),
            auth_id: Some("auth|1".to_string()),
        };

        let nora = h.directory.create_profile(profile.clone()).await.unwrap();
        assert_eq!(nora.email, "nora@example.com");
        assert_eq!(nora.role, Role::Resident);
        assert_eq!(nora.points, 0);

        assert!(matches!(
            h.directory.create_profile(profile).await,
            Err(RoomlyError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_avatar_upload_awards_every_time() {
        let h = harness().await;

        let first = h.directory.set_avatar(h.fx.alice.id, photo()).await.unwrap();
        let second = h.directory.set_avatar(h.fx.alice.id, photo()).await.unwrap();

        assert!(first.record.avatar_url.is_some());
        assert_eq!(second.points.points(), 20);
        assert_eq!(h.store.sum_user_points(h.fx.alice.id).await.unwrap(), 40);
        assert_eq!(h.storage.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_awards_nothing() {
        let h = harness().await;
        h.storage.set_failing(true);

        assert!(matches!(
            h.directory.set_avatar(h.fx.alice.id, photo()).await,
            Err(RoomlyError::Store(_))
        ));
        assert_eq!(h.store.point_log_count(), 0);
    }

    #[tokio::test]
    async fn test_avatar_kept_when_points_fail() {
        let h = harness().await;
        h.store.fail_on(FailPoint::AppendPointLog);

        let result = h.directory.set_avatar(h.fx.bob.id, photo()).await.unwrap();
        assert!(result.record.avatar_url.is_some());
        assert_eq!(result.points.points(), 0);
    }

    #[tokio::test]
    async fn test_update_profile_keeps_points() {
        let h = harness().await;
        h.directory.set_avatar(h.fx.alice.id, photo()).await.unwrap();

        let updated = h
            .directory
            .update_profile(
                h.fx.alice.id,
                ProfileUpdate {
                    name: Some("Alice M.".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Alice M.");
        assert_eq!(updated.apartment.as_deref(), Some("101"));
        assert_eq!(updated.points, 20);
    }

    #[tokio::test]
    async fn test_register_tower_promotes_founder() {
        let h = harness().await;
        let founder = h
            .directory
            .create_profile(NewProfile {
                email: "founder@example.com".to_string(),
                name: "Founder".to_string(),
                auth_id: None,
            })
            .await
            .unwrap();

        let community = h
            .directory
            .create_community(
                founder.id,
                NewCommunity {
                    name: "Torre Este".to_string(),
                    address: None,
                    total_floors: 12,
                    units_per_floor: 4,
                    num_buildings: 2,
                    rooms_per_floor: 4,
                    tower: Some("E1".to_string()),
                    apartment: Some("1201".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(community.admin_email, "founder@example.com");
        let founder = h.directory.profile(founder.id).await.unwrap();
        assert!(founder.is_admin());
        assert_eq!(founder.community_id, Some(community.id));
        assert_eq!(h.directory.list_communities().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_amenity_management_is_admin_only() {
        let h = harness().await;
        let input = NewAmenity {
            community_id: h.fx.community.id,
            name: "Padel Court".to_string(),
            category: AmenityCategory::Court,
            capacity: 4,
            description: None,
            image_url: None,
            points_reward: 15,
        };

        assert!(matches!(
            h.directory.create_amenity(h.fx.alice.id, input.clone()).await,
            Err(RoomlyError::Forbidden(_))
        ));

        let court = h.directory.create_amenity(h.fx.admin.id, input).await.unwrap();
        let court = h
            .directory
            .update_amenity(
                h.fx.admin.id,
                court.id,
                AmenityUpdate {
                    capacity: Some(6),
                    ..AmenityUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(court.capacity, 6);
        assert_eq!(court.points_reward, 15);

        assert!(matches!(
            h.directory
                .update_amenity(
                    h.fx.admin.id,
                    court.id,
                    AmenityUpdate {
                        points_reward: Some(-5),
                        ..AmenityUpdate::default()
                    },
                )
                .await,
            Err(RoomlyError::Validation(_))
        ));

        let listed = h.directory.list_amenities(Some(h.fx.community.id)).await.unwrap();
        assert_eq!(listed.len(), 4);
        assert_eq!(listed[0].name, "Grill Terrace");
    }

    #[tokio::test]
    async fn test_set_user_status() {
        let h = harness().await;
        let bob = h
            .directory
            .set_user_status(h.fx.admin.id, h.fx.bob.id, UserStatus::Inactive)
            .await
            .unwrap();
        assert!(!bob.is_active());
        assert_eq!(h.directory.community_members(h.fx.community.id).await.unwrap().len(), 3);

        assert!(matches!(
            h.directory
                .set_user_status(h.fx.bob.id, h.fx.alice.id, UserStatus::Inactive)
                .await,
            Err(RoomlyError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_admins_manage_only_their_own_tower() {
        let h = harness().await;
        let other_admin = h
            .directory
            .create_profile(NewProfile {
                email: "mallory@example.com".to_string(),
                name: "Mallory".to_string(),
                auth_id: None,
            })
            .await
            .unwrap();
        let other = h
            .directory
            .create_community(
                other_admin.id,
                NewCommunity {
                    name: "Other Tower".to_string(),
                    address: None,
                    total_floors: 3,
                    units_per_floor: 2,
                    num_buildings: 1,
                    rooms_per_floor: 2,
                    tower: None,
                    apartment: None,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            h.directory
                .set_user_status(other_admin.id, h.fx.admin.id, UserStatus::Inactive)
                .await,
            Err(RoomlyError::Forbidden(_))
        ));
        assert!(h.directory.profile(h.fx.admin.id).await.unwrap().is_active());

        assert!(matches!(
            h.directory
                .update_amenity(
                    other_admin.id,
                    h.fx.gym.id,
                    AmenityUpdate {
                        points_reward: Some(MAX_POINTS_REWARD),
                        ..AmenityUpdate::default()
                    },
                )
                .await,
            Err(RoomlyError::Forbidden(_))
        ));

        let input = NewAmenity {
            community_id: h.fx.community.id,
            name: "Sauna".to_string(),
            category: AmenityCategory::Other,
            capacity: 6,
            description: None,
            image_url: None,
            points_reward: 10,
        };
        assert!(matches!(
            h.directory.create_amenity(other_admin.id, input.clone()).await,
            Err(RoomlyError::Forbidden(_))
        ));
        let sauna = h
            .directory
            .create_amenity(
                other_admin.id,
                NewAmenity {
                    community_id: other.id,
                    ..input
                },
            )
            .await
            .unwrap();
        assert_eq!(sauna.community_id, Some(other.id));
    }

    #[tokio::test]
    async fn test_points_reward_is_capped() {
        let h = harness().await;
        let mut input = NewAmenity {
            community_id: h.fx.community.id,
            name: "Cinema Room".to_string(),
            category: AmenityCategory::Other,
            capacity: 10,
            description: None,
            image_url: None,
            points_reward: i64::MAX,
        };
        assert!(matches!(
            h.directory.create_amenity(h.fx.admin.id, input.clone()).await,
            Err(RoomlyError::Validation(_))
        ));

        input.points_reward = MAX_POINTS_REWARD;
        let cinema = h.directory.create_amenity(h.fx.admin.id, input).await.unwrap();
        assert!(matches!(
            h.directory
                .update_amenity(
                    h.fx.admin.id,
                    cinema.id,
                    AmenityUpdate {
                        points_reward: Some(MAX_POINTS_REWARD + 1),
                        ..AmenityUpdate::default()
                    },
                )
                .await,
            Err(RoomlyError::Validation(_))
        ));
    }
}
