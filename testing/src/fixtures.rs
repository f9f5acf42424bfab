//! Seed data shared by engine, postgres and web tests.

use roomly_core::environment::Clock;
use roomly_core::error::StoreResult;
use roomly_core::repository::{AmenityRepository, CommunityRepository, UserRepository};
use roomly_core::types::{Amenity, AmenityCategory, Community, Role, User};

/// One community with an admin, two residents and three amenities.
///
/// - `pool`: category `POOL`, reward 50
/// - `gym`: category `GYM`, default reward
/// - `grill`: category `GRILL`, reward 30
#[derive(Debug, Clone)]
pub struct Fixtures {
    /// The community
    pub community: Community,
    /// Community admin
    pub admin: User,
    /// First resident
    pub alice: User,
    /// Second resident
    pub bob: User,
    /// Pool (rate-limited category)
    pub pool: Amenity,
    /// Gym
    pub gym: Amenity,
    /// Grill area
    pub grill: Amenity,
}

impl Fixtures {
    /// Insert the fixture rows into `store`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn seed<S>(store: &S, clock: &impl Clock) -> StoreResult<Self>
    where
        S: UserRepository + CommunityRepository + AmenityRepository,
    {
        let now = clock.now();

        let community = store
            .insert_community(&Community {
                address: Some("Av. Central 100".to_string()),
                total_floors: 10,
                units_per_floor: 4,
                ..Community::new("Torre Norte", "admin@torre-norte.test", now)
            })
            .await?;

        let admin = store
            .insert_user(&User {
                role: Role::Admin,
                community_id: Some(community.id),
                ..User::new("admin@torre-norte.test", "Admin", now)
            })
            .await?;

        let alice = store
            .insert_user(&User {
                community_id: Some(community.id),
                tower: Some("A".to_string()),
                apartment: Some("101".to_string()),
                ..User::new("alice@torre-norte.test", "Alice", now)
            })
            .await?;

        let bob = store
            .insert_user(&User {
                community_id: Some(community.id),
                tower: Some("A".to_string()),
                apartment: Some("202".to_string()),
                ..User::new("bob@torre-norte.test", "Bob", now)
            })
            .await?;

        let pool = store
            .insert_amenity(&Amenity {
                points_reward: 50,
                ..Amenity::new(Some(community.id), "Rooftop Pool", AmenityCategory::Pool, 20, now)
            })
            .await?;

        let gym = store
            .insert_amenity(&Amenity::new(
                Some(community.id),
                "Gym",
                AmenityCategory::Gym,
                8,
                now,
            ))
            .await?;

        let grill = store
            .insert_amenity(&Amenity {
                points_reward: 30,
                ..Amenity::new(Some(community.id), "Grill Terrace", AmenityCategory::Grill, 12, now)
            })
            .await?;

        Ok(Self {
            community,
            admin,
            alice,
            bob,
            pool,
            gym,
            grill,
        })
    }

    /// A second community with its own admin, for cross-tower checks.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn seed_other_tower<S>(store: &S, clock: &impl Clock) -> StoreResult<(Community, User)>
    where
        S: UserRepository + CommunityRepository,
    {
        let now = clock.now();
        let community = store
            .insert_community(&Community::new("Torre Sul", "admin@torre-sul.test", now))
            .await?;
        let admin = store
            .insert_user(&User {
                role: Role::Admin,
                community_id: Some(community.id),
                ..User::new("admin@torre-sul.test", "Other Admin", now)
            })
            .await?;
        Ok((community, admin))
    }
}
