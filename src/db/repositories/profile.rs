use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::profiles;

/// Input for a new birth profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub name: String,
    pub birth_date: String,
    pub birth_time: String,
    pub birth_place: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, user_id: &str, profile: NewProfile, now: &str) -> Result<profiles::Model> {
        let active = profiles::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            name: Set(profile.name),
            birth_date: Set(profile.birth_date),
            birth_time: Set(profile.birth_time),
            birth_place: Set(profile.birth_place),
            latitude: Set(profile.latitude),
            longitude: Set(profile.longitude),
            timezone: Set(profile.timezone),
            created_at: Set(now.to_string()),
            updated_at: Set(now.to_string()),
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert profile")
    }

    pub async fn get(&self, id: &str) -> Result<Option<profiles::Model>> {
        profiles::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query profile by ID")
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<profiles::Model>> {
        profiles::Entity::find()
            .filter(profiles::Column::UserId.eq(user_id))
            .order_by_asc(profiles::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list profiles")
    }

    pub async fn rename(&self, id: &str, name: &str, now: &str) -> Result<Option<profiles::Model>> {
        let Some(profile) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: profiles::ActiveModel = profile.into();
        active.name = Set(name.to_string());
        active.updated_at = Set(now.to_string());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to rename profile")?;

        Ok(Some(updated))
    }

    /// Removes the profile. Cache rows referencing it go with it through
    /// `ON DELETE CASCADE`.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = profiles::Entity::delete_by_id(id.to_string())
            .exec(&self.conn)
            .await
            .context("Failed to delete profile")?;

        Ok(result.rows_affected > 0)
    }
}
