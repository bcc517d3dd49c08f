use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::profile::ProfileRepo,
    domain::entities::user_profile::UserProfile,
};

// Profile row as stored in the db.
#[derive(sqlx::FromRow, Debug)]
pub struct ProfileDb {
    pub id: Uuid,
    pub name: String,
    pub introduce: String,
    pub avatar_url: Option<String>,
    pub email: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<ProfileDb> for UserProfile {
    fn from(row: ProfileDb) -> Self {
        UserProfile {
            id: row.id,
            name: row.name,
            introduce: row.introduce,
            avatar_url: row.avatar_url,
            email: row.email,
        }
    }
}

const COLUMNS: &str = "id, name, introduce, avatar_url, email, created_at, updated_at";

#[async_trait]
impl ProfileRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileDb>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(UserProfile::from))
    }

    async fn ensure_profile(&self, id: Uuid, email: &str, name: &str) -> AppResult<UserProfile> {
        let row = sqlx::query_as::<_, ProfileDb>(&format!(
            r#"
                INSERT INTO profiles (id, name, email)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email,
                    updated_at = CASE WHEN profiles.email = EXCLUDED.email
                        THEN profiles.updated_at ELSE CURRENT_TIMESTAMP END
                RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.into())
    }

    async fn update_details(&self, id: Uuid, name: &str, introduce: &str) -> AppResult<UserProfile> {
        let row = sqlx::query_as::<_, ProfileDb>(&format!(
            r#"
                UPDATE profiles
                SET name = $2, introduce = $3, updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(introduce)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.into())
    }

    async fn set_avatar_url(&self, id: Uuid, avatar_url: &str) -> AppResult<UserProfile> {
        let row = sqlx::query_as::<_, ProfileDb>(&format!(
            r#"
                UPDATE profiles
                SET avatar_url = $2, updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(avatar_url)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.into())
    }
}
