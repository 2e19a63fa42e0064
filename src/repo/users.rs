use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{RoleAssignment, User};
use crate::errors::AppResult;
use crate::types::Role;

#[derive(Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "select * from users where id = $1 and deleted_at is null",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "select * from users where phone = $1 and deleted_at is null",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "select * from users where telegram_id = $1 and deleted_at is null",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, phone: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "insert into users (id, phone) values ($1, $2) returning *",
        )
        .bind(Uuid::new_v4())
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn bind_telegram_identity(
        &self,
        user_id: Uuid,
        telegram_id: i64,
        telegram_username: Option<&str>,
    ) -> AppResult<User> {
        if let Some(existing) = self.find_by_telegram_id(telegram_id).await? {
            if existing.id != user_id {
                return Err(crate::errors::AppError::conflict(
                    "telegram identity already bound to a different user",
                ));
            }
            return Ok(existing);
        }
        let user = sqlx::query_as::<_, User>(
            "update users set telegram_id = $2, telegram_username = $3, updated_at = now()
             where id = $1 returning *",
        )
        .bind(user_id)
        .bind(telegram_id)
        .bind(telegram_username)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn active_roles(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleAssignment>(
            "select * from role_assignments where user_id = $1 and is_active = true",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.role).collect())
    }

    /// Every active user carrying `role`, used to populate technician
    /// assignment buttons.
    #[tracing::instrument(skip(self))]
    pub async fn list_by_role(&self, role: Role) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            "select u.* from users u
             join role_assignments ra on ra.user_id = u.id
             where ra.role = $1 and ra.is_active = true and u.deleted_at is null
             order by u.created_at",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[tracing::instrument(skip(self))]
    pub async fn grant_role(&self, user_id: Uuid, role: Role) -> AppResult<()> {
        sqlx::query(
            "insert into role_assignments (id, user_id, role, is_active)
             values ($1, $2, $3, true)
             on conflict (user_id, role) do update set is_active = true",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        tracing::info!(user_id = %user_id, role = role.as_str(), "role granted");
        Ok(())
    }
}
