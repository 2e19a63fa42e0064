use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::AccessRequest;
use crate::errors::AppResult;
use crate::types::AccessRequestStatus;

#[derive(Clone)]
pub struct AccessRequestRepo {
    pool: PgPool,
}

impl AccessRequestRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        telegram_id: i64,
        telegram_username: Option<&str>,
        first_name: &str,
        last_name: Option<&str>,
        phone: &str,
    ) -> AppResult<AccessRequest> {
        let req = sqlx::query_as::<_, AccessRequest>(
            "insert into access_requests
                (id, telegram_id, telegram_username, first_name, last_name, phone, status)
             values ($1, $2, $3, $4, $5, $6, 'pending')
             returning *",
        )
        .bind(Uuid::new_v4())
        .bind(telegram_id)
        .bind(telegram_username)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(req)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<AccessRequest> {
        let req = sqlx::query_as::<_, AccessRequest>("select * from access_requests where id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(req)
    }

    /// Moves a `PENDING` request to a terminal status. No-op (returns the
    /// row unchanged) if it is already in that terminal status, since
    /// approval/rejection must be idempotent once decided.
    #[tracing::instrument(skip(self))]
    pub async fn finalize(
        &self,
        id: Uuid,
        status: AccessRequestStatus,
    ) -> AppResult<AccessRequest> {
        let current = self.find_by_id(id).await?;
        if current.status == status {
            return Ok(current);
        }
        if current.status != AccessRequestStatus::Pending {
            return Err(crate::errors::AppError::conflict(
                "access request already finalized",
            ));
        }
        let req = sqlx::query_as::<_, AccessRequest>(
            "update access_requests set status = $2, updated_at = now() where id = $1 returning *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(req)
    }
}
