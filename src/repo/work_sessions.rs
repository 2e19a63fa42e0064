use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::WorkSession;
use crate::errors::{AppError, AppResult};

#[derive(Clone)]
pub struct WorkSessionRepo {
    pool: PgPool,
}

impl WorkSessionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn active_for_ticket(&self, ticket_id: Uuid) -> AppResult<Option<WorkSession>> {
        let row = sqlx::query_as::<_, WorkSession>(
            "select * from work_sessions where ticket_id = $1 and status <> 'STOPPED'",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Most recent session on a ticket regardless of status, including an
    /// already-`STOPPED` one. Used by `stop` to make re-stopping idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn latest_for_ticket(&self, ticket_id: Uuid) -> AppResult<Option<WorkSession>> {
        let row = sqlx::query_as::<_, WorkSession>(
            "select * from work_sessions where ticket_id = $1 order by started_at desc limit 1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self))]
    pub async fn active_for_technician(
        &self,
        technician_id: Uuid,
    ) -> AppResult<Option<WorkSession>> {
        let row = sqlx::query_as::<_, WorkSession>(
            "select * from work_sessions where technician_id = $1 and status <> 'STOPPED'",
        )
        .bind(technician_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Inserts a new `RUNNING` session. Relies on the partial unique
    /// indexes to reject a concurrent double-start; a unique violation is
    /// surfaced as `Conflict` rather than `Internal` so the caller can
    /// retry once after re-reading state.
    pub async fn start(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ticket_id: Uuid,
        technician_id: Uuid,
    ) -> AppResult<WorkSession> {
        let now = chrono::Utc::now();
        let row = sqlx::query_as::<_, WorkSession>(
            "insert into work_sessions
                (id, ticket_id, technician_id, status, started_at, last_started_at, accumulated_seconds)
             values ($1, $2, $3, 'RUNNING', $4, $4, 0)
             returning *",
        )
        .bind(Uuid::new_v4())
        .bind(ticket_id)
        .bind(technician_id)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::conflict("technician or ticket already has an active work session")
            }
            _ => AppError::from(err),
        })?;
        Ok(row)
    }

    pub async fn lock_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<WorkSession> {
        let row = sqlx::query_as::<_, WorkSession>(
            "select * from work_sessions where id = $1 for update",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    pub async fn pause(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        segment_seconds: i64,
    ) -> AppResult<WorkSession> {
        let row = sqlx::query_as::<_, WorkSession>(
            "update work_sessions set status = 'PAUSED', accumulated_seconds = accumulated_seconds + $2
             where id = $1 returning *",
        )
        .bind(id)
        .bind(segment_seconds)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    pub async fn resume(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<WorkSession> {
        let now = chrono::Utc::now();
        let row = sqlx::query_as::<_, WorkSession>(
            "update work_sessions set status = 'RUNNING', last_started_at = $2
             where id = $1 returning *",
        )
        .bind(id)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    pub async fn stop(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        segment_seconds: i64,
    ) -> AppResult<WorkSession> {
        let now = chrono::Utc::now();
        let row = sqlx::query_as::<_, WorkSession>(
            "update work_sessions set status = 'STOPPED', stopped_at = $2,
                accumulated_seconds = accumulated_seconds + $3
             where id = $1 returning *",
        )
        .bind(id)
        .bind(now)
        .bind(segment_seconds)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Sum of `accumulated_seconds` across every `STOPPED` session on a
    /// ticket, floored to whole minutes at read time.
    pub async fn total_duration_minutes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ticket_id: Uuid,
    ) -> AppResult<i32> {
        let total_seconds: i64 = sqlx::query_scalar(
            "select coalesce(sum(accumulated_seconds), 0) from work_sessions
             where ticket_id = $1 and status = 'STOPPED'",
        )
        .bind(ticket_id)
        .fetch_one(&mut **tx)
        .await?;
        i32::try_from(total_seconds / 60)
            .map_err(|_| AppError::internal("ticket duration overflowed i32 minutes"))
    }

    pub async fn for_ticket(&self, ticket_id: Uuid) -> AppResult<Vec<WorkSession>> {
        let rows = sqlx::query_as::<_, WorkSession>(
            "select * from work_sessions where ticket_id = $1 order by started_at",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
