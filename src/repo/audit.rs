use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{TicketTransition, WorkSessionTransition};
use crate::errors::AppResult;
use crate::repo::Page;
use crate::types::{TicketAction, TicketStatus, WorkSessionAction, WorkSessionStatus};

/// Append-only audit log. Every insert happens inside the
/// caller's transaction so a transition and its audit row commit or
/// roll back together; reads go straight to the pool.
#[derive(Clone)]
pub struct AuditRepo {
    pool: PgPool,
}

impl AuditRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_ticket_transition(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ticket_id: Uuid,
        actor_id: Option<Uuid>,
        action: TicketAction,
        from_status: Option<TicketStatus>,
        to_status: TicketStatus,
        note: Option<&str>,
        metadata: serde_json::Value,
    ) -> AppResult<TicketTransition> {
        let row = sqlx::query_as::<_, TicketTransition>(
            "insert into ticket_transitions
                (id, ticket_id, actor_id, action, from_status, to_status, note, metadata)
             values ($1, $2, $3, $4, $5, $6, $7, $8)
             returning *",
        )
        .bind(Uuid::new_v4())
        .bind(ticket_id)
        .bind(actor_id)
        .bind(action)
        .bind(from_status)
        .bind(to_status)
        .bind(note)
        .bind(metadata)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_work_session_transition(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session_id: Uuid,
        ticket_id: Uuid,
        actor_id: Option<Uuid>,
        action: WorkSessionAction,
        from_status: Option<WorkSessionStatus>,
        to_status: WorkSessionStatus,
        metadata: serde_json::Value,
    ) -> AppResult<WorkSessionTransition> {
        let row = sqlx::query_as::<_, WorkSessionTransition>(
            "insert into work_session_transitions
                (id, session_id, ticket_id, actor_id, action, from_status, to_status, metadata)
             values ($1, $2, $3, $4, $5, $6, $7, $8)
             returning *",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(ticket_id)
        .bind(actor_id)
        .bind(action)
        .bind(from_status)
        .bind(to_status)
        .bind(metadata)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self))]
    pub async fn ticket_transitions(
        &self,
        ticket_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<TicketTransition>, i64)> {
        let rows = sqlx::query_as::<_, TicketTransition>(
            "select * from ticket_transitions where ticket_id = $1
             order by created_at desc, id desc
             limit $2 offset $3",
        )
        .bind(ticket_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("select count(*) from ticket_transitions where ticket_id = $1")
                .bind(ticket_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }

    /// Same rows but in chronological (insertion) order — used internally
    /// by the first-pass-bonus check, which must walk history forward.
    pub(crate) async fn ticket_transitions_chronological(
        &self,
        ticket_id: Uuid,
    ) -> AppResult<Vec<TicketTransition>> {
        let rows = sqlx::query_as::<_, TicketTransition>(
            "select * from ticket_transitions where ticket_id = $1 order by created_at asc, id asc",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[tracing::instrument(skip(self))]
    pub async fn work_session_transitions(
        &self,
        ticket_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<WorkSessionTransition>, i64)> {
        let rows = sqlx::query_as::<_, WorkSessionTransition>(
            "select * from work_session_transitions where ticket_id = $1
             order by event_at desc, id desc
             limit $2 offset $3",
        )
        .bind(ticket_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "select count(*) from work_session_transitions where ticket_id = $1",
        )
        .bind(ticket_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }
}
