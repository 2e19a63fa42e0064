use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{Ticket, TicketPart};
use crate::errors::AppResult;
use crate::repo::Page;
use crate::types::{FlagColor, TicketStatus};

#[derive(Clone)]
pub struct TicketRepo {
    pool: PgPool,
}

pub struct NewTicketPart {
    pub part_id: Uuid,
    pub color: FlagColor,
    pub minutes: i32,
    pub comment: String,
}

impl TicketRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find(&self, id: Uuid) -> AppResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "select * from tickets where id = $1 and deleted_at is null",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ticket)
    }

    /// Locks the row for update inside an already-open transaction; the
    /// caller must re-evaluate `status` after this returns — lock, then
    /// re-read.
    pub async fn lock_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "select * from tickets where id = $1 and deleted_at is null for update",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(ticket)
    }

    #[tracing::instrument(skip(self, parts))]
    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        inventory_item_id: Uuid,
        title: &str,
        master_id: Uuid,
        parts: &[NewTicketPart],
    ) -> AppResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "insert into tickets (id, inventory_item_id, title, master_id, status)
             values ($1, $2, $3, $4, 'under_review')
             returning *",
        )
        .bind(Uuid::new_v4())
        .bind(inventory_item_id)
        .bind(title)
        .bind(master_id)
        .fetch_one(&mut **tx)
        .await?;

        for part in parts {
            sqlx::query(
                "insert into ticket_parts (id, ticket_id, part_id, color, minutes, comment)
                 values ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(ticket.id)
            .bind(part.part_id)
            .bind(part.color)
            .bind(part.minutes)
            .bind(&part.comment)
            .execute(&mut **tx)
            .await?;
        }

        Ok(ticket)
    }

    pub async fn ticket_parts(&self, ticket_id: Uuid) -> AppResult<Vec<TicketPart>> {
        let rows = sqlx::query_as::<_, TicketPart>(
            "select * from ticket_parts where ticket_id = $1 order by id",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn apply_transition(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: TicketStatus,
        technician_id: Option<Uuid>,
        approved_by_id: Option<Uuid>,
        assigned_at: Option<chrono::DateTime<chrono::Utc>>,
        started_at: Option<chrono::DateTime<chrono::Utc>>,
        finished_at: Option<chrono::DateTime<chrono::Utc>>,
        total_duration_minutes: Option<i32>,
    ) -> AppResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "update tickets set
                status = $2,
                technician_id = coalesce($3, technician_id),
                approved_by_id = coalesce($4, approved_by_id),
                assigned_at = coalesce($5, assigned_at),
                started_at = coalesce($6, started_at),
                finished_at = coalesce($7, finished_at),
                total_duration_minutes = coalesce($8, total_duration_minutes)
             where id = $1
             returning *",
        )
        .bind(id)
        .bind(status)
        .bind(technician_id)
        .bind(approved_by_id)
        .bind(assigned_at)
        .bind(started_at)
        .bind(finished_at)
        .bind(total_duration_minutes)
        .fetch_one(&mut **tx)
        .await?;
        Ok(ticket)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn apply_manual_metrics(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        flag_color: FlagColor,
        xp_amount: i32,
    ) -> AppResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "update tickets set flag_color = $2, xp_amount = $3, is_manual = true
             where id = $1 returning *",
        )
        .bind(id)
        .bind(flag_color)
        .bind(xp_amount)
        .fetch_one(&mut **tx)
        .await?;
        Ok(ticket)
    }

    pub async fn update_total_duration_minutes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        total_duration_minutes: i32,
    ) -> AppResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "update tickets set total_duration_minutes = $2 where id = $1 returning *",
        )
        .bind(id)
        .bind(total_duration_minutes)
        .fetch_one(&mut **tx)
        .await?;
        Ok(ticket)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        page: Page,
        status: Option<TicketStatus>,
    ) -> AppResult<(Vec<Ticket>, i64)> {
        let rows = sqlx::query_as::<_, Ticket>(
            "select * from tickets
             where deleted_at is null and ($3::text is null or status = $3)
             order by created_at desc
             limit $1 offset $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "select count(*) from tickets where deleted_at is null and ($1::text is null or status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }
}
