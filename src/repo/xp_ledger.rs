use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::XpLedgerEntry;
use crate::errors::AppResult;
use crate::repo::Page;
use crate::types::XpSource;

#[derive(Clone)]
pub struct XpLedgerRepo {
    pool: PgPool,
}

impl XpLedgerRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin_for_emit(&self) -> AppResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Inserts an entry, or silently returns the existing one if its
    /// idempotency key already exists. Must be
    /// called inside the caller's transaction when emitted as a side
    /// effect of a ticket transition.
    pub async fn emit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        source: XpSource,
        reference_type: &str,
        reference_id: Uuid,
        amount: i32,
    ) -> AppResult<XpLedgerEntry> {
        let row = sqlx::query_as::<_, XpLedgerEntry>(
            "insert into xp_ledger_entries
                (id, user_id, source, reference_type, reference_id, amount, reason_label)
             values ($1, $2, $3, $4, $5, $6, $7)
             on conflict (user_id, source, reference_type, reference_id) do nothing
             returning *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(source)
        .bind(reference_type)
        .bind(reference_id)
        .bind(amount)
        .bind(source.reason_label())
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(row) => Ok(row),
            None => {
                let existing = sqlx::query_as::<_, XpLedgerEntry>(
                    "select * from xp_ledger_entries
                     where user_id = $1 and source = $2 and reference_type = $3 and reference_id = $4",
                )
                .bind(user_id)
                .bind(source)
                .bind(reference_type)
                .bind(reference_id)
                .fetch_one(&mut **tx)
                .await?;
                Ok(existing)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn for_user(&self, user_id: Uuid, page: Page) -> AppResult<(Vec<XpLedgerEntry>, i64)> {
        let rows = sqlx::query_as::<_, XpLedgerEntry>(
            "select * from xp_ledger_entries where user_id = $1
             order by created_at desc
             limit $2 offset $3",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("select count(*) from xp_ledger_entries where user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }
}
