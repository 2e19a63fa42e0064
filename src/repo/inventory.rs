use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{Category, Item, Part};
use crate::errors::AppResult;
use crate::repo::Page;
use crate::types::ItemStatus;

#[derive(Clone)]
pub struct InventoryRepo {
    pool: PgPool,
}

impl InventoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_item(
        &self,
        serial_number: &str,
        name: &str,
        category_id: Uuid,
    ) -> AppResult<Item> {
        let item = sqlx::query_as::<_, Item>(
            "insert into items (id, serial_number, name, category_id, status)
             values ($1, $2, $3, $4, 'ready') returning *",
        )
        .bind(Uuid::new_v4())
        .bind(serial_number)
        .bind(name)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_item(&self, id: Uuid) -> AppResult<Item> {
        let item = sqlx::query_as::<_, Item>("select * from items where id = $1 and deleted_at is null")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: Page,
        status: Option<ItemStatus>,
    ) -> AppResult<(Vec<Item>, i64)> {
        let rows = sqlx::query_as::<_, Item>(
            "select * from items
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
            "select count(*) from items where deleted_at is null and ($1::text is null or status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Mutated only by the ticket engine; never called from an HTTP or
    /// bot handler directly. Takes the caller's open transaction so
    /// the item's status change commits or rolls back atomically with the
    /// ticket transition that triggered it.
    pub(crate) async fn set_item_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: ItemStatus,
    ) -> AppResult<()> {
        sqlx::query("update items set status = $2, updated_at = now() where id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>("select * from categories order by name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_parts(&self, category_id: Option<Uuid>) -> AppResult<Vec<Part>> {
        let rows = sqlx::query_as::<_, Part>(
            "select * from parts
             where deleted_at is null and ($1::uuid is null or category_id = $1)
             order by name",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_part(&self, id: Uuid) -> AppResult<Part> {
        let part = sqlx::query_as::<_, Part>("select * from parts where id = $1 and deleted_at is null")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(part)
    }
}
