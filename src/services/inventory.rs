//! Inventory registry. Read-heavy CRUD over categories,
//! items and parts. Item status is never mutated here — only the ticket
//! engine is allowed to move an item between states, keeping that
//! cross-entity invariant single-sourced.

use uuid::Uuid;

use crate::db::models::{Category, Item, Part};
use crate::errors::{AppError, AppResult};
use crate::repo::{InventoryRepo, Page};
use crate::types::ItemStatus;

#[derive(Clone)]
pub struct InventoryService {
    repo: InventoryRepo,
}

impl InventoryService {
    pub fn new(repo: InventoryRepo) -> Self {
        Self { repo }
    }

    pub async fn create_item(
        &self,
        serial_number: &str,
        name: &str,
        category_id: Uuid,
    ) -> AppResult<Item> {
        if serial_number.trim().is_empty() || name.trim().is_empty() {
            return Err(AppError::validation("serial_number and name are required"));
        }
        self.repo.create_item(serial_number, name, category_id).await
    }

    pub async fn get_item(&self, id: Uuid) -> AppResult<Item> {
        self.repo.find_item(id).await
    }

    pub async fn list_items(
        &self,
        page: Page,
        status: Option<ItemStatus>,
    ) -> AppResult<(Vec<Item>, i64)> {
        self.repo.list_items(page, status).await
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repo.list_categories().await
    }

    pub async fn list_parts(&self, category_id: Option<Uuid>) -> AppResult<Vec<Part>> {
        self.repo.list_parts(category_id).await
    }
}
