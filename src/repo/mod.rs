//! Repositories: one struct per aggregate, each wrapping a shared
//! [`sqlx::PgPool`] and exposing async methods that issue hand-written SQL.
//! A thin struct over a pool, `tracing` spans on each call, no ORM.

pub mod access_requests;
pub mod audit;
pub mod inventory;
pub mod tickets;
pub mod users;
pub mod work_sessions;
pub mod xp_ledger;

pub use access_requests::AccessRequestRepo;
pub use audit::AuditRepo;
pub use inventory::InventoryRepo;
pub use tickets::TicketRepo;
pub use users::UserRepo;
pub use work_sessions::WorkSessionRepo;
pub use xp_ledger::XpLedgerRepo;

/// Pagination request shared by every list endpoint: `page` is
/// 1-based, `per_page` defaults to 20 and is clamped to `[1, 100]`.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(20).clamp(1, 100);
        Self { page, per_page }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn page_count(&self, total_count: i64) -> i64 {
        if total_count == 0 {
            0
        } else {
            (total_count + self.per_page - 1) / self.per_page
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_apply_when_absent() {
        let page = Page::new(None, None);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn per_page_is_clamped_to_max_100() {
        let page = Page::new(Some(3), Some(500));
        assert_eq!(page.per_page, 100);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn page_count_rounds_up() {
        let page = Page::new(Some(1), Some(20));
        assert_eq!(page.page_count(41), 3);
        assert_eq!(page.page_count(0), 0);
    }
}
