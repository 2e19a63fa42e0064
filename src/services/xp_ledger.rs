//! XP Ledger read projections and the attendance emitter.
//! Ticket-driven emissions (`qc_pass_base`, `qc_first_pass_bonus`) are
//! written by [`crate::services::ticket_engine`] inside the same
//! transaction as the triggering transition; this service covers the
//! emitter that stands alone (attendance) and all reads.

use chrono::Utc;
use uuid::Uuid;

use crate::db::models::XpLedgerEntry;
use crate::errors::AppResult;
use crate::repo::{Page, XpLedgerRepo};
use crate::types::XpSource;

#[derive(Clone)]
pub struct XpLedgerService {
    repo: XpLedgerRepo,
    punctuality_base_xp: i32,
}

impl XpLedgerService {
    pub fn new(repo: XpLedgerRepo, punctuality_base_xp: i32) -> Self {
        Self {
            repo,
            punctuality_base_xp,
        }
    }

    pub async fn history_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<XpLedgerEntry>, i64)> {
        self.repo.for_user(user_id, page).await
    }

    /// Once-per-local-calendar-day attendance emission; `on_time` decides
    /// whether the base amount or zero is awarded.
    /// `attendance_id` is the caller's externally-assigned id for the
    /// check-in event, used verbatim as the idempotency reference.
    pub async fn record_attendance_checkin(
        &self,
        user_id: Uuid,
        attendance_id: Uuid,
        on_time: bool,
    ) -> AppResult<XpLedgerEntry> {
        let amount = if on_time { self.punctuality_base_xp } else { 0 };
        let mut tx = self.repo_begin().await?;
        let entry = self
            .repo
            .emit(
                &mut tx,
                user_id,
                XpSource::AttendanceCheckin,
                "Attendance",
                attendance_id,
                amount,
            )
            .await?;
        tx.commit().await.map_err(crate::errors::AppError::from)?;
        Ok(entry)
    }

    async fn repo_begin(&self) -> AppResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.repo.begin_for_emit().await
    }

    /// Local midnight cutoff is the caller's responsibility to enforce by
    /// passing a stable per-day `attendance_id`; kept here only as a
    /// reminder of the invariant this component must uphold.
    pub fn today_utc() -> chrono::NaiveDate {
        Utc::now().date_naive()
    }
}
