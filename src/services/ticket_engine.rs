//! Ticket lifecycle state engine — the hard core of the
//! system. Every transition locks the ticket row, re-reads its status
//! inside the transaction, applies the transition table, and emits an
//! immutable [`crate::db::models::TicketTransition`] in the same
//! transaction as any side effect on the owning item or the XP ledger.

use serde_json::json;
use uuid::Uuid;

use crate::db::models::Ticket;
use crate::errors::{AppError, AppResult};
use crate::repo::tickets::NewTicketPart;
use crate::repo::{AuditRepo, InventoryRepo, Page, TicketRepo, UserRepo, WorkSessionRepo, XpLedgerRepo};
use crate::types::{FlagColor, ItemStatus, Role, TicketAction, TicketStatus, XpSource};

#[derive(Clone)]
pub struct TicketEngine {
    tickets: TicketRepo,
    inventory: InventoryRepo,
    work_sessions: WorkSessionRepo,
    audit: AuditRepo,
    xp_ledger: XpLedgerRepo,
    users: UserRepo,
    first_pass_bonus_xp: i32,
}

pub struct CreateTicketInput {
    pub inventory_item_id: Uuid,
    pub title: String,
    pub master_id: Uuid,
    pub parts: Vec<NewTicketPart>,
}

impl TicketEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tickets: TicketRepo,
        inventory: InventoryRepo,
        work_sessions: WorkSessionRepo,
        audit: AuditRepo,
        xp_ledger: XpLedgerRepo,
        users: UserRepo,
        first_pass_bonus_xp: i32,
    ) -> Self {
        Self {
            tickets,
            inventory,
            work_sessions,
            audit,
            xp_ledger,
            users,
            first_pass_bonus_xp,
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Ticket> {
        self.tickets.find(id).await
    }

    pub async fn list(
        &self,
        page: Page,
        status: Option<TicketStatus>,
    ) -> AppResult<(Vec<Ticket>, i64)> {
        self.tickets.list(page, status).await
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create(&self, input: CreateTicketInput) -> AppResult<Ticket> {
        if input.parts.is_empty() {
            return Err(AppError::validation("a ticket requires at least one part"));
        }

        let mut tx = self.tickets.begin().await?;
        let ticket = self
            .tickets
            .create(
                &mut tx,
                input.inventory_item_id,
                &input.title,
                input.master_id,
                &input.parts,
            )
            .await?;

        self.inventory
            .set_item_status(&mut tx, input.inventory_item_id, ItemStatus::InService)
            .await?;

        self.audit
            .record_ticket_transition(
                &mut tx,
                ticket.id,
                Some(input.master_id),
                TicketAction::Create,
                None,
                TicketStatus::UnderReview,
                None,
                json!({}),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(ticket_id = %ticket.id, "ticket created");
        Ok(ticket)
    }

    /// Idempotent: a ticket that has already left `under_review` returns
    /// its current state unchanged rather than erroring.
    #[tracing::instrument(skip(self))]
    pub async fn review_approve(&self, ticket_id: Uuid, caller_id: Uuid) -> AppResult<Ticket> {
        let mut tx = self.tickets.begin().await?;
        let current = self.tickets.lock_for_update(&mut tx, ticket_id).await?;

        if current.status != TicketStatus::UnderReview {
            tx.commit().await?;
            return Ok(current);
        }

        let ticket = self
            .tickets
            .apply_transition(
                &mut tx,
                ticket_id,
                TicketStatus::New,
                None,
                Some(caller_id),
                None,
                None,
                None,
                None,
            )
            .await?;

        self.audit
            .record_ticket_transition(
                &mut tx,
                ticket_id,
                Some(caller_id),
                TicketAction::ReviewApprove,
                Some(TicketStatus::UnderReview),
                TicketStatus::New,
                None,
                json!({}),
            )
            .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    /// Assigns a technician, combining `review_approve` into the same
    /// call (as two separately recorded transitions) when the ticket is
    /// still `under_review`.
    #[tracing::instrument(skip(self))]
    pub async fn assign(
        &self,
        ticket_id: Uuid,
        caller_id: Uuid,
        technician_id: Uuid,
    ) -> AppResult<Ticket> {
        let technician_roles = self.users.active_roles(technician_id).await?;
        if !technician_roles.contains(&Role::Technician) {
            return Err(AppError::validation(
                "assignee does not hold an active technician role",
            ));
        }

        let mut tx = self.tickets.begin().await?;
        let current = self.tickets.lock_for_update(&mut tx, ticket_id).await?;

        if !matches!(current.status, TicketStatus::UnderReview | TicketStatus::New) {
            return Err(AppError::conflict(
                "ticket must be under_review or new to be assigned",
            ));
        }

        let mut approved_by = current.approved_by_id;
        if current.status == TicketStatus::UnderReview {
            self.tickets
                .apply_transition(
                    &mut tx,
                    ticket_id,
                    TicketStatus::New,
                    None,
                    Some(caller_id),
                    None,
                    None,
                    None,
                    None,
                )
                .await?;
            self.audit
                .record_ticket_transition(
                    &mut tx,
                    ticket_id,
                    Some(caller_id),
                    TicketAction::ReviewApprove,
                    Some(TicketStatus::UnderReview),
                    TicketStatus::New,
                    None,
                    json!({}),
                )
                .await?;
            approved_by = Some(caller_id);
        }

        let now = chrono::Utc::now();
        let ticket = self
            .tickets
            .apply_transition(
                &mut tx,
                ticket_id,
                TicketStatus::Assigned,
                Some(technician_id),
                approved_by,
                Some(now),
                None,
                None,
                None,
            )
            .await?;

        self.audit
            .record_ticket_transition(
                &mut tx,
                ticket_id,
                Some(caller_id),
                TicketAction::Assign,
                Some(TicketStatus::New),
                TicketStatus::Assigned,
                None,
                json!({ "technician_id": technician_id }),
            )
            .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    /// Opens a work session and moves the ticket into `in_progress`;
    /// `started_at` is stamped only on the ticket's first entry into this
    /// state.
    #[tracing::instrument(skip(self))]
    pub async fn start_work(&self, ticket_id: Uuid, technician_id: Uuid) -> AppResult<Ticket> {
        let mut tx = self.tickets.begin().await?;
        let current = self.tickets.lock_for_update(&mut tx, ticket_id).await?;

        if !matches!(current.status, TicketStatus::Assigned | TicketStatus::Rework) {
            return Err(AppError::conflict(
                "ticket must be assigned or in rework to start work",
            ));
        }
        if current.technician_id != Some(technician_id) {
            return Err(AppError::forbidden("caller is not the assigned technician"));
        }

        let session = self
            .work_sessions
            .start(&mut tx, ticket_id, technician_id)
            .await?;

        self.audit
            .record_work_session_transition(
                &mut tx,
                session.id,
                ticket_id,
                Some(technician_id),
                crate::types::WorkSessionAction::Started,
                None,
                crate::types::WorkSessionStatus::Running,
                json!({ "accumulated_seconds": 0, "segment_seconds": 0 }),
            )
            .await?;

        let started_at = current.started_at.or(Some(chrono::Utc::now()));
        let from_status = current.status;
        let ticket = self
            .tickets
            .apply_transition(
                &mut tx,
                ticket_id,
                TicketStatus::InProgress,
                None,
                None,
                None,
                started_at,
                None,
                None,
            )
            .await?;

        self.audit
            .record_ticket_transition(
                &mut tx,
                ticket_id,
                Some(technician_id),
                TicketAction::StartWork,
                Some(from_status),
                TicketStatus::InProgress,
                None,
                json!({}),
            )
            .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    /// Requires the ticket's current work session to be `STOPPED`;
    /// rejects otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn to_waiting_qc(&self, ticket_id: Uuid, caller_id: Uuid) -> AppResult<Ticket> {
        let mut tx = self.tickets.begin().await?;
        let current = self.tickets.lock_for_update(&mut tx, ticket_id).await?;

        if current.status != TicketStatus::InProgress {
            return Err(AppError::conflict("ticket must be in_progress"));
        }
        if self.work_sessions.active_for_ticket(ticket_id).await?.is_some() {
            return Err(AppError::conflict(
                "work session must be stopped before moving to QC",
            ));
        }

        let ticket = self
            .tickets
            .apply_transition(
                &mut tx,
                ticket_id,
                TicketStatus::WaitingQc,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await?;

        self.audit
            .record_ticket_transition(
                &mut tx,
                ticket_id,
                Some(caller_id),
                TicketAction::ToWaitingQc,
                Some(TicketStatus::InProgress),
                TicketStatus::WaitingQc,
                None,
                json!({}),
            )
            .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    /// Idempotent on an already-`done` ticket: the XP ledger's
    /// idempotency key absorbs a repeat pass without a second emission
    /// already recorded.
    #[tracing::instrument(skip(self))]
    pub async fn qc_pass(&self, ticket_id: Uuid, caller_id: Uuid) -> AppResult<Ticket> {
        let mut tx = self.tickets.begin().await?;
        let current = self.tickets.lock_for_update(&mut tx, ticket_id).await?;

        if current.status == TicketStatus::Done {
            tx.commit().await?;
            return Ok(current);
        }
        if current.status != TicketStatus::WaitingQc {
            return Err(AppError::conflict("ticket must be waiting_qc"));
        }
        let technician_id = current
            .technician_id
            .ok_or_else(|| AppError::internal("waiting_qc ticket has no technician"))?;

        let total_minutes = self
            .work_sessions
            .total_duration_minutes(&mut tx, ticket_id)
            .await?;
        let now = chrono::Utc::now();

        let ticket = self
            .tickets
            .apply_transition(
                &mut tx,
                ticket_id,
                TicketStatus::Done,
                None,
                None,
                None,
                None,
                Some(now),
                Some(total_minutes),
            )
            .await?;

        self.inventory
            .set_item_status(&mut tx, ticket.inventory_item_id, ItemStatus::Ready)
            .await?;

        self.audit
            .record_ticket_transition(
                &mut tx,
                ticket_id,
                Some(caller_id),
                TicketAction::QcPass,
                Some(TicketStatus::WaitingQc),
                TicketStatus::Done,
                None,
                json!({}),
            )
            .await?;

        self.xp_ledger
            .emit(
                &mut tx,
                technician_id,
                XpSource::QcPassBase,
                "Ticket",
                ticket_id,
                ticket.xp_amount,
            )
            .await?;

        if self.is_first_pass(ticket_id).await? {
            self.xp_ledger
                .emit(
                    &mut tx,
                    technician_id,
                    XpSource::QcFirstPassBonus,
                    "Ticket",
                    ticket_id,
                    self.first_pass_bonus_xp,
                )
                .await?;
        }

        tx.commit().await?;
        Ok(ticket)
    }

    #[tracing::instrument(skip(self))]
    pub async fn qc_fail(&self, ticket_id: Uuid, caller_id: Uuid) -> AppResult<Ticket> {
        let mut tx = self.tickets.begin().await?;
        let current = self.tickets.lock_for_update(&mut tx, ticket_id).await?;

        if current.status != TicketStatus::WaitingQc {
            return Err(AppError::conflict("ticket must be waiting_qc"));
        }

        let ticket = self
            .tickets
            .apply_transition(
                &mut tx,
                ticket_id,
                TicketStatus::Rework,
                None,
                None,
                None,
                None,
                None,
                None,
            )
            .await?;

        self.audit
            .record_ticket_transition(
                &mut tx,
                ticket_id,
                Some(caller_id),
                TicketAction::QcFail,
                Some(TicketStatus::WaitingQc),
                TicketStatus::Rework,
                None,
                json!({}),
            )
            .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    #[tracing::instrument(skip(self))]
    pub async fn manual_metrics(
        &self,
        ticket_id: Uuid,
        caller_id: Uuid,
        flag_color: FlagColor,
        xp_amount: i32,
    ) -> AppResult<Ticket> {
        if xp_amount < 0 {
            return Err(AppError::validation("xp_amount must be non-negative"));
        }

        let mut tx = self.tickets.begin().await?;
        let current = self.tickets.lock_for_update(&mut tx, ticket_id).await?;

        if current.status == TicketStatus::Done {
            return Err(AppError::conflict("cannot edit metrics on a done ticket"));
        }

        let ticket = self
            .tickets
            .apply_manual_metrics(&mut tx, ticket_id, flag_color, xp_amount)
            .await?;

        self.audit
            .record_ticket_transition(
                &mut tx,
                ticket_id,
                Some(caller_id),
                TicketAction::ManualMetrics,
                Some(current.status),
                current.status,
                None,
                json!({ "flag_color": flag_color, "xp_amount": xp_amount }),
            )
            .await?;

        tx.commit().await?;
        Ok(ticket)
    }

    pub async fn transitions(
        &self,
        ticket_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<crate::db::models::TicketTransition>, i64)> {
        self.audit.ticket_transitions(ticket_id, page).await
    }

    pub async fn work_session_transitions(
        &self,
        ticket_id: Uuid,
        page: Page,
    ) -> AppResult<(Vec<crate::db::models::WorkSessionTransition>, i64)> {
        self.audit.work_session_transitions(ticket_id, page).await
    }

    /// A ticket had a "first attempt" QC pass if its transition history
    /// never recorded a move into `rework`.
    async fn is_first_pass(&self, ticket_id: Uuid) -> AppResult<bool> {
        let history = self.audit.ticket_transitions_chronological(ticket_id).await?;
        Ok(!history
            .iter()
            .any(|t| t.to_status == TicketStatus::Rework))
    }
}
