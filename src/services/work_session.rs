//! Work-session timer. `pause`/`resume`/`stop` act on the
//! ticket's current active session; `start` is folded into
//! [`crate::services::ticket_engine::TicketEngine::start_work`] because it
//! also moves the ticket into `in_progress` in the same transaction.

use serde_json::json;
use uuid::Uuid;

use crate::db::models::WorkSession;
use crate::errors::{AppError, AppResult};
use crate::repo::{AuditRepo, TicketRepo, WorkSessionRepo};
use crate::types::{WorkSessionAction, WorkSessionStatus};

#[derive(Clone)]
pub struct WorkSessionService {
    sessions: WorkSessionRepo,
    tickets: TicketRepo,
    audit: AuditRepo,
}

impl WorkSessionService {
    pub fn new(sessions: WorkSessionRepo, tickets: TicketRepo, audit: AuditRepo) -> Self {
        Self {
            sessions,
            tickets,
            audit,
        }
    }

    async fn active_session_for(&self, ticket_id: Uuid, caller_id: Uuid) -> AppResult<WorkSession> {
        let session = self
            .sessions
            .active_for_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::conflict("ticket has no active work session"))?;
        if session.technician_id != caller_id {
            return Err(AppError::forbidden("caller is not the session's technician"));
        }
        Ok(session)
    }

    #[tracing::instrument(skip(self))]
    pub async fn pause(&self, ticket_id: Uuid, caller_id: Uuid) -> AppResult<WorkSession> {
        let session = self.active_session_for(ticket_id, caller_id).await?;
        if session.status != WorkSessionStatus::Running {
            return Err(AppError::conflict("session is not running"));
        }

        let segment_seconds = segment_seconds_since(session.last_started_at);
        let mut tx = self.tickets.begin().await?;
        let session = self.sessions.pause(&mut tx, session.id, segment_seconds).await?;
        self.audit
            .record_work_session_transition(
                &mut tx,
                session.id,
                ticket_id,
                Some(caller_id),
                WorkSessionAction::Paused,
                Some(WorkSessionStatus::Running),
                WorkSessionStatus::Paused,
                json!({ "accumulated_seconds": session.accumulated_seconds, "segment_seconds": segment_seconds }),
            )
            .await?;
        tx.commit().await?;
        Ok(session)
    }

    #[tracing::instrument(skip(self))]
    pub async fn resume(&self, ticket_id: Uuid, caller_id: Uuid) -> AppResult<WorkSession> {
        let session = self.active_session_for(ticket_id, caller_id).await?;
        if session.status != WorkSessionStatus::Paused {
            return Err(AppError::conflict("session is not paused"));
        }

        let mut tx = self.tickets.begin().await?;
        let session = self.sessions.resume(&mut tx, session.id).await?;
        self.audit
            .record_work_session_transition(
                &mut tx,
                session.id,
                ticket_id,
                Some(caller_id),
                WorkSessionAction::Resumed,
                Some(WorkSessionStatus::Paused),
                WorkSessionStatus::Running,
                json!({ "accumulated_seconds": session.accumulated_seconds, "segment_seconds": 0 }),
            )
            .await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Folds a final running segment if needed, then recomputes the
    /// owning ticket's `total_duration_minutes` in the same transaction.
    /// Idempotent: stopping an already-`STOPPED` session returns it
    /// unchanged instead of erroring, since the most recent session is
    /// looked up regardless of status.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, ticket_id: Uuid, caller_id: Uuid) -> AppResult<WorkSession> {
        let session = self
            .sessions
            .latest_for_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::conflict("ticket has no work session"))?;
        if session.technician_id != caller_id {
            return Err(AppError::forbidden("caller is not the session's technician"));
        }
        if session.status == WorkSessionStatus::Stopped {
            return Ok(session);
        }

        let from_status = session.status;
        let segment_seconds = if from_status == WorkSessionStatus::Running {
            segment_seconds_since(session.last_started_at)
        } else {
            0
        };

        let mut tx = self.tickets.begin().await?;
        let session = self.sessions.stop(&mut tx, session.id, segment_seconds).await?;
        self.audit
            .record_work_session_transition(
                &mut tx,
                session.id,
                ticket_id,
                Some(caller_id),
                WorkSessionAction::Stopped,
                Some(from_status),
                WorkSessionStatus::Stopped,
                json!({ "accumulated_seconds": session.accumulated_seconds, "segment_seconds": segment_seconds }),
            )
            .await?;

        let total_minutes = self.sessions.total_duration_minutes(&mut tx, ticket_id).await?;
        self.tickets
            .update_total_duration_minutes(&mut tx, ticket_id, total_minutes)
            .await?;

        tx.commit().await?;
        Ok(session)
    }

    pub async fn for_ticket(&self, ticket_id: Uuid) -> AppResult<Vec<WorkSession>> {
        self.sessions.for_ticket(ticket_id).await
    }
}

fn segment_seconds_since(last_started_at: chrono::DateTime<chrono::Utc>) -> i64 {
    (chrono::Utc::now() - last_started_at).num_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn segment_seconds_never_negative() {
        let future = Utc::now() + chrono::Duration::seconds(5);
        assert_eq!(segment_seconds_since(future), 0);
    }

    #[test]
    fn segment_seconds_measures_elapsed_time() {
        let past = Utc::now() - chrono::Duration::seconds(30);
        let elapsed = segment_seconds_since(past);
        assert!((29..=31).contains(&elapsed));
    }
}
