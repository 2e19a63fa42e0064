//! Row structs mirroring the tables in `migrations/`. These are the only
//! place `sqlx::FromRow` derives live; repositories map them into
//! whatever shape a service or the wire layer needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{
    AccessRequestStatus, FlagColor, ItemStatus, Role, TicketAction, TicketStatus,
    WorkSessionAction, WorkSessionStatus, XpSource,
};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub telegram_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AccessRequest {
    pub id: Uuid,
    pub telegram_id: i64,
    pub telegram_username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: String,
    pub status: AccessRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Item {
    pub id: Uuid,
    pub serial_number: String,
    pub name: String,
    pub category_id: Uuid,
    pub status: ItemStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Part {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub item_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Ticket {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub title: String,
    pub master_id: Uuid,
    pub technician_id: Option<Uuid>,
    pub approved_by_id: Option<Uuid>,
    pub status: TicketStatus,
    pub flag_color: FlagColor,
    pub xp_amount: i32,
    pub is_manual: bool,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_duration_minutes: i32,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TicketPart {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub part_id: Uuid,
    pub color: FlagColor,
    pub minutes: i32,
    pub comment: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WorkSession {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub technician_id: Uuid,
    pub status: WorkSessionStatus,
    pub started_at: DateTime<Utc>,
    pub last_started_at: DateTime<Utc>,
    pub accumulated_seconds: i64,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl WorkSession {
    pub fn accumulated_minutes(&self) -> i64 {
        self.accumulated_seconds / 60
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TicketTransition {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: TicketAction,
    pub from_status: Option<TicketStatus>,
    pub to_status: TicketStatus,
    pub note: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WorkSessionTransition {
    pub id: Uuid,
    pub session_id: Uuid,
    pub ticket_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: WorkSessionAction,
    pub from_status: Option<WorkSessionStatus>,
    pub to_status: WorkSessionStatus,
    pub event_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct XpLedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: XpSource,
    pub reference_type: String,
    pub reference_id: Uuid,
    pub amount: i32,
    pub reason_label: String,
    pub created_at: DateTime<Utc>,
}
