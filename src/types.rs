//! Core domain enums shared across repositories, services, and both
//! the HTTP and bot edges.

use serde::{Deserialize, Serialize};

/// Closed role enumeration. Role assignments are many-to-many on `User`
/// and only active assignments grant capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Manager,
    Master,
    Technician,
    Qc,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Manager => "manager",
            Role::Master => "master",
            Role::Technician => "technician",
            Role::Qc => "qc",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "manager" => Ok(Role::Manager),
            "master" => Ok(Role::Master),
            "technician" => Ok(Role::Technician),
            "qc" => Ok(Role::Qc),
            other => Err(anyhow::anyhow!("unknown role: {other}")),
        }
    }
}

/// Access request moderation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Physical state of one inventory item. Mutated only by the ticket engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ready,
    InService,
    Rented,
    Blocked,
    WriteOff,
}

/// Ticket lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    UnderReview,
    New,
    Assigned,
    InProgress,
    WaitingQc,
    Rework,
    Done,
}

impl TicketStatus {
    /// Tickets in these states hold the owning item at `IN_SERVICE`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Done)
    }
}

/// Flag color used by manual metrics and general ticket triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FlagColor {
    Green,
    Yellow,
    Red,
}

impl std::str::FromStr for FlagColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "green" => Ok(FlagColor::Green),
            "yellow" => Ok(FlagColor::Yellow),
            "red" => Ok(FlagColor::Red),
            other => Err(anyhow::anyhow!("unknown flag color: {other}")),
        }
    }
}

/// Work session timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkSessionStatus {
    Running,
    Paused,
    Stopped,
}

/// Action recorded against a ticket transition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    Create,
    ReviewApprove,
    Assign,
    StartWork,
    ToWaitingQc,
    QcPass,
    QcFail,
    ManualMetrics,
}

/// Action recorded against a work session transition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkSessionAction {
    Started,
    Paused,
    Resumed,
    Stopped,
}

/// XP ledger source tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum XpSource {
    AttendanceCheckin,
    QcFirstPassBonus,
    QcPassBase,
    ManualAdjustment,
}

impl XpSource {
    /// Short human-readable label shown to non-admin roles.
    pub fn reason_label(&self) -> &'static str {
        match self {
            XpSource::AttendanceCheckin => "Attendance check-in",
            XpSource::QcFirstPassBonus => "First-pass QC bonus",
            XpSource::QcPassBase => "Ticket completion",
            XpSource::ManualAdjustment => "Manual adjustment",
        }
    }
}

/// Declarative capability evaluated against a caller's active roles and,
/// for object-scoped checks, the target object's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    TicketCreate,
    TicketReviewApprove,
    TicketAssign,
    TicketManualMetrics,
    TicketWorkStart,
    TicketWorkPause,
    TicketWorkResume,
    TicketWorkStop,
    TicketToWaitingQc,
    TicketQcPass,
    TicketQcFail,
    AccessRequestModerate,
    XpReadSelf,
    XpReadAny,
    AttendanceCheckin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            Role::SuperAdmin,
            Role::Manager,
            Role::Master,
            Role::Technician,
            Role::Qc,
        ] {
            let parsed: Role = role.as_str().parse().expect("should parse");
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn role_rejects_unknown_string() {
        assert!("bogus".parse::<Role>().is_err());
    }

    #[test]
    fn flag_color_parses_case_insensitively() {
        assert_eq!(FlagColor::Green, "Green".parse().expect("ok"));
        assert_eq!(FlagColor::Red, "RED".parse().expect("ok"));
        assert!("purple".parse::<FlagColor>().is_err());
    }
}
