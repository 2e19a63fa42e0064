//! End-to-end ticket lifecycle against a real database: creation through
//! review, assignment, work timing and QC, verifying the row-locked state
//! machine and its XP side effects actually persist.

#[path = "support/mod.rs"]
mod support;

use shopfloor::repo::tickets::NewTicketPart;
use shopfloor::repo::{AuditRepo, InventoryRepo, TicketRepo, UserRepo, WorkSessionRepo, XpLedgerRepo};
use shopfloor::services::ticket_engine::{CreateTicketInput, TicketEngine};
use shopfloor::services::work_session::WorkSessionService;
use shopfloor::types::{FlagColor, TicketStatus, WorkSessionStatus};

fn engine(pool: sqlx::PgPool) -> TicketEngine {
    TicketEngine::new(
        TicketRepo::new(pool.clone()),
        InventoryRepo::new(pool.clone()),
        WorkSessionRepo::new(pool.clone()),
        AuditRepo::new(pool.clone()),
        XpLedgerRepo::new(pool.clone()),
        UserRepo::new(pool),
        10,
    )
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn happy_path_create_to_done_emits_first_pass_bonus() {
    let pool = support::pool().await;
    let (item_id, master_id, part_id) = support::seed_item_master_and_part(&pool).await;
    let technician_id = support::seed_technician(&pool).await;
    let engine = engine(pool.clone());

    let ticket = engine
        .create(CreateTicketInput {
            inventory_item_id: item_id,
            title: "Flat tire".to_string(),
            master_id,
            parts: vec![NewTicketPart {
                part_id,
                color: FlagColor::Green,
                minutes: 15,
                comment: "front wheel".to_string(),
            }],
        })
        .await
        .expect("create ticket");
    assert_eq!(ticket.status, TicketStatus::UnderReview);

    let assigned = engine
        .assign(ticket.id, master_id, technician_id)
        .await
        .expect("assign");
    assert_eq!(assigned.status, TicketStatus::Assigned);
    assert_eq!(assigned.technician_id, Some(technician_id));

    let in_progress = engine
        .start_work(ticket.id, technician_id)
        .await
        .expect("start work");
    assert_eq!(in_progress.status, TicketStatus::InProgress);

    let work_sessions_repo = WorkSessionRepo::new(pool.clone());
    let active = work_sessions_repo
        .active_for_ticket(ticket.id)
        .await
        .expect("lookup active session")
        .expect("a session should be running");
    let mut tx = pool.begin().await.expect("begin");
    work_sessions_repo
        .stop(&mut tx, active.id, 120)
        .await
        .expect("stop session");
    tx.commit().await.expect("commit");

    let waiting_qc = engine
        .to_waiting_qc(ticket.id, technician_id)
        .await
        .expect("move to waiting_qc");
    assert_eq!(waiting_qc.status, TicketStatus::WaitingQc);

    let done = engine.qc_pass(ticket.id, master_id).await.expect("qc pass");
    assert_eq!(done.status, TicketStatus::Done);
    assert!(done.total_duration_minutes >= 2);

    let xp_repo = XpLedgerRepo::new(pool.clone());
    let (entries, _total) = xp_repo
        .for_user(master_id, shopfloor::repo::Page::new(Some(1), Some(20)))
        .await
        .expect("xp entries for master");
    // qc_pass_base and qc_first_pass_bonus both credit the technician, not
    // the approving manager; re-fetch against the technician instead.
    let (tech_entries, _total) = xp_repo
        .for_user(technician_id, shopfloor::repo::Page::new(Some(1), Some(20)))
        .await
        .expect("xp entries for technician");
    assert!(entries.is_empty());
    assert_eq!(tech_entries.len(), 2);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn qc_fail_sends_ticket_to_rework_with_no_xp() {
    let pool = support::pool().await;
    let (item_id, master_id, part_id) = support::seed_item_master_and_part(&pool).await;
    let technician_id = support::seed_technician(&pool).await;
    let engine = engine(pool.clone());

    let ticket = engine
        .create(CreateTicketInput {
            inventory_item_id: item_id,
            title: "Loose chain".to_string(),
            master_id,
            parts: vec![NewTicketPart {
                part_id,
                color: FlagColor::Yellow,
                minutes: 10,
                comment: "chain tension".to_string(),
            }],
        })
        .await
        .expect("create ticket");

    engine
        .assign(ticket.id, master_id, technician_id)
        .await
        .expect("assign");
    engine
        .start_work(ticket.id, technician_id)
        .await
        .expect("start work");

    let work_sessions_repo = WorkSessionRepo::new(pool.clone());
    let active = work_sessions_repo
        .active_for_ticket(ticket.id)
        .await
        .expect("lookup")
        .expect("running session");
    let mut tx = pool.begin().await.expect("begin");
    work_sessions_repo.stop(&mut tx, active.id, 60).await.expect("stop");
    tx.commit().await.expect("commit");

    engine
        .to_waiting_qc(ticket.id, technician_id)
        .await
        .expect("to waiting_qc");

    let reworked = engine.qc_fail(ticket.id, master_id).await.expect("qc fail");
    assert_eq!(reworked.status, TicketStatus::Rework);

    let xp_repo = XpLedgerRepo::new(pool.clone());
    let (entries, _) = xp_repo
        .for_user(technician_id, shopfloor::repo::Page::new(Some(1), Some(20)))
        .await
        .expect("xp entries");
    assert!(entries.is_empty());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn creating_a_second_active_ticket_for_the_same_item_conflicts() {
    let pool = support::pool().await;
    let (item_id, master_id, part_id) = support::seed_item_master_and_part(&pool).await;
    let engine = engine(pool.clone());

    let make_input = || CreateTicketInput {
        inventory_item_id: item_id,
        title: "Brake check".to_string(),
        master_id,
        parts: vec![NewTicketPart {
            part_id,
            color: FlagColor::Green,
            minutes: 5,
            comment: "quick check".to_string(),
        }],
    };

    engine.create(make_input()).await.expect("first ticket succeeds");
    let second = engine.create(make_input()).await;
    assert!(second.is_err(), "second active ticket on the same item must conflict");
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn stopping_an_already_stopped_session_is_idempotent() {
    let pool = support::pool().await;
    let (item_id, master_id, part_id) = support::seed_item_master_and_part(&pool).await;
    let technician_id = support::seed_technician(&pool).await;
    let engine = engine(pool.clone());
    let sessions = WorkSessionService::new(
        WorkSessionRepo::new(pool.clone()),
        TicketRepo::new(pool.clone()),
        AuditRepo::new(pool.clone()),
    );

    let ticket = engine
        .create(CreateTicketInput {
            inventory_item_id: item_id,
            title: "Squeaky pedal".to_string(),
            master_id,
            parts: vec![NewTicketPart {
                part_id,
                color: FlagColor::Green,
                minutes: 5,
                comment: "pedal".to_string(),
            }],
        })
        .await
        .expect("create ticket");
    engine.assign(ticket.id, master_id, technician_id).await.expect("assign");
    engine.start_work(ticket.id, technician_id).await.expect("start work");

    let first_stop = sessions
        .stop(ticket.id, technician_id)
        .await
        .expect("first stop succeeds");
    assert_eq!(first_stop.status, WorkSessionStatus::Stopped);

    let second_stop = sessions
        .stop(ticket.id, technician_id)
        .await
        .expect("re-stopping an already stopped session must not error");
    assert_eq!(second_stop.id, first_stop.id);
    assert_eq!(second_stop.status, WorkSessionStatus::Stopped);
    assert_eq!(second_stop.accumulated_seconds, first_stop.accumulated_seconds);
}
