//! Partial unique index enforcement on `work_sessions`: at most one
//! non-stopped session per ticket, and per technician, regardless of
//! how many times `start` races in.

#[path = "support/mod.rs"]
mod support;

use shopfloor::repo::tickets::NewTicketPart;
use shopfloor::repo::{AuditRepo, InventoryRepo, TicketRepo, UserRepo, WorkSessionRepo, XpLedgerRepo};
use shopfloor::services::ticket_engine::{CreateTicketInput, TicketEngine};
use shopfloor::types::FlagColor;

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn a_second_start_for_the_same_ticket_conflicts() {
    let pool = support::pool().await;
    let (item_id, master_id, part_id) = support::seed_item_master_and_part(&pool).await;
    let technician_id = support::seed_technician(&pool).await;

    let engine = TicketEngine::new(
        TicketRepo::new(pool.clone()),
        InventoryRepo::new(pool.clone()),
        WorkSessionRepo::new(pool.clone()),
        AuditRepo::new(pool.clone()),
        XpLedgerRepo::new(pool.clone()),
        UserRepo::new(pool.clone()),
        10,
    );

    let ticket = engine
        .create(CreateTicketInput {
            inventory_item_id: item_id,
            title: "Worn brake cable".to_string(),
            master_id,
            parts: vec![NewTicketPart {
                part_id,
                color: FlagColor::Red,
                minutes: 20,
                comment: "cable".to_string(),
            }],
        })
        .await
        .expect("create ticket");

    engine.assign(ticket.id, master_id, technician_id).await.expect("assign");
    engine.start_work(ticket.id, technician_id).await.expect("first start");

    // A second attempt to open a work session directly at the repo layer
    // (bypassing the status guard a real caller would already fail on)
    // must still be rejected by the database's partial unique index.
    let sessions = WorkSessionRepo::new(pool.clone());
    let mut tx = pool.begin().await.expect("begin");
    let second_start = sessions.start(&mut tx, ticket.id, technician_id).await;
    assert!(second_start.is_err(), "a concurrent second start must conflict");
}
