//! Invariants that only a real Postgres enforces: the `reject_mutation`
//! triggers on the audit/ledger tables and the XP ledger's
//! idempotency-key uniqueness.

#[path = "support/mod.rs"]
mod support;

use shopfloor::repo::{Page, XpLedgerRepo};
use shopfloor::types::XpSource;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn xp_ledger_emit_is_idempotent_on_the_same_reference() {
    let pool = support::pool().await;
    let (_item_id, master_id, _part_id) = support::seed_item_master_and_part(&pool).await;
    let repo = XpLedgerRepo::new(pool.clone());
    let reference_id = Uuid::new_v4();

    let mut tx = pool.begin().await.expect("begin");
    let first = repo
        .emit(&mut tx, master_id, XpSource::ManualAdjustment, "ticket", reference_id, 5)
        .await
        .expect("first emit");
    tx.commit().await.expect("commit");

    let mut tx = pool.begin().await.expect("begin");
    let second = repo
        .emit(&mut tx, master_id, XpSource::ManualAdjustment, "ticket", reference_id, 5)
        .await
        .expect("second emit is idempotent, not an error");
    tx.commit().await.expect("commit");

    assert_eq!(first.id, second.id, "replaying the same idempotency key must return the original row");

    let (entries, total) = repo
        .for_user(master_id, Page::new(Some(1), Some(20)))
        .await
        .expect("list entries");
    assert_eq!(total, 1);
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn ticket_transitions_table_rejects_updates() {
    let pool = support::pool().await;
    let (item_id, master_id, part_id) = support::seed_item_master_and_part(&pool).await;

    let tickets = shopfloor::repo::TicketRepo::new(pool.clone());
    let mut tx = tickets.begin().await.expect("begin");
    let ticket = tickets
        .create(
            &mut tx,
            item_id,
            "Rattle in the headset",
            master_id,
            &[shopfloor::repo::tickets::NewTicketPart {
                part_id,
                color: shopfloor::types::FlagColor::Green,
                minutes: 5,
                comment: "headset".to_string(),
            }],
        )
        .await
        .expect("create ticket");
    let audit = shopfloor::repo::AuditRepo::new(pool.clone());
    audit
        .record_ticket_transition(
            &mut tx,
            ticket.id,
            Some(master_id),
            shopfloor::types::TicketAction::Create,
            None,
            shopfloor::types::TicketStatus::UnderReview,
            None,
            serde_json::json!({}),
        )
        .await
        .expect("record transition");
    tx.commit().await.expect("commit");

    let row_id: Uuid = sqlx::query_scalar("select id from ticket_transitions where ticket_id = $1 limit 1")
        .bind(ticket.id)
        .fetch_one(&pool)
        .await
        .expect("fetch transition id");

    let result = sqlx::query("update ticket_transitions set metadata = '{}' where id = $1")
        .bind(row_id)
        .execute(&pool)
        .await;
    assert!(result.is_err(), "append-only trigger must reject the UPDATE");
}
