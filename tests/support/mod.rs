//! Shared Postgres fixture for integration tests. All tests in this
//! directory are `#[ignore]`d by default and only run against a real
//! database reachable at `TEST_DATABASE_URL` — there is no in-process
//! fake for row-locking transactions or trigger enforcement.

use sqlx::PgPool;
use uuid::Uuid;

pub async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("set TEST_DATABASE_URL to run the ignored integration tests");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

/// Inserts a minimal user + item + part so a ticket can be created
/// against them. Returns `(item_id, master_id, part_id)`.
pub async fn seed_item_master_and_part(pool: &PgPool) -> (Uuid, Uuid, Uuid) {
    let (item_id, master_id, category_id) = seed_item_and_master(pool).await;
    let part_id: Uuid = sqlx::query_scalar(
        "insert into parts (name, category_id) values ('Brake pad', $1) returning id",
    )
    .bind(category_id)
    .fetch_one(pool)
    .await
    .expect("insert part");
    (item_id, master_id, part_id)
}

/// Inserts a minimal user + item so a ticket can be created against them.
/// Returns `(item_id, master_id, category_id)`.
async fn seed_item_and_master(pool: &PgPool) -> (Uuid, Uuid, Uuid) {
    let master_id: Uuid = sqlx::query_scalar("insert into users (phone) values ($1) returning id")
        .bind(format!("+1555{:07}", rand::random::<u32>() % 10_000_000))
        .fetch_one(pool)
        .await
        .expect("insert master");

    sqlx::query("insert into role_assignments (user_id, role) values ($1, 'master')")
        .bind(master_id)
        .execute(pool)
        .await
        .expect("grant master role");

    let category_id: Uuid =
        sqlx::query_scalar("insert into categories (name) values ($1) returning id")
            .bind(format!("category-{}", Uuid::new_v4()))
            .fetch_one(pool)
            .await
            .expect("insert category");

    let item_id: Uuid = sqlx::query_scalar(
        "insert into items (category_id, serial_number, name) \
         values ($1, $2, 'Test bike') returning id",
    )
    .bind(category_id)
    .bind(format!("serial-{}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .expect("insert item");

    (item_id, master_id, category_id)
}

pub async fn seed_technician(pool: &PgPool) -> Uuid {
    let id: Uuid = sqlx::query_scalar("insert into users (phone) values ($1) returning id")
        .bind(format!("+1555{:07}", rand::random::<u32>() % 10_000_000))
        .fetch_one(pool)
        .await
        .expect("insert technician");

    sqlx::query("insert into role_assignments (user_id, role) values ($1, 'technician')")
        .bind(id)
        .execute(pool)
        .await
        .expect("grant technician role");

    id
}
