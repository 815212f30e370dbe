//! Ledger of provider webhook events that were already applied

use sqlx::SqliteConnection;

use super::RepoResult;
use crate::util::now_millis;

/// Record `event_id`; `false` if it was seen before.
///
/// Must run in the same transaction as the event's side effects.
pub async fn record(conn: &mut SqliteConnection, event_id: &str, event_type: &str) -> RepoResult<bool> {
    let rows = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at) VALUES (?, ?, ?) \
         ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_record_is_duplicate() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        assert!(record(&mut conn, "evt_1", "payment_intent.succeeded").await.unwrap());
        assert!(!record(&mut conn, "evt_1", "payment_intent.succeeded").await.unwrap());
        assert!(record(&mut conn, "evt_2", "payment_intent.succeeded").await.unwrap());
    }
}
