//! Database operations for the `clients` table.

use chrono::{DateTime, Utc};
use presswatch_core::FeedClient;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `clients` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    pub id: i64,
    pub name: String,
    pub feed_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Returns active clients with a non-blank feed URL, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_clients_with_feeds(pool: &PgPool) -> Result<Vec<FeedClient>, DbError> {
    let rows = sqlx::query_as::<_, ClientRow>(
        "SELECT id, name, feed_url, is_active, created_at \
         FROM clients \
         WHERE is_active = true AND feed_url IS NOT NULL AND btrim(feed_url) <> '' \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            row.feed_url.map(|feed_url| FeedClient {
                id: row.id,
                name: row.name,
                feed_url: feed_url.trim().to_string(),
            })
        })
        .collect())
}
