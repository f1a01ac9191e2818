//! Database operations for the `publications` table.

use presswatch_core::Publication;
use sqlx::PgPool;

use crate::DbError;

pub const UNKNOWN_SOURCE: &str = "Unknown Source";

/// A row from the `publications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PublicationRow {
    pub id: i64,
    pub name: String,
    pub domain: Option<String>,
}

impl From<PublicationRow> for Publication {
    fn from(row: PublicationRow) -> Self {
        Publication {
            id: row.id,
            name: row.name,
            domain: row.domain,
        }
    }
}

/// Returns all publications, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_publications(pool: &PgPool) -> Result<Vec<PublicationRow>, DbError> {
    let rows = sqlx::query_as::<_, PublicationRow>(
        "SELECT id, name, domain FROM publications ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the id of the "Unknown Source" publication, creating it if a
/// migration-seeded row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn unknown_source_publication_id(pool: &PgPool) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO publications (name) VALUES ($1) \
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(UNKNOWN_SOURCE)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
