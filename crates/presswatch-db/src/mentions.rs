//! Database operations for the `media_mentions` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use presswatch_core::{
    normalize_url_for_comparison, Mention, MentionForVerification, NewMention, Sentiment,
    Verification,
};
use sqlx::PgPool;

use crate::DbError;

/// SQL twin of `presswatch_core::normalize_title`, also used by the unique index.
const NORMALIZED_TITLE_SQL: &str = r"lower(btrim(regexp_replace(title, '\s+', ' ', 'g')))";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `media_mentions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MentionRow {
    pub id: i64,
    pub title: String,
    pub subject: Option<String>,
    pub mention_date: DateTime<Utc>,
    pub remention_date: Option<DateTime<Utc>>,
    pub link: String,
    pub normalized_link: String,
    pub source: Option<String>,
    pub sentiment: String,
    pub status: String,
    pub client_id: i64,
    pub publication_id: i64,
    pub press_release_id: Option<i64>,
    pub verification: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MentionRow> for Mention {
    type Error = DbError;

    fn try_from(row: MentionRow) -> Result<Self, Self::Error> {
        let sentiment = row
            .sentiment
            .parse::<Sentiment>()
            .map_err(|_| DbError::InvalidColumn {
                column: "sentiment",
                value: row.sentiment.clone(),
            })?;
        let verification = parse_verification(&row.verification)?;

        Ok(Mention {
            id: row.id,
            title: row.title,
            subject: row.subject,
            mention_date: row.mention_date,
            remention_date: row.remention_date,
            link: row.link,
            source: row.source,
            sentiment,
            status: row.status,
            client_id: row.client_id,
            publication_id: row.publication_id,
            press_release_id: row.press_release_id,
            verification,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VerificationRow {
    id: i64,
    title: String,
    link: String,
    subject: Option<String>,
    client_id: i64,
    client_name: String,
    verification: String,
}

/// Normalized link and title of a persisted mention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct ExistingKey {
    pub normalized_link: String,
    pub normalized_title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RekeyOutcome {
    pub deleted: usize,
    pub rekeyed: usize,
}

const MENTION_COLUMNS: &str = "id, title, subject, mention_date, remention_date, link, \
     normalized_link, source, sentiment, status, client_id, publication_id, \
     press_release_id, verification, created_at";

fn parse_verification(raw: &str) -> Result<Verification, DbError> {
    raw.parse::<Verification>()
        .map_err(|_| DbError::InvalidColumn {
            column: "verification",
            value: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the keys of every mention of `client_id` whose normalized link is in
/// `links` or whose normalized title is in `titles`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn existing_mention_keys(
    pool: &PgPool,
    client_id: i64,
    links: &[String],
    titles: &[String],
) -> Result<Vec<ExistingKey>, DbError> {
    let sql = format!(
        "SELECT normalized_link, {NORMALIZED_TITLE_SQL} AS normalized_title \
         FROM media_mentions \
         WHERE client_id = $1 \
           AND (normalized_link = ANY($2) OR {NORMALIZED_TITLE_SQL} = ANY($3))"
    );
    let rows = sqlx::query_as::<_, ExistingKey>(&sql)
        .bind(client_id)
        .bind(links)
        .bind(titles)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Inserts a mention with verification `unresolved`.
///
/// Returns `None` when a unique index rejects the row as a duplicate.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] for any failure other than a uniqueness conflict,
/// or [`DbError::InvalidColumn`] if the returned row cannot be decoded.
pub async fn insert_mention(
    pool: &PgPool,
    mention: &NewMention,
) -> Result<Option<Mention>, DbError> {
    let sql = format!(
        "INSERT INTO media_mentions \
             (title, subject, mention_date, link, normalized_link, source, sentiment, \
              status, client_id, publication_id, verification) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'unresolved') \
         ON CONFLICT DO NOTHING \
         RETURNING {MENTION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, MentionRow>(&sql)
        .bind(&mention.title)
        .bind(&mention.subject)
        .bind(mention.mention_date)
        .bind(&mention.link)
        .bind(normalize_url_for_comparison(&mention.link))
        .bind(&mention.source)
        .bind(mention.sentiment.as_str())
        .bind(&mention.status)
        .bind(mention.client_id)
        .bind(mention.publication_id)
        .fetch_optional(pool)
        .await?;

    row.map(Mention::try_from).transpose()
}

/// Returns every mention joined with its client's name, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidColumn`]
/// for an unknown verification value.
pub async fn list_mentions_for_verification(
    pool: &PgPool,
) -> Result<Vec<MentionForVerification>, DbError> {
    let rows = sqlx::query_as::<_, VerificationRow>(
        "SELECT m.id, m.title, m.link, m.subject, m.client_id, c.name AS client_name, \
                m.verification \
         FROM media_mentions m \
         JOIN clients c ON c.id = m.client_id \
         ORDER BY m.id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(MentionForVerification {
                id: row.id,
                title: row.title,
                link: Some(row.link).filter(|l| !l.trim().is_empty()),
                subject: row.subject,
                client_id: row.client_id,
                client_name: row.client_name,
                verification: parse_verification(&row.verification)?,
            })
        })
        .collect()
}

/// Sets the verification state of one mention.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no mention has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_verification(
    pool: &PgPool,
    id: i64,
    verification: Verification,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE media_mentions \
         SET verification = $1, updated_at = NOW() \
         WHERE id = $2",
    )
    .bind(verification.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Whether `client_id` already has a mention for `url`, raw or normalized.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn mention_exists_for_url(
    pool: &PgPool,
    client_id: i64,
    url: &str,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM media_mentions \
             WHERE client_id = $1 AND (normalized_link = $2 OR link = $3) \
         )",
    )
    .bind(client_id)
    .bind(normalize_url_for_comparison(url))
    .bind(url)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Returns `(id, subject)` for every mention with a non-null subject.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_mention_subjects(pool: &PgPool) -> Result<Vec<(i64, String)>, DbError> {
    let rows = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, subject FROM media_mentions WHERE subject IS NOT NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overwrites the subject (snippet) of one mention.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no mention has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_mention_subject(pool: &PgPool, id: i64, subject: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE media_mentions SET subject = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(subject)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Recomputes `normalized_link` for every mention with the current URL rules.
///
/// When several mentions of a client collapse onto the same key, the one with
/// the lowest id is kept and the rest are deleted. Runs in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is changed then.
pub async fn rekey_mention_links(pool: &PgPool) -> Result<RekeyOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query_as::<_, (i64, i64, String, String)>(
        "SELECT id, client_id, link, normalized_link FROM media_mentions ORDER BY id FOR UPDATE",
    )
    .fetch_all(&mut *tx)
    .await?;

    let plan = plan_rekey(&rows);

    if !plan.delete.is_empty() {
        sqlx::query("DELETE FROM media_mentions WHERE id = ANY($1)")
            .bind(&plan.delete)
            .execute(&mut *tx)
            .await?;
    }

    // Park rows on a unique placeholder first so swapping keys between two
    // rows cannot trip the unique index mid-update.
    for (id, _) in &plan.rekey {
        sqlx::query(
            "UPDATE media_mentions SET normalized_link = 'rekey:' || id::text WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }
    for (id, key) in &plan.rekey {
        sqlx::query(
            "UPDATE media_mentions SET normalized_link = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(key)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(RekeyOutcome {
        deleted: plan.delete.len(),
        rekeyed: plan.rekey.len(),
    })
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RekeyPlan {
    delete: Vec<i64>,
    rekey: Vec<(i64, String)>,
}

/// `rows` are `(id, client_id, link, normalized_link)` ordered by id.
fn plan_rekey(rows: &[(i64, i64, String, String)]) -> RekeyPlan {
    let mut seen: HashSet<(i64, String)> = HashSet::new();
    let mut plan = RekeyPlan::default();

    for (id, client_id, link, stored) in rows {
        let key = normalize_url_for_comparison(link);
        if !seen.insert((*client_id, key.clone())) {
            plan.delete.push(*id);
        } else if &key != stored {
            plan.rekey.push((*id, key));
        }
    }
    plan
}
