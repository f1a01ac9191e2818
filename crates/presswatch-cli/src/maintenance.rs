//! Maintenance commands that rewrite stored mentions in place.

use presswatch_core::clean_snippet;

/// Re-applies snippet cleaning to every stored subject.
///
/// Only subjects whose cleaned form differs are written back. A failed update
/// is logged and skipped.
///
/// # Errors
///
/// Returns an error if the subjects cannot be loaded.
pub(crate) async fn run_clean_snippets(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let subjects = presswatch_db::list_mention_subjects(pool).await?;
    let scanned = subjects.len();
    let updates = snippet_updates(subjects);

    let mut updated = 0usize;
    for (id, subject) in &updates {
        match presswatch_db::update_mention_subject(pool, *id, subject).await {
            Ok(()) => updated += 1,
            Err(e) => {
                tracing::error!(mention_id = id, error = %e, "failed to update snippet");
            }
        }
    }

    println!("cleaned {updated} of {scanned} snippets");
    Ok(())
}

/// Deletes duplicate mentions and rewrites stale canonical link keys.
///
/// # Errors
///
/// Returns an error if the rekeying transaction fails; nothing is changed in
/// that case.
pub(crate) async fn run_dedupe(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let outcome = presswatch_db::rekey_mention_links(pool).await?;
    tracing::info!(
        deleted = outcome.deleted,
        rekeyed = outcome.rekeyed,
        "mention links rekeyed"
    );
    println!(
        "deleted {} duplicate mentions, rekeyed {}",
        outcome.deleted, outcome.rekeyed
    );
    Ok(())
}

/// Returns the `(id, cleaned subject)` pairs that need writing back.
pub(crate) fn snippet_updates(subjects: Vec<(i64, String)>) -> Vec<(i64, String)> {
    subjects
        .into_iter()
        .filter_map(|(id, subject)| {
            let cleaned = clean_snippet(&subject);
            (cleaned != subject).then_some((id, cleaned))
        })
        .collect()
}
