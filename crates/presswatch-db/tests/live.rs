//! Live integration tests for presswatch-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database from the sqlx test
//! harness. They need `DATABASE_URL` pointing at a server the harness can
//! create databases on, so they are ignored by default:
//! `cargo test -p presswatch-db -- --ignored`.

use chrono::Utc;
use presswatch_core::{NewMention, Sentiment, Verification};
use presswatch_db::{
    existing_mention_keys, insert_mention, list_clients_with_feeds, list_mention_subjects,
    list_mentions_for_verification, list_publications, mention_exists_for_url,
    rekey_mention_links, unknown_source_publication_id, update_mention_subject,
    update_verification, DbError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_test_client(pool: &sqlx::PgPool, name: &str, feed_url: Option<&str>) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO clients (name, feed_url) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(feed_url)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_client failed for '{name}': {e}"))
}

fn new_mention(client_id: i64, publication_id: i64, title: &str, link: &str) -> NewMention {
    NewMention {
        title: title.to_string(),
        subject: "Acme wins award".to_string(),
        mention_date: Utc::now(),
        link: link.to_string(),
        source: Some("example.com".to_string()),
        sentiment: Sentiment::Positive,
        status: "new".to_string(),
        client_id,
        publication_id,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Publications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unknown_source_is_seeded_and_stable(pool: sqlx::PgPool) {
    let first = unknown_source_publication_id(&pool).await.expect("lookup failed");
    let second = unknown_source_publication_id(&pool).await.expect("lookup failed");
    assert_eq!(first, second);

    let pubs = list_publications(&pool).await.expect("list failed");
    assert!(pubs.iter().any(|p| p.name == "Unknown Source"));
}

// ---------------------------------------------------------------------------
// Section 2: Mention uniqueness
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn insert_mention_conflict_returns_none(pool: sqlx::PgPool) {
    let client = insert_test_client(&pool, "Acme", None).await;
    let publication = unknown_source_publication_id(&pool).await.unwrap();

    let created = insert_mention(
        &pool,
        &new_mention(client, publication, "Acme wins", "https://example.com/a"),
    )
    .await
    .expect("insert failed");
    assert!(created.is_some());
    assert_eq!(created.unwrap().verification, Verification::Unresolved);

    // Same canonical link, different title.
    let dup_link = insert_mention(
        &pool,
        &new_mention(client, publication, "Other", "http://www.example.com/a/"),
    )
    .await
    .expect("insert failed");
    assert!(dup_link.is_none());

    // Same normalized title, different link.
    let dup_title = insert_mention(
        &pool,
        &new_mention(client, publication, "  ACME   wins ", "https://other.com/b"),
    )
    .await
    .expect("insert failed");
    assert!(dup_title.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn blank_titles_do_not_conflict(pool: sqlx::PgPool) {
    let client = insert_test_client(&pool, "Acme", None).await;
    let publication = unknown_source_publication_id(&pool).await.unwrap();

    for (title, link) in [("", "https://example.com/a"), ("   ", "https://example.com/b")] {
        let created = insert_mention(&pool, &new_mention(client, publication, title, link))
            .await
            .expect("insert failed");
        assert!(created.is_some(), "untitled mention {link} was dropped");
    }

    let dup_link = insert_mention(
        &pool,
        &new_mention(client, publication, "", "https://example.com/a/"),
    )
    .await
    .expect("insert failed");
    assert!(dup_link.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn existing_keys_match_link_or_title(pool: sqlx::PgPool) {
    let client = insert_test_client(&pool, "Acme", None).await;
    let publication = unknown_source_publication_id(&pool).await.unwrap();
    insert_mention(&pool, &new_mention(client, publication, "Acme Wins", "https://example.com/a"))
        .await
        .unwrap();

    let keys = existing_mention_keys(
        &pool,
        client,
        &["https://example.com/zzz".to_string()],
        &["acme wins".to_string()],
    )
    .await
    .expect("query failed");
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].normalized_link, "https://example.com/a");
    assert_eq!(keys[0].normalized_title, "acme wins");

    assert!(mention_exists_for_url(&pool, client, "http://example.com/a/").await.unwrap());
    assert!(!mention_exists_for_url(&pool, client, "https://example.com/b").await.unwrap());
}

// ---------------------------------------------------------------------------
// Section 3: Verification write-back
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn verification_round_trip(pool: sqlx::PgPool) {
    let client = insert_test_client(&pool, "Acme", None).await;
    let publication = unknown_source_publication_id(&pool).await.unwrap();
    let mention = insert_mention(
        &pool,
        &new_mention(client, publication, "Acme", "https://example.com/a"),
    )
    .await
    .unwrap()
    .unwrap();

    update_verification(&pool, mention.id, Verification::Confirmed).await.unwrap();

    let listed = list_mentions_for_verification(&pool).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].client_name, "Acme");
    assert_eq!(listed[0].verification, Verification::Confirmed);

    let err = update_verification(&pool, 999_999, Verification::Rejected)
        .await
        .expect_err("unknown id should fail");
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 4: Maintenance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn subjects_can_be_rewritten(pool: sqlx::PgPool) {
    let client = insert_test_client(&pool, "Acme", None).await;
    let publication = unknown_source_publication_id(&pool).await.unwrap();
    let mention = insert_mention(
        &pool,
        &new_mention(client, publication, "Acme", "https://example.com/a"),
    )
    .await
    .unwrap()
    .unwrap();

    update_mention_subject(&pool, mention.id, "cleaned").await.unwrap();
    let subjects = list_mention_subjects(&pool).await.unwrap();
    assert_eq!(subjects, vec![(mention.id, "cleaned".to_string())]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn rekey_removes_later_duplicates(pool: sqlx::PgPool) {
    let client = insert_test_client(&pool, "Acme", None).await;
    let publication = unknown_source_publication_id(&pool).await.unwrap();

    // Simulate rows written under older normalization rules.
    for (title, link, key) in [
        ("First", "https://example.com/a", "https://example.com/a"),
        ("Second", "http://www.example.com/a/", "legacy-key"),
    ] {
        sqlx::query(
            "INSERT INTO media_mentions \
                 (title, mention_date, link, normalized_link, client_id, publication_id) \
             VALUES ($1, NOW(), $2, $3, $4, $5)",
        )
        .bind(title)
        .bind(link)
        .bind(key)
        .bind(client)
        .bind(publication)
        .execute(&pool)
        .await
        .unwrap();
    }

    let outcome = rekey_mention_links(&pool).await.unwrap();
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.rekeyed, 0);

    let remaining = list_mentions_for_verification(&pool).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "First");
}

// ---------------------------------------------------------------------------
// Section 5: Clients
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn only_clients_with_feeds_are_listed(pool: sqlx::PgPool) {
    insert_test_client(&pool, "With Feed", Some("https://www.google.com/alerts/feeds/1/2")).await;
    insert_test_client(&pool, "Blank Feed", Some("   ")).await;
    insert_test_client(&pool, "No Feed", None).await;

    let clients = list_clients_with_feeds(&pool).await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "With Feed");
}
