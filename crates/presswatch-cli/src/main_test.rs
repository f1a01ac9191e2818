use super::*;
use crate::maintenance::snippet_updates;
use crate::verify::{report_lines, summary_lines};
use presswatch_pipeline::{FeedPollError, FeedPollReport, VerificationSummary};

#[test]
fn parses_verify_command() {
    let cli = Cli::try_parse_from(["presswatch-cli", "verify"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Verify)));
}

#[test]
fn poll_feeds_verifies_by_default() {
    let cli =
        Cli::try_parse_from(["presswatch-cli", "poll-feeds"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::PollFeeds { no_verify: false })
    ));
}

#[test]
fn poll_feeds_accepts_no_verify() {
    let cli = Cli::try_parse_from(["presswatch-cli", "poll-feeds", "--no-verify"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::PollFeeds { no_verify: true })
    ));
}

#[test]
fn parses_maintenance_commands() {
    let clean = Cli::try_parse_from(["presswatch-cli", "clean-snippets"]).unwrap();
    assert!(matches!(clean.command, Some(Commands::CleanSnippets)));

    let dedupe = Cli::try_parse_from(["presswatch-cli", "dedupe"]).unwrap();
    assert!(matches!(dedupe.command, Some(Commands::Dedupe)));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["presswatch-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["presswatch-cli", "collect"]).is_err());
}

#[test]
fn summary_lines_report_rate_and_reasons() {
    let mut summary = VerificationSummary {
        total: 5,
        already_verified: 1,
        processed: 4,
        verified: 2,
        failed: 1,
        needs_review: 1,
        ..VerificationSummary::default()
    };
    summary.errors.insert("http_error_4xx".to_string(), 1);
    summary.errors.insert("blocked".to_string(), 1);

    let lines = summary_lines(&summary);

    assert_eq!(lines[0], "verified 2 of 5 mentions (1 already verified)");
    assert!(lines.contains(&"verification rate: 50%".to_string()));
    assert!(lines.contains(&"  blocked: 1".to_string()));
    assert!(lines.contains(&"  http_error_4xx: 1".to_string()));
    assert!(!lines.iter().any(|l| l.starts_with("listing pages")));
}

#[test]
fn summary_lines_without_checked_mentions() {
    let lines = summary_lines(&VerificationSummary::default());
    assert!(lines.contains(&"verification rate: n/a".to_string()));
}

#[test]
fn report_lines_include_errors_and_verification() {
    let report = FeedPollReport {
        feeds_polled: 2,
        entries_found: 7,
        mentions_created: 3,
        errors: vec![
            FeedPollError {
                client_id: Some(4),
                client_name: Some("Globex".to_string()),
                message: "HTTP 500".to_string(),
            },
            FeedPollError {
                client_id: None,
                client_name: None,
                message: "Verification failed: boom".to_string(),
            },
        ],
        verification: Some(VerificationSummary {
            total: 3,
            verified: 3,
            ..VerificationSummary::default()
        }),
    };

    let lines = report_lines(&report);

    assert_eq!(lines[0], "polled 2 feeds: 7 entries, 3 new mentions");
    assert_eq!(lines[1], "error: Globex: HTTP 500");
    assert_eq!(lines[2], "error: Verification failed: boom");
    assert_eq!(lines[3], "verified 3 of 3 mentions (0 already verified)");
}

#[test]
fn snippet_updates_only_include_changed_subjects() {
    let updates = snippet_updates(vec![
        (1, "2 days ago ... Acme wins award".to_string()),
        (2, "Acme opens plant".to_string()),
        (3, "Jan 5, 2025 — Acme opens".to_string()),
    ]);

    assert_eq!(
        updates,
        vec![
            (1, "Acme wins award".to_string()),
            (3, "Acme opens".to_string()),
        ]
    );
}
