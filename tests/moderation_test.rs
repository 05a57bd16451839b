mod common;

use catalog_issues::config::IssuesConfig;
use catalog_issues::models::{comment_report, AbuseStatus, Visibility};
use catalog_issues::AppError;
use sea_orm::EntityTrait;

async fn app_with_issue() -> common::TestApp {
    let app = common::spawn_app_with(IssuesConfig {
        max_strikes: Some(2),
        ..IssuesConfig::default()
    })
    .await;
    app.directory.add_dataset("ds", "Dataset", Some("org"));
    app.issues
        .create("author", "ds", "suspicious", None, None)
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn reports_up_to_the_limit_leave_the_issue_visible() {
    let app = app_with_issue().await;

    app.moderation.report_issue("u1", "ds", 1).await.unwrap();
    let outcome = app.moderation.report_issue("u2", "ds", 1).await.unwrap();

    assert_eq!(outcome.strikes, 2);
    assert_eq!(outcome.visibility, Visibility::Visible);
    assert_eq!(outcome.abuse_status, AbuseStatus::Unmoderated);
}

#[tokio::test]
async fn the_report_beyond_the_limit_hides_the_issue() {
    let app = app_with_issue().await;

    app.moderation.report_issue("u1", "ds", 1).await.unwrap();
    app.moderation.report_issue("u2", "ds", 1).await.unwrap();
    let outcome = app.moderation.report_issue("u3", "ds", 1).await.unwrap();

    assert_eq!(outcome.strikes, 3);
    assert_eq!(outcome.visibility, Visibility::Hidden);
    assert_eq!(outcome.abuse_status, AbuseStatus::Abuse);
}

#[tokio::test]
async fn reporting_twice_is_an_idempotent_no_op() {
    let app = app_with_issue().await;

    let first = app.moderation.report_issue("u1", "ds", 1).await.unwrap();
    let second = app.moderation.report_issue("u1", "ds", 1).await.unwrap();

    assert_eq!(first.strikes, 1);
    assert_eq!(second.strikes, 1);
    assert_eq!(second.visibility, Visibility::Visible);
}

#[tokio::test]
async fn a_privileged_report_hides_immediately() {
    let app = app_with_issue().await;
    app.perms.grant_dataset_update("publisher", "ds");

    let outcome = app
        .moderation
        .report_issue("publisher", "ds", 1)
        .await
        .unwrap();

    assert_eq!(outcome.visibility, Visibility::Hidden);
    assert_eq!(outcome.abuse_status, AbuseStatus::Abuse);
    assert_eq!(outcome.strikes, 1);
}

#[tokio::test]
async fn withdrawing_a_report_does_not_unhide() {
    let app = app_with_issue().await;

    for reporter in ["u1", "u2", "u3"] {
        app.moderation
            .report_issue(reporter, "ds", 1)
            .await
            .unwrap();
    }
    app.moderation
        .clear_issue_reports("u1", "ds", 1)
        .await
        .unwrap();

    let detail = app.issues.show(None, "ds", 1, false).await;
    // still hidden: anonymous viewers cannot see it
    assert!(matches!(detail, Err(AppError::NotFound)));
}

#[tokio::test]
async fn clearing_twice_leaves_state_unchanged() {
    let app = app_with_issue().await;
    app.moderation.report_issue("u1", "ds", 1).await.unwrap();
    app.moderation.report_issue("u2", "ds", 1).await.unwrap();

    app.moderation
        .clear_issue_reports("u1", "ds", 1)
        .await
        .unwrap();
    app.moderation
        .clear_issue_reports("u1", "ds", 1)
        .await
        .unwrap();

    app.perms.grant_dataset_update("publisher", "ds");
    let reporters = app
        .moderation
        .issue_reporters("publisher", "ds", 1)
        .await
        .unwrap();
    assert_eq!(reporters, vec!["u2".to_string()]);
}

#[tokio::test]
async fn a_privileged_clear_is_a_full_reset() {
    let app = app_with_issue().await;
    app.perms.grant_dataset_update("publisher", "ds");

    for reporter in ["u1", "u2", "u3"] {
        app.moderation
            .report_issue(reporter, "ds", 1)
            .await
            .unwrap();
    }
    app.moderation
        .clear_issue_reports("publisher", "ds", 1)
        .await
        .unwrap();

    let detail = app.issues.show(None, "ds", 1, false).await.unwrap();
    assert_eq!(detail.issue.visibility, Visibility::Visible);
    assert_eq!(detail.issue.abuse_status, AbuseStatus::NotAbuse);

    let reporters = app
        .moderation
        .issue_reporters("publisher", "ds", 1)
        .await
        .unwrap();
    assert!(reporters.is_empty());
}

#[tokio::test]
async fn reset_requires_dataset_update_rights() {
    let app = app_with_issue().await;
    app.moderation.report_issue("u1", "ds", 1).await.unwrap();

    let err = app
        .moderation
        .reset_issue("stranger", "ds", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn reporting_a_missing_issue_is_not_found() {
    let app = common::spawn_app().await;
    app.directory.add_dataset("ds", "Dataset", None);

    let err = app.moderation.report_issue("u1", "ds", 9).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn hidden_issues_stay_visible_to_publishers() {
    let app = app_with_issue().await;
    app.perms.grant_dataset_update("publisher", "ds");
    app.moderation
        .report_issue("publisher", "ds", 1)
        .await
        .unwrap();

    assert!(matches!(
        app.issues.show(Some("stranger"), "ds", 1, false).await,
        Err(AppError::NotFound)
    ));
    let detail = app
        .issues
        .show(Some("publisher"), "ds", 1, false)
        .await
        .unwrap();
    assert_eq!(detail.issue.visibility, Visibility::Hidden);
}

#[tokio::test]
async fn reporter_lists_are_filtered_by_privilege() {
    let app = app_with_issue().await;
    app.perms.grant_dataset_update("publisher", "ds");
    app.moderation.report_issue("u1", "ds", 1).await.unwrap();
    app.moderation.report_issue("u2", "ds", 1).await.unwrap();

    let all = app
        .moderation
        .issue_reporters("publisher", "ds", 1)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let own = app.moderation.issue_reporters("u2", "ds", 1).await.unwrap();
    assert_eq!(own, vec!["u2".to_string()]);

    let none = app
        .moderation
        .issue_reporters("stranger", "ds", 1)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn comments_hide_after_the_strike_limit() {
    let app = app_with_issue().await;
    let comment = app
        .comments
        .create("author", "ds", 1, "buy cheap meds")
        .await
        .unwrap();

    app.moderation
        .report_comment("u1", comment.id)
        .await
        .unwrap();
    app.moderation
        .report_comment("u2", comment.id)
        .await
        .unwrap();
    let outcome = app
        .moderation
        .report_comment("u3", comment.id)
        .await
        .unwrap();

    assert_eq!(outcome.visibility, Visibility::Hidden);
    assert_eq!(outcome.abuse_status, AbuseStatus::Abuse);
}

#[tokio::test]
async fn a_privileged_comment_clear_resets_reports() {
    let app = app_with_issue().await;
    app.perms.grant_dataset_update("publisher", "ds");
    let comment = app
        .comments
        .create("author", "ds", 1, "spam spam")
        .await
        .unwrap();

    app.moderation
        .report_comment("publisher", comment.id)
        .await
        .unwrap();
    app.moderation
        .clear_comment_reports("publisher", comment.id)
        .await
        .unwrap();

    let restored = app.comments.get(comment.id).await.unwrap();
    assert_eq!(restored.visibility, Visibility::Visible);
    assert_eq!(restored.abuse_status, AbuseStatus::NotAbuse);
    assert!(comment_report::Entity::find()
        .one(&app.db)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn strike_hiding_can_be_disabled() {
    let app = common::spawn_app_with(IssuesConfig {
        max_strikes: None,
        ..IssuesConfig::default()
    })
    .await;
    app.directory.add_dataset("ds", "Dataset", None);
    app.issues
        .create("author", "ds", "fine actually", None, None)
        .await
        .unwrap();

    for i in 0..10 {
        app.moderation
            .report_issue(&format!("u{i}"), "ds", 1)
            .await
            .unwrap();
    }

    let detail = app.issues.show(None, "ds", 1, false).await.unwrap();
    assert_eq!(detail.issue.visibility, Visibility::Visible);
}
