use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

mod common;

struct Org {
    head: String,
    maya: String,
    noor: String,
    devi: String,
}

/// Maya manages Devi; Noor is a manager with no reports here.
async fn seed_org(ctx: &common::TestApp) -> Result<Org> {
    common::seed_user(&ctx.pool, "Head", "head@test.dev", "password123", "HEAD", None).await?;
    let maya_id =
        common::seed_user(&ctx.pool, "Maya", "maya@test.dev", "password123", "MANAGER", None)
            .await?;
    common::seed_user(&ctx.pool, "Noor", "noor@test.dev", "password123", "MANAGER", None).await?;
    common::seed_user(
        &ctx.pool,
        "Devi",
        "devi@test.dev",
        "password123",
        "EMPLOYEE",
        Some(maya_id),
    )
    .await?;

    Ok(Org {
        head: common::login(&ctx.app, "head@test.dev", "password123").await?,
        maya: common::login(&ctx.app, "maya@test.dev", "password123").await?,
        noor: common::login(&ctx.app, "noor@test.dev", "password123").await?,
        devi: common::login(&ctx.app, "devi@test.dev", "password123").await?,
    })
}

async fn report_issue(ctx: &common::TestApp, token: &str, title: &str) -> Result<String> {
    let (status, body) = common::post(
        &ctx.app,
        "/issues",
        Some(token),
        json!({ "title": title, "description": "something broke" }),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "issue create failed: {} - {}", status, body);
    common::id_of(&body)
}

#[tokio::test]
async fn issue_lists_follow_the_reporting_chain() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let devi_issue = report_issue(&ctx, &org.devi, "Broken build").await?;
    report_issue(&ctx, &org.maya, "Planning conflict").await?;
    report_issue(&ctx, &org.noor, "Stale credentials").await?;

    // employee: exactly their own reports
    let (status, body) = common::get(&ctx.app, "/issues", Some(&org.devi)).await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i.get("id").and_then(Value::as_str))
        .collect();
    assert_eq!(ids, vec![devi_issue.as_str()]);

    // manager: own plus their reports' issues, nothing from other chains
    let (_, body) = common::get(&ctx.app, "/issues", Some(&org.maya)).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (_, body) = common::get(&ctx.app, "/issues", Some(&org.noor)).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    // HEAD: everything
    let (_, body) = common::get(&ctx.app, "/issues", Some(&org.head)).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(3));

    // a status filter composes with the creator restriction
    let (_, body) = common::get(&ctx.app, "/issues?status=OPEN", Some(&org.devi)).await?;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i.get("id").and_then(Value::as_str))
        .collect();
    assert_eq!(ids, vec![devi_issue.as_str()]);
    let (_, body) = common::get(&ctx.app, "/issues?status=RESOLVED", Some(&org.devi)).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn cross_chain_issue_access_is_denied() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let devi_issue = report_issue(&ctx, &org.devi, "Broken build").await?;

    let (status, _) = common::get(
        &ctx.app,
        &format!("/issues/{}", devi_issue),
        Some(&org.noor),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::get(
        &ctx.app,
        &format!("/issues/{}", devi_issue),
        Some(&org.maya),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn non_creator_may_only_move_the_status() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let issue_id = report_issue(&ctx, &org.devi, "Broken build").await?;

    // the creator's manager moves the status
    let (status, body) = common::put(
        &ctx.app,
        &format!("/issues/{}", issue_id),
        Some(&org.maya),
        json!({ "status": "IN_PROGRESS" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("status").and_then(Value::as_str), Some("IN_PROGRESS"));

    // but may not touch the description
    let (status, _) = common::put(
        &ctx.app,
        &format!("/issues/{}", issue_id),
        Some(&org.maya),
        json!({ "status": "RESOLVED", "description": "rewritten" }),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // HEAD gets the same status-only treatment
    let (status, _) = common::put(
        &ctx.app,
        &format!("/issues/{}", issue_id),
        Some(&org.head),
        json!({ "title": "Renamed" }),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // while the creator edits freely
    let (status, body) = common::put(
        &ctx.app,
        &format!("/issues/{}", issue_id),
        Some(&org.devi),
        json!({ "title": "Broken release build", "status": "OPEN" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.get("title").and_then(Value::as_str),
        Some("Broken release build")
    );

    Ok(())
}

#[tokio::test]
async fn dangling_task_link_reports_not_found_before_access() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let issue_id = report_issue(&ctx, &org.devi, "Broken build").await?;

    // Noor may not even view the issue, but the broken reference wins.
    let (status, _) = common::put(
        &ctx.app,
        &format!("/issues/{}", issue_id),
        Some(&org.noor),
        json!({ "task_id": Uuid::new_v4() }),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn only_head_deletes_issues() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let issue_id = report_issue(&ctx, &org.devi, "Broken build").await?;

    // not even the creator
    let (status, _) =
        common::delete(&ctx.app, &format!("/issues/{}", issue_id), Some(&org.devi)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) =
        common::delete(&ctx.app, &format!("/issues/{}", issue_id), Some(&org.maya)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        common::delete(&ctx.app, &format!("/issues/{}", issue_id), Some(&org.head)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn issue_survives_linked_task_deletion() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let (_, task) = common::post(
        &ctx.app,
        "/tasks",
        Some(&org.head),
        json!({ "title": "Flaky deploy" }),
    )
    .await?;
    let task_id = common::id_of(&task)?;

    let (status, issue) = common::post(
        &ctx.app,
        "/issues",
        Some(&org.devi),
        json!({ "title": "Deploy fails", "description": "see task", "task_id": task_id }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let issue_id = common::id_of(&issue)?;

    let (status, _) =
        common::delete(&ctx.app, &format!("/tasks/{}", task_id), Some(&org.head)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // the issue stays, its task link nulled out
    let task_link: Option<Uuid> = sqlx::query_scalar("SELECT task_id FROM issues WHERE id = ?")
        .bind(Uuid::parse_str(&issue_id)?)
        .fetch_one(&ctx.pool)
        .await?;
    assert_eq!(task_link, None);

    Ok(())
}
