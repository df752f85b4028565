use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

mod common;

struct Org {
    maya: String,
    noor: String,
    devi: String,
    devi_id: Uuid,
    team_id: String,
}

async fn seed_org(ctx: &common::TestApp) -> Result<Org> {
    common::seed_user(&ctx.pool, "Head", "head@test.dev", "password123", "HEAD", None).await?;
    let maya_id =
        common::seed_user(&ctx.pool, "Maya", "maya@test.dev", "password123", "MANAGER", None)
            .await?;
    common::seed_user(&ctx.pool, "Noor", "noor@test.dev", "password123", "MANAGER", None).await?;
    let devi_id = common::seed_user(
        &ctx.pool,
        "Devi",
        "devi@test.dev",
        "password123",
        "EMPLOYEE",
        Some(maya_id),
    )
    .await?;

    let head = common::login(&ctx.app, "head@test.dev", "password123").await?;
    let (_, project) = common::post(
        &ctx.app,
        "/projects",
        Some(&head),
        json!({ "name": "Rollout", "start_date": "2026-01-01T00:00:00Z" }),
    )
    .await?;
    let project_id = common::id_of(&project)?;
    let (_, team) = common::post(
        &ctx.app,
        "/teams",
        Some(&head),
        json!({ "name": "Crew", "leader_id": maya_id, "project_ids": [project_id] }),
    )
    .await?;
    let team_id = common::id_of(&team)?;
    common::post(
        &ctx.app,
        &format!("/teams/{}/members", team_id),
        Some(&head),
        json!({ "user_id": devi_id }),
    )
    .await?;

    Ok(Org {
        maya: common::login(&ctx.app, "maya@test.dev", "password123").await?,
        noor: common::login(&ctx.app, "noor@test.dev", "password123").await?,
        devi: common::login(&ctx.app, "devi@test.dev", "password123").await?,
        devi_id,
        team_id,
    })
}

#[tokio::test]
async fn dashboard_collects_active_work_only() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    // direct assignment, team assignment and a finished task
    common::post(
        &ctx.app,
        "/tasks",
        Some(&org.maya),
        json!({ "title": "Direct", "assignee_id": org.devi_id, "status": "ONGOING" }),
    )
    .await?;
    common::post(
        &ctx.app,
        "/tasks",
        Some(&org.maya),
        json!({ "title": "Through team", "team_id": org.team_id, "status": "BACKLOG" }),
    )
    .await?;
    common::post(
        &ctx.app,
        "/tasks",
        Some(&org.maya),
        json!({ "title": "Done", "assignee_id": org.devi_id, "status": "FINISHED" }),
    )
    .await?;

    // an open and a resolved issue
    common::post(
        &ctx.app,
        "/issues",
        Some(&org.devi),
        json!({ "title": "Open item", "description": "pending" }),
    )
    .await?;
    let (_, resolved) = common::post(
        &ctx.app,
        "/issues",
        Some(&org.devi),
        json!({ "title": "Resolved item", "description": "done" }),
    )
    .await?;
    let resolved_id = common::id_of(&resolved)?;
    common::put(
        &ctx.app,
        &format!("/issues/{}", resolved_id),
        Some(&org.devi),
        json!({ "status": "RESOLVED" }),
    )
    .await?;

    let (status, body) = common::get(
        &ctx.app,
        &format!("/dashboard/{}", org.devi_id),
        Some(&org.maya),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let task_titles: Vec<&str> = body
        .get("active_tasks")
        .and_then(Value::as_array)
        .unwrap()
        .iter()
        .filter_map(|t| t.get("title").and_then(Value::as_str))
        .collect();
    assert_eq!(task_titles.len(), 2);
    assert!(task_titles.contains(&"Direct") && task_titles.contains(&"Through team"));

    let issue_titles: Vec<&str> = body
        .get("open_issues")
        .and_then(Value::as_array)
        .unwrap()
        .iter()
        .filter_map(|i| i.get("title").and_then(Value::as_str))
        .collect();
    assert_eq!(issue_titles, vec!["Open item"]);

    Ok(())
}

#[tokio::test]
async fn dashboard_access_mirrors_workload_rules() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    // the user themselves
    let (status, _) = common::get(
        &ctx.app,
        &format!("/dashboard/{}", org.devi_id),
        Some(&org.devi),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // a manager outside the chain
    let (status, _) = common::get(
        &ctx.app,
        &format!("/dashboard/{}", org.devi_id),
        Some(&org.noor),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // unknown user: the access check passes for a manager of nobody, so 404
    let head = common::login(&ctx.app, "head@test.dev", "password123").await?;
    let (status, _) = common::get(
        &ctx.app,
        &format!("/dashboard/{}", Uuid::new_v4()),
        Some(&head),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}
