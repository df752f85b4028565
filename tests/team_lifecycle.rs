use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

mod common;

struct Org {
    head: String,
    maya: String,
    devi: String,
    maya_id: Uuid,
    devi_id: Uuid,
    eko_id: Uuid,
    project_id: String,
}

async fn seed_org(ctx: &common::TestApp) -> Result<Org> {
    common::seed_user(&ctx.pool, "Head", "head@test.dev", "password123", "HEAD", None).await?;
    let maya_id =
        common::seed_user(&ctx.pool, "Maya", "maya@test.dev", "password123", "MANAGER", None)
            .await?;
    let devi_id = common::seed_user(
        &ctx.pool,
        "Devi",
        "devi@test.dev",
        "password123",
        "EMPLOYEE",
        Some(maya_id),
    )
    .await?;
    let eko_id = common::seed_user(
        &ctx.pool,
        "Eko",
        "eko@test.dev",
        "password123",
        "EMPLOYEE",
        Some(maya_id),
    )
    .await?;

    let head = common::login(&ctx.app, "head@test.dev", "password123").await?;
    let (status, project) = common::post(
        &ctx.app,
        "/projects",
        Some(&head),
        json!({ "name": "Rollout", "start_date": "2026-01-01T00:00:00Z" }),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "project create failed");
    let project_id = common::id_of(&project)?;

    Ok(Org {
        maya: common::login(&ctx.app, "maya@test.dev", "password123").await?,
        devi: common::login(&ctx.app, "devi@test.dev", "password123").await?,
        head,
        maya_id,
        devi_id,
        eko_id,
        project_id,
    })
}

fn member_user_ids(team: &Value) -> Vec<String> {
    team.get("members")
        .and_then(Value::as_array)
        .unwrap()
        .iter()
        .filter_map(|m| m.get("user_id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn create_team_requires_head_and_projects() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    // non-HEAD creation denied
    let (status, _) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.maya),
        json!({ "name": "Crew", "leader_id": org.maya_id, "project_ids": [org.project_id] }),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // at least one project required
    let (status, _) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({ "name": "Crew", "leader_id": org.maya_id, "project_ids": [] }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // unknown project rolls the whole create back
    let (status, _) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({
            "name": "Crew",
            "leader_id": org.maya_id,
            "project_ids": [Uuid::new_v4()]
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, team) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({ "name": "Crew", "leader_id": org.maya_id, "project_ids": [org.project_id] }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    // the leader is enrolled as a member automatically
    assert_eq!(member_user_ids(&team), vec![org.maya_id.to_string()]);
    assert_eq!(
        team.get("project_ids").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );

    Ok(())
}

#[tokio::test]
async fn leader_manages_members_but_not_leadership() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let (_, team) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({ "name": "Crew", "leader_id": org.maya_id, "project_ids": [org.project_id] }),
    )
    .await?;
    let team_id = common::id_of(&team)?;

    // the leader may add and remove members
    let (status, member) = common::post(
        &ctx.app,
        &format!("/teams/{}/members", team_id),
        Some(&org.maya),
        json!({ "user_id": org.devi_id }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        member.get("user_id").and_then(Value::as_str),
        Some(org.devi_id.to_string().as_str())
    );

    // adding the same member twice stays idempotent
    let (status, _) = common::post(
        &ctx.app,
        &format!("/teams/{}/members", team_id),
        Some(&org.maya),
        json!({ "user_id": org.devi_id }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    // a plain member cannot manage the roster
    let (status, _) = common::post(
        &ctx.app,
        &format!("/teams/{}/members", team_id),
        Some(&org.devi),
        json!({ "user_id": org.eko_id }),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the leader cannot hand leadership to someone else
    let (status, _) = common::put(
        &ctx.app,
        &format!("/teams/{}", team_id),
        Some(&org.maya),
        json!({ "leader_id": org.devi_id }),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // a rename by the leader is fine
    let (status, body) = common::put(
        &ctx.app,
        &format!("/teams/{}", team_id),
        Some(&org.maya),
        json!({ "name": "Delivery Crew" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("name").and_then(Value::as_str), Some("Delivery Crew"));

    Ok(())
}

#[tokio::test]
async fn head_reassigns_leadership_and_new_leader_joins() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let (_, team) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({ "name": "Crew", "leader_id": org.maya_id, "project_ids": [org.project_id] }),
    )
    .await?;
    let team_id = common::id_of(&team)?;

    let (status, body) = common::put(
        &ctx.app,
        &format!("/teams/{}", team_id),
        Some(&org.head),
        json!({ "leader_id": org.devi_id }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body.get("leader_id").and_then(Value::as_str),
        Some(org.devi_id.to_string().as_str())
    );
    // the new leader was enrolled, the old leader stays a member
    let members = member_user_ids(&body);
    assert!(members.contains(&org.devi_id.to_string()));
    assert!(members.contains(&org.maya_id.to_string()));

    Ok(())
}

#[tokio::test]
async fn leader_cannot_be_removed_from_roster() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let (_, team) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({ "name": "Crew", "leader_id": org.maya_id, "project_ids": [org.project_id] }),
    )
    .await?;
    let team_id = common::id_of(&team)?;

    let (status, _) = common::delete(
        &ctx.app,
        &format!("/teams/{}/members/{}", team_id, org.maya_id),
        Some(&org.head),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn team_visibility_is_membership_scoped_for_employees() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let (_, own_team) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({ "name": "Own", "leader_id": org.maya_id, "project_ids": [org.project_id] }),
    )
    .await?;
    let own_team_id = common::id_of(&own_team)?;
    common::post(
        &ctx.app,
        &format!("/teams/{}/members", own_team_id),
        Some(&org.head),
        json!({ "user_id": org.devi_id }),
    )
    .await?;

    let (_, other_team) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({ "name": "Other", "leader_id": org.eko_id, "project_ids": [org.project_id] }),
    )
    .await?;
    let other_team_id = common::id_of(&other_team)?;

    let (status, body) = common::get(&ctx.app, "/teams", Some(&org.devi)).await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t.get("id").and_then(Value::as_str))
        .collect();
    assert_eq!(ids, vec![own_team_id.as_str()]);

    let (status, _) = common::get(
        &ctx.app,
        &format!("/teams/{}", other_team_id),
        Some(&org.devi),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // HEAD and managers see all teams
    let (status, body) = common::get(&ctx.app, "/teams", Some(&org.maya)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    Ok(())
}

#[tokio::test]
async fn only_head_deletes_teams() -> Result<()> {
    let ctx = common::spawn().await?;
    let org = seed_org(&ctx).await?;

    let (_, team) = common::post(
        &ctx.app,
        "/teams",
        Some(&org.head),
        json!({ "name": "Crew", "leader_id": org.maya_id, "project_ids": [org.project_id] }),
    )
    .await?;
    let team_id = common::id_of(&team)?;

    let (status, _) =
        common::delete(&ctx.app, &format!("/teams/{}", team_id), Some(&org.maya)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        common::delete(&ctx.app, &format!("/teams/{}", team_id), Some(&org.head)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // membership rows are cascaded away with the team
    let members: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM team_members WHERE team_id = ?")
        .bind(Uuid::parse_str(&team_id)?)
        .fetch_one(&ctx.pool)
        .await?;
    assert_eq!(members, 0);

    Ok(())
}
