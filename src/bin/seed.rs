use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use uuid::Uuid;

use crewdesk::authz::Role;
use crewdesk::{db, utils};

#[derive(Parser, Debug)]
#[command(author, version, about = "crewdesk provisioning tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create (or keep) a HEAD account so the API has a first administrator
    Head {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Populate a small demo org: one manager, two employees, a project and a team
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenvy::dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    let pool = db::init().await?;
    db::migrate(&pool).await?;

    match cli.command {
        Commands::Head {
            name,
            email,
            password,
        } => {
            let id = ensure_user(&pool, &name, &email, &password, Role::Head, None).await?;
            println!("HEAD account ready: {} ({})", email, id);
        }
        Commands::Demo => {
            seed_demo(&pool).await?;
            println!("Demo data seeded");
        }
    }

    Ok(())
}

async fn ensure_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    manager_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let password_hash =
        utils::hash_password(password).with_context(|| format!("cannot hash password for {email}"))?;
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, manager_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(manager_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

async fn seed_demo(pool: &SqlitePool) -> anyhow::Result<()> {
    let head = ensure_user(pool, "Head Office", "head@crewdesk.local", "head-pass-1", Role::Head, None).await?;
    let manager = ensure_user(
        pool,
        "Maya Manager",
        "maya@crewdesk.local",
        "maya-pass-1",
        Role::Manager,
        Some(head),
    )
    .await?;
    let dev_a = ensure_user(
        pool,
        "Devi Developer",
        "devi@crewdesk.local",
        "devi-pass-1",
        Role::Employee,
        Some(manager),
    )
    .await?;
    let dev_b = ensure_user(
        pool,
        "Eko Engineer",
        "eko@crewdesk.local",
        "eko-pass-1",
        Role::Employee,
        Some(manager),
    )
    .await?;

    let now = Utc::now();
    let project_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO projects (id, name, description, start_date, end_date, status, creator_id, created_at, updated_at)
         VALUES (?, 'Demo Rollout', 'Internal demo project', ?, NULL, 'ACTIVE', ?, ?, ?)",
    )
    .bind(project_id)
    .bind(now)
    .bind(head)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let team_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO teams (id, name, description, leader_id, creator_id, created_at, updated_at)
         VALUES (?, 'Rollout Crew', 'Demo delivery team', ?, ?, ?, ?)",
    )
    .bind(team_id)
    .bind(manager)
    .bind(head)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    sqlx::query("INSERT INTO team_projects (team_id, project_id) VALUES (?, ?)")
        .bind(team_id)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    for member in [manager, dev_a, dev_b] {
        sqlx::query(
            "INSERT INTO team_members (id, user_id, team_id, joined_at)
             VALUES (?, ?, ?, ?) ON CONFLICT(user_id, team_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(member)
        .bind(team_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let task_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, priority, task_type, creator_id, assignee_id, due_date, created_at, updated_at)
         VALUES (?, 'Prepare rollout checklist', NULL, 'ONGOING', 'HIGH', 'TEAM', ?, ?, NULL, ?, ?)",
    )
    .bind(task_id)
    .bind(manager)
    .bind(dev_a)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    sqlx::query("INSERT INTO team_tasks (id, task_id, team_id, assigned_at) VALUES (?, ?, ?, ?)")
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(team_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(())
}
