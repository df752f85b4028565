use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{Principal, Role, Scope};
use crate::errors::{AppError, AppResult};
use crate::jwt::JwtConfig;
use crate::models::user::{
    AuthResponse, DbUser, LoginRequest, User, UserCreateRequest, UserUpdateRequest,
};
use crate::utils::{hash_password, utc_now, verify_password};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, manager_id, created_at, updated_at";

pub async fn authenticate(
    pool: &SqlitePool,
    jwt: &JwtConfig,
    payload: LoginRequest,
) -> AppResult<AuthResponse> {
    let db_user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(&payload.email)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    let password_ok = verify_password(&payload.password, &db_user.password_hash)?;
    if !password_ok {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let token = jwt.encode(db_user.id, db_user.role)?;

    Ok(AuthResponse {
        token,
        user: db_user.into(),
    })
}

pub async fn me(pool: &SqlitePool, principal: &Principal) -> AppResult<User> {
    Ok(fetch_user(pool, principal.id).await?.into())
}

/// Account provisioning is HEAD-only (the admin flow).
pub async fn create(
    pool: &SqlitePool,
    principal: &Principal,
    payload: UserCreateRequest,
) -> AppResult<User> {
    if !principal.role.is_head() {
        return Err(AppError::forbidden("only HEAD may create accounts"));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    validate_manager_assignment(pool, payload.role, payload.manager_id).await?;
    ensure_email_available(pool, &payload.email).await?;

    let password_hash = hash_password(&payload.password)?;
    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, manager_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(payload.role)
    .bind(payload.manager_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(fetch_user(pool, id).await?.into())
}

/// HEAD sees the whole directory; a MANAGER their reports plus themselves;
/// an EMPLOYEE only themselves.
pub async fn list(pool: &SqlitePool, principal: &Principal) -> AppResult<Vec<User>> {
    let rows = match principal.role {
        Role::Head => {
            sqlx::query_as::<_, DbUser>(&format!(
                "SELECT {} FROM users ORDER BY name ASC",
                USER_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
        Role::Manager => {
            sqlx::query_as::<_, DbUser>(&format!(
                "SELECT {} FROM users WHERE id = ? OR manager_id = ? ORDER BY name ASC",
                USER_COLUMNS
            ))
            .bind(principal.id)
            .bind(principal.id)
            .fetch_all(pool)
            .await?
        }
        Role::Employee => vec![fetch_user(pool, principal.id).await?],
    };

    Ok(rows.into_iter().map(User::from).collect())
}

pub async fn get(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<User> {
    let user = fetch_user(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;

    let allowed = scope.role().is_head() || id == principal.id || scope.manages(id);
    if !allowed {
        return Err(AppError::forbidden("not allowed to view this user"));
    }

    Ok(user.into())
}

/// Manager reassignment, HEAD-only.
pub async fn update(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    payload: UserUpdateRequest,
) -> AppResult<User> {
    if !principal.role.is_head() {
        return Err(AppError::forbidden("only HEAD may reassign managers"));
    }

    let user = fetch_user(pool, id).await?;
    validate_manager_assignment(pool, user.role, payload.manager_id).await?;

    sqlx::query("UPDATE users SET manager_id = ?, updated_at = ? WHERE id = ?")
        .bind(payload.manager_id)
        .bind(utc_now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(fetch_user(pool, id).await?.into())
}

/// Only EMPLOYEE or MANAGER may carry a manager, and the manager must
/// resolve to a MANAGER or HEAD account.
async fn validate_manager_assignment(
    pool: &SqlitePool,
    role: Role,
    manager_id: Option<Uuid>,
) -> AppResult<()> {
    let Some(manager_id) = manager_id else {
        return Ok(());
    };

    if !role.can_lead() {
        return Err(AppError::bad_request("a HEAD account cannot have a manager"));
    }

    let manager_role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(manager_id)
        .fetch_optional(pool)
        .await?;
    match manager_role {
        None => Err(AppError::not_found("manager not found")),
        Some(Role::Employee) => Err(AppError::bad_request("manager must be a MANAGER or HEAD")),
        Some(_) => Ok(()),
    }
}

async fn ensure_email_available(pool: &SqlitePool, email: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    Ok(())
}

async fn fetch_user(pool: &SqlitePool, id: Uuid) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}
