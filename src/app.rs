use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, dashboard, health, issues, projects, tasks, team_updates, teams, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/", post(users::create_user))
        .route("/:id", get(users::get_user))
        .route("/:id", put(users::update_user));

    let project_routes = Router::new()
        .route("/", get(projects::list_projects))
        .route("/", post(projects::create_project))
        .route("/:id", get(projects::get_project))
        .route("/:id", put(projects::update_project))
        .route("/:id", delete(projects::delete_project));

    let team_routes = Router::new()
        .route("/", get(teams::list_teams))
        .route("/", post(teams::create_team))
        .route("/:id", get(teams::get_team))
        .route("/:id", put(teams::update_team))
        .route("/:id", delete(teams::delete_team))
        .route("/:id/members", post(teams::add_member))
        .route("/:id/members/:user_id", delete(teams::remove_member));

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks))
        .route("/", post(tasks::create_task))
        .route("/:id", get(tasks::get_task))
        .route("/:id", put(tasks::update_task))
        .route("/:id", delete(tasks::delete_task));

    let issue_routes = Router::new()
        .route("/", get(issues::list_issues))
        .route("/", post(issues::create_issue))
        .route("/:id", get(issues::get_issue))
        .route("/:id", put(issues::update_issue))
        .route("/:id", delete(issues::delete_issue));

    let team_update_routes = Router::new()
        .route("/", get(team_updates::list_team_updates))
        .route("/", post(team_updates::create_team_update))
        .route("/:id", get(team_updates::get_team_update))
        .route("/:id", put(team_updates::update_team_update))
        .route("/:id", delete(team_updates::delete_team_update));

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/dashboard/:user_id", get(dashboard::get_dashboard))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/teams", team_routes)
        .nest("/tasks", task_routes)
        .nest("/issues", issue_routes)
        .nest("/team-updates", team_update_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
