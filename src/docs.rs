use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::Role;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::login,
        routes::auth::me,
        routes::users::list_users,
        routes::users::create_user,
        routes::users::get_user,
        routes::users::update_user,
        routes::projects::list_projects,
        routes::projects::create_project,
        routes::projects::get_project,
        routes::projects::update_project,
        routes::projects::delete_project,
        routes::teams::list_teams,
        routes::teams::create_team,
        routes::teams::get_team,
        routes::teams::update_team,
        routes::teams::delete_team,
        routes::teams::add_member,
        routes::teams::remove_member,
        routes::tasks::list_tasks,
        routes::tasks::create_task,
        routes::tasks::get_task,
        routes::tasks::update_task,
        routes::tasks::delete_task,
        routes::issues::list_issues,
        routes::issues::create_issue,
        routes::issues::get_issue,
        routes::issues::update_issue,
        routes::issues::delete_issue,
        routes::team_updates::list_team_updates,
        routes::team_updates::create_team_update,
        routes::team_updates::get_team_update,
        routes::team_updates::update_team_update,
        routes::team_updates::delete_team_update,
        routes::dashboard::get_dashboard,
        routes::health::health,
    ),
    components(
        schemas(
            Role,
            models::user::User,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::UserCreateRequest,
            models::user::UserUpdateRequest,
            models::project::Project,
            models::project::ProjectStatus,
            models::project::ProjectCreateRequest,
            models::project::ProjectUpdateRequest,
            models::team::Team,
            models::team::TeamDetail,
            models::team::TeamMember,
            models::team::TeamCreateRequest,
            models::team::TeamUpdateRequest,
            models::team::TeamMemberAddRequest,
            models::task::Task,
            models::task::TaskStatus,
            models::task::TaskPriority,
            models::task::TaskType,
            models::task::TaskCreateRequest,
            models::task::TaskUpdateRequest,
            models::issue::Issue,
            models::issue::IssueStatus,
            models::issue::IssueCreateRequest,
            models::issue::IssueUpdateRequest,
            models::team_update::TeamUpdate,
            models::team_update::TeamUpdateCreateRequest,
            models::team_update::TeamUpdateEditRequest,
            routes::dashboard::Dashboard,
            routes::health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "Account administration"),
        (name = "Projects", description = "Project management"),
        (name = "Teams", description = "Team and membership management"),
        (name = "Tasks", description = "Task management"),
        (name = "Issues", description = "Issue tracking"),
        (name = "TeamUpdates", description = "Team progress updates"),
        (name = "Dashboard", description = "Per-user workload view"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_routes() -> Router {
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .persist_authorization(true);

    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(swagger_config)
        .into()
}
