/// Project endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects[?name=]` - Projects the caller is a member of
/// - `POST /v1/projects` - Create a project (caller becomes sole owner)
/// - `GET /v1/projects/:id` - Project with its roster

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use cyclectl_shared::{
    auth::{
        authorization::{authorize, Action, Roster},
        middleware::AuthContext,
    },
    models::{
        project::{CreateProject, Project, ProjectWithTeam},
        user::User,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}

/// List filter
#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    /// Exact project name, case-insensitive
    pub name: Option<String>,
}

/// Loads a project and its roster, or 404
pub(crate) async fn load_project(state: &AppState, project_id: Uuid) -> ApiResult<(Project, Roster)> {
    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let roster = Project::roster(&state.db, project_id).await?;

    Ok((project, roster))
}

/// List the caller's projects
///
/// ```text
/// GET /v1/projects?name=Launch
/// Authorization: Bearer <jwt_token>
/// ```
///
/// Returns every project the caller is on the roster of, newest first, each
/// with its team.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListProjectsQuery>,
) -> ApiResult<Json<Vec<ProjectWithTeam>>> {
    let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let projects = Project::list_for_member(&state.db, auth.user_id, name).await?;

    let mut result = Vec::with_capacity(projects.len());
    for project in projects {
        let team = Project::roster(&state.db, project.id).await?.into_members();
        result.push(ProjectWithTeam { project, team });
    }

    Ok(Json(result))
}

/// Create a project
///
/// ```text
/// POST /v1/projects
/// Authorization: Bearer <jwt_token>
///
/// { "name": "Launch" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Session user no longer exists
/// - `422 Unprocessable Entity`: Blank or overlong name
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectWithTeam>)> {
    req.validate()?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("name", "Name must not be blank"));
    }

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let project = Project::create(
        &state.db,
        CreateProject {
            name: name.to_string(),
            owner_id: user.id,
            owner_email: user.email,
        },
    )
    .await?;

    let team = Project::roster(&state.db, project.id).await?.into_members();

    tracing::info!(project_id = %project.id, owner_id = %auth.user_id, "Project created");

    Ok((StatusCode::CREATED, Json(ProjectWithTeam { project, team })))
}

/// Get a project with its roster
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member
/// - `404 Not Found`: No such project
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectWithTeam>> {
    let (project, roster) = load_project(&state, project_id).await?;
    authorize(&roster, auth.user_id, Action::ViewProject)?;

    Ok(Json(ProjectWithTeam {
        project,
        team: roster.into_members(),
    }))
}
