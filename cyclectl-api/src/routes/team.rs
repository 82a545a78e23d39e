/// Roster endpoints
///
/// Each change runs in one transaction holding the project row lock. The
/// authorization matrix decides against the roster read under that lock.
///
/// # Endpoints
///
/// - `POST /v1/projects/:id/team/members` - Invite a user by email
/// - `PUT /v1/projects/:id/team/members/:user_id` - Change a member's role
/// - `DELETE /v1/projects/:id/team/members/:user_id` - Remove a member

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use cyclectl_shared::{
    auth::{
        authorization::{
            authorize, authorize_invite, authorize_removal, authorize_role_change, Action,
            Roster,
        },
        middleware::AuthContext,
    },
    models::{
        project::Project,
        team_member::{ProjectRole, TeamMember},
        user::User,
    },
};
use serde::Deserialize;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

/// Invite request
///
/// `role` is required when the caller is an owner and ignored otherwise.
#[derive(Debug, Deserialize, Validate)]
pub struct InviteMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub role: Option<ProjectRole>,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: ProjectRole,
}

/// Invite a member
///
/// The invitee must have signed in at least once.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member
/// - `404 Not Found`: No such project or no user with that email
/// - `409 Conflict`: Invitee is already on the roster
/// - `422 Unprocessable Entity`: Owner did not name a role
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<InviteMemberRequest>,
) -> ApiResult<(StatusCode, Json<TeamMember>)> {
    req.validate()?;

    let mut tx = state.db.begin().await?;
    let roster = lock_roster(&mut tx, project_id).await?;
    authorize(&roster, auth.user_id, Action::InviteMember)?;

    let invitee = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let role = authorize_invite(&roster, auth.user_id, invitee.id, req.role)?;

    let member = TeamMember::add(&mut *tx, project_id, invitee.id, &invitee.email, role).await?;
    Project::touch(&mut *tx, project_id).await?;
    tx.commit().await?;

    tracing::info!(
        project_id = %project_id,
        invited_by = %auth.user_id,
        user_id = %member.user_id,
        role = %member.role,
        "Member invited"
    );

    Ok((StatusCode::CREATED, Json(member)))
}

/// Locked roster of a project, or 404
async fn lock_roster(conn: &mut PgConnection, project_id: Uuid) -> ApiResult<Roster> {
    Project::lock_roster(conn, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

/// Change a member's role
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner
/// - `404 Not Found`: No such project or member
/// - `409 Conflict`: Would demote the last owner
pub async fn change_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ChangeRoleRequest>,
) -> ApiResult<Json<TeamMember>> {
    let mut tx = state.db.begin().await?;
    let roster = lock_roster(&mut tx, project_id).await?;
    authorize_role_change(&roster, auth.user_id, user_id, req.role)?;

    let member = TeamMember::update_role(&mut *tx, project_id, user_id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;
    Project::touch(&mut *tx, project_id).await?;
    tx.commit().await?;

    tracing::info!(
        project_id = %project_id,
        changed_by = %auth.user_id,
        user_id = %user_id,
        role = %req.role,
        "Member role changed"
    );

    Ok(Json(member))
}

/// Remove a member
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner
/// - `404 Not Found`: No such project or member
/// - `409 Conflict`: Would remove the last owner
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let mut tx = state.db.begin().await?;
    let roster = lock_roster(&mut tx, project_id).await?;
    authorize_removal(&roster, auth.user_id, user_id)?;

    if !TeamMember::remove(&mut *tx, project_id, user_id).await? {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }
    Project::touch(&mut *tx, project_id).await?;
    tx.commit().await?;

    tracing::info!(
        project_id = %project_id,
        removed_by = %auth.user_id,
        user_id = %user_id,
        "Member removed"
    );

    Ok(StatusCode::NO_CONTENT)
}
