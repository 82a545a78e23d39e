/// Project roster entries and their database operations
///
/// A project's team is the ordered list of its `project_members` rows. Order is
/// insertion order, tracked by the `position` sequence column. Whether a
/// change to the roster is allowed is decided by
/// [`crate::auth::authorization`]; the functions here only persist it.
///
/// Every function takes any executor, so roster changes can run inside the
/// transaction that holds [`crate::models::project::Project::lock_roster`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     email TEXT NOT NULL,
///     role project_role NOT NULL DEFAULT 'viewer',
///     position BIGSERIAL NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use uuid::Uuid;

/// Role of a user within one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Full control, including the roster and destructive board operations
    Owner,

    /// Can create and edit tasks within their month
    Editor,

    /// Read-only
    Viewer,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::Editor => "editor",
            ProjectRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a project's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub project_id: Uuid,

    pub user_id: Uuid,

    /// Email at the time the member was added
    pub email: String,

    pub role: ProjectRole,

    /// Insertion order within the roster
    #[serde(skip_serializing, default)]
    pub position: i64,

    pub created_at: DateTime<Utc>,
}

impl TeamMember {
    /// Builds an unsaved roster entry
    pub fn new(project_id: Uuid, user_id: Uuid, email: &str, role: ProjectRole) -> Self {
        Self {
            project_id,
            user_id,
            email: email.to_string(),
            role,
            position: 0,
            created_at: Utc::now(),
        }
    }

    /// Loads a project's roster in insertion order
    ///
    /// An empty result means the project does not exist (every project has
    /// at least one owner).
    pub async fn list_by_project<'e>(
        executor: impl PgExecutor<'e>,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let members = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT project_id, user_id, email, role, position, created_at
            FROM project_members
            WHERE project_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await?;

        Ok(members)
    }

    /// Appends a member to the end of the roster
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the user is already on the roster
    pub async fn add<'e>(
        executor: impl PgExecutor<'e>,
        project_id: Uuid,
        user_id: Uuid,
        email: &str,
        role: ProjectRole,
    ) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, email, role)
            VALUES ($1, $2, $3, $4)
            RETURNING project_id, user_id, email, role, position, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(email)
        .bind(role)
        .fetch_one(executor)
        .await?;

        Ok(member)
    }

    /// Sets a member's role, returning the updated entry if the member exists
    pub async fn update_role<'e>(
        executor: impl PgExecutor<'e>,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            UPDATE project_members
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, email, role, position, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await?;

        Ok(member)
    }

    /// Removes a member from the roster
    ///
    /// Returns true if a row was deleted.
    pub async fn remove<'e>(
        executor: impl PgExecutor<'e>,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
