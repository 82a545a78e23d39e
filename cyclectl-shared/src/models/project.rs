/// Project model and database operations
///
/// A project owns a roster ([`TeamMember`]) and a board of tasks. The creator
/// becomes the sole owner; the project row and that first roster entry are
/// written by a single statement so a project can never exist without an
/// owner.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(200) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use cyclectl_shared::models::project::{CreateProject, Project};
/// use sqlx::{PgConnection, PgExecutor, PgPool};
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create(&pool, CreateProject {
///     name: "Launch".to_string(),
///     owner_id: user_id,
///     owner_email: "ada@example.com".to_string(),
/// })
/// .await?;
///
/// let roster = Project::roster(&pool, project.id).await?;
/// assert!(roster.is_sole_owner(user_id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::team_member::TeamMember;
use crate::auth::authorization::Roster;

/// A project
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    pub name: String,

    /// Creator of record
    ///
    /// Not kept in step with roster roles and never used for authorization.
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// A project together with its roster, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithTeam {
    #[serde(flatten)]
    pub project: Project,

    pub team: Vec<TeamMember>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,

    /// Creator; becomes the sole owner
    pub owner_id: Uuid,

    pub owner_email: String,
}

impl Project {
    /// Creates a project and its owner roster entry in one statement
    ///
    /// # Errors
    ///
    /// Returns an error if the creator does not exist or the database
    /// operation fails
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            WITH new_project AS (
                INSERT INTO projects (name, owner_id)
                VALUES ($1, $2)
                RETURNING id, name, owner_id, created_at, updated_at
            ), owner_member AS (
                INSERT INTO project_members (project_id, user_id, email, role)
                SELECT id, owner_id, $3, 'owner'
                FROM new_project
            )
            SELECT id, name, owner_id, created_at, updated_at
            FROM new_project
            "#,
        )
        .bind(data.name.trim())
        .bind(data.owner_id)
        .bind(data.owner_email)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, owner_id, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists the projects `user_id` is a member of, newest first
    ///
    /// `name` narrows the result to projects with that name
    /// (case-insensitive).
    pub async fn list_for_member(
        pool: &PgPool,
        user_id: Uuid,
        name: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.owner_id, p.created_at, p.updated_at
            FROM projects p
            JOIN project_members m ON m.project_id = p.id
            WHERE m.user_id = $1
              AND ($2::TEXT IS NULL OR LOWER(p.name) = LOWER($2))
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(name.map(str::trim))
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Loads the project's roster in insertion order
    pub async fn roster(pool: &PgPool, project_id: Uuid) -> Result<Roster, sqlx::Error> {
        let members = TeamMember::list_by_project(pool, project_id).await?;
        Ok(Roster::new(members))
    }

    /// Locks the project row and loads its roster
    ///
    /// Call inside a transaction. Concurrent roster changes to the same
    /// project queue on the row lock, so the roster returned here is the one
    /// the change is applied to. Returns `None` if the project does not
    /// exist.
    pub async fn lock_roster(
        conn: &mut PgConnection,
        project_id: Uuid,
    ) -> Result<Option<Roster>, sqlx::Error> {
        let locked = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM projects
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await?;

        if locked.is_none() {
            return Ok(None);
        }

        let members = TeamMember::list_by_project(&mut *conn, project_id).await?;
        Ok(Some(Roster::new(members)))
    }

    /// Bumps `updated_at`, called after roster or board changes
    pub async fn touch<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
