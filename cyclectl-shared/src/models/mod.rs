/// Database models for CycleCtl
///
/// Each model exposes associated async functions that take an explicit
/// `&PgPool`. None of them check permissions; handlers run the
/// authorization matrix first.
///
/// # Models
///
/// - `user`: Accounts, upserted on sign-in
/// - `project`: Projects and their roster
/// - `team_member`: Roster entries and project roles
/// - `task`: Board tasks
///
/// # Example
///
/// ```no_run
/// use cyclectl_shared::models::project::Project;
/// use cyclectl_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let projects = Project::list_for_member(&pool, user_id, None).await?;
/// # Ok(())
/// # }
/// ```

pub mod project;
pub mod task;
pub mod team_member;
pub mod user;
