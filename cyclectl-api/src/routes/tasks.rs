/// Task board endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects/:id/tasks[?year=]` - Board grouped by month
/// - `POST /v1/projects/:id/tasks` - Create a task
/// - `DELETE /v1/projects/:id/tasks` - Clear the board
/// - `PUT /v1/projects/:id/tasks/reorder` - Reorder one month column
/// - `POST /v1/projects/:id/tasks/import` - Bulk import
/// - `GET /v1/projects/:id/tasks/export[?year=]` - JSON export
/// - `PUT /v1/tasks/:id` - Edit, move, or change status
/// - `DELETE /v1/tasks/:id` - Delete one task
///
/// Statuses are re-derived from the dates whenever the board is read, so the
/// list endpoint may write.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::projects::load_project,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use cyclectl_shared::{
    auth::{
        authorization::{authorize, authorize_task_update, Action},
        middleware::AuthContext,
    },
    board::{
        transfer::{
            export_file_name, validate_batch, ExportRecord, SkippedRecord, MAX_TITLE_LENGTH,
            MAX_YEAR, MIN_YEAR,
        },
        Month, TaskStatus,
    },
    models::{
        project::Project,
        task::{group_by_month, CreateTask, MonthSchedule, Task, UpdateTask},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;
use validator::Validate;

/// Year filter shared by list and export
#[derive(Debug, Deserialize)]
pub struct YearQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

/// Board response
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub year: i32,

    /// Project name
    pub project: String,

    /// Month columns that have at least one task, in calendar order
    pub schedule: Vec<MonthSchedule>,
}

/// Create task request
///
/// `month` and `year` default to those of `start_date`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    pub status: Option<TaskStatus>,

    pub month: Option<Month>,

    pub year: Option<i32>,
}

/// Reorder request: the full column order for one month
#[derive(Debug, Deserialize, Validate)]
pub struct ReorderRequest {
    pub month: Month,

    pub year: i32,

    #[validate(length(min = 1, message = "At least one task is required"))]
    pub task_ids: Vec<Uuid>,
}

/// Import response
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: Vec<SkippedRecord>,
    pub tasks: Vec<Task>,
}

fn current_year() -> i32 {
    Utc::now().year()
}

fn check_year(year: i32) -> ApiResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ApiError::validation(
            "year",
            format!("Year must be between {} and {}", MIN_YEAR, MAX_YEAR),
        ));
    }
    Ok(())
}

fn check_dates(start: NaiveDate, end: NaiveDate) -> ApiResult<()> {
    if start > end {
        return Err(ApiError::validation("end_date", "End date must not be before start date"));
    }
    Ok(())
}

fn check_title(title: &str) -> ApiResult<()> {
    if title.trim().is_empty() {
        return Err(ApiError::validation("title", "Title must not be blank"));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::validation(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LENGTH),
        ));
    }
    Ok(())
}

async fn load_task(state: &AppState, task_id: Uuid) -> ApiResult<Task> {
    Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// List a project's board for one year
///
/// ```text
/// GET /v1/projects/:id/tasks?year=2025
/// ```
///
/// Any member may read. Tasks whose derived status differs from the stored
/// one are written back before the response is built.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let (project, roster) = load_project(&state, project_id).await?;
    authorize(&roster, auth.user_id, Action::ViewProject)?;

    let year = query.year.unwrap_or_else(current_year);
    let mut tasks = Task::list_by_project(&state.db, project_id, Some(year)).await?;

    let today = Utc::now().date_naive();
    let refreshed = Task::refresh_statuses(&state.db, &mut tasks, today).await?;
    if refreshed > 0 {
        tracing::debug!(project_id = %project_id, refreshed, "Task statuses refreshed");
    }

    Ok(Json(TaskListResponse {
        year,
        project: project.name,
        schedule: group_by_month(tasks),
    }))
}

/// Create a task at the end of its month column
///
/// # Errors
///
/// - `403 Forbidden`: Caller is a viewer or not a member
/// - `422 Unprocessable Entity`: Blank title, end before start, bad year
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;
    check_title(&req.title)?;
    check_dates(req.start_date, req.end_date)?;

    let year = req.year.unwrap_or_else(|| req.start_date.year());
    check_year(year)?;

    let (_, roster) = load_project(&state, project_id).await?;
    authorize(&roster, auth.user_id, Action::CreateTask)?;

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id,
            user_id: auth.user_id,
            title: req.title,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            status: req.status.unwrap_or(TaskStatus::Pending),
            month: req.month.unwrap_or_else(|| Month::of(req.start_date)),
            year,
        },
    )
    .await?;
    Project::touch(&state.db, project_id).await?;

    tracing::info!(
        project_id = %project_id,
        task_id = %task.id,
        month = %task.month,
        year = task.year,
        "Task created"
    );

    Ok((StatusCode::CREATED, Json(task)))
}

/// Delete every task on the board
///
/// Owner only. Returns `{ "deleted": <count> }`.
pub async fn clear_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<JsonValue>> {
    let (_, roster) = load_project(&state, project_id).await?;
    authorize(&roster, auth.user_id, Action::ClearTasks)?;

    let deleted = Task::delete_by_project(&state.db, project_id).await?;
    Project::touch(&state.db, project_id).await?;

    tracing::info!(project_id = %project_id, cleared_by = %auth.user_id, deleted, "Board cleared");

    Ok(Json(json!({ "deleted": deleted })))
}

/// Set the order of one month column
///
/// `task_ids[i]` gets `order_index = i`. Ids that are not in the given
/// month and year of this project are ignored. Returns
/// `{ "updated": <count> }`.
pub async fn reorder_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<JsonValue>> {
    req.validate()?;

    let (_, roster) = load_project(&state, project_id).await?;
    authorize(&roster, auth.user_id, Action::EditTask)?;

    let mut updated = 0usize;
    for (index, task_id) in req.task_ids.iter().enumerate() {
        let order_index = i32::try_from(index)
            .map_err(|_| ApiError::validation("task_ids", "Too many tasks"))?;

        if Task::update_order_index(
            &state.db,
            project_id,
            *task_id,
            req.month,
            req.year,
            order_index,
            auth.user_id,
        )
        .await?
        {
            updated += 1;
        }
    }
    Project::touch(&state.db, project_id).await?;

    tracing::debug!(
        project_id = %project_id,
        month = %req.month,
        year = req.year,
        updated,
        "Month column reordered"
    );

    Ok(Json(json!({ "updated": updated })))
}

/// Bulk import tasks
///
/// ```text
/// POST /v1/projects/:id/tasks/import
///
/// [{ "title": "Plan", "start": 3, "end": 9, "month": "March", "year": 2025 }]
/// ```
///
/// Invalid records are skipped and reported; accepted ones are appended to
/// their month columns in input order.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an owner
/// - `422 Unprocessable Entity`: Empty batch or no valid record
pub async fn import_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(records): Json<Vec<JsonValue>>,
) -> ApiResult<(StatusCode, Json<ImportResponse>)> {
    let (_, roster) = load_project(&state, project_id).await?;
    authorize(&roster, auth.user_id, Action::ImportTasks)?;

    let batch = validate_batch(&records)?;

    let tasks = Task::import_many(&state.db, project_id, auth.user_id, &batch.accepted).await?;
    Project::touch(&state.db, project_id).await?;

    tracing::info!(
        project_id = %project_id,
        imported = tasks.len(),
        skipped = batch.skipped.len(),
        "Tasks imported"
    );

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            imported: tasks.len(),
            skipped: batch.skipped,
            tasks,
        }),
    ))
}

/// Export one year of the board as a JSON attachment
///
/// The body is an array in the import format, ordered by month and then
/// column position. Statuses are brought up to date first, as on the board.
pub async fn export_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<YearQuery>,
) -> ApiResult<impl IntoResponse> {
    let (project, roster) = load_project(&state, project_id).await?;
    authorize(&roster, auth.user_id, Action::ExportTasks)?;

    let year = query.year.unwrap_or_else(current_year);
    let mut tasks = Task::list_by_project(&state.db, project_id, Some(year)).await?;
    Task::refresh_statuses(&state.db, &mut tasks, Utc::now().date_naive()).await?;
    let records: Vec<ExportRecord> = tasks.iter().map(ExportRecord::from).collect();

    let body = serde_json::to_vec_pretty(&records)
        .map_err(|e| ApiError::InternalError(format!("Export serialization failed: {}", e)))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(&project.name, year)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Edit a task
///
/// ```text
/// PUT /v1/tasks/:id
///
/// { "status": "completed" }
/// ```
///
/// Omitted fields keep their value. Changing `month` or `year` is a move and
/// needs an owner; every other edit needs an editor.
///
/// # Errors
///
/// - `403 Forbidden`: Role too low for the edit
/// - `404 Not Found`: No such task
/// - `422 Unprocessable Entity`: Resulting task is invalid
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(changes): Json<UpdateTask>,
) -> ApiResult<Json<Task>> {
    let task = load_task(&state, task_id).await?;
    let roster = Project::roster(&state.db, task.project_id).await?;

    authorize_task_update(&roster, auth.user_id, task.moves_month(&changes))?;

    let next = task.with_changes(&changes);
    check_title(&next.title)?;
    check_dates(next.start_date, next.end_date)?;
    check_year(next.year)?;

    let updated = Task::update(&state.db, &next, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Project::touch(&state.db, updated.project_id).await?;

    tracing::debug!(task_id = %task_id, edited_by = %auth.user_id, "Task updated");

    Ok(Json(updated))
}

/// Delete one task
///
/// Owner only. Returns `{ "deleted": <task> }`.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<JsonValue>> {
    let task = load_task(&state, task_id).await?;
    let roster = Project::roster(&state.db, task.project_id).await?;

    authorize(&roster, auth.user_id, Action::DeleteTask)?;

    let deleted = Task::delete(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Project::touch(&state.db, deleted.project_id).await?;

    tracing::info!(task_id = %task_id, deleted_by = %auth.user_id, "Task deleted");

    Ok(Json(json!({ "deleted": deleted })))
}
