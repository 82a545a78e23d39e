/// Task model and database operations
///
/// Tasks are the cards on a project's board. Each one sits in a month column
/// of a given year, ordered by `order_index`. The stored `status` is brought up
/// to date on every board read via [`Task::refresh_statuses`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     start_date DATE NOT NULL,
///     end_date DATE NOT NULL,
///     status task_status NOT NULL DEFAULT 'pending',
///     month board_month NOT NULL,
///     year INTEGER NOT NULL,
///     order_index INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tasks_date_range_check CHECK (start_date <= end_date)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use cyclectl_shared::board::{Month, TaskStatus};
/// use cyclectl_shared::models::task::{CreateTask, Task};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     project_id,
///     user_id,
///     title: "Write launch post".to_string(),
///     description: String::new(),
///     start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
///     status: TaskStatus::Pending,
///     month: Month::March,
///     year: 2025,
/// })
/// .await?;
///
/// // Appended to the end of March
/// println!("order_index = {}", task.order_index);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::board::status::{derive_status, TaskStatus};
use crate::board::transfer::ImportedTask;
use crate::board::Month;

/// A card on a project board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub project_id: Uuid,

    /// Last user to create or edit the task
    pub user_id: Uuid,

    pub title: String,

    pub description: String,

    pub start_date: NaiveDate,

    /// Inclusive
    pub end_date: NaiveDate,

    pub status: TaskStatus,

    /// Board column
    pub month: Month,

    pub year: i32,

    /// Position within the month column
    pub order_index: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TaskStatus,
    pub month: Month,
    pub year: i32,
}

/// Partial edit of a task; `None` leaves the field as it is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    pub month: Option<Month>,
    pub year: Option<i32>,
    pub order_index: Option<i32>,
}

/// Tasks of one month column, in display order
#[derive(Debug, Clone, Serialize)]
pub struct MonthSchedule {
    pub month: Month,
    pub tasks: Vec<Task>,
}

const TASK_COLUMNS: &str = "id, project_id, user_id, title, description, start_date, end_date, \
                            status, month, year, order_index, created_at, updated_at";

impl Task {
    /// True if applying `changes` would put the task in another month or year
    pub fn moves_month(&self, changes: &UpdateTask) -> bool {
        changes.month.map_or(false, |m| m != self.month)
            || changes.year.map_or(false, |y| y != self.year)
    }

    /// Returns a copy of this task with `changes` applied
    pub fn with_changes(&self, changes: &UpdateTask) -> Task {
        let mut next = self.clone();

        if let Some(title) = &changes.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = &changes.description {
            next.description = description.clone();
        }
        if let Some(start) = changes.start_date {
            next.start_date = start;
        }
        if let Some(end) = changes.end_date {
            next.end_date = end;
        }
        if let Some(status) = changes.status {
            next.status = status;
        }
        if let Some(month) = changes.month {
            next.month = month;
        }
        if let Some(year) = changes.year {
            next.year = year;
        }
        if let Some(order_index) = changes.order_index {
            next.order_index = order_index;
        }

        next
    }

    /// Creates a task at the end of its month column
    ///
    /// # Errors
    ///
    /// Returns an error if the date range check fails or the database
    /// operation fails
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (project_id, user_id, title, description, start_date, end_date,
                               status, month, year, order_index)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE(MAX(order_index) + 1, 0)
            FROM tasks
            WHERE project_id = $1 AND month = $8 AND year = $9
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.title.trim())
        .bind(data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.status)
        .bind(data.month)
        .bind(data.year)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a project's tasks by month then display order
    ///
    /// `year` restricts the result to one year.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        year: Option<i32>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE project_id = $1
              AND ($2::INTEGER IS NULL OR year = $2)
            ORDER BY year ASC, month ASC, order_index ASC, created_at ASC
            "#
        ))
        .bind(project_id)
        .bind(year)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Writes every mutable field of `task` and records `actor` as last editor
    ///
    /// Returns None if the task no longer exists.
    pub async fn update(pool: &PgPool, task: &Task, actor: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let updated = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = $2,
                description = $3,
                start_date = $4,
                end_date = $5,
                status = $6,
                month = $7,
                year = $8,
                order_index = $9,
                user_id = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.start_date)
        .bind(task.end_date)
        .bind(task.status)
        .bind(task.month)
        .bind(task.year)
        .bind(task.order_index)
        .bind(actor)
        .fetch_optional(pool)
        .await?;

        Ok(updated)
    }

    /// Persists a derived status
    pub async fn update_status(pool: &PgPool, id: Uuid, status: TaskStatus) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the position of a task inside a given month column
    ///
    /// Only touches the row if it belongs to that project, month and year.
    pub async fn update_order_index(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
        month: Month,
        year: i32,
        order_index: i32,
        actor: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET order_index = $5, user_id = $6, updated_at = NOW()
            WHERE id = $1 AND project_id = $2 AND month = $3 AND year = $4
            "#,
        )
        .bind(id)
        .bind(project_id)
        .bind(month)
        .bind(year)
        .bind(order_index)
        .bind(actor)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a task, returning it if it existed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let deleted = sqlx::query_as::<_, Task>(&format!(
            "DELETE FROM tasks WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(deleted)
    }

    /// Deletes every task in a project, returning how many were removed
    pub async fn delete_by_project(pool: &PgPool, project_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Inserts validated import records, each at the end of its month
    ///
    /// Records are inserted one by one in input order; a failure part-way
    /// leaves the earlier inserts in place.
    pub async fn import_many(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        records: &[ImportedTask],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut created = Vec::with_capacity(records.len());

        for record in records {
            let task = Self::create(
                pool,
                CreateTask {
                    project_id,
                    user_id,
                    title: record.title.clone(),
                    description: record.description.clone(),
                    start_date: record.start,
                    end_date: record.end,
                    status: record.status,
                    month: record.month,
                    year: record.year,
                },
            )
            .await?;
            created.push(task);
        }

        Ok(created)
    }

    /// Re-derives the status of each task for `today`, persisting only the
    /// tasks whose status changed
    ///
    /// Returns the number of tasks written.
    pub async fn refresh_statuses(
        pool: &PgPool,
        tasks: &mut [Task],
        today: NaiveDate,
    ) -> Result<usize, sqlx::Error> {
        let mut written = 0;

        for task in tasks.iter_mut() {
            let derived = derive_status(task.start_date, task.end_date, today, task.status);
            if derived.changed {
                tracing::debug!(
                    task_id = %task.id,
                    from = %task.status,
                    to = %derived.status,
                    "Persisting derived task status"
                );
                Self::update_status(pool, task.id, derived.status).await?;
                task.status = derived.status;
                written += 1;
            }
        }

        Ok(written)
    }
}

/// Groups tasks into month columns, keeping their order within each month
///
/// Months without tasks are omitted; columns come out in calendar order.
pub fn group_by_month(tasks: Vec<Task>) -> Vec<MonthSchedule> {
    let mut schedule: Vec<MonthSchedule> = Vec::new();

    for month in Month::ALL {
        let column: Vec<Task> = tasks.iter().filter(|t| t.month == month).cloned().collect();
        if !column.is_empty() {
            schedule.push(MonthSchedule { month, tasks: column });
        }
    }

    schedule
}
