/// Task status and its date-driven derivation
///
/// A task's displayed status is recomputed from its date range every time a
/// board is read. Only tasks whose status actually changes are written back,
/// which keeps stored state in step with derived state without a scheduler.
///
/// # Rule
///
/// Evaluated in order:
///
/// 1. `completed` stays `completed`.
/// 2. If today is after the end date, the task is `overdue`.
/// 3. If the task is `pending` and today is within `[start, end]`, it is `in_progress`.
/// 4. Otherwise the status is unchanged.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use cyclectl_shared::board::status::{derive_status, TaskStatus};
///
/// let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
///
/// let result = derive_status(day(5), day(10), day(7), TaskStatus::Pending);
/// assert_eq!(result.status, TaskStatus::InProgress);
/// assert!(result.changed);
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet
    Pending,

    /// Inside its date range
    InProgress,

    /// Marked done by a user; never changed automatically
    Completed,

    /// End date has passed without completion
    Overdue,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Overdue => "overdue",
        }
    }

    /// Parses the wire name (`"in_progress"` etc.)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "overdue" => Some(TaskStatus::Overdue),
            _ => None,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying the derivation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDerivation {
    /// Status after the rule was applied
    pub status: TaskStatus,

    /// Whether `status` differs from the input, i.e. whether to persist it
    pub changed: bool,
}

/// Derives a task's status from its date range and today's date
pub fn derive_status(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    current: TaskStatus,
) -> StatusDerivation {
    let status = match current {
        TaskStatus::Completed => TaskStatus::Completed,
        _ if today > end => TaskStatus::Overdue,
        TaskStatus::Pending if start <= today => TaskStatus::InProgress,
        other => other,
    };

    StatusDerivation {
        status,
        changed: status != current,
    }
}
