use std::convert::TryFrom;
use std::str::FromStr;

use rusqlite::{named_params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::schedule::{AvailabilityWindow, DayOfWeek, FixedCommitment};
use crate::models::user::{ItemUpdate, TaskRecord, TestRecord};
use crate::models::work_item::RecordKind;

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub task_type: Option<String>,
    pub deadline: Option<String>,
    pub priority: Option<String>,
    pub duration_hours: Option<f64>,
}

impl TaskRow {
    pub fn from_record(user_id: &str, record: &TaskRecord) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: record.name.clone(),
            task_type: record.task_type.clone(),
            deadline: record.deadline.clone(),
            priority: record.priority.clone(),
            duration_hours: record.duration_hours,
        }
    }

    pub fn into_record(self) -> TaskRecord {
        TaskRecord {
            name: self.name,
            task_type: self.task_type,
            deadline: self.deadline,
            priority: self.priority,
            duration_hours: self.duration_hours,
        }
    }
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            task_type: row.get("task_type")?,
            deadline: row.get("deadline")?,
            priority: row.get("priority")?,
            duration_hours: row.get("duration_hours")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TestRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub test_type: Option<String>,
    pub date: Option<String>,
    pub deadline: Option<String>,
    pub priority: Option<String>,
}

impl TestRow {
    pub fn from_record(user_id: &str, record: &TestRecord) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: record.name.clone(),
            test_type: record.test_type.clone(),
            date: record.date.clone(),
            deadline: record.deadline.clone(),
            priority: record.priority.clone(),
        }
    }

    pub fn into_record(self) -> TestRecord {
        TestRecord {
            name: self.name,
            test_type: self.test_type,
            date: self.date,
            deadline: self.deadline,
            priority: self.priority,
        }
    }
}

impl TryFrom<&Row<'_>> for TestRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            test_type: row.get("test_type")?,
            date: row.get("date")?,
            deadline: row.get("deadline")?,
            priority: row.get("priority")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClassRow {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

impl ClassRow {
    pub fn from_record(user_id: &str, record: &FixedCommitment) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            subject: record.subject.clone(),
            day: record.day.as_str().to_string(),
            start_time: record.start_time.clone(),
            end_time: record.end_time.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<FixedCommitment> {
        Ok(FixedCommitment {
            subject: self.subject,
            day: DayOfWeek::from_str(&self.day)?,
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}

impl TryFrom<&Row<'_>> for ClassRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            subject: row.get("subject")?,
            day: row.get("day")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StudyWindowRow {
    pub id: String,
    pub user_id: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

impl StudyWindowRow {
    pub fn from_record(user_id: &str, record: &AvailabilityWindow) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            day: record.day.as_str().to_string(),
            start_time: record.start_time.clone(),
            end_time: record.end_time.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<AvailabilityWindow> {
        Ok(AvailabilityWindow {
            day: DayOfWeek::from_str(&self.day)?,
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}

impl TryFrom<&Row<'_>> for StudyWindowRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            day: row.get("day")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
        })
    }
}

/// Per-user tasks, tests, classes and study windows. Rows come back in insertion order.
pub struct UserDataRepository;

impl UserDataRepository {
    pub fn insert_task(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (id, user_id, name, task_type, deadline, priority, duration_hours)
                VALUES (:id, :user_id, :name, :task_type, :deadline, :priority, :duration_hours)
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":name": &row.name,
                ":task_type": &row.task_type,
                ":deadline": &row.deadline,
                ":priority": &row.priority,
                ":duration_hours": &row.duration_hours,
            },
        )?;
        Ok(())
    }

    pub fn insert_test(conn: &Connection, row: &TestRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tests (id, user_id, name, test_type, date, deadline, priority)
                VALUES (:id, :user_id, :name, :test_type, :date, :deadline, :priority)
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":name": &row.name,
                ":test_type": &row.test_type,
                ":date": &row.date,
                ":deadline": &row.deadline,
                ":priority": &row.priority,
            },
        )?;
        Ok(())
    }

    pub fn insert_class(conn: &Connection, row: &ClassRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO class_schedule (id, user_id, subject, day, start_time, end_time)
                VALUES (:id, :user_id, :subject, :day, :start_time, :end_time)
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":subject": &row.subject,
                ":day": &row.day,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
            },
        )?;
        Ok(())
    }

    pub fn insert_study_window(conn: &Connection, row: &StudyWindowRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO study_windows (id, user_id, day, start_time, end_time)
                VALUES (:id, :user_id, :day, :start_time, :end_time)
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":day": &row.day,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
            },
        )?;
        Ok(())
    }

    pub fn list_tasks(conn: &Connection, user_id: &str) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, task_type, deadline, priority, duration_hours
             FROM tasks WHERE user_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([user_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_tests(conn: &Connection, user_id: &str) -> AppResult<Vec<TestRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, test_type, date, deadline, priority
             FROM tests WHERE user_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([user_id], |row| TestRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_classes(conn: &Connection, user_id: &str) -> AppResult<Vec<ClassRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, subject, day, start_time, end_time
             FROM class_schedule WHERE user_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([user_id], |row| ClassRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_study_windows(conn: &Connection, user_id: &str) -> AppResult<Vec<StudyWindowRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, day, start_time, end_time
             FROM study_windows WHERE user_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([user_id], |row| StudyWindowRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Deletes tasks, tests and classes carrying `name`, returning how many rows went.
    pub fn delete_named(conn: &Connection, user_id: &str, name: &str) -> AppResult<usize> {
        let params = named_params! {":user_id": user_id, ":name": name};
        let tasks = conn.execute(
            "DELETE FROM tasks WHERE user_id = :user_id AND name = :name COLLATE NOCASE",
            params,
        )?;
        let tests = conn.execute(
            "DELETE FROM tests WHERE user_id = :user_id AND name = :name COLLATE NOCASE",
            params,
        )?;
        let classes = conn.execute(
            "DELETE FROM class_schedule WHERE user_id = :user_id AND subject = :name COLLATE NOCASE",
            params,
        )?;
        Ok(tasks + tests + classes)
    }

    /// Renames the matching tasks and tests, returning how many rows changed.
    pub fn rename_item(
        conn: &Connection,
        user_id: &str,
        current_name: &str,
        new_name: &str,
    ) -> AppResult<usize> {
        let params = named_params! {
            ":user_id": user_id,
            ":current_name": current_name,
            ":new_name": new_name,
        };
        let tasks = conn.execute(
            "UPDATE tasks SET name = :new_name
             WHERE user_id = :user_id AND name = :current_name COLLATE NOCASE",
            params,
        )?;
        let tests = conn.execute(
            "UPDATE tests SET name = :new_name
             WHERE user_id = :user_id AND name = :current_name COLLATE NOCASE",
            params,
        )?;
        Ok(tasks + tests)
    }

    /// Which table holds a task or test called `name`, tasks first.
    pub fn find_item_kind(
        conn: &Connection,
        user_id: &str,
        name: &str,
    ) -> AppResult<Option<RecordKind>> {
        let params = named_params! {":user_id": user_id, ":name": name};
        let task = conn
            .query_row(
                "SELECT 1 FROM tasks WHERE user_id = :user_id AND name = :name COLLATE NOCASE LIMIT 1",
                params,
                |_| Ok(RecordKind::Task),
            )
            .optional()?;
        if task.is_some() {
            return Ok(task);
        }

        let test = conn
            .query_row(
                "SELECT 1 FROM tests WHERE user_id = :user_id AND name = :name COLLATE NOCASE LIMIT 1",
                params,
                |_| Ok(RecordKind::Test),
            )
            .optional()?;
        Ok(test)
    }

    /// Applies the non-empty fields of `update` to the matching rows of one table.
    pub fn update_item(
        conn: &Connection,
        kind: RecordKind,
        user_id: &str,
        current_name: &str,
        update: &ItemUpdate,
    ) -> AppResult<usize> {
        let changed = match kind {
            RecordKind::Task => conn.execute(
                "UPDATE tasks SET
                    name = COALESCE(:new_name, name),
                    task_type = COALESCE(:new_type, task_type),
                    deadline = COALESCE(:new_deadline, deadline),
                    priority = COALESCE(:new_priority, priority),
                    duration_hours = COALESCE(:new_duration_hours, duration_hours)
                 WHERE user_id = :user_id AND name = :current_name COLLATE NOCASE",
                named_params! {
                    ":user_id": user_id,
                    ":current_name": current_name,
                    ":new_name": &update.new_name,
                    ":new_type": &update.new_type,
                    ":new_deadline": &update.new_deadline,
                    ":new_priority": &update.new_priority,
                    ":new_duration_hours": &update.new_duration_hours,
                },
            )?,
            RecordKind::Test => conn.execute(
                "UPDATE tests SET
                    name = COALESCE(:new_name, name),
                    test_type = COALESCE(:new_type, test_type),
                    deadline = COALESCE(:new_deadline, deadline),
                    priority = COALESCE(:new_priority, priority)
                 WHERE user_id = :user_id AND name = :current_name COLLATE NOCASE",
                named_params! {
                    ":user_id": user_id,
                    ":current_name": current_name,
                    ":new_name": &update.new_name,
                    ":new_type": &update.new_type,
                    ":new_deadline": &update.new_deadline,
                    ":new_priority": &update.new_priority,
                },
            )?,
        };
        Ok(changed)
    }

    pub fn find_classes(conn: &Connection, user_id: &str, subject: &str) -> AppResult<Vec<ClassRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, subject, day, start_time, end_time
             FROM class_schedule
             WHERE user_id = ?1 AND subject = ?2 COLLATE NOCASE
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([user_id, subject], |row| ClassRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_class(conn: &Connection, row: &ClassRow) -> AppResult<()> {
        conn.execute(
            "UPDATE class_schedule SET day = :day, start_time = :start_time, end_time = :end_time
             WHERE id = :id",
            named_params! {
                ":id": &row.id,
                ":day": &row.day,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
            },
        )?;
        Ok(())
    }

    pub fn delete_task(conn: &Connection, id: &str) -> AppResult<usize> {
        Ok(conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?)
    }

    pub fn delete_test(conn: &Connection, id: &str) -> AppResult<usize> {
        Ok(conn.execute("DELETE FROM tests WHERE id = ?1", [id])?)
    }
}
