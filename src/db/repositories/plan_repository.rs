use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::plan::PlanBlock;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct PlanBlockRow {
    pub id: String,
    pub user_id: String,
    pub plan_date: String,
    pub start_time: String,
    pub end_time: String,
    pub label: String,
    pub completed: bool,
    pub position: i64,
}

impl PlanBlockRow {
    pub fn from_record(user_id: &str, position: i64, block: &PlanBlock) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            plan_date: block.date.format(DATE_FORMAT).to_string(),
            start_time: block.start_time.clone(),
            end_time: block.end_time.clone(),
            label: block.label.clone(),
            completed: block.completed,
            position,
        }
    }

    pub fn into_record(self) -> AppResult<PlanBlock> {
        let date = NaiveDate::parse_from_str(&self.plan_date, DATE_FORMAT).map_err(|err| {
            AppError::database(format!(
                "invalid plan block date '{}': {err}",
                self.plan_date
            ))
        })?;

        Ok(PlanBlock {
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            label: self.label,
            completed: self.completed,
        })
    }
}

impl TryFrom<&Row<'_>> for PlanBlockRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            plan_date: row.get("plan_date")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            label: row.get("label")?,
            completed: row.get::<_, i64>("completed")? != 0,
            position: row.get("position")?,
        })
    }
}

/// The stored `generatedPlan` of each user.
pub struct PlanRepository;

impl PlanRepository {
    pub fn list(conn: &Connection, user_id: &str) -> AppResult<Vec<PlanBlockRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, plan_date, start_time, end_time, label, completed, position
                FROM plan_blocks
                WHERE user_id = ?1
                ORDER BY position ASC
            "#,
        )?;
        let rows = stmt
            .query_map([user_id], |row| PlanBlockRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Swaps the user's whole plan for `blocks`, keeping their order. Callers wrap this
    /// in a transaction.
    pub fn replace(conn: &Connection, user_id: &str, blocks: &[PlanBlock]) -> AppResult<()> {
        conn.execute("DELETE FROM plan_blocks WHERE user_id = ?1", [user_id])?;

        for (position, block) in blocks.iter().enumerate() {
            let row = PlanBlockRow::from_record(user_id, position as i64, block);
            conn.execute(
                r#"
                    INSERT INTO plan_blocks (
                        id, user_id, plan_date, start_time, end_time, label, completed, position
                    ) VALUES (
                        :id, :user_id, :plan_date, :start_time, :end_time, :label, :completed, :position
                    )
                "#,
                named_params! {
                    ":id": &row.id,
                    ":user_id": &row.user_id,
                    ":plan_date": &row.plan_date,
                    ":start_time": &row.start_time,
                    ":end_time": &row.end_time,
                    ":label": &row.label,
                    ":completed": row.completed as i64,
                    ":position": row.position,
                },
            )?;
        }

        Ok(())
    }

    /// Flags the user's block at `date`/`start_time` as done.
    pub fn mark_completed(
        conn: &Connection,
        user_id: &str,
        date: NaiveDate,
        start_time: &str,
    ) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE plan_blocks SET completed = 1
                WHERE user_id = :user_id AND plan_date = :plan_date AND start_time = :start_time
            "#,
            named_params! {
                ":user_id": user_id,
                ":plan_date": date.format(DATE_FORMAT).to_string(),
                ":start_time": start_time,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
