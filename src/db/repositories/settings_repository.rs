use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct AppSettingRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for AppSettingRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.get("key")?,
            value: row.get("value")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Key/value rows in `app_settings`; values are opaque JSON documents.
pub struct SettingsRepository;

impl SettingsRepository {
    pub fn get(conn: &Connection, key: &str) -> AppResult<Option<AppSettingRow>> {
        let row = conn
            .query_row(
                "SELECT key, value, updated_at FROM app_settings WHERE key = ?1",
                [key],
                |row| AppSettingRow::try_from(row),
            )
            .optional()?;
        Ok(row)
    }

    pub fn upsert(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO app_settings (key, value)
                VALUES (:key, :value)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = CURRENT_TIMESTAMP
            "#,
            named_params! {":key": key, ":value": value},
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, key: &str) -> AppResult<bool> {
        let affected = conn.execute("DELETE FROM app_settings WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }
}
