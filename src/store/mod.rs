//! SQLite persistence for users, reminders, and sessions.
//!
//! All access goes through one `tokio_rusqlite::Connection`, which serializes
//! statements on a single background thread. Reminder replacement is two
//! statements (delete matching filter, then insert) with no transaction,
//! matching the documented delete-then-insert semantics.

use std::path::Path;

use chrono::Utc;
use rusqlite::params;
use tokio_rusqlite::Connection;

use crate::error::BotError;
use crate::types::{PendingLocation, Prayer, ReminderEntry, Session, User};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    telegram_id INTEGER UNIQUE NOT NULL,
    city TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    timezone TEXT NOT NULL DEFAULT 'UTC',
    full_name TEXT,
    username TEXT,
    created_at TEXT,
    updated_at TEXT
);
CREATE TABLE IF NOT EXISTS reminders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    prayer TEXT NOT NULL,
    offset_minutes INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS sessions (
    telegram_id INTEGER PRIMARY KEY,
    data TEXT NOT NULL DEFAULT '{}',
    created_at TEXT,
    updated_at TEXT
);
";

/// A joined reminder row for the dashboard API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReminderWithOwner {
    pub id: i64,
    pub user_id: i64,
    pub telegram_id: i64,
    pub city: String,
    pub prayer: Prayer,
    pub offset_minutes: i64,
}

/// A raw session row for the dashboard API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionRow {
    pub telegram_id: i64,
    pub data: Session,
    pub updated_at: Option<String>,
}

#[derive(Clone)]
pub struct Store {
    conn: Connection,
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        city: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        timezone: row.get(5)?,
        full_name: row.get(6)?,
        username: row.get(7)?,
    })
}

const USER_COLUMNS: &str =
    "id, telegram_id, city, latitude, longitude, timezone, full_name, username";

impl Store {
    pub async fn open(path: impl AsRef<Path>) -> Result<Store, BotError> {
        let conn = Connection::open(path.as_ref().to_path_buf()).await?;
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Store { conn })
    }

    /// Health-check query for the HTTP API.
    pub async fn ping(&self) -> Result<(), BotError> {
        self.conn
            .call(|conn| {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Insert or update the user keyed by telegram id.
    pub async fn upsert_user(
        &self,
        telegram_id: i64,
        location: &PendingLocation,
        full_name: &str,
        username: Option<&str>,
    ) -> Result<(), BotError> {
        let location = location.clone();
        let full_name = full_name.to_string();
        let username = username.map(|s| s.to_string());
        self.conn
            .call(move |conn| {
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO users
                        (telegram_id, city, latitude, longitude, timezone,
                         full_name, username, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                     ON CONFLICT(telegram_id) DO UPDATE SET
                        city = excluded.city,
                        latitude = excluded.latitude,
                        longitude = excluded.longitude,
                        timezone = excluded.timezone,
                        full_name = excluded.full_name,
                        username = excluded.username,
                        updated_at = excluded.updated_at",
                    params![
                        telegram_id,
                        location.city,
                        location.latitude,
                        location.longitude,
                        location.timezone,
                        full_name,
                        username,
                        now,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>, BotError> {
        let user = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM users WHERE telegram_id = ?1",
                    USER_COLUMNS
                ))?;
                match stmt.query_row(params![telegram_id], row_to_user) {
                    Ok(user) => Ok(Some(user)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, BotError> {
        let users = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
                let rows = stmt.query_map([], row_to_user)?;
                let mut users = Vec::new();
                for row in rows {
                    users.push(row?);
                }
                Ok(users)
            })
            .await?;
        Ok(users)
    }

    /// Reminders for one user, in insertion order.
    pub async fn reminders_for_user(&self, user_id: i64) -> Result<Vec<ReminderEntry>, BotError> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT prayer, offset_minutes FROM reminders
                     WHERE user_id = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![user_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await?;

        rows.into_iter()
            .map(|(prayer, offset_minutes)| {
                let prayer = Prayer::parse(&prayer)
                    .ok_or_else(|| BotError::CorruptRow(format!("unknown prayer {:?}", prayer)))?;
                Ok(ReminderEntry { prayer, offset_minutes })
            })
            .collect()
    }

    /// Replace the reminder for one (user, prayer) pair: delete it, insert
    /// the new offset.
    pub async fn replace_reminder(
        &self,
        user_id: i64,
        prayer: Prayer,
        offset_minutes: i64,
    ) -> Result<(), BotError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM reminders WHERE user_id = ?1 AND prayer = ?2",
                    params![user_id, prayer.as_str()],
                )?;
                conn.execute(
                    "INSERT INTO reminders (user_id, prayer, offset_minutes) VALUES (?1, ?2, ?3)",
                    params![user_id, prayer.as_str(), offset_minutes],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Replace every reminder for the user with one per prayer at the given
    /// offset.
    pub async fn replace_all_reminders(
        &self,
        user_id: i64,
        offset_minutes: i64,
    ) -> Result<(), BotError> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM reminders WHERE user_id = ?1", params![user_id])?;
                let mut stmt = conn.prepare(
                    "INSERT INTO reminders (user_id, prayer, offset_minutes) VALUES (?1, ?2, ?3)",
                )?;
                for prayer in Prayer::ALL {
                    stmt.execute(params![user_id, prayer.as_str(), offset_minutes])?;
                }
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn delete_all_reminders(&self, user_id: i64) -> Result<(), BotError> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM reminders WHERE user_id = ?1", params![user_id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn delete_reminder(&self, user_id: i64, prayer: Prayer) -> Result<usize, BotError> {
        let deleted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "DELETE FROM reminders WHERE user_id = ?1 AND prayer = ?2",
                    params![user_id, prayer.as_str()],
                )?;
                Ok(n)
            })
            .await?;
        Ok(deleted)
    }

    /// All reminders joined with their owning user, for the dashboard API.
    pub async fn list_reminders_with_owner(&self) -> Result<Vec<ReminderWithOwner>, BotError> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT r.id, r.user_id, u.telegram_id, u.city, r.prayer, r.offset_minutes
                     FROM reminders r JOIN users u ON r.user_id = u.id
                     ORDER BY r.id",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await?;

        rows.into_iter()
            .map(|(id, user_id, telegram_id, city, prayer, offset_minutes)| {
                let prayer = Prayer::parse(&prayer)
                    .ok_or_else(|| BotError::CorruptRow(format!("unknown prayer {:?}", prayer)))?;
                Ok(ReminderWithOwner { id, user_id, telegram_id, city, prayer, offset_minutes })
            })
            .collect()
    }

    /// Upsert the session blob for a telegram id; the whole payload is
    /// replaced, so the last writer's fields win.
    pub async fn upsert_session(&self, telegram_id: i64, session: &Session) -> Result<(), BotError> {
        let data = serde_json::to_string(session)?;
        self.conn
            .call(move |conn| {
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO sessions (telegram_id, data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)
                     ON CONFLICT(telegram_id) DO UPDATE SET
                        data = excluded.data,
                        updated_at = excluded.updated_at",
                    params![telegram_id, data, now],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn session_for(&self, telegram_id: i64) -> Result<Option<Session>, BotError> {
        let data = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT data FROM sessions WHERE telegram_id = ?1")?;
                match stmt.query_row(params![telegram_id], |row| row.get::<_, String>(0)) {
                    Ok(data) => Ok(Some(data)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Not part of the normal conversation flow; sessions are otherwise only
    /// superseded by upserts.
    pub async fn delete_session(&self, telegram_id: i64) -> Result<(), BotError> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM sessions WHERE telegram_id = ?1", params![telegram_id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionRow>, BotError> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT telegram_id, data, updated_at FROM sessions ORDER BY telegram_id",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await?;

        rows.into_iter()
            .map(|(telegram_id, data, updated_at)| {
                let data: Session = serde_json::from_str(&data)?;
                Ok(SessionRow { telegram_id, data, updated_at })
            })
            .collect()
    }
}
