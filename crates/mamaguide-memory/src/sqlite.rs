//! SQLite store for preferences and the symptom log.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use mamaguide_core::config::MemoryConfig;
use mamaguide_core::error::{MamaGuideError, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::pregnancy;
use crate::symptom_log::{DEFAULT_ACTION, DEFAULT_URGENCY, NewSymptomLog, SymptomLogEntry};

const DUE_DATE_KEY: &str = "due_date";

fn db_err(e: rusqlite::Error) -> MamaGuideError {
    MamaGuideError::Memory(e.to_string())
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    pub fn from_config(config: &MemoryConfig) -> Result<Self> {
        let path = config.resolved_path();
        tracing::debug!("💾 Opening store at {}", path.display());
        Self::open(&path)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().map_err(db_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS symptom_log (
                id TEXT PRIMARY KEY,
                symptom TEXT NOT NULL,
                severity TEXT NOT NULL,
                duration TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT '',
                urgency TEXT NOT NULL,
                action TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .map_err(db_err)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MamaGuideError::Memory(e.to_string()))
    }

    // ── Preferences ─────────────────────────────────────────

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        Ok(())
    }

    pub fn preference(&self, key: &str) -> Result<Option<String>> {
        self.conn()?
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    /// Returns whether the key existed.
    pub fn remove_preference(&self, key: &str) -> Result<bool> {
        let n = self
            .conn()?
            .execute("DELETE FROM preferences WHERE key = ?1", params![key])
            .map_err(db_err)?;
        Ok(n > 0)
    }

    // ── Due date ────────────────────────────────────────────

    pub fn set_due_date(&self, due: NaiveDate) -> Result<()> {
        self.set_preference(DUE_DATE_KEY, &due.format("%Y-%m-%d").to_string())
    }

    /// The stored due date. An unparseable value is logged and ignored.
    pub fn due_date(&self) -> Result<Option<NaiveDate>> {
        let Some(raw) = self.preference(DUE_DATE_KEY)? else {
            return Ok(None);
        };
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => Ok(Some(date)),
            Err(e) => {
                tracing::warn!("⚠️ Ignoring stored due date '{raw}': {e}");
                Ok(None)
            }
        }
    }

    pub fn clear_due_date(&self) -> Result<bool> {
        self.remove_preference(DUE_DATE_KEY)
    }

    pub fn current_week(&self, today: NaiveDate) -> Result<u32> {
        Ok(pregnancy::current_week(self.due_date()?, today))
    }

    // ── Symptom log ─────────────────────────────────────────

    pub fn add_symptom(&self, entry: NewSymptomLog) -> Result<SymptomLogEntry> {
        let symptom = entry.symptom.trim();
        if symptom.is_empty() {
            return Err(MamaGuideError::Memory("symptom must not be empty".into()));
        }

        let logged = SymptomLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            symptom: symptom.to_string(),
            severity: entry.severity,
            duration: entry.duration.trim().to_string(),
            notes: entry.notes.trim().to_string(),
            timestamp: Utc::now(),
            urgency: DEFAULT_URGENCY.into(),
            action: DEFAULT_ACTION.into(),
        };

        self.conn()?
            .execute(
                "INSERT INTO symptom_log (id, symptom, severity, duration, notes, urgency, action, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    logged.id,
                    logged.symptom,
                    logged.severity.as_str(),
                    logged.duration,
                    logged.notes,
                    logged.urgency,
                    logged.action,
                    logged.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .map_err(db_err)?;

        tracing::debug!("💾 Logged symptom {} ({})", logged.symptom, logged.severity);
        Ok(logged)
    }

    /// All entries, newest first.
    pub fn list_symptoms(&self) -> Result<Vec<SymptomLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, symptom, severity, duration, notes, urgency, action, created_at
                 FROM symptom_log ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, symptom, severity, duration, notes, urgency, action, created_at) =
                row.map_err(db_err)?;
            let timestamp = DateTime::parse_from_rfc3339(&created_at)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| MamaGuideError::Memory(format!("bad timestamp for {id}: {e}")))?;
            entries.push(SymptomLogEntry {
                severity: severity.parse()?,
                id,
                symptom,
                duration,
                notes,
                timestamp,
                urgency,
                action,
            });
        }
        Ok(entries)
    }

    /// Returns whether an entry was removed.
    pub fn delete_symptom(&self, id: &str) -> Result<bool> {
        let n = self
            .conn()?
            .execute("DELETE FROM symptom_log WHERE id = ?1", params![id])
            .map_err(db_err)?;
        Ok(n > 0)
    }
}
