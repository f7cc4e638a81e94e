use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::question::{Difficulty, Mode, Operation, SessionConfig};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Composite key a best score is filed under: `{operation}_{difficulty}_{mode}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighScoreKey {
    pub operation: Operation,
    pub difficulty: Difficulty,
    pub mode: Mode,
}

impl HighScoreKey {
    /// Key format written before scores were split per difficulty and mode.
    /// Equation rounds never had one.
    pub fn legacy(&self) -> Option<String> {
        match (self.mode, self.difficulty) {
            (Mode::Equations, _) => None,
            (Mode::Normal, Difficulty::Mix) => Some("highscore_mix".to_string()),
            (Mode::Normal, Difficulty::Table(_)) => Some(format!("highscore_{}", self.operation)),
        }
    }
}

impl From<&SessionConfig> for HighScoreKey {
    fn from(config: &SessionConfig) -> Self {
        Self {
            operation: config.operation,
            difficulty: config.difficulty,
            mode: config.mode,
        }
    }
}

impl fmt::Display for HighScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.operation, self.difficulty, self.mode)
    }
}

/// Stored values are text; anything that isn't a non-negative integer counts as zero
pub fn parse_score(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

/// Best-score persistence. Reads never fail: a missing or unreadable entry is 0.
pub trait HighScoreStore {
    fn get(&self, key: &HighScoreKey) -> u32;
    fn set(&mut self, key: &HighScoreKey, score: u32) -> Result<()>;
}

impl<T: HighScoreStore + ?Sized> HighScoreStore for Box<T> {
    fn get(&self, key: &HighScoreKey) -> u32 {
        (**self).get(key)
    }

    fn set(&mut self, key: &HighScoreKey, score: u32) -> Result<()> {
        (**self).set(key, score)
    }
}

/// In-memory store of raw values, used when no database is available and in tests
#[derive(Debug, Default, Clone)]
pub struct MemoryHighScoreStore {
    values: HashMap<String, String>,
}

impl MemoryHighScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, as an older version or another tool might have left it
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl HighScoreStore for MemoryHighScoreStore {
    fn get(&self, key: &HighScoreKey) -> u32 {
        self.raw(&key.to_string())
            .or_else(|| key.legacy().and_then(|legacy| self.raw(&legacy)))
            .map(parse_score)
            .unwrap_or(0)
    }

    fn set(&mut self, key: &HighScoreKey, score: u32) -> Result<()> {
        self.values.insert(key.to_string(), score.to_string());
        Ok(())
    }
}

/// SQLite-backed key/value table of best scores
#[derive(Debug)]
pub struct SqliteHighScoreStore {
    conn: Connection,
}

impl SqliteHighScoreStore {
    /// Open the store at the default location, creating it if needed
    pub fn new() -> Result<Self> {
        Self::open(AppDirs::db_path())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS high_scores (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self { conn })
    }

    /// Raw stored text for a key, if any
    pub fn raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM high_scores WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO high_scores (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Every stored record, sorted by key
    pub fn all_scores(&self) -> Result<Vec<ScoreEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM high_scores ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let value: String = row.get(1)?;
            let updated_at: String = row.get(2)?;
            Ok(ScoreEntry {
                key,
                score: parse_score(&value),
                updated_at: DateTime::parse_from_rfc3339(&updated_at)
                    .ok()
                    .map(|dt| dt.with_timezone(&Local)),
            })
        })?;

        let mut scores = Vec::new();
        for row in rows {
            scores.push(row?);
        }
        Ok(scores)
    }
}

/// One row of the high score table, as listed by `--scores`
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub key: String,
    pub score: u32,
    pub updated_at: Option<DateTime<Local>>,
}

impl HighScoreStore for SqliteHighScoreStore {
    fn get(&self, key: &HighScoreKey) -> u32 {
        let lookup = |k: &str| match self.raw(k) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = k, error = %e, "failed to read high score");
                None
            }
        };

        lookup(&key.to_string())
            .or_else(|| key.legacy().and_then(|legacy| lookup(&legacy)))
            .map(|raw| parse_score(&raw))
            .unwrap_or(0)
    }

    fn set(&mut self, key: &HighScoreKey, score: u32) -> Result<()> {
        tracing::debug!(key = %key, score, "storing high score");
        self.put_raw(&key.to_string(), &score.to_string())
    }
}
