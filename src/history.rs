use crate::error::Result;
use crate::question::{Difficulty, Mode, Operation};
use crate::session::RoundResult;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// One line of the round history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub date: DateTime<Local>,
    pub operation: Operation,
    pub difficulty: Difficulty,
    pub mode: Mode,
    pub score: u32,
    pub best_streak: u32,
    pub high_score: u32,
    pub new_record: bool,
}

impl RoundRecord {
    pub fn from_result(result: &RoundResult, date: DateTime<Local>) -> Self {
        Self {
            date,
            operation: result.config.operation,
            difficulty: result.config.difficulty,
            mode: result.config.mode,
            score: result.score,
            best_streak: result.best_streak,
            high_score: result.high_score,
            new_record: result.is_new_record,
        }
    }
}

/// Append-only CSV of finished rounds
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn append(&self, record: &RoundRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet we need to emit a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<RoundRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for record in reader.deserialize() {
            records.push(record?);
        }
        Ok(records)
    }
}
