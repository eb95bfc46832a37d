use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::error::PortalError;
use crate::exam::ExamOutcome;

/// Lifecycle of an examination id. Verification moves `Pending` to
/// `InProgress`; recording a result moves it to `Completed`. Ids are
/// single-use, so there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExamStatus {
    Pending,
    InProgress,
    Completed,
}

/// One row of the results registry, newest first in listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub examination_id: String,
    pub english: u32,
    pub logical: u32,
    pub computerskill: u32,
    pub customerservice: u32,
    pub typing_wpm: u32,
    pub typing_accuracy: u32,
    pub submitted_at: String,
}

impl ResultRow {
    pub fn total(&self) -> u32 {
        self.english + self.logical + self.computerskill + self.customerservice
    }

    /// "2 hours ago" style rendering of the submission time, falling back
    /// to the raw timestamp when it does not parse.
    pub fn submitted_ago(&self, now: SystemTime) -> String {
        let Ok(ts) = DateTime::parse_from_rfc3339(&self.submitted_at) else {
            return self.submitted_at.clone();
        };
        let elapsed = now
            .duration_since(SystemTime::from(ts.with_timezone(&Utc)))
            .unwrap_or_default();
        HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
    }
}

/// Destination for a finished sitting's payload. The sequencer produces at
/// most one payload per trigger; the sink only has to deliver it.
pub trait ResultSink {
    fn submit(&mut self, outcome: &ExamOutcome) -> Result<(), PortalError>;
}

/// Local registry: issued examination ids and submitted results, one
/// SQLite file under the user's state directory.
#[derive(Debug)]
pub struct PortalDb {
    conn: Connection,
}

impl PortalDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PortalError> {
        debug!("opening portal registry at {}", path.as_ref().display());
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, PortalError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, PortalError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS exams (
                examination_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                issued_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                examination_id TEXT PRIMARY KEY,
                english_score INTEGER NOT NULL,
                logical_score INTEGER NOT NULL,
                computerskill_score INTEGER NOT NULL,
                customerservice_score INTEGER NOT NULL,
                typing_wpm INTEGER NOT NULL,
                typing_accuracy INTEGER NOT NULL,
                submitted_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self { conn })
    }

    /// Issue a fresh pending examination id. Re-registering an existing id
    /// is refused with its current status.
    pub fn register(&self, examination_id: &str) -> Result<(), PortalError> {
        if examination_id.is_empty() {
            return Err(PortalError::MissingExamId);
        }
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO exams (examination_id, status, issued_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![examination_id, ExamStatus::Pending.to_string(), now],
        )?;
        if inserted == 0 {
            let status = self
                .status_of(examination_id)?
                .unwrap_or_else(|| "registered".into());
            return Err(PortalError::ExamUnavailable { status });
        }
        info!("registered examination id {examination_id}");
        Ok(())
    }

    /// Admit an applicant: the id must exist and still be pending, and
    /// admission flips it to in_progress so it cannot be reused.
    pub fn verify(&self, examination_id: &str) -> Result<(), PortalError> {
        if examination_id.is_empty() {
            return Err(PortalError::MissingExamId);
        }
        let status = self
            .status_of(examination_id)?
            .ok_or(PortalError::UnknownExam)?;
        if status != ExamStatus::Pending.to_string() {
            return Err(PortalError::ExamUnavailable { status });
        }
        self.conn.execute(
            "UPDATE exams SET status = ?1, updated_at = ?2 WHERE examination_id = ?3",
            params![
                ExamStatus::InProgress.to_string(),
                Utc::now().to_rfc3339(),
                examination_id
            ],
        )?;
        Ok(())
    }

    fn status_of(&self, examination_id: &str) -> Result<Option<String>, PortalError> {
        let status = self
            .conn
            .query_row(
                "SELECT status FROM exams WHERE examination_id = ?1",
                [examination_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status)
    }

    /// Store a submission and close out the examination id. The upsert
    /// keeps a manual retry harmless; the latest scores win.
    pub fn record_outcome(&self, outcome: &ExamOutcome) -> Result<(), PortalError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO results
                (examination_id, english_score, logical_score, computerskill_score,
                 customerservice_score, typing_wpm, typing_accuracy, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (examination_id) DO UPDATE SET
                english_score = excluded.english_score,
                logical_score = excluded.logical_score,
                computerskill_score = excluded.computerskill_score,
                customerservice_score = excluded.customerservice_score,
                typing_wpm = excluded.typing_wpm,
                typing_accuracy = excluded.typing_accuracy
            "#,
            params![
                outcome.examination_id,
                outcome.english,
                outcome.logical,
                outcome.computerskill,
                outcome.customerservice,
                outcome.typing_wpm,
                outcome.typing_accuracy,
                now,
            ],
        )?;
        self.conn.execute(
            "UPDATE exams SET status = ?1, updated_at = ?2 WHERE examination_id = ?3",
            params![
                ExamStatus::Completed.to_string(),
                now,
                outcome.examination_id
            ],
        )?;
        info!(
            "saved results for {} (wpm {}, accuracy {})",
            outcome.examination_id, outcome.typing_wpm, outcome.typing_accuracy
        );
        Ok(())
    }

    /// All submitted results, newest first.
    pub fn list_results(&self) -> Result<Vec<ResultRow>, PortalError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT examination_id, english_score, logical_score, computerskill_score,
                   customerservice_score, typing_wpm, typing_accuracy, submitted_at
            FROM results
            ORDER BY submitted_at DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ResultRow {
                examination_id: row.get(0)?,
                english: row.get(1)?,
                logical: row.get(2)?,
                computerskill: row.get(3)?,
                customerservice: row.get(4)?,
                typing_wpm: row.get(5)?,
                typing_accuracy: row.get(6)?,
                submitted_at: row.get(7)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Dump every result as CSV, returning the row count.
    pub fn export_csv<W: std::io::Write>(&self, out: W) -> Result<usize, PortalError> {
        let rows = self.list_results()?;
        let mut writer = csv::Writer::from_writer(out);

        writer.write_record([
            "examination_id",
            "english_score",
            "logical_score",
            "computerskill_score",
            "customerservice_score",
            "typing_wpm",
            "typing_accuracy",
            "total_score",
            "submitted_at",
        ])?;
        for row in &rows {
            writer.write_record([
                row.examination_id.clone(),
                row.english.to_string(),
                row.logical.to_string(),
                row.computerskill.to_string(),
                row.customerservice.to_string(),
                row.typing_wpm.to_string(),
                row.typing_accuracy.to_string(),
                row.total().to_string(),
                row.submitted_at.clone(),
            ])?;
        }
        writer.flush()?;

        Ok(rows.len())
    }
}

impl ResultSink for PortalDb {
    fn submit(&mut self, outcome: &ExamOutcome) -> Result<(), PortalError> {
        self.record_outcome(outcome)
            .map_err(|e| PortalError::Submission(e.to_string()))
    }
}
