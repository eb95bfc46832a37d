use thiserror::Error;

/// Portal failure taxonomy. Content and identifier problems end a session;
/// submission failures leave it recoverable.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The question paper could not be loaded or was empty.
    #[error("failed to load questions: {0}")]
    ContentLoad(String),

    /// Result delivery failed. The session survives and may resubmit.
    #[error("failed to submit results: {0}")]
    Submission(String),

    /// No examination id was available at submission time.
    #[error("Exam ID missing")]
    MissingExamId,

    #[error("Invalid Examination ID")]
    UnknownExam,

    /// The id exists but was already started or completed.
    #[error("Exam is already {status}")]
    ExamUnavailable { status: String },

    #[error("invalid question paper: {0}")]
    InvalidPaper(String),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
