use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use log::debug;
use serde::Deserialize;

use crate::error::PortalError;
use crate::exam::Question;

static BANK_DIR: Dir = include_dir!("src/bank");

/// Paper document shape: a single `questions` array.
#[derive(Debug, Deserialize)]
struct Paper {
    questions: Vec<Question>,
}

/// Source of the question paper for a sitting.
pub trait QuestionBank {
    fn load(&self) -> Result<Vec<Question>, PortalError>;
}

/// Paper read from a JSON file given on the command line.
#[derive(Debug, Clone)]
pub struct FileBank {
    path: PathBuf,
}

impl FileBank {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl QuestionBank for FileBank {
    fn load(&self) -> Result<Vec<Question>, PortalError> {
        debug!("loading question paper from {}", self.path.display());
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| PortalError::ContentLoad(format!("{}: {e}", self.path.display())))?;
        parse_paper(&raw)
    }
}

/// Compiled-in sample paper, so the binary runs with no files around.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedBank;

impl QuestionBank for EmbeddedBank {
    fn load(&self) -> Result<Vec<Question>, PortalError> {
        debug!("loading the embedded sample paper");
        let raw = BANK_DIR
            .get_file("sample.json")
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| PortalError::ContentLoad("embedded paper missing".into()))?;
        parse_paper(raw)
    }
}

/// Decode a paper and refuse one that could never be scored sensibly.
fn parse_paper(raw: &str) -> Result<Vec<Question>, PortalError> {
    let paper: Paper =
        serde_json::from_str(raw).map_err(|e| PortalError::ContentLoad(e.to_string()))?;

    for q in &paper.questions {
        if q.options.is_empty() {
            return Err(PortalError::InvalidPaper(format!(
                "question {} has no options",
                q.id
            )));
        }
        if q.answer >= q.options.len() {
            return Err(PortalError::InvalidPaper(format!(
                "question {} marks option {} but has only {}",
                q.id,
                q.answer,
                q.options.len()
            )));
        }
    }

    Ok(paper.questions)
}
