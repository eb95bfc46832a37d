use invigil::error::PortalError;
use invigil::exam::ExamOutcome;
use invigil::store::{PortalDb, ResultSink};

fn outcome(id: &str) -> ExamOutcome {
    ExamOutcome {
        examination_id: id.into(),
        english: 4,
        logical: 3,
        computerskill: 2,
        customerservice: 5,
        typing_wpm: 42,
        typing_accuracy: 97,
    }
}

// The whole registry lifecycle against a real file: issue an id, verify it
// once, store the payload, then read it back over a fresh connection.
#[test]
fn register_verify_submit_and_export_on_disk() -> Result<(), PortalError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("portal.db");

    {
        let mut db = PortalDb::open(&path)?;
        db.register("EX-9")?;
        db.verify("EX-9")?;
        db.submit(&outcome("EX-9"))?;
    }

    let db = PortalDb::open(&path)?;
    let rows = db.list_results()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].examination_id, "EX-9");
    assert_eq!(rows[0].typing_wpm, 42);
    assert_eq!(rows[0].total(), 14);

    let mut csv = Vec::new();
    let exported = db.export_csv(&mut csv)?;
    assert_eq!(exported, 1);
    let text = String::from_utf8(csv).unwrap();
    assert!(text.starts_with("examination_id,"));
    assert!(text.contains("EX-9,4,3,2,5,42,97,14,"));

    // a completed id cannot be sat again
    let err = db.verify("EX-9").unwrap_err();
    assert_eq!(err.to_string(), "Exam is already completed");

    Ok(())
}

// Crashing mid-sitting leaves the id in_progress; a second launch is
// refused with the status in the message.
#[test]
fn interrupted_sitting_cannot_reenter() -> Result<(), PortalError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal.db");

    {
        let db = PortalDb::open(&path)?;
        db.register("EX-10")?;
        db.verify("EX-10")?;
        // no submission: simulates the process dying mid-exam
    }

    let db = PortalDb::open(&path)?;
    let err = db.verify("EX-10").unwrap_err();
    assert_eq!(err.to_string(), "Exam is already in_progress");

    Ok(())
}

// A retried submission overwrites the scores instead of duplicating the row.
#[test]
fn resubmission_keeps_a_single_row() -> Result<(), PortalError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal.db");

    let mut db = PortalDb::open(&path)?;
    db.register("EX-11")?;
    db.verify("EX-11")?;

    db.submit(&outcome("EX-11"))?;
    let mut second = outcome("EX-11");
    second.english = 9;
    db.submit(&second)?;

    let rows = db.list_results()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].english, 9);

    Ok(())
}
