use super::{require_text, trainers, StoreError};
use crate::files;
use crate::model::{now_timestamp, Assignment, AssignmentStatus, FeedbackEntry};
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use uuid::Uuid;

const SELECT_COLS: &str = "id, trainer_id, trainer_name, trainer_email, student_name,
    student_email, file_name, file_url, file_type, status, submitted_at, feedback_json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub student_name: String,
    pub student_email: String,
    pub file_url: String,
    /// Derived from the URL when absent.
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub text: String,
    pub author: String,
}

/// The only status change allowed is pending -> checked. Re-asserting the
/// current status is a no-op.
pub fn check_transition(
    id: &str,
    from: AssignmentStatus,
    to: AssignmentStatus,
) -> Result<(), StoreError> {
    match (from, to) {
        (a, b) if a == b => Ok(()),
        (AssignmentStatus::Pending, AssignmentStatus::Checked) => Ok(()),
        _ => Err(StoreError::InvalidTransition {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

fn row_to_assignment(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Assignment, String, String)> {
    let assignment = Assignment {
        id: row.get(0)?,
        trainer_id: row.get(1)?,
        trainer_name: row.get(2)?,
        trainer_email: row.get(3)?,
        student_name: row.get(4)?,
        student_email: row.get(5)?,
        file_name: row.get(6)?,
        file_url: row.get(7)?,
        file_type: row.get(8)?,
        status: AssignmentStatus::Pending,
        submitted_at: row.get(10)?,
        feedback: Vec::new(),
    };
    Ok((assignment, row.get(9)?, row.get(11)?))
}

fn finish(raw: (Assignment, String, String)) -> Result<Assignment, StoreError> {
    let (mut a, status, feedback_json) = raw;
    a.status = status
        .parse()
        .map_err(|e: String| StoreError::Corrupt(format!("assignment {}: {e}", a.id)))?;
    a.feedback = serde_json::from_str(&feedback_json)?;
    Ok(a)
}

pub fn list(conn: &Connection, trainer_id: &str) -> Result<Vec<Assignment>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLS} FROM assignments WHERE trainer_id = ? ORDER BY seq"
    ))?;
    let raw = stmt
        .query_map([trainer_id], row_to_assignment)?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(finish).collect()
}

pub fn get(conn: &Connection, trainer_id: &str, id: &str) -> Result<Assignment, StoreError> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLS} FROM assignments WHERE trainer_id = ? AND id = ?"),
            [trainer_id, id],
            row_to_assignment,
        )
        .optional()?;
    match raw {
        Some(r) => finish(r),
        None => Err(StoreError::not_found("assignment", id)),
    }
}

pub fn submit(
    conn: &Connection,
    trainer_id: &str,
    input: NewSubmission,
) -> Result<Assignment, StoreError> {
    let trainer = trainers::get(conn, trainer_id)?;
    let file_url = require_text("fileUrl", &input.file_url)?;
    let file_name = input
        .file_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| files::file_name_from_url(&file_url, 0));

    let a = Assignment {
        id: Uuid::new_v4().to_string(),
        trainer_id: trainer.id,
        trainer_name: trainer.name,
        trainer_email: trainer.email,
        student_name: require_text("studentName", &input.student_name)?,
        student_email: require_text("studentEmail", &input.student_email)?,
        file_type: files::classify(&file_url).to_string(),
        file_name,
        file_url,
        status: AssignmentStatus::Pending,
        submitted_at: now_timestamp(),
        feedback: Vec::new(),
    };

    conn.execute(
        &format!(
            "INSERT INTO assignments({SELECT_COLS})
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        (
            &a.id,
            &a.trainer_id,
            &a.trainer_name,
            a.trainer_email.as_deref(),
            &a.student_name,
            &a.student_email,
            &a.file_name,
            &a.file_url,
            &a.file_type,
            a.status.as_str(),
            &a.submitted_at,
            "[]",
        ),
    )?;
    tracing::info!(assignment_id = %a.id, trainer_id = %a.trainer_id, "assignment submitted");
    Ok(a)
}

fn feedback_entry(input: NewFeedback) -> Result<FeedbackEntry, StoreError> {
    Ok(FeedbackEntry {
        text: require_text("feedback text", &input.text)?,
        timestamp: now_timestamp(),
        author: require_text("feedback author", &input.author)?,
    })
}

/// Status and feedback land in one UPDATE so a reader never sees one
/// without the other.
fn write_status_and_feedback(conn: &Connection, a: &Assignment) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE assignments SET status = ?, feedback_json = ? WHERE trainer_id = ? AND id = ?",
        (
            a.status.as_str(),
            serde_json::to_string(&a.feedback)?,
            &a.trainer_id,
            &a.id,
        ),
    )?;
    Ok(())
}

pub fn set_status(
    conn: &Connection,
    trainer_id: &str,
    id: &str,
    status: AssignmentStatus,
) -> Result<Assignment, StoreError> {
    let mut a = get(conn, trainer_id, id)?;
    check_transition(&a.id, a.status, status)?;
    if a.status == status {
        return Ok(a);
    }
    a.status = status;
    write_status_and_feedback(conn, &a)?;
    tracing::info!(assignment_id = %a.id, status = %a.status, "assignment status changed");
    Ok(a)
}

/// Checked stays checked; optional feedback is appended either way.
pub fn mark_checked(
    conn: &Connection,
    trainer_id: &str,
    id: &str,
    feedback: Option<NewFeedback>,
) -> Result<Assignment, StoreError> {
    let mut a = get(conn, trainer_id, id)?;
    check_transition(&a.id, a.status, AssignmentStatus::Checked)?;
    let entry = feedback.map(feedback_entry).transpose()?;
    if a.status == AssignmentStatus::Checked && entry.is_none() {
        return Ok(a);
    }
    a.status = AssignmentStatus::Checked;
    a.feedback.extend(entry);
    write_status_and_feedback(conn, &a)?;
    tracing::info!(assignment_id = %a.id, "assignment checked");
    Ok(a)
}

pub fn add_feedback(
    conn: &Connection,
    trainer_id: &str,
    id: &str,
    feedback: NewFeedback,
) -> Result<Assignment, StoreError> {
    let mut a = get(conn, trainer_id, id)?;
    a.feedback.push(feedback_entry(feedback)?);
    write_status_and_feedback(conn, &a)?;
    Ok(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_conn;
    use crate::store::trainers::{create as create_trainer, NewTrainer};
    use pretty_assertions::assert_eq;

    fn setup() -> (Connection, String) {
        let conn = test_conn();
        let t = create_trainer(
            &conn,
            NewTrainer {
                name: "John Doe".into(),
                email: Some("john@school.test".into()),
                subject: "Computer Science".into(),
                batches: vec!["SOC1".into()],
            },
            "admin@school.test",
        )
        .expect("trainer");
        (conn, t.id)
    }

    fn submission(url: &str) -> NewSubmission {
        NewSubmission {
            student_name: "Ali Raza".into(),
            student_email: "ali@school.test".into(),
            file_url: url.into(),
            file_name: None,
        }
    }

    fn feedback(text: &str) -> NewFeedback {
        NewFeedback {
            text: text.into(),
            author: "John Doe".into(),
        }
    }

    #[test]
    fn submit_denormalizes_trainer_and_infers_type() {
        let (conn, tid) = setup();
        let a = submit(&conn, &tid, submission("https://files.test/u/essay.PDF")).expect("submit");
        assert_eq!(a.status, AssignmentStatus::Pending);
        assert_eq!(a.file_name, "essay.PDF");
        assert_eq!(a.file_type, "application/pdf");
        assert_eq!(a.trainer_name, "John Doe");
        assert_eq!(a.trainer_email.as_deref(), Some("john@school.test"));
        assert_eq!(list(&conn, &tid).expect("list"), vec![a]);
    }

    #[test]
    fn submit_to_unknown_trainer_is_not_found() {
        let (conn, _) = setup();
        assert!(matches!(
            submit(&conn, "ghost", submission("https://files.test/a.png")),
            Err(StoreError::NotFound { entity: "trainer", .. })
        ));
    }

    #[test]
    fn checked_never_returns_to_pending() {
        let (conn, tid) = setup();
        let a = submit(&conn, &tid, submission("https://files.test/a.png")).expect("submit");
        let checked = mark_checked(&conn, &tid, &a.id, None).expect("check");
        assert_eq!(checked.status, AssignmentStatus::Checked);

        let again = mark_checked(&conn, &tid, &a.id, None).expect("check again");
        assert_eq!(again.status, AssignmentStatus::Checked);

        assert!(matches!(
            set_status(&conn, &tid, &a.id, AssignmentStatus::Pending),
            Err(StoreError::InvalidTransition { .. })
        ));
        assert_eq!(
            get(&conn, &tid, &a.id).expect("get").status,
            AssignmentStatus::Checked
        );
    }

    #[test]
    fn mark_checked_with_feedback_is_one_write() {
        let (conn, tid) = setup();
        let a = submit(&conn, &tid, submission("https://files.test/a.docx")).expect("submit");
        let checked = mark_checked(&conn, &tid, &a.id, Some(feedback("Well structured")))
            .expect("check");
        assert_eq!(checked.feedback.len(), 1);
        assert_eq!(get(&conn, &tid, &a.id).expect("get"), checked);
    }

    #[test]
    fn feedback_is_additive() {
        let (conn, tid) = setup();
        let a = submit(&conn, &tid, submission("https://files.test/a.pptx")).expect("submit");
        let first = add_feedback(&conn, &tid, &a.id, feedback("Add citations")).expect("first");
        let before = first.feedback.clone();
        let second = add_feedback(&conn, &tid, &a.id, feedback("Better now")).expect("second");
        assert_eq!(second.feedback.len(), before.len() + 1);
        assert_eq!(&second.feedback[..before.len()], before.as_slice());
        assert_eq!(second.status, AssignmentStatus::Pending);

        assert!(matches!(
            add_feedback(&conn, &tid, &a.id, feedback("   ")),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn unreadable_status_is_a_store_failure() {
        let (conn, tid) = setup();
        let a = submit(&conn, &tid, submission("https://files.test/a.png")).expect("submit");
        conn.execute("UPDATE assignments SET status = 'lost' WHERE id = ?", [&a.id])
            .expect("corrupt row");

        let err = get(&conn, &tid, &a.id).expect_err("corrupt");
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert_eq!(err.code(), "db_query_failed");
        assert!(list(&conn, &tid).is_err());
    }

    #[test]
    fn assignment_lookup_is_scoped_to_trainer() {
        let (conn, tid) = setup();
        let a = submit(&conn, &tid, submission("https://files.test/a.png")).expect("submit");
        assert!(matches!(
            get(&conn, "other-trainer", &a.id),
            Err(StoreError::NotFound { .. })
        ));
    }
}
