use super::{clean_labels, labels_json, parse_labels, require_text, StoreError};
use crate::model::{now_timestamp, Student};
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use uuid::Uuid;

const SELECT_COLS: &str = "id, name, email, phone, address, father_name, father_phone,
    mother_name, mother_phone, student_code, batches_json, creator_email, created_at";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub father_phone: String,
    #[serde(default)]
    pub mother_name: String,
    #[serde(default)]
    pub mother_phone: String,
    #[serde(default)]
    pub student_code: String,
    #[serde(default)]
    pub batches: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub father_name: Option<String>,
    pub father_phone: Option<String>,
    pub mother_name: Option<String>,
    pub mother_phone: Option<String>,
    pub student_code: Option<String>,
    pub batches: Option<Vec<String>>,
}

fn row_to_student(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Student, String)> {
    let student = Student {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        father_name: row.get(5)?,
        father_phone: row.get(6)?,
        mother_name: row.get(7)?,
        mother_phone: row.get(8)?,
        student_code: row.get(9)?,
        batches: Vec::new(),
        creator_email: row.get(11)?,
        created_at: row.get(12)?,
    };
    Ok((student, row.get(10)?))
}

fn finish(raw: (Student, String)) -> Result<Student, StoreError> {
    let (mut student, batches_json) = raw;
    student.batches = parse_labels(&batches_json)?;
    Ok(student)
}

pub fn list(conn: &Connection) -> Result<Vec<Student>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {SELECT_COLS} FROM students ORDER BY seq"))?;
    let raw = stmt
        .query_map([], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(finish).collect()
}

pub fn get(conn: &Connection, id: &str) -> Result<Student, StoreError> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLS} FROM students WHERE id = ?"),
            [id],
            row_to_student,
        )
        .optional()?;
    match raw {
        Some(r) => finish(r),
        None => Err(StoreError::not_found("student", id)),
    }
}

/// First record (in creation order) carrying exactly this email.
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Student>, StoreError> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLS} FROM students WHERE email = ? ORDER BY seq LIMIT 1"),
            [email],
            row_to_student,
        )
        .optional()?;
    raw.map(finish).transpose()
}

fn write_row(conn: &Connection, s: &Student, insert: bool) -> Result<(), StoreError> {
    let batches = labels_json(&s.batches)?;
    if insert {
        conn.execute(
            &format!(
                "INSERT INTO students({SELECT_COLS})
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            (
                &s.id,
                &s.name,
                &s.email,
                &s.phone,
                &s.address,
                &s.father_name,
                &s.father_phone,
                &s.mother_name,
                &s.mother_phone,
                &s.student_code,
                &batches,
                &s.creator_email,
                &s.created_at,
            ),
        )?;
    } else {
        conn.execute(
            "UPDATE students
             SET name = ?, email = ?, phone = ?, address = ?, father_name = ?, father_phone = ?,
                 mother_name = ?, mother_phone = ?, student_code = ?, batches_json = ?
             WHERE id = ?",
            (
                &s.name,
                &s.email,
                &s.phone,
                &s.address,
                &s.father_name,
                &s.father_phone,
                &s.mother_name,
                &s.mother_phone,
                &s.student_code,
                &batches,
                &s.id,
            ),
        )?;
    }
    Ok(())
}

pub fn create(
    conn: &Connection,
    input: NewStudent,
    creator_email: &str,
) -> Result<Student, StoreError> {
    let student = Student {
        id: Uuid::new_v4().to_string(),
        name: require_text("name", &input.name)?,
        email: require_text("email", &input.email)?,
        phone: input.phone.trim().to_string(),
        address: input.address.trim().to_string(),
        father_name: input.father_name.trim().to_string(),
        father_phone: input.father_phone.trim().to_string(),
        mother_name: input.mother_name.trim().to_string(),
        mother_phone: input.mother_phone.trim().to_string(),
        student_code: input.student_code.trim().to_string(),
        batches: clean_labels(&input.batches)?,
        creator_email: creator_email.to_string(),
        created_at: now_timestamp(),
    };
    write_row(conn, &student, true)?;
    tracing::info!(student_id = %student.id, "student created");
    Ok(student)
}

/// `creatorEmail` and `createdAt` are never part of a patch.
pub fn update(conn: &Connection, id: &str, patch: StudentPatch) -> Result<Student, StoreError> {
    let mut s = get(conn, id)?;
    if let Some(v) = patch.name {
        s.name = require_text("name", &v)?;
    }
    if let Some(v) = patch.email {
        s.email = require_text("email", &v)?;
    }
    let optional = [
        (patch.phone, &mut s.phone),
        (patch.address, &mut s.address),
        (patch.father_name, &mut s.father_name),
        (patch.father_phone, &mut s.father_phone),
        (patch.mother_name, &mut s.mother_name),
        (patch.mother_phone, &mut s.mother_phone),
        (patch.student_code, &mut s.student_code),
    ];
    for (value, slot) in optional {
        if let Some(v) = value {
            *slot = v.trim().to_string();
        }
    }
    if let Some(batches) = patch.batches {
        s.batches = clean_labels(&batches)?;
    }
    write_row(conn, &s, false)?;
    tracing::debug!(student_id = %s.id, "student updated");
    Ok(s)
}

pub fn delete(conn: &Connection, id: &str) -> Result<(), StoreError> {
    let n = conn.execute("DELETE FROM students WHERE id = ?", [id])?;
    if n == 0 {
        return Err(StoreError::not_found("student", id));
    }
    tracing::info!(student_id = %id, "student deleted");
    Ok(())
}
