use super::{check_label, clean_labels, labels_json, parse_labels, require_text, StoreError};
use crate::model::{now_timestamp, EditEntry, Trainer};
use crate::roster;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use std::collections::BTreeSet;
use uuid::Uuid;

const SELECT_COLS: &str =
    "id, name, email, subject, batches_json, creator_email, created_at, edit_history_json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrainer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub batches: Vec<String>,
}

/// Partial update; absent fields are left untouched. `email: null` clears
/// the contact email.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub batches: Option<Vec<String>>,
}

fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

fn clean_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

fn row_to_trainer(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Trainer, String, String)> {
    let trainer = Trainer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        subject: row.get(3)?,
        batches: Vec::new(),
        creator_email: row.get(5)?,
        created_at: row.get(6)?,
        edit_history: Vec::new(),
    };
    Ok((trainer, row.get(4)?, row.get(7)?))
}

fn finish(raw: (Trainer, String, String)) -> Result<Trainer, StoreError> {
    let (mut trainer, batches_json, history_json) = raw;
    trainer.batches = parse_labels(&batches_json)?;
    trainer.edit_history = serde_json::from_str(&history_json)?;
    Ok(trainer)
}

pub fn list(conn: &Connection) -> Result<Vec<Trainer>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {SELECT_COLS} FROM trainers ORDER BY seq"))?;
    let raw = stmt
        .query_map([], row_to_trainer)?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(finish).collect()
}

pub fn get(conn: &Connection, id: &str) -> Result<Trainer, StoreError> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLS} FROM trainers WHERE id = ?"),
            [id],
            row_to_trainer,
        )
        .optional()?;
    match raw {
        Some(r) => finish(r),
        None => Err(StoreError::not_found("trainer", id)),
    }
}

pub fn create(
    conn: &Connection,
    input: NewTrainer,
    creator_email: &str,
) -> Result<Trainer, StoreError> {
    let trainer = Trainer {
        id: Uuid::new_v4().to_string(),
        name: require_text("name", &input.name)?,
        email: clean_email(input.email),
        subject: require_text("subject", &input.subject)?,
        batches: clean_labels(&input.batches)?,
        creator_email: creator_email.to_string(),
        created_at: now_timestamp(),
        edit_history: Vec::new(),
    };

    conn.execute(
        &format!("INSERT INTO trainers({SELECT_COLS}) VALUES(?, ?, ?, ?, ?, ?, ?, ?)"),
        (
            &trainer.id,
            &trainer.name,
            trainer.email.as_deref(),
            &trainer.subject,
            labels_json(&trainer.batches)?,
            &trainer.creator_email,
            &trainer.created_at,
            "[]",
        ),
    )?;
    tracing::info!(trainer_id = %trainer.id, "trainer created");
    Ok(trainer)
}

/// Names of the fields that differ; batches compare as sets.
pub fn changed_fields(before: &Trainer, after: &Trainer) -> Vec<String> {
    let mut changed = Vec::new();
    if before.name != after.name {
        changed.push("name".to_string());
    }
    if before.email != after.email {
        changed.push("email".to_string());
    }
    if before.subject != after.subject {
        changed.push("subject".to_string());
    }
    let a: BTreeSet<&String> = before.batches.iter().collect();
    let b: BTreeSet<&String> = after.batches.iter().collect();
    if a != b {
        changed.push("batches".to_string());
    }
    changed
}

fn write_back(
    conn: &Connection,
    before: &Trainer,
    mut after: Trainer,
    editor_email: &str,
) -> Result<Trainer, StoreError> {
    let changed = changed_fields(before, &after);
    if changed.is_empty() {
        return Ok(after);
    }
    after.edit_history.push(EditEntry {
        editor_email: editor_email.to_string(),
        edited_at: now_timestamp(),
        changed_fields: changed,
    });

    conn.execute(
        "UPDATE trainers
         SET name = ?, email = ?, subject = ?, batches_json = ?, edit_history_json = ?
         WHERE id = ?",
        (
            &after.name,
            after.email.as_deref(),
            &after.subject,
            labels_json(&after.batches)?,
            serde_json::to_string(&after.edit_history)?,
            &after.id,
        ),
    )?;
    tracing::debug!(trainer_id = %after.id, "trainer updated");
    Ok(after)
}

pub fn update(
    conn: &Connection,
    id: &str,
    patch: TrainerPatch,
    editor_email: &str,
) -> Result<Trainer, StoreError> {
    let before = get(conn, id)?;
    let mut after = before.clone();
    if let Some(name) = patch.name {
        after.name = require_text("name", &name)?;
    }
    if let Some(email) = patch.email {
        after.email = clean_email(email);
    }
    if let Some(subject) = patch.subject {
        after.subject = require_text("subject", &subject)?;
    }
    if let Some(batches) = patch.batches {
        after.batches = clean_labels(&batches)?;
    }
    write_back(conn, &before, after, editor_email)
}

pub fn add_batch(
    conn: &Connection,
    id: &str,
    label: &str,
    editor_email: &str,
) -> Result<Trainer, StoreError> {
    check_label(label)?;
    let before = get(conn, id)?;
    let mut after = before.clone();
    if !roster::add_label(&mut after.batches, label) {
        return Err(StoreError::Validation(format!(
            "batch {:?} is blank or already assigned",
            label.trim()
        )));
    }
    write_back(conn, &before, after, editor_email)
}

pub fn remove_batch(
    conn: &Connection,
    id: &str,
    label: &str,
    editor_email: &str,
) -> Result<Trainer, StoreError> {
    let before = get(conn, id)?;
    let mut after = before.clone();
    if !roster::remove_label(&mut after.batches, label) {
        return Err(StoreError::not_found("batch", label));
    }
    write_back(conn, &before, after, editor_email)
}

pub fn delete(conn: &Connection, id: &str) -> Result<(), StoreError> {
    let n = conn.execute("DELETE FROM trainers WHERE id = ?", [id])?;
    if n == 0 {
        return Err(StoreError::not_found("trainer", id));
    }
    tracing::info!(trainer_id = %id, "trainer deleted");
    Ok(())
}
