use super::{check_label, require_text, StoreError};
use crate::config::UploadLimits;
use crate::files;
use crate::model::{now_timestamp, Attachment, AuthorRole, StreamPost};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

const SELECT_COLS: &str =
    "id, batch, author_email, author_name, author_role, body, attachments_json, created_at";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub batch: String,
    pub author_email: String,
    pub author_name: String,
    pub author_role: AuthorRole,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StreamPost, String, String)> {
    let post = StreamPost {
        id: row.get(0)?,
        batch: row.get(1)?,
        author_email: row.get(2)?,
        author_name: row.get(3)?,
        author_role: AuthorRole::Student,
        text: row.get(5)?,
        attachments: Vec::new(),
        timestamp: row.get(7)?,
    };
    Ok((post, row.get(4)?, row.get(6)?))
}

fn finish(raw: (StreamPost, String, String)) -> Result<StreamPost, StoreError> {
    let (mut post, role, attachments_json) = raw;
    post.author_role = role
        .parse()
        .map_err(|e: String| StoreError::Corrupt(format!("post {}: {e}", post.id)))?;
    post.attachments = serde_json::from_str(&attachments_json)?;
    Ok(post)
}

/// Creation order; feeds re-sort newest first on the way out.
pub fn list(conn: &Connection, batch: &str) -> Result<Vec<StreamPost>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLS} FROM stream_posts WHERE batch = ? ORDER BY seq"
    ))?;
    let raw = stmt
        .query_map([batch], row_to_post)?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(finish).collect()
}

pub fn post(
    conn: &Connection,
    input: NewPost,
    limits: &UploadLimits,
) -> Result<StreamPost, StoreError> {
    let batch = require_text("batch", &input.batch)?;
    check_label(&batch)?;
    if input.text.trim().is_empty() && input.attachments.is_empty() {
        return Err(StoreError::Validation(
            "add some text or attach a file".into(),
        ));
    }
    for att in &input.attachments {
        require_text("attachment url", &att.url)?;
        if let Err(e) = files::check_size(att, limits) {
            return Err(StoreError::FileTooLarge {
                name: e.name,
                size: e.size,
                limit: e.limit,
            });
        }
    }

    let post = StreamPost {
        id: Uuid::new_v4().to_string(),
        batch,
        author_email: require_text("authorEmail", &input.author_email)?,
        author_name: require_text("authorName", &input.author_name)?,
        author_role: input.author_role,
        text: input.text,
        attachments: input.attachments,
        timestamp: now_timestamp(),
    };

    conn.execute(
        &format!("INSERT INTO stream_posts({SELECT_COLS}) VALUES(?, ?, ?, ?, ?, ?, ?, ?)"),
        (
            &post.id,
            &post.batch,
            &post.author_email,
            &post.author_name,
            post.author_role.as_str(),
            &post.text,
            serde_json::to_string(&post.attachments)?,
            &post.timestamp,
        ),
    )?;
    tracing::info!(post_id = %post.id, batch = %post.batch, "stream post created");
    Ok(post)
}

pub fn delete(conn: &Connection, batch: &str, id: &str) -> Result<(), StoreError> {
    let n = conn.execute(
        "DELETE FROM stream_posts WHERE batch = ? AND id = ?",
        [batch, id],
    )?;
    if n == 0 {
        return Err(StoreError::not_found("post", id));
    }
    tracing::info!(post_id = %id, batch = %batch, "stream post deleted");
    Ok(())
}
