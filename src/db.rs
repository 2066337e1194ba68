use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "lernova.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// One table per store path, no foreign keys between them: deleting a
/// trainer leaves its assignments and streams in place.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS admins(
            email TEXT PRIMARY KEY
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS trainers(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            email TEXT,
            subject TEXT NOT NULL,
            batches_json TEXT NOT NULL,
            creator_email TEXT NOT NULL,
            created_at TEXT NOT NULL,
            edit_history_json TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            address TEXT NOT NULL,
            father_name TEXT NOT NULL,
            father_phone TEXT NOT NULL,
            mother_name TEXT NOT NULL,
            mother_phone TEXT NOT NULL,
            student_code TEXT NOT NULL,
            batches_json TEXT NOT NULL,
            creator_email TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_email ON students(email)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            trainer_id TEXT NOT NULL,
            trainer_name TEXT NOT NULL,
            trainer_email TEXT,
            student_name TEXT NOT NULL,
            student_email TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_url TEXT NOT NULL,
            file_type TEXT NOT NULL,
            status TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            feedback_json TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_trainer ON assignments(trainer_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stream_posts(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            batch TEXT NOT NULL,
            author_email TEXT NOT NULL,
            author_name TEXT NOT NULL,
            author_role TEXT NOT NULL,
            body TEXT NOT NULL,
            attachments_json TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stream_posts_batch ON stream_posts(batch)",
        [],
    )?;

    Ok(())
}

pub fn seed_admins(conn: &Connection, emails: &[String]) -> anyhow::Result<usize> {
    let mut inserted = 0;
    for email in emails {
        let email = email.trim();
        if email.is_empty() {
            continue;
        }
        inserted += conn
            .execute("INSERT OR IGNORE INTO admins(email) VALUES(?)", [email])
            .with_context(|| format!("failed to seed admin {email}"))?;
    }
    Ok(inserted)
}
