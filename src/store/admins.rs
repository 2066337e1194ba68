use super::{require_text, StoreError};
use rusqlite::Connection;

pub fn list(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT email FROM admins ORDER BY email")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn is_admin(conn: &Connection, email: &str) -> Result<bool, StoreError> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM admins WHERE email = ?",
        [email],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

/// Returns false when the email was already on the list.
pub fn add(conn: &Connection, email: &str) -> Result<bool, StoreError> {
    let email = require_text("email", email)?;
    let n = conn.execute("INSERT OR IGNORE INTO admins(email) VALUES(?)", [&email])?;
    Ok(n > 0)
}

pub fn remove(conn: &Connection, email: &str) -> Result<(), StoreError> {
    let n = conn.execute("DELETE FROM admins WHERE email = ?", [email.trim()])?;
    if n == 0 {
        return Err(StoreError::not_found("admin", email.trim()));
    }
    Ok(())
}
