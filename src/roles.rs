use crate::model::Role;
use crate::store::{admins, students, StoreError};
use rusqlite::Connection;

/// Admin allow-list first, then the student roster. Exact match on the
/// trimmed email.
pub fn resolve_role(conn: &Connection, email: &str) -> Result<Role, StoreError> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(Role::None);
    }
    if admins::is_admin(conn, email)? {
        return Ok(Role::Admin);
    }
    if students::find_by_email(conn, email)?.is_some() {
        return Ok(Role::Student);
    }
    Ok(Role::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::students::NewStudent;
    use crate::store::test_conn;

    #[test]
    fn admin_wins_over_student() {
        let conn = test_conn();
        admins::add(&conn, "both@school.test").expect("admin");
        students::create(
            &conn,
            NewStudent {
                name: "Both".into(),
                email: "both@school.test".into(),
                ..Default::default()
            },
            "x",
        )
        .expect("student");
        students::create(
            &conn,
            NewStudent {
                name: "Ali".into(),
                email: "ali@school.test".into(),
                ..Default::default()
            },
            "x",
        )
        .expect("student");

        assert_eq!(resolve_role(&conn, " both@school.test").expect("r"), Role::Admin);
        assert_eq!(resolve_role(&conn, "ali@school.test").expect("r"), Role::Student);
        assert_eq!(resolve_role(&conn, "stranger@school.test").expect("r"), Role::None);
        assert_eq!(resolve_role(&conn, "").expect("r"), Role::None);
    }

    #[test]
    fn read_error_surfaces() {
        let conn = Connection::open_in_memory().expect("db");
        assert!(resolve_role(&conn, "a@b").is_err());
    }
}
