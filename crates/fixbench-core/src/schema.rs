//! SQLite schema for the ticket store
//!
//! Version is tracked in `PRAGMA user_version`. Every statement is
//! `IF NOT EXISTS` / `OR IGNORE`, so applying it again is a no-op.

use rusqlite::Connection;

use crate::{Error, Result};

pub const SCHEMA_VERSION: i64 = 1;

/// Name of the counter row behind ticket numbers
pub const TICKET_COUNTER: &str = "ticket_number";

pub fn version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Create missing tables and seed the counter
pub fn ensure(conn: &Connection) -> Result<()> {
    let current = version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }

    conn.execute_batch(include_str!("../migrations/0001_ticket_schema.sql"))?;

    if current < SCHEMA_VERSION {
        tracing::debug!(from = current, to = SCHEMA_VERSION, "migrated ticket schema");
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_ensure_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        ensure(&conn).unwrap();

        for table in ["tickets", "status_changes", "counters"] {
            assert!(table_exists(&conn, table), "missing table {table}");
        }
        assert_eq!(version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_ensure_is_idempotent_and_keeps_counter() {
        let conn = Connection::open_in_memory().unwrap();
        ensure(&conn).unwrap();
        conn.execute(
            "UPDATE counters SET value = 7 WHERE name = ?1",
            [TICKET_COUNTER],
        )
        .unwrap();

        ensure(&conn).unwrap();

        let value: i64 = conn
            .query_row(
                "SELECT value FROM counters WHERE name = ?1",
                [TICKET_COUNTER],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        assert!(matches!(
            ensure(&conn),
            Err(Error::UnsupportedSchema { .. })
        ));
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        ensure(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO tickets (ticket_number, customer_first_name, customer_last_name,
             customer_phone, product, status, created_at, updated_at)
             VALUES ('FIX-000001', 'a', 'b', '1', 'p', 'closed', 'x', 'x')",
            [],
        );
        assert!(result.is_err());
    }
}
