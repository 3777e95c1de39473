//! SQLite store for fixbench tickets
//!
//! One connection, one transaction per mutating operation. Ticket number
//! issuance, the ticket row and its history row commit together or not at all.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};

use crate::number::{format_ticket_number, validate_prefix};
use crate::schema::{self, TICKET_COUNTER};
use crate::{Error, NewTicket, Result, Statistics, Status, StatusChange, Ticket, TicketPatch};

const TICKET_COLUMNS: &str = "id, ticket_number, customer_first_name, customer_last_name, \
     customer_phone, product, description, repair_cost_cents, status, created_at, updated_at, \
     picked_up_at, customer_note";

/// SQLite-backed ticket store
pub struct TicketStore {
    conn: Connection,
    prefix: String,
    path: Option<PathBuf>,
}

impl TicketStore {
    /// Open (or create) the store at `path` and make sure the schema exists
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        validate_prefix(prefix)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn, prefix, Some(path.to_path_buf()))?;
        tracing::info!("Ticket store opened at {}", path.display());
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory(prefix: &str) -> Result<Self> {
        validate_prefix(prefix)?;
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, prefix, None)
    }

    fn from_connection(conn: Connection, prefix: &str, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn,
            prefix: prefix.to_string(),
            path,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Ensure tables exist and the counter is seeded. Safe to call repeatedly.
    pub fn initialize(&self) -> Result<()> {
        schema::ensure(&self.conn)
    }

    /// Ticket number prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Issue the next ticket number
    pub fn next_ticket_number(&mut self) -> Result<String> {
        let tx = self.conn.transaction()?;
        let number = issue_ticket_number(&tx, &self.prefix)?;
        tx.commit()?;
        Ok(number)
    }

    /// Last sequence value handed out
    pub fn counter_value(&self) -> Result<u64> {
        read_counter(&self.conn)
    }

    /// Create a ticket and return its number
    pub fn create_ticket(&mut self, new: &NewTicket) -> Result<String> {
        let new = new.validated()?;
        let status = new.status.unwrap_or_default();

        let tx = self.conn.transaction()?;
        let number = issue_ticket_number(&tx, &self.prefix)?;
        let now = Utc::now();
        let picked_up_at = (status == Status::PickedUp).then_some(now);

        tx.execute(
            "INSERT INTO tickets (ticket_number, customer_first_name, customer_last_name,
             customer_phone, product, description, repair_cost_cents, status, created_at,
             updated_at, picked_up_at, customer_note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?11)",
            params![
                number,
                new.customer_first_name,
                new.customer_last_name,
                new.customer_phone,
                new.product,
                new.description,
                new.repair_cost,
                status,
                now,
                picked_up_at,
                new.customer_note,
            ],
        )?;
        let ticket_id = tx.last_insert_rowid();
        append_status_change(&tx, ticket_id, None, status, now, "Ticket created")?;
        tx.commit()?;

        tracing::info!(ticket = %number, %status, "created ticket");
        Ok(number)
    }

    /// Get a ticket by number, deleted ones included
    pub fn get_ticket(&self, ticket_number: &str) -> Result<Option<Ticket>> {
        find_ticket(&self.conn, ticket_number)
    }

    /// All non-deleted tickets, newest first
    pub fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE status != ?1
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tickets = stmt
            .query_map(params![Status::Deleted], ticket_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tickets)
    }

    /// Tickets in one status, newest first
    pub fn list_by_status(&self, status: Status) -> Result<Vec<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE status = ?1
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tickets = stmt
            .query_map(params![status], ticket_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tickets)
    }

    /// Case-insensitive search over number, names, phone and product
    pub fn search_tickets(&self, term: &str) -> Result<Vec<Ticket>> {
        // SQLite LIKE only folds ASCII, so names with accents are matched here.
        let mut tickets = self.list_tickets()?;
        tickets.retain(|t| t.matches(term));
        Ok(tickets)
    }

    /// Apply a partial update. Returns `false` if the ticket does not exist.
    pub fn update_ticket(&mut self, ticket_number: &str, patch: &TicketPatch) -> Result<bool> {
        let patch = patch.validated()?;

        let tx = self.conn.transaction()?;
        let Some(current) = find_ticket(&tx, ticket_number)? else {
            tracing::debug!(ticket = %ticket_number, "update skipped, ticket not found");
            return Ok(false);
        };

        let now = Utc::now().max(current.created_at);
        let mut next = current.clone();
        patch.apply_to(&mut next);
        next.updated_at = now;

        let status_changed = next.status != current.status;
        if status_changed && next.status == Status::PickedUp && next.picked_up_at.is_none() {
            next.picked_up_at = Some(now);
        }

        tx.execute(
            "UPDATE tickets SET customer_first_name = ?2, customer_last_name = ?3,
             customer_phone = ?4, product = ?5, description = ?6, repair_cost_cents = ?7,
             status = ?8, updated_at = ?9, picked_up_at = ?10, customer_note = ?11
             WHERE id = ?1",
            params![
                current.id,
                next.customer_first_name,
                next.customer_last_name,
                next.customer_phone,
                next.product,
                next.description,
                next.repair_cost,
                next.status,
                next.updated_at,
                next.picked_up_at,
                next.customer_note,
            ],
        )?;

        if status_changed {
            let note = format!("Status changed to {}", next.status);
            append_status_change(
                &tx,
                current.id,
                Some(current.status),
                next.status,
                now,
                &note,
            )?;
        }
        tx.commit()?;

        if status_changed {
            tracing::info!(
                ticket = %ticket_number,
                from = %current.status,
                to = %next.status,
                "updated ticket status"
            );
        } else {
            tracing::info!(ticket = %ticket_number, "updated ticket");
        }
        Ok(true)
    }

    /// Soft delete. Returns `false` if the ticket does not exist.
    pub fn delete_ticket(&mut self, ticket_number: &str) -> Result<bool> {
        self.update_ticket(ticket_number, &TicketPatch::status(Status::Deleted))
    }

    /// Ticket counts per status, deleted tickets excluded
    pub fn get_statistics(&self) -> Result<Statistics> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM tickets WHERE status != ?1 GROUP BY status",
        )?;
        let rows = stmt
            .query_map(params![Status::Deleted], |row| {
                Ok((row.get::<_, Status>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats = Statistics::default();
        for (status, count) in rows {
            stats.record(status, count.max(0) as u64);
        }
        Ok(stats)
    }

    /// Status history of a ticket, oldest first. `None` if the ticket does not exist.
    pub fn ticket_history(&self, ticket_number: &str) -> Result<Option<Vec<StatusChange>>> {
        let Some(ticket) = self.get_ticket(ticket_number)? else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, ticket_id, previous_status, new_status, changed_at, note
             FROM status_changes WHERE ticket_id = ?1 ORDER BY id",
        )?;
        let changes = stmt
            .query_map(params![ticket.id], |row| {
                Ok(StatusChange {
                    id: row.get("id")?,
                    ticket_id: row.get("ticket_id")?,
                    previous_status: row.get("previous_status")?,
                    new_status: row.get("new_status")?,
                    changed_at: row.get("changed_at")?,
                    note: row.get("note")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(changes))
    }
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get("id")?,
        ticket_number: row.get("ticket_number")?,
        customer_first_name: row.get("customer_first_name")?,
        customer_last_name: row.get("customer_last_name")?,
        customer_phone: row.get("customer_phone")?,
        product: row.get("product")?,
        description: row.get("description")?,
        repair_cost: row.get("repair_cost_cents")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        picked_up_at: row.get("picked_up_at")?,
        customer_note: row.get("customer_note")?,
    })
}

fn find_ticket(conn: &Connection, ticket_number: &str) -> Result<Option<Ticket>> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_number = ?1");
    let ticket = conn
        .query_row(&sql, params![ticket_number], ticket_from_row)
        .optional()?;
    Ok(ticket)
}

fn read_counter(conn: &Connection) -> Result<u64> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT value FROM counters WHERE name = ?1",
            params![TICKET_COUNTER],
            |row| row.get(0),
        )
        .optional()?;
    let value = value.unwrap_or(0);
    u64::try_from(value).map_err(|_| {
        Error::InvalidTicketNumber(format!("counter holds a negative value: {}", value))
    })
}

/// Increment the counter and format the new number. Runs inside the caller's transaction.
fn issue_ticket_number(conn: &Connection, prefix: &str) -> Result<String> {
    let changed = conn.execute(
        "UPDATE counters SET value = value + 1 WHERE name = ?1",
        params![TICKET_COUNTER],
    )?;
    if changed == 0 {
        conn.execute(
            "INSERT INTO counters (name, value) VALUES (?1, 1)",
            params![TICKET_COUNTER],
        )?;
    }
    let sequence = read_counter(conn)?;
    Ok(format_ticket_number(prefix, sequence))
}

fn append_status_change(
    conn: &Connection,
    ticket_id: i64,
    previous: Option<Status>,
    new: Status,
    changed_at: DateTime<Utc>,
    note: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO status_changes (ticket_id, previous_status, new_status, changed_at, note)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![ticket_id, previous, new, changed_at, note],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cost;

    fn store() -> TicketStore {
        TicketStore::open_in_memory("FIX").unwrap()
    }

    fn new_ticket(first: &str, last: &str, product: &str) -> NewTicket {
        NewTicket::new(first, last, "11 5555-0000", product)
    }

    fn history_len(store: &TicketStore) -> i64 {
        store
            .conn
            .query_row("SELECT COUNT(*) FROM status_changes", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_next_ticket_number_is_sequential() {
        let mut store = store();
        let numbers: Vec<_> = (0..5).map(|_| store.next_ticket_number().unwrap()).collect();
        assert_eq!(
            numbers,
            ["FIX-000001", "FIX-000002", "FIX-000003", "FIX-000004", "FIX-000005"]
        );
        assert_eq!(store.counter_value().unwrap(), 5);
    }

    #[test]
    fn test_create_and_get() {
        let mut store = store();
        let mut input = new_ticket("Ana", "García", "iPhone 12");
        input.description = Some("Screen cracked".into());
        input.customer_note = Some("Screen replaced".into());

        let number = store.create_ticket(&input).unwrap();
        assert_eq!(number, "FIX-000001");

        let ticket = store.get_ticket(&number).unwrap().unwrap();
        assert_eq!(ticket.customer_first_name, "Ana");
        assert_eq!(ticket.customer_last_name, "García");
        assert_eq!(ticket.product, "iPhone 12");
        assert_eq!(ticket.description.as_deref(), Some("Screen cracked"));
        assert_eq!(ticket.customer_note.as_deref(), Some("Screen replaced"));
        assert_eq!(ticket.repair_cost, None);
        assert_eq!(ticket.status, Status::Pending);
        assert_eq!(ticket.created_at, ticket.updated_at);
        assert_eq!(ticket.picked_up_at, None);

        let history = store.ticket_history(&number).unwrap().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_status, None);
        assert_eq!(history[0].new_status, Status::Pending);
        assert_eq!(history[0].note, "Ticket created");
    }

    #[test]
    fn test_create_rejects_missing_fields_without_writing() {
        let mut store = store();
        let result = store.create_ticket(&new_ticket("", "García", "Phone"));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.counter_value().unwrap(), 0);
        assert_eq!(history_len(&store), 0);
    }

    #[test]
    fn test_create_as_picked_up_stamps_pickup() {
        let mut store = store();
        let mut input = new_ticket("Ana", "García", "Phone");
        input.status = Some(Status::PickedUp);
        let number = store.create_ticket(&input).unwrap();

        let ticket = store.get_ticket(&number).unwrap().unwrap();
        assert_eq!(ticket.picked_up_at, Some(ticket.created_at));
    }

    #[test]
    fn test_failed_create_rolls_back_counter() {
        let mut store = store();
        // Occupy the number the counter will hand out next.
        store
            .conn
            .execute(
                "INSERT INTO tickets (ticket_number, customer_first_name, customer_last_name,
                 customer_phone, product, created_at, updated_at)
                 VALUES ('FIX-000001', 'x', 'y', '1', 'p', '2024-01-01', '2024-01-01')",
                [],
            )
            .unwrap();

        let result = store.create_ticket(&new_ticket("Ana", "García", "Phone"));
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(store.counter_value().unwrap(), 0);
        assert_eq!(history_len(&store), 0);
    }

    #[test]
    fn test_update_missing_ticket() {
        let mut store = store();
        store.create_ticket(&new_ticket("Ana", "García", "Phone")).unwrap();
        let before = history_len(&store);

        let updated = store
            .update_ticket("FIX-999999", &TicketPatch::status(Status::Done))
            .unwrap();
        assert!(!updated);
        assert_eq!(history_len(&store), before);
        assert_eq!(store.counter_value().unwrap(), 1);
        assert!(!store.delete_ticket("FIX-999999").unwrap());
    }

    #[test]
    fn test_status_change_appends_history() {
        let mut store = store();
        let number = store.create_ticket(&new_ticket("Ana", "García", "Phone")).unwrap();

        assert!(store
            .update_ticket(&number, &TicketPatch::status(Status::InProgress))
            .unwrap());
        let history = store.ticket_history(&number).unwrap().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].previous_status, Some(Status::Pending));
        assert_eq!(history[1].new_status, Status::InProgress);
        assert_eq!(history[1].note, "Status changed to in_progress");

        // Same status again: no new history row.
        store
            .update_ticket(&number, &TicketPatch::status(Status::InProgress))
            .unwrap();
        assert_eq!(store.ticket_history(&number).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_pickup_timestamp_set_once() {
        let mut store = store();
        let number = store.create_ticket(&new_ticket("Ana", "García", "Phone")).unwrap();

        store
            .update_ticket(&number, &TicketPatch::status(Status::PickedUp))
            .unwrap();
        let first = store.get_ticket(&number).unwrap().unwrap();
        let picked_up_at = first.picked_up_at.expect("pickup stamped");
        assert!(picked_up_at >= first.created_at);

        store
            .update_ticket(&number, &TicketPatch::status(Status::Done))
            .unwrap();
        store
            .update_ticket(&number, &TicketPatch::status(Status::PickedUp))
            .unwrap();
        let again = store.get_ticket(&number).unwrap().unwrap();
        assert_eq!(again.picked_up_at, Some(picked_up_at));
    }

    #[test]
    fn test_update_fields_refreshes_updated_at() {
        let mut store = store();
        let number = store.create_ticket(&new_ticket("Ana", "García", "Phone")).unwrap();
        let created = store.get_ticket(&number).unwrap().unwrap();

        let patch = TicketPatch {
            customer_phone: Some("+54 11 4444-0000".into()),
            repair_cost: Some(Some("150.50".parse().unwrap())),
            customer_note: Some(Some("Battery replaced".into())),
            ..TicketPatch::default()
        };
        assert!(store.update_ticket(&number, &patch).unwrap());

        let updated = store.get_ticket(&number).unwrap().unwrap();
        assert_eq!(updated.customer_phone, "+54 11 4444-0000");
        assert_eq!(updated.repair_cost, Some(Cost::from_cents(15050).unwrap()));
        assert_eq!(updated.customer_note.as_deref(), Some("Battery replaced"));
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(history_len(&store), 1);
    }

    #[test]
    fn test_update_validates_before_writing() {
        let mut store = store();
        let number = store.create_ticket(&new_ticket("Ana", "García", "Phone")).unwrap();
        let before = store.get_ticket(&number).unwrap().unwrap();

        let patch = TicketPatch {
            product: Some("Tablet".into()),
            customer_phone: Some("not a phone".into()),
            ..TicketPatch::default()
        };
        assert!(matches!(
            store.update_ticket(&number, &patch),
            Err(Error::Validation(_))
        ));
        assert_eq!(store.get_ticket(&number).unwrap().unwrap(), before);
    }

    #[test]
    fn test_clear_repair_cost() {
        let mut store = store();
        let mut input = new_ticket("Ana", "García", "Phone");
        input.repair_cost = Some(Cost::from_cents(500).unwrap());
        let number = store.create_ticket(&input).unwrap();

        store
            .update_ticket(&number, &TicketPatch::repair_cost(None))
            .unwrap();
        assert_eq!(store.get_ticket(&number).unwrap().unwrap().repair_cost, None);
    }

    #[test]
    fn test_list_orders_newest_first_and_hides_deleted() {
        let mut store = store();
        let a = store.create_ticket(&new_ticket("Ana", "García", "Phone")).unwrap();
        let b = store.create_ticket(&new_ticket("Luis", "Pérez", "Tablet")).unwrap();
        let c = store.create_ticket(&new_ticket("Marta", "Suárez", "Laptop")).unwrap();
        store.delete_ticket(&b).unwrap();

        let listed: Vec<_> = store
            .list_tickets()
            .unwrap()
            .into_iter()
            .map(|t| t.ticket_number)
            .collect();
        assert_eq!(listed, [c, a]);

        // Deleted tickets stay readable by number.
        let deleted = store.get_ticket(&b).unwrap().unwrap();
        assert_eq!(deleted.status, Status::Deleted);
        assert_eq!(store.list_by_status(Status::Deleted).unwrap().len(), 1);
        assert_eq!(store.list_by_status(Status::Pending).unwrap().len(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mut store = store();
        let garcia = store.create_ticket(&new_ticket("Ana", "Garcia", "Phone")).unwrap();
        store.create_ticket(&new_ticket("Luis", "Pérez", "Tablet")).unwrap();
        let product = store
            .create_ticket(&new_ticket("Marta", "Suárez", "GARCIA branded radio"))
            .unwrap();

        let found: Vec<_> = store
            .search_tickets("garcia")
            .unwrap()
            .into_iter()
            .map(|t| t.ticket_number)
            .collect();
        assert_eq!(found, [product, garcia]);

        assert_eq!(store.search_tickets("pérez").unwrap().len(), 1);
        assert_eq!(store.search_tickets("PÉREZ").unwrap().len(), 1);
        assert_eq!(store.search_tickets("fix-000002").unwrap().len(), 1);
        assert_eq!(store.search_tickets("").unwrap().len(), 3);
    }

    #[test]
    fn test_statistics() {
        let mut store = store();
        let first = store.create_ticket(&new_ticket("Ana", "García", "Phone")).unwrap();
        store.create_ticket(&new_ticket("Luis", "Pérez", "Tablet")).unwrap();
        let mut input = new_ticket("Marta", "Suárez", "Laptop");
        input.status = Some(Status::InProgress);
        store.create_ticket(&input).unwrap();
        store.delete_ticket(&first).unwrap();

        let stats = store.get_statistics().unwrap();
        assert_eq!(
            stats,
            Statistics {
                pending: 1,
                in_progress: 1,
                done: 0,
                picked_up: 0,
                total: 2,
            }
        );
    }

    #[test]
    fn test_history_of_missing_ticket() {
        let store = store();
        assert!(store.ticket_history("FIX-000001").unwrap().is_none());
    }

    #[test]
    fn test_open_rejects_bad_prefix() {
        assert!(matches!(
            TicketStore::open_in_memory("FIX-"),
            Err(Error::InvalidTicketNumber(_))
        ));
    }
}
