//! Ticket data model for fixbench
//!
//! One ticket per repair job, plus the typed inputs used to create and
//! update tickets and the audit rows written on status changes.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::{Cost, Error};

/// Ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Done,
    PickedUp,
    /// Soft-deleted, hidden from listings and statistics
    Deleted,
}

impl Status {
    /// Statuses an operator can pick, in workflow order
    pub const ACTIVE: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Done,
        Status::PickedUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Done => "done",
            Status::PickedUp => "picked_up",
            Status::Deleted => "deleted",
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Status::Deleted)
    }

    /// Human label used on receipts and in terminal output
    pub fn label(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In progress",
            Status::Done => "Done",
            Status::PickedUp => "Picked up",
            Status::Deleted => "Deleted",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "in_progress" | "in-progress" | "inprogress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            "picked_up" | "picked-up" | "pickedup" => Ok(Status::PickedUp),
            "deleted" => Ok(Status::Deleted),
            _ => Err(crate::Error::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

/// A repair ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Internal row id, only used for joins
    #[serde(skip)]
    pub id: i64,

    /// Public identifier (PREFIX-NNNNNN)
    pub ticket_number: String,

    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_phone: String,

    /// Device or product being repaired
    pub product: String,

    /// Internal technical notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Quoted price; `None` until quoted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair_cost: Option<Cost>,

    pub status: Status,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set on the first transition into `picked_up`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked_up_at: Option<DateTime<Utc>>,

    /// Note shown to the customer in messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_note: Option<String>,
}

impl Ticket {
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.customer_first_name, self.customer_last_name)
    }

    /// Case-insensitive substring match over the searchable fields
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            &self.ticket_number,
            &self.customer_first_name,
            &self.customer_last_name,
            &self.customer_phone,
            &self.product,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} - {}",
            self.ticket_number,
            self.status,
            self.customer_name(),
            self.product
        )
    }
}

/// Input for creating a ticket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTicket {
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_phone: String,
    pub product: String,
    pub description: Option<String>,
    pub repair_cost: Option<Cost>,
    /// Initial status, `pending` when absent
    pub status: Option<Status>,
    pub customer_note: Option<String>,
}

impl NewTicket {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        Self {
            customer_first_name: first_name.into(),
            customer_last_name: last_name.into(),
            customer_phone: phone.into(),
            product: product.into(),
            ..Self::default()
        }
    }

    /// Check required fields and return a trimmed copy
    pub fn validated(&self) -> crate::Result<NewTicket> {
        let status = self.status.unwrap_or_default();
        if status.is_deleted() {
            return Err(Error::validation("a ticket cannot be created as deleted"));
        }
        Ok(NewTicket {
            customer_first_name: required("customer first name", &self.customer_first_name)?,
            customer_last_name: required("customer last name", &self.customer_last_name)?,
            customer_phone: phone(&self.customer_phone)?,
            product: required("product", &self.product)?,
            description: optional_text(self.description.as_deref()),
            repair_cost: self.repair_cost,
            status: Some(status),
            customer_note: optional_text(self.customer_note.as_deref()),
        })
    }
}

/// Partial update over the mutable ticket fields
///
/// `None` leaves a field untouched. For optional fields, `Some(None)` clears
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketPatch {
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub customer_phone: Option<String>,
    pub product: Option<String>,
    pub description: Option<Option<String>>,
    pub repair_cost: Option<Option<Cost>>,
    pub status: Option<Status>,
    pub customer_note: Option<Option<String>>,
}

impl TicketPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn repair_cost(cost: Option<Cost>) -> Self {
        Self {
            repair_cost: Some(cost),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check present fields and return a trimmed copy
    pub fn validated(&self) -> crate::Result<TicketPatch> {
        Ok(TicketPatch {
            customer_first_name: self
                .customer_first_name
                .as_deref()
                .map(|v| required("customer first name", v))
                .transpose()?,
            customer_last_name: self
                .customer_last_name
                .as_deref()
                .map(|v| required("customer last name", v))
                .transpose()?,
            customer_phone: self.customer_phone.as_deref().map(phone).transpose()?,
            product: self
                .product
                .as_deref()
                .map(|v| required("product", v))
                .transpose()?,
            description: self
                .description
                .as_ref()
                .map(|v| optional_text(v.as_deref())),
            repair_cost: self.repair_cost,
            status: self.status,
            customer_note: self
                .customer_note
                .as_ref()
                .map(|v| optional_text(v.as_deref())),
        })
    }

    /// Copy the present fields onto a ticket
    pub fn apply_to(&self, ticket: &mut Ticket) {
        if let Some(v) = &self.customer_first_name {
            ticket.customer_first_name = v.clone();
        }
        if let Some(v) = &self.customer_last_name {
            ticket.customer_last_name = v.clone();
        }
        if let Some(v) = &self.customer_phone {
            ticket.customer_phone = v.clone();
        }
        if let Some(v) = &self.product {
            ticket.product = v.clone();
        }
        if let Some(v) = &self.description {
            ticket.description = v.clone();
        }
        if let Some(v) = self.repair_cost {
            ticket.repair_cost = v;
        }
        if let Some(v) = self.status {
            ticket.status = v;
        }
        if let Some(v) = &self.customer_note {
            ticket.customer_note = v.clone();
        }
    }
}

/// Audit row written when a ticket is created or its status changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub ticket_id: i64,
    /// `None` for the creation event
    pub previous_status: Option<Status>,
    pub new_status: Status,
    pub changed_at: DateTime<Utc>,
    pub note: String,
}

/// Ticket counts per status, deleted tickets excluded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub pending: u64,
    pub in_progress: u64,
    pub done: u64,
    pub picked_up: u64,
    pub total: u64,
}

impl Statistics {
    pub fn get(&self, status: Status) -> u64 {
        match status {
            Status::Pending => self.pending,
            Status::InProgress => self.in_progress,
            Status::Done => self.done,
            Status::PickedUp => self.picked_up,
            Status::Deleted => 0,
        }
    }

    pub(crate) fn record(&mut self, status: Status, count: u64) {
        match status {
            Status::Pending => self.pending += count,
            Status::InProgress => self.in_progress += count,
            Status::Done => self.done += count,
            Status::PickedUp => self.picked_up += count,
            Status::Deleted => return,
        }
        self.total += count;
    }
}

fn required(field: &str, value: &str) -> crate::Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn phone(value: &str) -> crate::Result<String> {
    let value = required("customer phone", value)?;
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '+');
    if !value.chars().all(allowed) || !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "invalid customer phone: {:?}",
            value
        )));
    }
    Ok(value)
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
