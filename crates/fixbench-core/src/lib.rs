//! fixbench-core: Core library for the fixbench repair ticket tracker
//!
//! Provides the ticket model and the SQLite-backed store, plus the documents
//! built from a ticket: printable receipts, customer messages with WhatsApp
//! links, and CSV exports.

pub mod config;
pub mod cost;
pub mod error;
pub mod export;
pub mod message;
pub mod number;
pub mod pdf;
pub mod receipt;
pub mod schema;
pub mod store;
pub mod ticket;
pub mod whatsapp;

pub use config::Config;
pub use cost::Cost;
pub use error::Error;
pub use export::export_csv;
pub use message::{MessageComposer, MessageKind, suggested_notifications};
pub use receipt::Receipt;
pub use store::TicketStore;
pub use ticket::{NewTicket, Statistics, Status, StatusChange, Ticket, TicketPatch};
pub use whatsapp::{normalize_phone, whatsapp_url};

/// Result type for fixbench operations
pub type Result<T> = std::result::Result<T, Error>;
