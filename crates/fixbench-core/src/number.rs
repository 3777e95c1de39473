//! Ticket numbers
//!
//! Public ticket identifiers are sequential and human friendly.
//! Format: PREFIX-NNNNNN (sequence zero-padded to 6 digits)

use crate::Error;

/// Width of the zero-padded sequence part
pub const SEQUENCE_WIDTH: usize = 6;

/// Format a ticket number from a prefix and a sequence value
pub fn format_ticket_number(prefix: &str, sequence: u64) -> String {
    format!("{}-{:0width$}", prefix, sequence, width = SEQUENCE_WIDTH)
}

/// Split a ticket number into prefix and sequence
pub fn parse_ticket_number(number: &str) -> Option<(&str, u64)> {
    let (prefix, digits) = number.rsplit_once('-')?;
    if prefix.is_empty() || digits.len() < SEQUENCE_WIDTH {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|seq| (prefix, seq))
}

/// Check that a prefix is usable in ticket numbers
pub fn validate_prefix(prefix: &str) -> crate::Result<()> {
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidTicketNumber(format!(
            "prefix must be non-empty ASCII letters or digits, got {:?}",
            prefix
        )));
    }
    Ok(())
}
