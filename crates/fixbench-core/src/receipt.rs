//! Printable repair receipts
//!
//! A receipt is built from one ticket and the business details. It renders
//! as plain text for the terminal or as a one-page PDF holding an ORIGINAL
//! and a COPY (see [`crate::pdf`]).

use std::path::{Path, PathBuf};

use crate::config::{BusinessInfo, ReceiptConfig, format_date};
use crate::Ticket;

/// Column width of the plain-text rendering
const TEXT_WIDTH: usize = 60;

/// Receipt contents, independent of the output format
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub ticket_number: String,
    pub intake_date: String,
    pub business_name: String,
    pub business_address: Option<String>,
    pub contact_line: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub product: String,
    /// Work description from the technician
    pub work: Option<String>,
    /// Formatted cost, only when a positive cost is quoted
    pub estimated_cost: Option<String>,
    pub terms: Vec<String>,
}

impl Receipt {
    pub fn new(ticket: &Ticket, business: &BusinessInfo, config: &ReceiptConfig) -> Self {
        let contact: Vec<String> = [
            (!business.phone.is_empty()).then(|| format!("Tel: {}", business.phone)),
            (!business.mobile.is_empty()).then(|| format!("Mobile: {}", business.mobile)),
            (!business.email.is_empty()).then(|| business.email.clone()),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            ticket_number: ticket.ticket_number.clone(),
            intake_date: format_date(&ticket.created_at, &config.date_format),
            business_name: business.name.clone(),
            business_address: non_empty(&business.address),
            contact_line: (!contact.is_empty()).then(|| contact.join(" | ")),
            customer_name: ticket.customer_name(),
            customer_phone: ticket.customer_phone.clone(),
            product: ticket.product.clone(),
            work: ticket.description.clone().filter(|d| !d.trim().is_empty()),
            estimated_cost: ticket
                .repair_cost
                .filter(|c| !c.is_zero())
                .map(|c| c.format_with(&business.currency_symbol)),
            terms: config.terms.clone(),
        }
    }

    /// Default file name: `receipt_<ticket_number>.pdf`
    pub fn file_name(&self) -> String {
        format!("receipt_{}.pdf", self.ticket_number)
    }

    /// Full path of the receipt inside `dir`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Render the ORIGINAL section as plain text
    pub fn render_text(&self) -> String {
        let mut out = Vec::new();
        out.push(center(&self.business_name, TEXT_WIDTH));
        if let Some(address) = &self.business_address {
            out.push(center(address, TEXT_WIDTH));
        }
        if let Some(contact) = &self.contact_line {
            out.push(center(contact, TEXT_WIDTH));
        }
        out.push("-".repeat(TEXT_WIDTH));
        out.push(center("REPAIR RECEIPT", TEXT_WIDTH));
        out.push(spread(
            &format!("No. {}", self.ticket_number),
            &format!("Date: {}", self.intake_date),
            TEXT_WIDTH,
        ));
        out.push(String::new());
        out.push("CUSTOMER".to_string());
        out.push(format!("Name:   {}", self.customer_name));
        out.push(format!("Phone:  {}", self.customer_phone));
        out.push(format!("Device: {}", self.product));
        for (i, line) in self.work_lines(TEXT_WIDTH - 8).iter().enumerate() {
            let label = if i == 0 { "Work:  " } else { "       " };
            out.push(format!("{} {}", label, line));
        }
        if let Some(cost) = &self.estimated_cost {
            out.push(String::new());
            out.push(center(&format!("ESTIMATED COST: {}", cost), TEXT_WIDTH));
        }
        out.push(String::new());
        out.push(format!("{:>width$}", "_".repeat(30), width = TEXT_WIDTH));
        out.push(format!("{:>width$}", "Customer signature", width = TEXT_WIDTH - 6));
        for term in &self.terms {
            out.push(center(term, TEXT_WIDTH));
        }

        let mut text = out
            .into_iter()
            .map(|l| l.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        text.push('\n');
        text
    }

    /// Render the two-part PDF
    pub fn render_pdf(&self) -> crate::Result<Vec<u8>> {
        crate::pdf::render_receipt(self)
    }

    /// Render the PDF and write it to `path`
    pub fn write_pdf(&self, path: &Path) -> crate::Result<()> {
        let bytes = self.render_pdf()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, bytes)?;
        tracing::info!(ticket = %self.ticket_number, "receipt written to {}", path.display());
        Ok(())
    }

    /// Work description wrapped to `width` characters
    pub fn work_lines(&self, width: usize) -> Vec<String> {
        self.work
            .as_deref()
            .map(|w| wrap(w, width))
            .unwrap_or_default()
    }
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed <= width || current.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    format!("{}{}", " ".repeat((width - len) / 2), text)
}

fn spread(left: &str, right: &str, width: usize) -> String {
    let used = left.chars().count() + right.chars().count();
    let gap = width.saturating_sub(used).max(1);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cost, Status};
    use chrono::{TimeZone, Utc};

    fn ticket() -> Ticket {
        let created = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0).unwrap();
        Ticket {
            id: 1,
            ticket_number: "FIX-000042".into(),
            customer_first_name: "Ana".into(),
            customer_last_name: "García".into(),
            customer_phone: "11 5555-1234".into(),
            product: "Notebook Lenovo".into(),
            description: Some("Replace keyboard and clean the fan".into()),
            repair_cost: Some(Cost::from_cents(1_550_000).unwrap()),
            status: Status::Pending,
            created_at: created,
            updated_at: created,
            picked_up_at: None,
            customer_note: None,
        }
    }

    fn business() -> BusinessInfo {
        BusinessInfo {
            name: "InstaFix".into(),
            address: "Av. Siempre Viva 742".into(),
            phone: "4555-0000".into(),
            email: "hola@instafix.test".into(),
            ..BusinessInfo::default()
        }
    }

    #[test]
    fn test_receipt_fields() {
        let receipt = Receipt::new(&ticket(), &business(), &ReceiptConfig::default());
        assert_eq!(receipt.intake_date, "14/03/2026");
        assert_eq!(receipt.customer_name, "Ana García");
        assert_eq!(receipt.estimated_cost.as_deref(), Some("$15,500.00"));
        assert_eq!(
            receipt.contact_line.as_deref(),
            Some("Tel: 4555-0000 | hola@instafix.test")
        );
        assert_eq!(receipt.file_name(), "receipt_FIX-000042.pdf");
    }

    #[test]
    fn test_zero_or_missing_cost_is_not_printed() {
        let mut t = ticket();
        t.repair_cost = Some(Cost::ZERO);
        let receipt = Receipt::new(&t, &business(), &ReceiptConfig::default());
        assert_eq!(receipt.estimated_cost, None);

        t.repair_cost = None;
        let receipt = Receipt::new(&t, &business(), &ReceiptConfig::default());
        assert!(!receipt.render_text().contains("ESTIMATED COST"));
    }

    #[test]
    fn test_render_text() {
        let receipt = Receipt::new(&ticket(), &business(), &ReceiptConfig::default());
        let text = receipt.render_text();
        assert!(text.contains("REPAIR RECEIPT"));
        assert!(text.contains("No. FIX-000042"));
        assert!(text.contains("Date: 14/03/2026"));
        assert!(text.contains("Device: Notebook Lenovo"));
        assert!(text.contains("Work:   Replace keyboard"));
        assert!(text.contains("ESTIMATED COST: $15,500.00"));
        assert!(text.contains("Customer signature"));
    }

    #[test]
    fn test_bad_date_format_does_not_panic() {
        let config = ReceiptConfig {
            date_format: "%d/%m/%Q".into(),
            ..ReceiptConfig::default()
        };
        let receipt = Receipt::new(&ticket(), &business(), &config);
        assert_eq!(receipt.intake_date, "2026-03-14");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three four", 9), ["one two", "three", "four"]);
        assert_eq!(wrap("supercalifragilistic ok", 5), ["supercalifragilistic", "ok"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_write_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let receipt = Receipt::new(&ticket(), &business(), &ReceiptConfig::default());
        let path = receipt.path_in(&dir.path().join("receipts"));
        receipt.write_pdf(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
