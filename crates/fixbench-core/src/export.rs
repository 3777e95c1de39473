//! CSV export of tickets

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Result, Ticket};

const HEADER: [&str; 11] = [
    "ticket_number",
    "customer_first_name",
    "customer_last_name",
    "customer_phone",
    "product",
    "description",
    "repair_cost",
    "status",
    "created_at",
    "updated_at",
    "picked_up_at",
];

/// Write `tickets` as CSV with a header row. Returns the number of rows written.
pub fn export_csv<W: Write>(tickets: &[Ticket], writer: W) -> Result<usize> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(HEADER)?;

    for t in tickets {
        let cost = t.repair_cost.map(|c| c.to_string()).unwrap_or_default();
        let picked_up = t.picked_up_at.as_ref().map(timestamp).unwrap_or_default();
        out.write_record([
            t.ticket_number.as_str(),
            t.customer_first_name.as_str(),
            t.customer_last_name.as_str(),
            t.customer_phone.as_str(),
            t.product.as_str(),
            t.description.as_deref().unwrap_or(""),
            cost.as_str(),
            t.status.as_str(),
            timestamp(&t.created_at).as_str(),
            timestamp(&t.updated_at).as_str(),
            picked_up.as_str(),
        ])?;
    }

    out.flush()?;
    tracing::debug!(rows = tickets.len(), "exported tickets to csv");
    Ok(tickets.len())
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cost, Status};
    use chrono::TimeZone;

    fn ticket(number: &str, cost: Option<i64>) -> Ticket {
        let at = Utc.with_ymd_and_hms(2026, 5, 2, 14, 0, 0).unwrap();
        Ticket {
            id: 1,
            ticket_number: number.into(),
            customer_first_name: "Ana".into(),
            customer_last_name: "García".into(),
            customer_phone: "11 5555-1234".into(),
            product: "Phone, cracked".into(),
            description: None,
            repair_cost: cost.map(|c| Cost::from_cents(c).unwrap()),
            status: Status::PickedUp,
            created_at: at,
            updated_at: at,
            picked_up_at: Some(at),
            customer_note: None,
        }
    }

    #[test]
    fn test_export_csv() {
        let mut buf = Vec::new();
        let rows = export_csv(
            &[ticket("FIX-000001", Some(15_050)), ticket("FIX-000002", None)],
            &mut buf,
        )
        .unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ticket_number,customer_first_name,"));
        assert_eq!(
            lines[1],
            "FIX-000001,Ana,García,11 5555-1234,\"Phone, cracked\",,150.50,picked_up,\
             2026-05-02T14:00:00Z,2026-05-02T14:00:00Z,2026-05-02T14:00:00Z"
        );
        assert!(lines[2].contains(",,,picked_up,"));
    }

    #[test]
    fn test_export_empty_writes_header() {
        let mut buf = Vec::new();
        assert_eq!(export_csv(&[], &mut buf).unwrap(), 0);
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
