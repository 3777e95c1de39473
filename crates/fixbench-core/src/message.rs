//! Customer notification texts
//!
//! Texts use WhatsApp markup: `*bold*` and `_italic_`.

use serde::{Deserialize, Serialize};

use crate::config::BusinessInfo;
use crate::{Error, Result, Status, Ticket};

/// Which notification to compose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "text")]
pub enum MessageKind {
    /// Repair cost quote, asks the customer to confirm
    CostQuote,
    ReadyForPickup,
    PickedUp,
    /// Free text with the business header and footer
    Custom(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::CostQuote => "cost_quote",
            MessageKind::ReadyForPickup => "ready_for_pickup",
            MessageKind::PickedUp => "picked_up",
            MessageKind::Custom(_) => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::CostQuote => "Cost quote",
            MessageKind::ReadyForPickup => "Ready for pickup",
            MessageKind::PickedUp => "Pickup confirmation",
            MessageKind::Custom(_) => "Custom message",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds notification texts for one business
pub struct MessageComposer<'a> {
    business: &'a BusinessInfo,
}

impl<'a> MessageComposer<'a> {
    pub fn new(business: &'a BusinessInfo) -> Self {
        Self { business }
    }

    pub fn compose(&self, kind: &MessageKind, ticket: &Ticket) -> Result<String> {
        match kind {
            MessageKind::CostQuote => self.cost_quote(ticket),
            MessageKind::ReadyForPickup => Ok(self.ready_for_pickup(ticket)),
            MessageKind::PickedUp => Ok(self.picked_up(ticket)),
            MessageKind::Custom(text) => self.custom(text),
        }
    }

    fn cost_quote(&self, ticket: &Ticket) -> Result<String> {
        let cost = ticket.repair_cost.ok_or_else(|| {
            Error::validation(format!("ticket {} has no repair cost", ticket.ticket_number))
        })?;

        let mut msg = self.header("🔧");
        msg.push_str(&format!("Hi {}!\n\n", ticket.customer_name()));
        msg.push_str(&format!("We have looked at your *{}*.\n\n", ticket.product));
        if let Some(note) = ticket.customer_note.as_deref().filter(|n| !n.trim().is_empty()) {
            msg.push_str(&format!("*About the repair:* {}\n\n", note.trim()));
        }
        msg.push_str(&format!(
            "*Repair cost:* {}\n\n",
            cost.format_with(&self.business.currency_symbol)
        ));
        msg.push_str("*Contact:*\n");
        self.push_visit_details(&mut msg);
        msg.push_str("\nPlease confirm if you want us to go ahead with the repair.\n\n");
        self.push_footer(&mut msg, "Thanks for trusting us!");
        Ok(msg)
    }

    fn ready_for_pickup(&self, ticket: &Ticket) -> String {
        let mut msg = self.header("✅");
        msg.push_str(&format!("Good news {}!\n\n", ticket.customer_name()));
        msg.push_str(&format!("Your *{}* is ready for pickup.\n\n", ticket.product));
        msg.push_str("*Pickup details:*\n");
        self.push_visit_details(&mut msg);
        msg.push_str("\nSee you soon.\n\n");
        self.push_footer(&mut msg, "Thanks for your patience!");
        msg
    }

    fn picked_up(&self, ticket: &Ticket) -> String {
        let mut msg = self.header("✅");
        msg.push_str(&format!(
            "This confirms that {} picked up the *{}*.\n\n",
            ticket.customer_name(),
            ticket.product
        ));
        msg.push_str("We hope everything works perfectly!\n\n");
        msg.push_str("*Stay in touch:*\n");
        if !self.business.mobile.is_empty() {
            msg.push_str(&format!("*WhatsApp:* {}\n", self.business.mobile));
        }
        if !self.business.phone.is_empty() {
            msg.push_str(&format!("*Phone:* {}\n", self.business.phone));
        }
        if !self.business.email.is_empty() {
            msg.push_str(&format!("*Email:* {}\n", self.business.email));
        }
        msg.push_str("\nIf anything goes wrong, do not hesitate to contact us.\n\n");
        self.push_footer(&mut msg, "Thanks for choosing us!");
        msg
    }

    fn custom(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("message text cannot be empty"));
        }
        let mut msg = self.header("💬");
        msg.push_str(text);
        msg.push_str("\n\n");
        self.push_footer(&mut msg, "Thanks!");
        Ok(msg)
    }

    fn header(&self, icon: &str) -> String {
        let mut msg = format!("{} *{}*", icon, self.business.name);
        if !self.business.slogan.is_empty() {
            msg.push_str(&format!("\n_{}_", self.business.slogan));
        }
        msg.push_str("\n\n");
        msg
    }

    fn push_visit_details(&self, msg: &mut String) {
        let b = self.business;
        msg.push_str(&format!("*Hours:* {}\n", b.hours));
        if !b.mobile.is_empty() {
            msg.push_str(&format!("*WhatsApp:* {}\n", b.mobile));
        }
        if !b.phone.is_empty() {
            msg.push_str(&format!("*Phone:* {}\n", b.phone));
        }
        if !b.address.is_empty() {
            msg.push_str(&format!("*Address:* {}\n", b.address));
        }
    }

    fn push_footer(&self, msg: &mut String, closing: &str) {
        if !self.business.extra.is_empty() {
            msg.push_str(&format!("{}\n\n", self.business.extra));
        }
        msg.push_str(closing);
    }
}

/// Notifications worth offering after a ticket changed from `before` to `after`
pub fn suggested_notifications(before: &Ticket, after: &Ticket) -> Vec<MessageKind> {
    let mut kinds = Vec::new();

    let quoted = |t: &Ticket| t.repair_cost.is_some_and(|c| !c.is_zero());
    if quoted(after) && after.repair_cost != before.repair_cost {
        kinds.push(MessageKind::CostQuote);
    }
    if before.status != after.status {
        match after.status {
            Status::Done => kinds.push(MessageKind::ReadyForPickup),
            Status::PickedUp => kinds.push(MessageKind::PickedUp),
            _ => {}
        }
    }
    kinds
}
