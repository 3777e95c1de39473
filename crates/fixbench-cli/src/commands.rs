//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Local, Utc};
use colored::{ColoredString, Colorize};
use fixbench_core::config::format_date;
use fixbench_core::{
    Config, Cost, MessageComposer, MessageKind, NewTicket, Receipt, Status, Ticket, TicketPatch,
    TicketStore, export_csv, suggested_notifications, whatsapp_url,
};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Settings shared by every command
pub struct Context {
    pub config_path: PathBuf,
    pub config: Config,
    db: Option<PathBuf>,
    pub json: bool,
}

impl Context {
    pub fn load(config_path: PathBuf, db: Option<PathBuf>, json: bool) -> Result<Self> {
        let config = Config::load(&config_path)?;
        if !config.display.colors {
            colored::control::set_override(false);
        }
        Ok(Self {
            config_path,
            config,
            db,
            json,
        })
    }

    fn database_path(&self) -> PathBuf {
        self.db
            .clone()
            .unwrap_or_else(|| self.config.database_path())
    }

    fn open_store(&self) -> Result<TicketStore> {
        Ok(TicketStore::open(&self.database_path(), &self.config.prefix)?)
    }

    fn date(&self, at: &DateTime<Utc>) -> String {
        format_date(&at.with_timezone(&Local), &self.config.display.date_format)
    }

    fn money(&self, cost: Option<Cost>) -> String {
        cost.map(|c| c.format_with(&self.config.business.currency_symbol))
            .unwrap_or_else(|| "-".to_string())
    }
}

pub struct CreateArgs {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub product: String,
    pub description: Option<String>,
    pub cost: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
}

pub struct UpdateArgs {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub product: Option<String>,
    pub description: Option<String>,
    pub cost: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
    pub clear_description: bool,
    pub clear_cost: bool,
    pub clear_note: bool,
}

#[derive(Tabled)]
struct TicketRow {
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Device")]
    product: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Created")]
    created: String,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Tickets")]
    count: u64,
}

fn status_colored(status: Status) -> ColoredString {
    match status {
        Status::Pending => status.label().white(),
        Status::InProgress => status.label().yellow(),
        Status::Done => status.label().green(),
        Status::PickedUp => status.label().blue(),
        Status::Deleted => status.label().dimmed(),
    }
}

fn find(store: &TicketStore, number: &str) -> Result<Ticket> {
    store
        .get_ticket(number)?
        .ok_or_else(|| anyhow!("Ticket not found: {}", number))
}

fn print_tickets(ctx: &Context, tickets: &[Ticket]) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string(tickets)?);
        return Ok(());
    }
    if tickets.is_empty() {
        println!("No tickets found");
        return Ok(());
    }

    let rows = tickets.iter().map(|t| TicketRow {
        number: t.ticket_number.clone(),
        customer: t.customer_name(),
        phone: t.customer_phone.clone(),
        product: t.product.clone(),
        status: t.status.label(),
        cost: ctx.money(t.repair_cost),
        created: ctx.date(&t.created_at),
    });
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("{} ticket(s)", tickets.len());
    Ok(())
}

fn print_suggestions(number: &str, kinds: &[MessageKind]) {
    if kinds.is_empty() {
        return;
    }
    println!();
    println!("{}", "Notify the customer:".bold());
    for kind in kinds {
        println!(
            "  {} fixbench message {} {}",
            kind.label().cyan(),
            number,
            kind.as_str().replace('_', "-")
        );
    }
}

fn parse_status(s: &str) -> Result<Status> {
    let status: Status = s.parse()?;
    if status.is_deleted() {
        bail!("Use `fixbench delete` to delete a ticket");
    }
    Ok(status)
}

pub fn init(ctx: &Context) -> Result<()> {
    let created_config = !ctx.config_path.exists();
    if created_config {
        if let Some(parent) = ctx.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&ctx.config_path, Config::default_with_comments())?;
    }

    let store = ctx.open_store()?;
    let db_path = ctx.database_path();

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({
                "config": ctx.config_path,
                "database": db_path,
                "prefix": store.prefix(),
                "counter": store.counter_value()?,
            })
        );
    } else {
        println!("{} Initialized fixbench", "✓".green());
        println!(
            "  Config:   {}{}",
            ctx.config_path.display(),
            if created_config { " (created)" } else { "" }
        );
        println!("  Database: {}", db_path.display());
        println!("  Ticket prefix: {}", store.prefix());
    }
    Ok(())
}

pub fn create(ctx: &Context, args: CreateArgs) -> Result<()> {
    let mut store = ctx.open_store()?;

    let mut new = NewTicket::new(args.first_name, args.last_name, args.phone, args.product);
    new.description = args.description;
    new.repair_cost = args.cost.as_deref().map(str::parse::<Cost>).transpose()?;
    new.status = args.status.as_deref().map(parse_status).transpose()?;
    new.customer_note = args.note;

    let number = store.create_ticket(&new)?;
    let ticket = find(&store, &number)?;

    if ctx.json {
        println!("{}", serde_json::to_string(&ticket)?);
    } else {
        println!("{} Created ticket: {}", "✓".green(), number.cyan().bold());
        println!("  Customer: {}", ticket.customer_name());
        println!("  Device:   {}", ticket.product);
        println!("  Status:   {}", status_colored(ticket.status));
        println!();
        println!("Print the receipt with: fixbench receipt {}", number);
    }
    Ok(())
}

pub fn list(ctx: &Context, status: Option<String>) -> Result<()> {
    let store = ctx.open_store()?;
    let tickets = match status {
        Some(s) => store.list_by_status(s.parse()?)?,
        None => store.list_tickets()?,
    };
    print_tickets(ctx, &tickets)
}

pub fn search(ctx: &Context, term: &str) -> Result<()> {
    let store = ctx.open_store()?;
    let tickets = store.search_tickets(term)?;
    print_tickets(ctx, &tickets)
}

pub fn show(ctx: &Context, number: &str) -> Result<()> {
    let store = ctx.open_store()?;
    let ticket = find(&store, number)?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&ticket)?);
        return Ok(());
    }

    println!(
        "{} {}",
        ticket.ticket_number.cyan().bold(),
        ticket.customer_name().bold()
    );
    println!();
    println!("Status:   {}", status_colored(ticket.status));
    println!("Phone:    {}", ticket.customer_phone);
    println!("Device:   {}", ticket.product);
    println!("Cost:     {}", ctx.money(ticket.repair_cost));
    println!("Created:  {}", ctx.date(&ticket.created_at));
    println!("Updated:  {}", ctx.date(&ticket.updated_at));
    if let Some(at) = &ticket.picked_up_at {
        println!("Picked up: {}", ctx.date(at));
    }
    if let Some(desc) = &ticket.description {
        println!();
        println!("{}", "Description:".bold());
        println!("{}", desc);
    }
    if let Some(note) = &ticket.customer_note {
        println!();
        println!("{}", "Customer note:".bold());
        println!("{}", note);
    }
    Ok(())
}

/// Apply a patch, then report the change and any notifications worth sending
fn apply_patch(ctx: &Context, number: &str, patch: &TicketPatch) -> Result<()> {
    let mut store = ctx.open_store()?;
    let before = find(&store, number)?;
    if !store.update_ticket(number, patch)? {
        bail!("Ticket not found: {}", number);
    }
    let after = find(&store, number)?;
    let suggestions = suggested_notifications(&before, &after);

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({
                "ticket": after,
                "suggested_messages": suggestions.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
            })
        );
        return Ok(());
    }

    if before.status != after.status {
        println!(
            "{} {}: {} -> {}",
            "✓".green(),
            number,
            status_colored(before.status),
            status_colored(after.status)
        );
    } else {
        println!("{} Updated {}", "✓".green(), number);
    }
    print_suggestions(number, &suggestions);
    Ok(())
}

pub fn update(ctx: &Context, number: &str, args: UpdateArgs) -> Result<()> {
    let patch = TicketPatch {
        customer_first_name: args.first_name,
        customer_last_name: args.last_name,
        customer_phone: args.phone,
        product: args.product,
        description: if args.clear_description {
            Some(None)
        } else {
            args.description.map(Some)
        },
        repair_cost: if args.clear_cost {
            Some(None)
        } else {
            args.cost
                .as_deref()
                .map(str::parse::<Cost>)
                .transpose()?
                .map(Some)
        },
        status: args.status.as_deref().map(parse_status).transpose()?,
        customer_note: if args.clear_note {
            Some(None)
        } else {
            args.note.map(Some)
        },
    };
    apply_patch(ctx, number, &patch)
}

pub fn set_status(ctx: &Context, number: &str, status: &str) -> Result<()> {
    let status = parse_status(status)?;
    apply_patch(ctx, number, &TicketPatch::status(status))
}

pub fn delete(ctx: &Context, number: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    if !store.delete_ticket(number)? {
        bail!("Ticket not found: {}", number);
    }

    if ctx.json {
        println!("{}", serde_json::json!({ "deleted": number }));
    } else {
        println!("{} Deleted {}", "✓".green(), number);
    }
    Ok(())
}

pub fn stats(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let stats = store.get_statistics()?;

    if ctx.json {
        println!("{}", serde_json::to_string(&stats)?);
        return Ok(());
    }

    let rows = Status::ACTIVE.iter().map(|s| CountRow {
        status: s.label(),
        count: stats.get(*s),
    });
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("{} {}", "Total:".bold(), stats.total);
    Ok(())
}

pub fn history(ctx: &Context, number: &str) -> Result<()> {
    let store = ctx.open_store()?;
    let changes = store
        .ticket_history(number)?
        .ok_or_else(|| anyhow!("Ticket not found: {}", number))?;

    if ctx.json {
        println!("{}", serde_json::to_string(&changes)?);
        return Ok(());
    }

    println!("{} {}", "History of".bold(), number.cyan().bold());
    for change in &changes {
        let transition = match change.previous_status {
            Some(prev) => format!("{} -> {}", prev.label(), status_colored(change.new_status)),
            None => status_colored(change.new_status).to_string(),
        };
        println!(
            "  {}  {}  {}",
            ctx.date(&change.changed_at).dimmed(),
            transition,
            change.note
        );
    }
    Ok(())
}

pub fn receipt(
    ctx: &Context,
    number: &str,
    output: Option<PathBuf>,
    open: bool,
    text: bool,
) -> Result<()> {
    let store = ctx.open_store()?;
    let ticket = find(&store, number)?;
    let receipt = Receipt::new(&ticket, &ctx.config.business, &ctx.config.receipt);

    if text {
        print!("{}", receipt.render_text());
        return Ok(());
    }

    let path = output.unwrap_or_else(|| receipt.path_in(&ctx.config.receipt_dir()));
    receipt.write_pdf(&path)?;

    if ctx.json {
        println!("{}", serde_json::json!({ "ticket": number, "path": path }));
    } else {
        println!("{} Receipt written to {}", "✓".green(), path.display());
    }
    if open {
        crate::launch::open(&path.to_string_lossy())?;
    }
    Ok(())
}

pub fn message(ctx: &Context, number: &str, kind: MessageKind, open: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let ticket = find(&store, number)?;
    let text = MessageComposer::new(&ctx.config.business).compose(&kind, &ticket)?;
    let url = whatsapp_url(&ticket.customer_phone, &text, &ctx.config.messaging)?;

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({
                "ticket": number,
                "kind": kind.as_str(),
                "text": text,
                "url": url,
            })
        );
    } else {
        println!("{} for {}", kind.label().bold(), ticket.customer_name());
        println!();
        println!("{}", text);
        println!();
        println!("{}", url.dimmed());
    }
    if open {
        crate::launch::open(&url)?;
    }
    Ok(())
}

pub fn export(ctx: &Context, path: &Path) -> Result<()> {
    let store = ctx.open_store()?;
    let tickets = store.list_tickets()?;

    if path.as_os_str() == "-" {
        export_csv(&tickets, std::io::stdout().lock())?;
        return Ok(());
    }

    let file = std::fs::File::create(path)?;
    let rows = export_csv(&tickets, file)?;
    if ctx.json {
        println!("{}", serde_json::json!({ "path": path, "rows": rows }));
    } else {
        println!("{} Exported {} ticket(s) to {}", "✓".green(), rows, path.display());
    }
    Ok(())
}

pub fn config_show(ctx: &Context) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    } else {
        println!(
            "{} {}",
            "Current configuration:".bold(),
            ctx.config_path.display().to_string().dimmed()
        );
        println!();
        print!("{}", toml::to_string_pretty(&ctx.config)?);
    }
    Ok(())
}

pub fn config_path(path: &Path, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "path": path }));
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

/// Edit configuration file
pub fn config_edit(path: &Path) -> Result<()> {
    if !path.exists() {
        write_default_config(path)?;
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "vi".to_string());

    let status = std::process::Command::new(&editor)
        .arg(path)
        .status()?;

    if !status.success() {
        bail!("Editor exited with non-zero status");
    }

    // Validate the config after editing
    match Config::load(path) {
        Ok(_) => println!("{} Configuration saved", "✓".green()),
        Err(e) => {
            println!(
                "{} Warning: Configuration may be invalid: {}",
                "!".yellow(),
                e
            );
        }
    }
    Ok(())
}

/// Reset configuration to defaults
pub fn config_reset(path: &Path) -> Result<()> {
    write_default_config(path)?;
    println!("{} Configuration reset to defaults", "✓".green());
    Ok(())
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default_with_comments())?;
    Ok(())
}

/// Get a specific config value
pub fn config_get(ctx: &Context, key: &str) -> Result<()> {
    let config_json = serde_json::to_value(&ctx.config)?;

    let mut value = &config_json;
    for part in key.split('.') {
        value = value
            .get(part)
            .ok_or_else(|| anyhow!("Config key not found: {}", key))?;
    }

    if ctx.json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        match value {
            serde_json::Value::String(s) => println!("{}", s),
            serde_json::Value::Bool(b) => println!("{}", b),
            serde_json::Value::Number(n) => println!("{}", n),
            serde_json::Value::Null => println!("null"),
            _ => println!("{}", serde_json::to_string_pretty(value)?),
        }
    }
    Ok(())
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.trim().is_empty()).then(|| PathBuf::from(value))
}

/// Set a config value
pub fn config_set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut config = ctx.config.clone();
    let text = || value.to_string();

    match key {
        "prefix" => {
            fixbench_core::number::validate_prefix(value)?;
            config.prefix = text();
        }
        "database" => config.database = optional_path(value),
        "business.name" => config.business.name = text(),
        "business.slogan" => config.business.slogan = text(),
        "business.hours" => config.business.hours = text(),
        "business.address" => config.business.address = text(),
        "business.phone" => config.business.phone = text(),
        "business.mobile" => config.business.mobile = text(),
        "business.email" => config.business.email = text(),
        "business.extra" => config.business.extra = text(),
        "business.currency_symbol" => config.business.currency_symbol = text(),
        "receipt.output_dir" => config.receipt.output_dir = optional_path(value),
        "receipt.date_format" => config.receipt.date_format = text(),
        "messaging.country_code" => config.messaging.country_code = text(),
        "messaging.mobile_prefix" => config.messaging.mobile_prefix = text(),
        "messaging.mobile_prefix_exempt_areas" => {
            config.messaging.mobile_prefix_exempt_areas = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "messaging.base_url" => config.messaging.base_url = text(),
        "display.colors" => {
            config.display.colors = value
                .parse()
                .map_err(|_| anyhow!("Invalid boolean value: {}", value))?;
        }
        "display.date_format" => config.display.date_format = text(),
        _ => bail!("Unknown config key: {}", key),
    }

    config.validate()?;
    config.save(&ctx.config_path)?;
    println!("{} Set {} = {}", "✓".green(), key, value);
    Ok(())
}
