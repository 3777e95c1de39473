//! fixbench - Repair ticket tracker for small repair shops
//!
//! Tickets live in one SQLite file. Receipts are written as PDFs and customer
//! messages open in WhatsApp Web.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use fixbench_core::config::default_config_path;

mod commands;
mod launch;

#[derive(Parser)]
#[command(name = "fixbench")]
#[command(about = "Repair ticket tracker with receipts and WhatsApp messages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file
    #[arg(long, global = true, env = "FIXBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overrides the config
    #[arg(long, global = true, env = "FIXBENCH_DB")]
    db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file and the ticket database
    Init,

    /// Create a new ticket
    Create {
        first_name: String,
        last_name: String,
        phone: String,
        /// Device or product left for repair
        product: String,

        /// Problem description
        #[arg(short, long)]
        description: Option<String>,

        /// Quoted repair cost, e.g. 150.50
        #[arg(short, long)]
        cost: Option<String>,

        /// Initial status (pending, in_progress, done, picked_up)
        #[arg(short, long)]
        status: Option<String>,

        /// Note for the customer, used in the cost quote
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List tickets, newest first
    List {
        /// Only tickets in this status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Search by number, name, phone or product
    Search {
        term: String,
    },

    /// Show ticket details
    Show {
        /// Ticket number
        number: String,
    },

    /// Update ticket fields
    Update {
        /// Ticket number
        number: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        product: Option<String>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(short, long, conflicts_with = "clear_cost")]
        cost: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long, conflicts_with = "clear_note")]
        note: Option<String>,

        #[arg(long)]
        clear_description: bool,

        #[arg(long)]
        clear_cost: bool,

        #[arg(long)]
        clear_note: bool,
    },

    /// Change ticket status
    Status {
        /// Ticket number
        number: String,
        /// New status (pending, in_progress, done, picked_up)
        status: String,
    },

    /// Delete a ticket (kept in the database, hidden from listings)
    Delete {
        /// Ticket number
        number: String,
    },

    /// Ticket counts per status
    Stats,

    /// Status history of a ticket
    History {
        /// Ticket number
        number: String,
    },

    /// Generate the printable receipt
    Receipt {
        /// Ticket number
        number: String,

        /// Output file (defaults to receipt_<number>.pdf in the receipt directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the PDF after writing it
        #[arg(long)]
        open: bool,

        /// Print a plain-text receipt instead of writing a PDF
        #[arg(long, conflicts_with_all = ["output", "open"])]
        text: bool,
    },

    /// Compose a customer message and its WhatsApp Web link
    Message {
        /// Ticket number
        number: String,

        kind: MessageArg,

        /// Message text for `custom`
        #[arg(short, long, required_if_eq("kind", "custom"))]
        text: Option<String>,

        /// Open WhatsApp Web with the message
        #[arg(long)]
        open: bool,
    },

    /// Export tickets as CSV ("-" for stdout)
    Export {
        path: PathBuf,
    },

    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print the config file location
    Path,
    /// Edit configuration file
    Edit,
    /// Reset to default configuration
    Reset,
    /// Get a specific config value
    Get {
        /// Config key (e.g., "prefix", "business.name")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MessageArg {
    CostQuote,
    ReadyForPickup,
    PickedUp,
    Custom,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.unwrap_or_else(default_config_path);

    // These must work on a config file that no longer parses
    match &cli.command {
        Commands::Config {
            command: Some(ConfigCommands::Path),
        } => return commands::config_path(&config_path, cli.json),
        Commands::Config {
            command: Some(ConfigCommands::Edit),
        } => return commands::config_edit(&config_path),
        Commands::Config {
            command: Some(ConfigCommands::Reset),
        } => return commands::config_reset(&config_path),
        _ => {}
    }

    let ctx = commands::Context::load(config_path, cli.db, cli.json)?;

    match cli.command {
        Commands::Init => commands::init(&ctx),
        Commands::Create {
            first_name,
            last_name,
            phone,
            product,
            description,
            cost,
            status,
            note,
        } => commands::create(
            &ctx,
            commands::CreateArgs {
                first_name,
                last_name,
                phone,
                product,
                description,
                cost,
                status,
                note,
            },
        ),
        Commands::List { status } => commands::list(&ctx, status),
        Commands::Search { term } => commands::search(&ctx, &term),
        Commands::Show { number } => commands::show(&ctx, &number),
        Commands::Update {
            number,
            first_name,
            last_name,
            phone,
            product,
            description,
            cost,
            status,
            note,
            clear_description,
            clear_cost,
            clear_note,
        } => commands::update(
            &ctx,
            &number,
            commands::UpdateArgs {
                first_name,
                last_name,
                phone,
                product,
                description,
                cost,
                status,
                note,
                clear_description,
                clear_cost,
                clear_note,
            },
        ),
        Commands::Status { number, status } => commands::set_status(&ctx, &number, &status),
        Commands::Delete { number } => commands::delete(&ctx, &number),
        Commands::Stats => commands::stats(&ctx),
        Commands::History { number } => commands::history(&ctx, &number),
        Commands::Receipt {
            number,
            output,
            open,
            text,
        } => commands::receipt(&ctx, &number, output, open, text),
        Commands::Message {
            number,
            kind,
            text,
            open,
        } => {
            let kind = match kind {
                MessageArg::CostQuote => fixbench_core::MessageKind::CostQuote,
                MessageArg::ReadyForPickup => fixbench_core::MessageKind::ReadyForPickup,
                MessageArg::PickedUp => fixbench_core::MessageKind::PickedUp,
                MessageArg::Custom => fixbench_core::MessageKind::Custom(text.unwrap_or_default()),
            };
            commands::message(&ctx, &number, kind, open)
        }
        Commands::Export { path } => commands::export(&ctx, &path),
        Commands::Config { command } => match command {
            Some(ConfigCommands::Show) | None => commands::config_show(&ctx),
            Some(ConfigCommands::Get { key }) => commands::config_get(&ctx, &key),
            Some(ConfigCommands::Set { key, value }) => commands::config_set(&ctx, &key, &value),
            // Dispatched above, before the config is loaded
            Some(ConfigCommands::Path | ConfigCommands::Edit | ConfigCommands::Reset) => Ok(()),
        },
    }
}
