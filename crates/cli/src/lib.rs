pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "guildhall",
    about = "Guildhall operator CLI",
    long_about = "Inspect configuration, check readiness, and maintain the event and verification documents.",
    after_help = "Examples:\n  guildhall doctor --json\n  guildhall events list\n  guildhall events cleanup --keep 25"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, bot token shape, and storage readability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List and prune stored event polls")]
    Events {
        #[command(subcommand)]
        action: EventsCommand,
    },
    #[command(about = "Inspect stored verification records")]
    Verifications {
        #[command(subcommand)]
        action: VerificationsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum EventsCommand {
    #[command(about = "List stored events, newest first")]
    List {
        #[arg(long, help = "Only show the N most recent events")]
        limit: Option<usize>,
    },
    #[command(about = "Keep only the most recent events")]
    Cleanup {
        #[arg(long, help = "How many events to keep (defaults to storage.retention_keep)")]
        keep: Option<usize>,
    },
    #[command(about = "Delete events by id")]
    Delete {
        #[arg(required = true, help = "Event ids to delete")]
        ids: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum VerificationsCommand {
    #[command(about = "List the most recent verification records")]
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Events { action } => match action {
            EventsCommand::List { limit } => commands::events::list(limit),
            EventsCommand::Cleanup { keep } => commands::events::cleanup(keep),
            EventsCommand::Delete { ids } => commands::events::delete(&ids),
        },
        Command::Verifications { action: VerificationsCommand::List { limit } } => {
            commands::verifications::list(limit)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
