pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::GlobalOptions;

#[derive(Debug, Parser)]
#[command(
    name = "nunzio",
    about = "Nunzio workout assistant CLI",
    long_about = "Log workouts, check stats and ask for coaching from the terminal, and operate the Nunzio database.",
    after_help = "Examples:\n  nunzio chat\n  nunzio send \"3 sets of bench press at 185 lbs, 10 reps\"\n  nunzio migrate\n  nunzio doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a nunzio.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override cli.user_id")]
    user: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session")]
    Chat {
        #[arg(long, help = "Hide the diagnostics line under each reply")]
        quiet: bool,
    },
    #[command(about = "Send a single message and print the reply")]
    Send {
        #[arg(required = true, num_args = 1.., help = "Message text")]
        text: Vec<String>,
        #[arg(long, help = "Hide the diagnostics line under the reply")]
        quiet: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the exercise catalog and training principles (idempotent)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity and language model settings")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config_path: cli.config,
        database_url: cli.database_url,
        user_id: cli.user,
    };

    let result = match cli.command {
        Command::Chat { quiet } => commands::chat::run(&options, !quiet),
        Command::Send { text, quiet } => commands::chat::send(&options, &text.join(" "), !quiet),
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed => commands::seed::run(&options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(&options, json) }
        }
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
