use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use satcalc::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount into bitcoin at the office rate
    #[command(allow_negative_numbers = true)]
    Calc {
        /// Cash amount to convert
        amount: f64,
        /// Office rate in cash per BTC
        office_rate: f64,
        /// Fetch a new market rate even if the cached one is fresh
        #[arg(short, long)]
        refresh: bool,
        /// Save the calculation to history
        #[arg(short, long)]
        save: bool,
    },
    /// Display the market rate
    Rate {
        /// Fetch a new market rate even if the cached one is fresh
        #[arg(short, long)]
        refresh: bool,
    },
    /// Display the cached rate status without going online
    Status,
    /// Browse or edit saved calculations
    History {
        #[command(subcommand)]
        command: Option<HistoryCommands>,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List saved calculations
    List,
    /// Delete one saved calculation
    Delete {
        /// Entry ID as shown by `history list`
        id: i64,
    },
    /// Delete all saved calculations
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

impl From<Commands> for satcalc::AppCommand {
    fn from(cmd: Commands) -> satcalc::AppCommand {
        match cmd {
            Commands::Calc {
                amount,
                office_rate,
                refresh,
                save,
            } => satcalc::AppCommand::Calc {
                amount,
                office_rate,
                refresh,
                save,
            },
            Commands::Rate { refresh } => satcalc::AppCommand::Rate { refresh },
            Commands::Status => satcalc::AppCommand::Status,
            Commands::History { command } => match command.unwrap_or(HistoryCommands::List) {
                HistoryCommands::List => satcalc::AppCommand::HistoryList,
                HistoryCommands::Delete { id } => satcalc::AppCommand::HistoryDelete { id },
                HistoryCommands::Clear { yes } => satcalc::AppCommand::HistoryClear { yes },
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => satcalc::cli::setup::setup(),
        Some(cmd) => satcalc::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
