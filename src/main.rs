use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use finnikacc::core::log::init_logging;

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

impl From<Commands> for finnikacc::AppCommand {
    fn from(cmd: Commands) -> finnikacc::AppCommand {
        match cmd {
            Commands::Rates => finnikacc::AppCommand::Rates,
            Commands::Convert { amount, from, to } => {
                finnikacc::AppCommand::Convert { amount, from, to }
            }
            Commands::Basket => finnikacc::AppCommand::Basket,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the current convert rates and how fresh they are
    Rates,
    /// Convert an amount into other currencies
    Convert {
        /// Amount to convert, e.g. "120.50" or "1 000,25"
        amount: String,
        /// Currency of the amount
        from: String,
        /// Target currencies; defaults to the configured basket
        to: Vec<String>,
    },
    /// Start an interactive conversion basket
    Basket,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => finnikacc::cli::setup::setup(),
        Some(cmd) => finnikacc::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
