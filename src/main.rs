use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use fundwatch::core::log::init_logging;
use fundwatch::scheduler::View;

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

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    /// Prices and sentiment together
    Split,
    Prices,
    Sentiment,
}

impl From<ViewArg> for View {
    fn from(arg: ViewArg) -> View {
        match arg {
            ViewArg::Split => View::Split,
            ViewArg::Prices => View::Prices,
            ViewArg::Sentiment => View::Sentiment,
        }
    }
}

impl From<Commands> for fundwatch::AppCommand {
    fn from(cmd: Commands) -> fundwatch::AppCommand {
        match cmd {
            Commands::Watch { view, once } => fundwatch::AppCommand::Watch {
                view: view.into(),
                once,
            },
            Commands::Fund { fund_id, days } => fundwatch::AppCommand::Fund { fund_id, days },
            Commands::Recommendations => fundwatch::AppCommand::Recommendations,
            Commands::Health => fundwatch::AppCommand::Health,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Live dashboard of prices, sentiment and the merged feed
    Watch {
        #[arg(long, value_enum, default_value = "split")]
        view: ViewArg,
        /// Fetch a single cycle, print it and exit
        #[arg(long)]
        once: bool,
    },
    /// Show price, sentiment, risk and history for one fund
    Fund {
        fund_id: String,
        /// Days of price history to show
        #[arg(long)]
        days: Option<u32>,
    },
    /// Display trading recommendations and top opportunities
    Recommendations,
    /// Check that the backend is up
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fundwatch::cli::setup::setup_at_path(path),
            None => fundwatch::cli::setup::setup(),
        },
        Some(cmd) => fundwatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
