use crate::commands::{
    run_battery_rebate, run_catalog_export, run_catalog_list, run_catalog_migrate, run_quote,
    run_solar_rebate, BatteryRebateArgs, CatalogArgs, ExportArgs, QuoteArgs, SolarRebateArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use solar_quote::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Solar Quote",
    about = "Serve and inspect the solar, battery, and EV charger pricing catalog",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect or maintain the pricing catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Price a selection of systems against the catalog
    Quote(QuoteArgs),
    /// Preview government rebates
    Rebate {
        #[command(subcommand)]
        command: RebateCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List every priced option with its identifier and position
    List(CatalogArgs),
    /// Replace legacy or missing option identifiers with UUIDs
    Migrate(CatalogArgs),
    /// Write every priced option to a CSV file
    Export(ExportArgs),
}

#[derive(Subcommand, Debug)]
enum RebateCommand {
    /// STC rebate for a solar system size
    Solar(SolarRebateArgs),
    /// State and national rebate for a battery capacity
    Battery(BatteryRebateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured pricing catalog path
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Catalog {
            command: CatalogCommand::List(args),
        } => run_catalog_list(args),
        Command::Catalog {
            command: CatalogCommand::Migrate(args),
        } => run_catalog_migrate(args),
        Command::Catalog {
            command: CatalogCommand::Export(args),
        } => run_catalog_export(args),
        Command::Quote(args) => run_quote(args),
        Command::Rebate {
            command: RebateCommand::Solar(args),
        } => run_solar_rebate(args),
        Command::Rebate {
            command: RebateCommand::Battery(args),
        } => run_battery_rebate(args),
    }
}
