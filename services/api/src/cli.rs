use crate::commands::{
    run_check, run_levels, run_place, run_report, run_template, LevelArgs, PlaceArgs, RosterArgs,
    TemplateArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use roster_planner::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Roster Planner",
    about = "Place students into next year's classes from the command line or over HTTP",
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
    /// List the school levels found in a roster file
    Levels(RosterArgs),
    /// Run the automatic placement for a target level and write the updated roster
    Place(PlaceArgs),
    /// Print rule violations for the placements recorded in a roster file
    Check(LevelArgs),
    /// Print the ranked class report for a target level
    Report(LevelArgs),
    /// Write an empty roster with every known column
    Template(TemplateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the directory holding the stored roster and level workspaces
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Levels(args) => run_levels(args),
        Command::Place(args) => run_place(args),
        Command::Check(args) => run_check(args),
        Command::Report(args) => run_report(args),
        Command::Template(args) => run_template(args),
    }
}
