use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "airtime")]
#[command(about = "Breakout-room speaking-time tracker", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Print aggregated speaking stats for a meeting from the local store
    Report(ReportCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ReportCliArgs {
    /// Meeting name to aggregate across rooms
    #[arg(short, long)]
    pub meeting: String,
}
