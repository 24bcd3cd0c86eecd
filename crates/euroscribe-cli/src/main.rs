mod display;
mod run;

use clap::{Parser, Subcommand};
use euroscribe_core::EUROSCORE2;
use tracing_subscriber::EnvFilter;

use crate::run::RunArgs;

#[derive(Debug, Parser)]
#[command(name = "euroscribe", version, about = "Schema-validated EuroSCORE II extraction with a local LLM")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract EuroSCORE II fields from every report and write the three row sets
    Run(RunArgs),
    /// Show the extraction schema
    Schema {
        /// Print the constraint descriptor sent to the model as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            tracing::info!("euroscribe v{}", env!("CARGO_PKG_VERSION"));
            let summary = run::run_extraction(&args).await?;
            eprintln!(
                "  {} attempts in {:.1}s",
                summary.attempts, summary.elapsed_secs
            );
            println!("  raw:  {}", summary.files.raw.display());
            println!("  json: {}", summary.files.json.display());
            println!("  pyd:  {}", summary.files.valid.display());
            println!(
                "Done: {}/{} reports are schema-valid.",
                summary.accepted, summary.total
            );
        }
        Command::Schema { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&EUROSCORE2.to_json_schema())?);
            } else {
                display::print_schema_card(&EUROSCORE2);
            }
        }
    }
    Ok(())
}
