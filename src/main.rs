use clap::Parser;
use job_form_automator::cli::commands::{cmd_extract, cmd_extract_snapshot, cmd_fill};
use job_form_automator::cli::config::{Cli, Commands, load_config};
use job_form_automator::trace::subscriber::init_logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_logging(cli.verbose, &config.logging.log_dir)?;

    match cli.command {
        Commands::Extract {
            urls,
            output_dir,
            concurrency,
        } => {
            let report = cmd_extract(&urls, output_dir.as_deref(), concurrency, &config)?;
            if report.succeeded == 0 {
                std::process::exit(1);
            }
        }
        Commands::ExtractSnapshot {
            snapshot,
            output_dir,
        } => {
            cmd_extract_snapshot(&snapshot, output_dir.as_deref(), &config)?;
        }
        Commands::Fill {
            input,
            no_watch,
            snapshot,
        } => {
            cmd_fill(&input, no_watch, snapshot.as_deref(), &config)?;
        }
    }

    Ok(())
}
