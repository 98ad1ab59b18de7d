use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use nobel_etl::config::{Config, DEFAULT_CONFIG_PATH};
use nobel_etl::logging::init_logging;
use nobel_etl::pipeline::{print_summary, run};

/// Fetch Nobel laureates, flatten them, and write the report tables.
#[derive(Debug, Parser)]
#[command(name = "nobel_etl", version)]
struct Cli {
    /// TOML configuration file
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Held until exit so the file writer flushes.
    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("run aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
