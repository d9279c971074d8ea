//! Fieldwatch binary entrypoint.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fieldwatch_cli::{Cli, CliError, LogFormat, execute};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

/// Runs the invocation and prints the result. Returns whether it succeeded.
fn run(cli: &Cli) -> Result<bool, CliError> {
    let execution = execute(cli, io::stdin().lock())?;
    let output = serde_json::to_string_pretty(&execution)
        .map_err(|e| CliError::Output(e.to_string()))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(execution.envelope.is_success())
}
