use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use invoke_harness_core::context::{DEFAULT_FUNCTION_NAME, DEFAULT_MEMORY_LIMIT_MB};
use invoke_harness_core::{ContextSettings, InvocationDriver};
use invoke_harness_handlers::adapters::logging::{init_logging, install_panic_hook, LogFormat};
use invoke_harness_handlers::default_registry;

const BOOTSTRAP_FAILURE: u8 = 1;

#[derive(Debug, Parser)]
#[command(
    name = "local_invoke",
    about = "Invoke a registered handler locally with a payload read from stdin"
)]
struct Cli {
    /// Handler reference in the form <unit>::<entry-point>.
    #[arg(required_unless_present = "list")]
    handler: Option<String>,

    #[arg(long, env = "INVOKE_FUNCTION_NAME", default_value = DEFAULT_FUNCTION_NAME)]
    function_name: String,

    /// Memory limit in MB, rounded down to a multiple of 64 within [64, 1536].
    #[arg(long, env = "INVOKE_MEMORY_MB", default_value_t = DEFAULT_MEMORY_LIMIT_MB)]
    memory: u32,

    /// Timeout in seconds, clamped to [1, 300]. Sets the remaining time.
    #[arg(long, env = "INVOKE_TIMEOUT_SECS")]
    timeout: Option<u64>,

    #[arg(long, value_enum, env = "INVOKE_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Print every registered handler reference and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = init_logging(cli.log_format) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::from(BOOTSTRAP_FAILURE);
    }
    install_panic_hook();

    let registry = match default_registry() {
        Ok(registry) => registry,
        Err(error) => {
            eprintln!("error: failed to build handler registry: {error}");
            return ExitCode::from(BOOTSTRAP_FAILURE);
        }
    };

    let mut stdout = io::stdout().lock();

    if cli.list {
        for reference in registry.references() {
            if writeln!(stdout, "{reference}").is_err() {
                return ExitCode::from(BOOTSTRAP_FAILURE);
            }
        }
        return ExitCode::SUCCESS;
    }

    let Some(handler) = cli.handler else {
        eprintln!("error: a handler reference is required");
        return ExitCode::from(2);
    };

    let settings = ContextSettings::new(cli.function_name, cli.memory, cli.timeout);
    let result = InvocationDriver::new(&registry)
        .with_context_settings(settings)
        .run(&handler, io::stdin().lock());

    match result {
        Ok(line) => match writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: failed to write output: {error}");
                ExitCode::from(BOOTSTRAP_FAILURE)
            }
        },
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}
