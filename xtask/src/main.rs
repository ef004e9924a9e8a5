use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{exit, Command, ExitStatus, Stdio};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the local invoke harness workspace",
    long_about = "A unified CLI for invoking sample handlers, listing registered\n\
                  references, and running CI checks in the invoke harness workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a handler through local_invoke with an inline or file payload
    Invoke {
        /// Handler reference in the form <unit>::<entry-point>
        handler: String,
        /// Payload written to stdin, followed by a blank line
        #[arg(long, conflicts_with = "payload_file")]
        payload: Option<String>,
        /// File whose contents are written to stdin
        #[arg(long)]
        payload_file: Option<PathBuf>,
        /// Function name reported by the mock context
        #[arg(long)]
        function_name: Option<String>,
    },
    /// List every registered handler reference
    List,
    /// Run CI checks (fmt, clippy, tests, smoke invocations)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Invoke each sample handler once
    Smoke,
    /// Run check + smoke
    All,
}

// ── helpers ────────────────────────────────────────────────────────

const LOCAL_INVOKE: [&str; 6] = [
    "run",
    "-q",
    "-p",
    "invoke_harness_handlers",
    "--bin",
    "local_invoke",
];

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("xtask: {message}");
    exit(1);
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .unwrap_or_else(|error| fail(format!("failed to execute cargo: {error}")))
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

/// Runs `cargo <args>` with `stdin` piped in and returns its exit status.
fn cargo_with_stdin(args: &[&str], stdin: &[u8]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    let mut child = Command::new("cargo")
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .unwrap_or_else(|error| fail(format!("failed to execute cargo: {error}")));

    if let Some(mut input) = child.stdin.take() {
        if let Err(error) = input.write_all(stdin) {
            eprintln!("xtask: payload not fully written: {error}");
        }
    }

    child
        .wait()
        .unwrap_or_else(|error| fail(format!("failed to wait for cargo: {error}")))
}

fn local_invoke_args<'a>(extra: &[&'a str]) -> Vec<&'a str> {
    let mut args: Vec<&'a str> = LOCAL_INVOKE.to_vec();
    args.push("--");
    args.extend_from_slice(extra);
    args
}

fn framed_payload(payload: Option<String>, payload_file: Option<PathBuf>) -> Vec<u8> {
    let mut body = match (payload, payload_file) {
        (Some(payload), _) => payload.into_bytes(),
        (None, Some(path)) => fs::read(&path)
            .unwrap_or_else(|error| fail(format!("failed to read {}: {error}", path.display()))),
        (None, None) => Vec::new(),
    };
    if !body.ends_with(b"\n") {
        body.push(b'\n');
    }
    body.push(b'\n');
    body
}

fn invoke(handler: &str, stdin: &[u8], function_name: Option<&str>) -> ExitStatus {
    let mut extra = vec![handler];
    if let Some(name) = function_name {
        extra.extend(["--function-name", name]);
    }
    cargo_with_stdin(&local_invoke_args(&extra), stdin)
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test invoke_harness_core");
    run_cargo(&["test", "-p", "invoke_harness_core"]);

    step("Test invoke_harness_handlers");
    run_cargo(&["test", "-p", "invoke_harness_handlers"]);
}

fn ci_smoke() {
    let cases: [(&str, &[u8], i32); 4] = [
        ("helloworld.Hello::handler", b"{\"key1\":\"a\"}\n\n", 0),
        ("echo.Echo::handler", b"smoke\n\n", 0),
        ("greeting.Greeter::handler", b"{\"name\":\"ci\"}\n\n", 0),
        ("bad::format", b"{}\n\n", 4),
    ];

    for (handler, stdin, expected) in cases {
        step(&format!("Invoke {handler}"));
        let status = invoke(handler, stdin, None);
        if status.code() != Some(expected) {
            fail(format!(
                "{handler} exited with {:?}, expected {expected}",
                status.code()
            ));
        }
    }
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Invoke {
            handler,
            payload,
            payload_file,
            function_name,
        } => {
            let stdin = framed_payload(payload, payload_file);
            let status = invoke(&handler, &stdin, function_name.as_deref());
            exit(status.code().unwrap_or(1));
        }
        Commands::List => {
            run_cargo(&local_invoke_args(&["--list"]));
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Smoke => ci_smoke(),
                CiJob::All => {
                    ci_check();
                    ci_smoke();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
