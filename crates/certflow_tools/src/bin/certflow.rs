#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::io::{self, Read};

use certflow_tools::audit_cli::{execute_audit_command, SUBCOMMANDS};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("CERTFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn usage() -> String {
    format!("usage: certflow <{}> [file|-]", SUBCOMMANDS.join("|"))
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let subcommand = args.first().ok_or_else(usage)?.as_str();
    let input = read_input(args.get(1).map(String::as_str))?;
    let output = execute_audit_command(subcommand, &input)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn read_input(path: Option<&str>) -> Result<Vec<u8>, String> {
    match path {
        None | Some("-") => {
            let mut input = Vec::new();
            io::stdin()
                .read_to_end(&mut input)
                .map_err(|e| e.to_string())?;
            Ok(input)
        }
        Some(p) => fs::read(p).map_err(|e| format!("failed to read {p}: {e}")),
    }
}
