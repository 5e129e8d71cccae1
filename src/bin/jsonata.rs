use std::fs;
use std::process::ExitCode;

use clap::Parser;
use jsonata_rs::{JsonAta, Options};
use log::error;

/// Evaluate a JSONata expression against a JSON document.
#[derive(Parser)]
#[command(name = "jsonata", version, about)]
struct Cli {
    /// The JSONata expression to evaluate.
    expr: String,

    /// Path to a JSON input file; reads stdin if omitted.
    #[arg(short, long)]
    input: Option<String>,

    /// Wall-clock time limit for evaluation, in milliseconds.
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Maximum recursion depth for evaluation.
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let input_text = match &cli.input {
        Some(path) => fs::read_to_string(path),
        None => std::io::read_to_string(std::io::stdin()),
    };
    let input_text = match input_text {
        Ok(text) => text,
        Err(e) => {
            error!("failed to read input: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let input: serde_json::Value = match serde_json::from_str(&input_text) {
        Ok(v) => v,
        Err(e) => {
            error!("failed to parse input as JSON: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let parse_options = Options::default();
    let jsonata = match JsonAta::new(&cli.expr, &parse_options) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let eval_options = Options {
        time_limit_ms: cli.time_limit_ms,
        max_depth: cli.max_depth,
        ..Options::default()
    };

    match jsonata.evaluate(Some(&input), &eval_options) {
        Ok(Some(value)) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap());
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("undefined");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
