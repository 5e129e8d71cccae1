use std::process::ExitCode;

use clap::Parser;
use jsonata_rs::parse;

/// Parse a JSONata expression and print its AST.
#[derive(Parser)]
#[command(name = "jsonata-parse", version, about)]
struct Cli {
    /// The JSONata expression to parse.
    expr: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match parse(&cli.expr) {
        Ok(ast) => {
            println!("{:#?}", ast);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
