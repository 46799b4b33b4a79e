use anyhow::Result;
use ansible_mcp::cli::Cli;
use ansible_mcp::commands;
use clap::Parser;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the protocol stream
    let default_filter = if cli.verbose {
        "ansible_mcp=debug,info"
    } else {
        "ansible_mcp=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    commands::execute(cli)
}
