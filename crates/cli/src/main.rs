// githerd CLI entry point.

use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "githerd", about = "Keep git working copies in step across a fleet of machines")]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr: for `session`, stdout is the control channel.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli.command)
}
