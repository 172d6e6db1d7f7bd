//! Ondule CLI - render, check and inspect patches for the ondule runtime.

mod commands;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ondule")]
#[command(author, version, about = "Ondule audio graph CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a patch to a WAV file
    Render(commands::render::RenderArgs),

    /// Validate a patch and print its execution order
    Check(commands::check::CheckArgs),

    /// List the object catalog
    Objects(commands::objects::ObjectsArgs),

    /// Write an example patch to start from
    Init(commands::init::InitArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Objects(args) => commands::objects::run(args),
        Commands::Init(args) => commands::init::run(args),
    }
}
