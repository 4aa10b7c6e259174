use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docxlate::cli::{Cli, Commands};
use docxlate::{config, translate};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Translate(args) => translate::run(args)?,
        Commands::Glossary(args) => translate::run_glossary(args)?,
        Commands::Cache(args) => translate::run_cache(args)?,
        Commands::Config(args) => config::commands::run(args)?,
    }

    Ok(())
}
