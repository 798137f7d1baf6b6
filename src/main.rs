use std::process;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gator::app::AppContext;
use gator::cli::{commands, Cli};
use gator::config::{Config, JsonConfigStore};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone();

    let Some(command) = cli.into_command() else {
        eprintln!("{}", Cli::command().render_help());
        process::exit(1);
    };

    let config_path = match config_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    let config_store = JsonConfigStore::load(config_path)?;
    let mut ctx = AppContext::new(config_store)?;

    commands::registry().run(&mut ctx, &command).await?;
    Ok(())
}
