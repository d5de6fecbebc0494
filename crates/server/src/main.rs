mod api;
mod cli;
mod router;
mod state;

use clap::Parser;
use tracing::info;

use buyerflow_core::Config;

use crate::cli::{Cli, Command};
use crate::state::AppState;

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::from_env();
    cli.apply(&mut config);
    config
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.log_summary();
    let addr = config.server.bind_addr();
    let port = config.server.port;

    let state = AppState::init(config)?;
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://localhost:{}", port);
    info!("API docs at http://localhost:{}/docs", port);
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    buyerflow_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    match &cli.command {
        Command::Serve { .. } => serve(config).await,
        Command::Simulate { events } => cli::simulate(&config, events),
        Command::Score { events } => cli::score(&config, events),
        Command::Validate { files } => cli::validate(&config, files),
    }
}
