use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wtc::cli::{self, Invocation};
use wtc::render::TerminalQr;
use wtc::{app, Client, Config, Connector, Error};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match cli::parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            println!("{e}");
            return exit_code(&e);
        }
    };
    let (invocation, config) = cli.into_parts();
    init_tracing(&config.log_filter);

    match run(invocation, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code(&e)
        }
    }
}

async fn run(invocation: Invocation, config: Config) -> wtc::Result<()> {
    let (store, device) = app::open_session(&config.database_path).await?;
    let client = Client::new(store, device, connector(&config)?);
    let response = app::run(&client, &invocation, &config, Arc::new(TerminalQr)).await?;
    tracing::debug!(id = %response.id, "done");
    Ok(())
}

#[cfg(feature = "full")]
fn connector(config: &Config) -> wtc::Result<Arc<dyn Connector>> {
    Ok(Arc::new(wtc::socket::WebSocketConnector::new(&config.ws_url)))
}

#[cfg(not(feature = "full"))]
fn connector(_config: &Config) -> wtc::Result<Arc<dyn Connector>> {
    Err(wtc::error::ConnectionError::NoTransport.into())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn exit_code(e: &Error) -> ExitCode {
    ExitCode::from(e.exit_code() as u8)
}
