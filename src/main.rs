use furfriends::Config;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting furfriends API");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Environment misconfigured: {e}");
            std::process::exit(1);
        }
    };

    furfriends::server::serve(config).await
}
