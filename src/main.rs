use std::process::ExitCode;

use log::{debug, error};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before the logger so RUST_LOG may come from .env
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = dotenv {
        debug!(".env file not loaded: {e}");
    }

    match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
