mod app;
mod args;
mod logging;

use clap::Parser;
use std::process::ExitCode;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Pick up SPOTIFY_ACCESS_TOKEN and RUST_LOG from a local .env
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init(args.verbose);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    match app::run(args, cancel).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Cancel the session on Ctrl+C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, stopping"),
        _ = terminate => tracing::info!("Received terminate signal, stopping"),
    }
    cancel.cancel();
}
