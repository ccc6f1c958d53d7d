//! pwd-filter daemon
//!
//! Loads the rules file and banned-password list, then answers password
//! tests on the loopback endpoint until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use pwd_filter::config::{self, ServerSettings};
use pwd_filter::{
    Dictionary, DictionaryError, EmptyDictionary, PasswordFilter, PolicyConfig, Server, WordList,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let policy = match PolicyConfig::load(config::get_rules_path()) {
        Ok(policy) => policy,
        Err(e) => {
            tracing::error!("Cannot start password filter: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let dictionary: Arc<dyn Dictionary> = match WordList::load(config::get_dictionary_path()) {
        Ok(list) => Arc::new(list),
        Err(e @ (DictionaryError::FileNotFound(_) | DictionaryError::EmptyFile)) => {
            tracing::warn!("{}; only policy rules will be enforced", e);
            Arc::new(EmptyDictionary)
        }
        Err(e) => {
            tracing::error!("Cannot start password filter: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = PasswordFilter::new(Arc::new(policy), dictionary);
    let server = Server::new(filter, ServerSettings::from_env());

    let shutdown = CancellationToken::new();
    // A bind failure ends the server task only; the process stays up until
    // it is told to stop.
    let server_task = tokio::spawn(server.run(shutdown.clone()));

    wait_for_shutdown().await;
    tracing::info!("Shutdown requested");
    shutdown.cancel();

    if let Err(e) = server_task.await {
        tracing::error!("Server task failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
