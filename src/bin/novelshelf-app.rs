use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use novelshelf::api::{AppState, router};
use novelshelf::scrape::SiteScraper;
use novelshelf::store::book_store::LocalFsBookStore;
use novelshelf::store::translation_store::LocalFsTranslationStore;
use novelshelf::translate::Translator;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Storage root directory.
    #[arg(long, default_value = "storage")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    novelshelf::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting novelshelf-app");

    let translator = match Translator::from_env() {
        Ok(translator) => Some(translator),
        Err(err) => {
            tracing::warn!(%err, "translation disabled");
            None
        }
    };

    let state = AppState {
        book_store: Arc::new(LocalFsBookStore::new(&args.data_dir)),
        translation_store: Arc::new(LocalFsTranslationStore::new(&args.data_dir)),
        scraper: SiteScraper::new()?,
        translator,
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to install ctrl-c handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
