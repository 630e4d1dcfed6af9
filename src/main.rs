use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    novelshelf::logging::init().context("init logging")?;

    let cli = novelshelf::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        novelshelf::cli::Command::Scrape(args) => {
            novelshelf::scrape::run_scrape(args).await.context("scrape")?;
        }
        novelshelf::cli::Command::Fetch(args) => {
            novelshelf::scrape::run_fetch(args).await.context("fetch")?;
        }
        novelshelf::cli::Command::Translate(args) => {
            novelshelf::translate::run(args).await.context("translate")?;
        }
        novelshelf::cli::Command::Book {
            command: novelshelf::cli::BookCommand::List(args),
        } => {
            novelshelf::book::list(args).await.context("book list")?;
        }
        novelshelf::cli::Command::Book {
            command: novelshelf::cli::BookCommand::Delete(args),
        } => {
            novelshelf::book::delete(args).await.context("book delete")?;
        }
    }

    Ok(())
}
