use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape a book's chapter catalog and save it.
    Scrape(ScrapeArgs),
    /// Fetch one chapter's text into the content cache.
    Fetch(FetchArgs),
    /// Translate a cached chapter and save the translation record.
    Translate(TranslateArgs),
    Book {
        #[command(subcommand)]
        command: BookCommand,
    },
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Catalog page URL (e.g. https://uukanshu.cc/book/25138/).
    #[arg(long)]
    pub url: String,

    /// Storage root directory.
    #[arg(long, default_value = "storage")]
    pub data_dir: String,

    /// Route requests through a rotating free proxy.
    #[arg(long, default_value_t = false)]
    pub use_proxy: bool,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Book id (as printed by `scrape`).
    #[arg(long)]
    pub book: String,

    /// Chapter id or URL-derived chapter number.
    #[arg(long)]
    pub chapter: String,

    /// Chapter page URL; defaults to the URL recorded in the book.
    #[arg(long)]
    pub url: Option<String>,

    /// Re-scrape even when the chapter is already cached.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Storage root directory.
    #[arg(long, default_value = "storage")]
    pub data_dir: String,

    /// Route requests through a rotating free proxy.
    #[arg(long, default_value_t = false)]
    pub use_proxy: bool,
}

#[derive(Debug, Args)]
pub struct TranslateArgs {
    /// Book id.
    #[arg(long)]
    pub book: String,

    /// Chapter id or URL-derived chapter number.
    #[arg(long)]
    pub chapter: String,

    /// Characters per LLM request.
    #[arg(long, default_value_t = crate::translate::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Storage root directory.
    #[arg(long, default_value = "storage")]
    pub data_dir: String,
}

#[derive(Debug, Subcommand)]
pub enum BookCommand {
    /// List saved books.
    List(BookListArgs),
    /// Delete a saved book and its cached chapters.
    Delete(BookDeleteArgs),
}

#[derive(Debug, Args)]
pub struct BookListArgs {
    /// Storage root directory.
    #[arg(long, default_value = "storage")]
    pub data_dir: String,
}

#[derive(Debug, Args)]
pub struct BookDeleteArgs {
    /// Book id.
    #[arg(long)]
    pub book: String,

    /// Storage root directory.
    #[arg(long, default_value = "storage")]
    pub data_dir: String,
}
