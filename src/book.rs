//! `novelshelf book` maintenance commands.

use anyhow::Context as _;

use crate::cli::{BookDeleteArgs, BookListArgs};
use crate::store::book_store::{BookStore as _, LocalFsBookStore};

pub async fn list(args: BookListArgs) -> anyhow::Result<()> {
    let store = LocalFsBookStore::new(&args.data_dir);
    let mut books = store.get_all_books().await.context("list books")?;
    // Listing order off disk is arbitrary; sort for stable output.
    books.sort_by(|a, b| a.id.cmp(&b.id));

    for book in books {
        println!(
            "{}\t{}\t{} chapters\t{}",
            book.id,
            book.title,
            book.chapters.len(),
            book.last_updated.to_rfc3339()
        );
    }
    Ok(())
}

pub async fn delete(args: BookDeleteArgs) -> anyhow::Result<()> {
    let store = LocalFsBookStore::new(&args.data_dir);
    let deleted = store.delete_book(&args.book).await.context("delete book")?;
    if !deleted {
        anyhow::bail!("book not found: {}", args.book);
    }
    Ok(())
}
