//! End-to-end walk through the storage layer: scrape-shaped input in,
//! enriched reads and cached content out.

use novelshelf::model::Chapter;
use novelshelf::store::book_store::{BookStore as _, LocalFsBookStore};

#[tokio::test]
async fn save_enrich_fetch_lifecycle() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = LocalFsBookStore::new(dir.path());

    let chapters = vec![Chapter::new(
        "chapter-1",
        "C1",
        "https://site.test/book/555/1.html",
    )];
    let book_id = store
        .save_book("https://site.test/book/555/", "T", chapters)
        .await?;
    assert_eq!(book_id, "555");

    let book = store.get_book("555", false).await?.expect("book saved");
    assert_eq!(book.title, "T");
    assert_eq!(book.chapters.len(), 1);
    assert!(book.chapters[0].has_content.is_none());

    let enriched = store.get_book("555", true).await?.expect("book saved");
    assert_eq!(enriched.chapters[0].has_content, Some(false));

    store
        .save_chapter_content("555", "chapter-1", "body text")
        .await?;

    let enriched = store.get_book("555", true).await?.expect("book saved");
    assert_eq!(enriched.chapters[0].has_content, Some(true));
    assert_eq!(
        store.get_chapter_content("555", "chapter-1").await?,
        Some("body text".to_owned())
    );

    assert!(store.delete_book("555").await?);
    assert!(store.get_book("555", false).await?.is_none());
    assert!(!store.delete_book("555").await?);
    Ok(())
}

#[tokio::test]
async fn saving_again_overwrites_the_record() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = LocalFsBookStore::new(dir.path());

    store
        .save_book(
            "https://site.test/book/7/",
            "Old",
            vec![Chapter::new("chapter-1", "C1", "https://site.test/book/7/1.html")],
        )
        .await?;
    store
        .save_book("https://site.test/book/7/", "New", Vec::new())
        .await?;

    let book = store.get_book("7", false).await?.expect("book saved");
    assert_eq!(book.title, "New");
    assert!(book.chapters.is_empty());
    Ok(())
}
