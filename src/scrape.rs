//! Scraper for uukanshu.cc catalog and chapter pages. The site serves its
//! content in static HTML, so plain GETs plus CSS selectors are enough; no
//! browser automation.

use std::time::Duration;

use anyhow::Context as _;
use reqwest::header;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::cli::{FetchArgs, ScrapeArgs};
use crate::model::{Chapter, ScrapedCatalog, ScrapedChapter};
use crate::proxy::ProxyPool;
use crate::status::find_chapter_index;
use crate::store::book_store::{BookStore as _, LocalFsBookStore};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct SiteScraper {
    client: reqwest::Client,
}

impl SiteScraper {
    pub fn new() -> anyhow::Result<Self> {
        Self::build(None)
    }

    /// Routes all requests through the given proxy URL (see
    /// [`crate::proxy::ProxyPool`]).
    pub fn with_proxy(proxy_url: &str) -> anyhow::Result<Self> {
        Self::build(Some(proxy_url))
    }

    fn build(proxy_url: Option<&str>) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30));
        if let Some(proxy_url) = proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("build proxy from url: {proxy_url}"))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("build scraper http client")?;
        Ok(Self { client })
    }

    /// Fetches a book's table-of-contents page and returns its title and
    /// chapter list. Chapter ids are running indexes (`chapter-1`, ...).
    pub async fn fetch_catalog(&self, url: &str) -> anyhow::Result<ScrapedCatalog> {
        let base = Url::parse(url).with_context(|| format!("parse catalog url: {url}"))?;
        tracing::info!(%base, "fetching catalog page");
        let html = self.fetch_html(&base).await?;
        parse_catalog(&html, &base)
    }

    /// Fetches one chapter page: title, cleaned body text, and the
    /// next/previous chapter links when present.
    pub async fn fetch_chapter(&self, url: &str) -> anyhow::Result<ScrapedChapter> {
        let base = Url::parse(url).with_context(|| format!("parse chapter url: {url}"))?;
        tracing::info!(%base, "fetching chapter page");
        let html = self.fetch_html(&base).await?;
        parse_chapter(&html, &base)
    }

    async fn fetch_html(&self, url: &Url) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }
        response
            .text()
            .await
            .with_context(|| format!("read body: {url}"))
    }
}

/// `novelshelf scrape`: catalog page to saved book.
pub async fn run_scrape(args: ScrapeArgs) -> anyhow::Result<()> {
    let scraper = scraper_for(args.use_proxy).await?;
    let catalog = scraper
        .fetch_catalog(&args.url)
        .await
        .context("fetch catalog")?;

    let store = LocalFsBookStore::new(&args.data_dir);
    let book_id = store
        .save_book(&args.url, &catalog.title, catalog.chapters)
        .await
        .context("save book")?;
    println!("{book_id}");
    Ok(())
}

/// `novelshelf fetch`: one chapter into the content cache. Skips the
/// network when the chapter is already cached, unless forced.
pub async fn run_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let store = LocalFsBookStore::new(&args.data_dir);
    let Some(book) = store.get_book(&args.book, false).await? else {
        anyhow::bail!("book not found: {}", args.book);
    };
    let Some(idx) = find_chapter_index(&book.chapters, &args.chapter) else {
        anyhow::bail!("chapter not found: {} in book {}", args.chapter, args.book);
    };
    let chapter = &book.chapters[idx];

    if !args.force && store.has_chapter_content(&args.book, &chapter.id).await {
        tracing::info!(book = args.book, chapter = chapter.id, "chapter already cached; skipping");
        return Ok(());
    }

    let url = args.url.as_deref().unwrap_or(&chapter.url);
    let scraper = scraper_for(args.use_proxy).await?;
    let scraped = scraper.fetch_chapter(url).await.context("fetch chapter")?;
    store
        .save_chapter_content(&args.book, &chapter.id, &scraped.content)
        .await
        .context("save chapter content")?;
    Ok(())
}

async fn scraper_for(use_proxy: bool) -> anyhow::Result<SiteScraper> {
    if !use_proxy {
        return SiteScraper::new();
    }

    let mut pool = ProxyPool::new();
    pool.refresh(&reqwest::Client::new())
        .await
        .context("refresh proxy pool")?;
    let proxy = pool
        .next()
        .ok_or_else(|| anyhow::anyhow!("proxy pool is empty after refresh"))?;
    tracing::info!(proxy = %proxy.url(), "scraping through proxy");
    SiteScraper::with_proxy(&proxy.url())
}

pub fn parse_catalog(html: &str, base: &Url) -> anyhow::Result<ScrapedCatalog> {
    let document = Html::parse_document(html);
    let container_sel = selector("#list-chapterAll")?;
    let title_sel = selector("h2")?;
    let link_sel = selector("dd a")?;

    let container = document
        .select(&container_sel)
        .next()
        .ok_or_else(|| anyhow::anyhow!("chapter list container not found on page"))?;

    let title = container
        .select(&title_sel)
        .next()
        .map(|el| collect_text(&el))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown Title".to_owned());

    let mut chapters = Vec::new();
    for (index, link) in container.select(&link_sel).enumerate() {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(url) = base.join(href) else {
            continue;
        };

        let number = index + 1;
        let chapter_title = {
            let text = collect_text(&link);
            if text.is_empty() {
                format!("Chapter {number}")
            } else {
                text
            }
        };
        chapters.push(Chapter::new(
            format!("chapter-{number}"),
            chapter_title,
            url.to_string(),
        ));
    }

    if chapters.is_empty() {
        anyhow::bail!("no chapters found on catalog page");
    }

    Ok(ScrapedCatalog { title, chapters })
}

pub fn parse_chapter(html: &str, base: &Url) -> anyhow::Result<ScrapedChapter> {
    let document = Html::parse_document(html);
    let content_sel = selector("div.readcotent")?;
    let title_sel = selector("h1")?;
    let next_sel = selector("a.next")?;
    let prev_sel = selector("a.prev")?;

    let content_el = document
        .select(&content_sel)
        .next()
        .ok_or_else(|| anyhow::anyhow!("chapter content container not found on page"))?;
    let title = document
        .select(&title_sel)
        .next()
        .map(|el| collect_text(&el))
        .unwrap_or_default();

    let content = extract_paragraphs(&content_el);
    if content.is_empty() {
        anyhow::bail!("no content found in chapter");
    }

    Ok(ScrapedChapter {
        title,
        content,
        next_chapter_url: link_href(&document, &next_sel, base),
        prev_chapter_url: link_href(&document, &prev_sel, base),
    })
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("parse selector {css:?}: {err}"))
}

fn link_href(document: &Html, sel: &Selector, base: &Url) -> Option<String> {
    let href = document.select(sel).next()?.value().attr("href")?;
    base.join(href).ok().map(|url| url.to_string())
}

fn collect_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_owned()
}

/// Walks the direct children of the content container, keeping the text of
/// text nodes and of non-script elements, and joins the pieces as
/// blank-line-separated paragraphs.
fn extract_paragraphs(content_el: &ElementRef) -> String {
    let mut paragraphs = Vec::new();
    for node in content_el.children() {
        let text = match node.value() {
            scraper::Node::Text(text) => text.to_string(),
            scraper::Node::Element(element) => {
                if element.name() == "script" || element.classes().any(|c| c == "ad") {
                    continue;
                }
                match ElementRef::wrap(node) {
                    Some(el) => el.text().collect::<String>(),
                    None => continue,
                }
            }
            _ => continue,
        };
        let text = clean_fragment(&text);
        if !text.is_empty() {
            paragraphs.push(text);
        }
    }
    paragraphs.join("\n\n")
}

fn clean_fragment(text: &str) -> String {
    let cleaned: String = text
        .replace("（本章未完）", "")
        .chars()
        .map(|c| match c {
            '\u{a0}' => ' ',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    cleaned.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_HTML: &str = r#"<!doctype html>
<html><body>
  <div id="list-chapterAll">
    <h2> 都市之光 </h2>
    <dl>
      <dd><a href="/book/555/1001.html">第一章 雨夜</a></dd>
      <dd><a href="/book/555/1002.html">第二章 归途</a></dd>
      <dd><a>无链接章节</a></dd>
    </dl>
  </div>
</body></html>"#;

    const CHAPTER_HTML: &str = r#"<!doctype html>
<html><body>
  <h1>第一章 雨夜</h1>
  <a class="prev" href="/book/555/1000.html">上一章</a>
  <a class="next" href="/book/555/1002.html">下一章</a>
  <div class="readcotent">
    在繁华的都市中，他沉默地走在人群里。&nbsp;
    <p>“你来了。”她说。（本章未完）</p>
    <script>trackAd();</script>
    <div class="ad">广告内容</div>
    <p>霓虹灯闪烁。</p>
  </div>
</body></html>"#;

    fn base() -> Url {
        Url::parse("https://site.test/book/555/").expect("base url")
    }

    #[test]
    fn catalog_parses_title_and_chapter_links() -> anyhow::Result<()> {
        let catalog = parse_catalog(CATALOG_HTML, &base())?;
        assert_eq!(catalog.title, "都市之光");
        assert_eq!(catalog.chapters.len(), 2);
        assert_eq!(catalog.chapters[0].id, "chapter-1");
        assert_eq!(catalog.chapters[0].title, "第一章 雨夜");
        assert_eq!(
            catalog.chapters[0].url,
            "https://site.test/book/555/1001.html"
        );
        assert_eq!(catalog.chapters[1].id, "chapter-2");
        Ok(())
    }

    #[test]
    fn catalog_without_chapters_is_an_error() {
        let html = r#"<div id="list-chapterAll"><h2>T</h2></div>"#;
        let err = parse_catalog(html, &base()).expect_err("must fail");
        assert!(err.to_string().contains("no chapters"));
    }

    #[test]
    fn catalog_without_container_is_an_error() {
        let err = parse_catalog("<html></html>", &base()).expect_err("must fail");
        assert!(err.to_string().contains("container not found"));
    }

    #[test]
    fn chapter_extracts_cleaned_paragraphs_and_neighbor_links() -> anyhow::Result<()> {
        let chapter = parse_chapter(CHAPTER_HTML, &base())?;
        assert_eq!(chapter.title, "第一章 雨夜");
        assert_eq!(
            chapter.next_chapter_url.as_deref(),
            Some("https://site.test/book/555/1002.html")
        );
        assert_eq!(
            chapter.prev_chapter_url.as_deref(),
            Some("https://site.test/book/555/1000.html")
        );

        let paragraphs: Vec<&str> = chapter.content.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0], "在繁华的都市中，他沉默地走在人群里。");
        // Curly quotes normalized, trailing marker removed.
        assert_eq!(paragraphs[1], "\"你来了。\"她说。");
        assert_eq!(paragraphs[2], "霓虹灯闪烁。");
        assert!(!chapter.content.contains("trackAd"));
        assert!(!chapter.content.contains("广告"));
        Ok(())
    }

    #[test]
    fn empty_chapter_body_is_an_error() {
        let html = r#"<h1>T</h1><div class="readcotent"><script>x()</script></div>"#;
        let err = parse_chapter(html, &base()).expect_err("must fail");
        assert!(err.to_string().contains("no content"));
    }
}
