use base64::Engine as _;

/// Derives a stable, filesystem-safe book id from a source URL.
///
/// URLs like `https://uukanshu.cc/book/25138/` map to the numeric id after
/// the `/book/` segment. Anything else falls back to base64 of the whole URL
/// with `/`, `+` and `=` replaced by `_`, which is deterministic but may
/// collide for URLs that differ only in the stripped characters.
pub fn derive_book_id(url: &str) -> String {
    if let Some(digits) = digits_after_book_segment(url) {
        return digits;
    }

    base64::engine::general_purpose::STANDARD
        .encode(url.as_bytes())
        .chars()
        .map(|c| if matches!(c, '/' | '+' | '=') { '_' } else { c })
        .collect()
}

fn digits_after_book_segment(url: &str) -> Option<String> {
    let rest = url.split("/book/").nth(1)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() { None } else { Some(digits) }
}

/// Extracts the numeric fragment of a chapter's source URL, the `{digits}`
/// in `.../{digits}.html`.
pub fn chapter_number_from_url(url: &str) -> Option<&str> {
    let rest = url.strip_suffix(".html")?;
    let start = rest.rfind('/')? + 1;
    let candidate = &rest[start..];
    if candidate.is_empty() || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(candidate)
}

/// Normalizes a caller-supplied chapter key (`chapter-12` or a raw `12`)
/// down to its numeric part for URL-suffix matching.
pub fn chapter_key_number(key: &str) -> &str {
    key.strip_prefix("chapter-").unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_book_urls_yield_the_digits() {
        assert_eq!(derive_book_id("https://uukanshu.cc/book/25138/"), "25138");
        assert_eq!(
            derive_book_id("https://site.test/book/555/1234.html?ref=x"),
            "555"
        );
    }

    #[test]
    fn trailing_path_does_not_change_the_id() {
        assert_eq!(
            derive_book_id("https://site.test/book/42/"),
            derive_book_id("https://site.test/book/42/chapters?page=3")
        );
    }

    #[test]
    fn non_book_urls_fall_back_to_an_encoded_id() {
        let id = derive_book_id("https://example.com/some/novel?x=1");
        assert!(!id.is_empty());
        assert!(!id.contains('/'));
        assert!(!id.contains('+'));
        assert!(!id.contains('='));
        // Deterministic across calls.
        assert_eq!(id, derive_book_id("https://example.com/some/novel?x=1"));
    }

    #[test]
    fn book_segment_without_digits_falls_back() {
        let id = derive_book_id("https://site.test/book/abc/");
        assert!(!id.contains('/'));
    }

    #[test]
    fn chapter_number_comes_from_the_html_basename() {
        assert_eq!(
            chapter_number_from_url("https://site.test/book/555/1234.html"),
            Some("1234")
        );
        assert_eq!(chapter_number_from_url("https://site.test/book/555/"), None);
        assert_eq!(
            chapter_number_from_url("https://site.test/book/555/intro.html"),
            None
        );
    }

    #[test]
    fn chapter_keys_strip_the_prefix() {
        assert_eq!(chapter_key_number("chapter-12"), "12");
        assert_eq!(chapter_key_number("12"), "12");
    }
}
