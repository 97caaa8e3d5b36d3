/// Bookmark import from exported HTML files
///
/// Browsers export bookmarks in the Netscape bookmark format, which is a flat
/// run of `<DT><A HREF="...">Title</A>` lines. Any HTML with anchors works.

use std::sync::LazyLock;

use regex::Regex;

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("anchor pattern is valid"));

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("href pattern is valid")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid"));

/// A link found in an import file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedLink {
    pub url: String,
    /// Anchor text, trimmed; may be empty
    pub title: String,
}

/// Every anchor with an http(s) href, in document order
pub fn parse_bookmark_html(html: &str) -> Vec<ImportedLink> {
    ANCHOR
        .captures_iter(html)
        .filter_map(|anchor| {
            let attributes = anchor.get(1)?.as_str();
            let href = HREF.captures(attributes)?;
            let raw_url = href.get(1).or_else(|| href.get(2)).or_else(|| href.get(3))?.as_str();
            let url = decode_entities(raw_url.trim());
            if !url.starts_with("http") {
                return None;
            }
            let inner = anchor.get(2).map_or("", |m| m.as_str());
            let title = decode_entities(&TAG.replace_all(inner, "")).trim().to_string();
            Some(ImportedLink { url, title })
        })
        .collect()
}

/// Status line shown after an import
pub fn import_summary(added: usize) -> String {
    format!("Successfully imported {} bookmarks", added)
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ if name.starts_with("#x") || name.starts_with("#X") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse::<u32>().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}
