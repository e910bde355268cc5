//! Lightweight HTML metadata scanning
//!
//! Link previews only need a handful of `<meta>`, `<link>` and `<title>`
//! tags, so the document is scanned tag by tag instead of parsed into a
//! DOM. Tag and attribute names are matched case-insensitively. Offsets
//! into the lowercased copy are valid in the original because ASCII
//! lowercasing never changes byte lengths.

/// Metadata found in an HTML document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_site_name: Option<String>,
    pub og_url: Option<String>,
    /// `(url, type)` pairs in document order
    pub og_images: Vec<(String, Option<String>)>,
    /// Text of the `<title>` element
    pub title: Option<String>,
    /// `<meta name="description">`
    pub description: Option<String>,
    /// `href` of the first icon link, verbatim
    pub favicon: Option<String>,
    pub charset: Option<String>,
}

/// Scans `html` for preview metadata
pub fn scan(html: &str) -> PageMeta {
    let lower = html.to_ascii_lowercase();
    let mut meta = PageMeta::default();
    let mut touch_icon: Option<String> = None;

    let mut pos = 0usize;
    while let Some(rel) = lower[pos..].find('<') {
        let start = pos + rel + 1;
        let Some(end_rel) = lower[start..].find('>') else {
            break;
        };
        let end = start + end_rel;
        let tag = &html[start..end];
        let name_len = tag
            .find(|c: char| c.is_ascii_whitespace() || c == '/')
            .unwrap_or(tag.len());
        let name = &lower[start..start + name_len];
        let attrs_src = &tag[name_len..];
        pos = end + 1;

        match name {
            "meta" => apply_meta(&mut meta, &parse_attributes(attrs_src)),
            "link" => {
                let attrs = parse_attributes(attrs_src);
                let (Some(rel), Some(href)) = (attr(&attrs, "rel"), attr(&attrs, "href")) else {
                    continue;
                };
                let rel = rel.to_ascii_lowercase();
                let tokens: Vec<&str> = rel.split_ascii_whitespace().collect();
                if meta.favicon.is_none() && tokens.contains(&"icon") {
                    meta.favicon = Some(href.to_string());
                } else if touch_icon.is_none() && tokens.contains(&"apple-touch-icon") {
                    touch_icon = Some(href.to_string());
                }
            }
            "title" if meta.title.is_none() => {
                if let Some(close) = lower[pos..].find("</title") {
                    let text = decode_entities(html[pos..pos + close].trim());
                    if !text.is_empty() {
                        meta.title = Some(text);
                    }
                    pos += close;
                }
            }
            _ => {}
        }
    }

    if meta.favicon.is_none() {
        meta.favicon = touch_icon;
    }
    meta
}

fn apply_meta(meta: &mut PageMeta, attrs: &[(String, String)]) {
    if let Some(charset) = attr(attrs, "charset") {
        meta.charset.get_or_insert_with(|| charset.to_string());
        return;
    }

    let Some(content) = attr(attrs, "content") else {
        return;
    };
    let key = attr(attrs, "property")
        .or_else(|| attr(attrs, "name"))
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let value = Some(content.to_string());

    match key.as_str() {
        "og:title" => meta.og_title = meta.og_title.take().or(value),
        "og:description" => meta.og_description = meta.og_description.take().or(value),
        "og:site_name" => meta.og_site_name = meta.og_site_name.take().or(value),
        "og:url" => meta.og_url = meta.og_url.take().or(value),
        "og:image" | "og:image:url" => meta.og_images.push((content.to_string(), None)),
        "og:image:type" => {
            if let Some(last) = meta.og_images.last_mut() {
                last.1 = value;
            }
        }
        "description" => meta.description = meta.description.take().or(value),
        _ => {}
    }
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Parses `key="value"` pairs; names are lowercased, values entity-decoded
pub fn parse_attributes(src: &str) -> Vec<(String, String)> {
    let bytes = src.as_bytes();
    let mut attrs = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'/')
        {
            i += 1;
        }
        if name_start == i {
            break;
        }
        let name = src[name_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            attrs.push((name, String::new()));
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = match bytes.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let value_start = i + 1;
                let value_end = src[value_start..]
                    .find(q as char)
                    .map(|n| value_start + n)
                    .unwrap_or(src.len());
                i = (value_end + 1).min(src.len());
                &src[value_start..value_end]
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                &src[value_start..i]
            }
        };
        attrs.push((name, decode_entities(value)));
    }

    attrs
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
