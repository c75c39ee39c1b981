use async_trait::async_trait;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use super::{http_client, MarkupSource};
use crate::error::{CollectError, CollectResult};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is raw markup and must not be re-escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["noscript", "xmp", "iframe", "noembed", "noframes", "plaintext"];

pub struct HttpMarkupFetcher {
    http: reqwest::Client,
}

impl HttpMarkupFetcher {
    pub fn new() -> CollectResult<Self> {
        Ok(Self {
            http: http_client()?,
        })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MarkupSource for HttpMarkupFetcher {
    async fn fetch_cleaned_markup(&self, url: &str) -> CollectResult<String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CollectError::http(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let raw = resp.text().await.map_err(|e| CollectError::http(url, e))?;
        let cleaned = clean_markup(&raw);
        debug!(url, raw_bytes = raw.len(), cleaned_bytes = cleaned.len(), "Markup cleaned");
        Ok(cleaned)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Re-serialize `html` without `<script>`, `<style>`, stylesheet `<link>`s,
/// inline `style` attributes, or comments. Everything else is kept.
pub fn clean_markup(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len());

    for child in document.tree.root().children() {
        match child.value() {
            Node::Doctype(doctype) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(doctype.name());
                out.push_str(">\n");
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, &mut out);
                }
            }
            _ => {}
        }
    }

    out
}

fn is_stripped(element: &Element) -> bool {
    match element.name() {
        "script" | "style" => true,
        "link" => element.attr("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("stylesheet"))
        }),
        _ => false,
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let value = element.value();
    if is_stripped(value) {
        return;
    }

    let name = value.name();
    out.push('<');
    out.push_str(name);
    for (attr, attr_value) in value.attrs() {
        if attr.eq_ignore_ascii_case("style") {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_into(attr_value, true, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    let raw_text = RAW_TEXT_ELEMENTS.contains(&name);
    for child in element.children() {
        match child.value() {
            Node::Text(text) if raw_text => out.push_str(text),
            Node::Text(text) => escape_into(text, false, out),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    write_element(child_element, out);
                }
            }
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_into(text: &str, in_attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !in_attribute => out.push_str("&lt;"),
            '>' if !in_attribute => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
