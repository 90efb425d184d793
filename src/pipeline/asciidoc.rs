//! Minimal AsciiDoc to HTML rendering
//!
//! Covers what API documentation built from test snippets uses: a document
//! title, section titles, block titles, `----` listing blocks, `|===`
//! tables (kept verbatim), paragraphs, `:name: value` attributes with
//! `{name}` references, and `include::target[]` directives. Everything else
//! renders as paragraph text. All output text is HTML-escaped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Includes nested deeper than this are treated as a loop
const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("include target '{target}' not found (in {})", from.display())]
    IncludeNotFound { target: String, from: PathBuf },

    #[error("includes nested too deeply at {}", .0.display())]
    IncludeTooDeep(PathBuf),

    #[error("failed to read {path}: {1}", path = .0.display())]
    Read(PathBuf, String),
}

/// Renders documents against a fixed set of attributes
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    attributes: BTreeMap<String, String>,
    meta: Vec<(String, String)>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predefines an attribute, e.g. `snippets`
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Adds a `<meta>` tag to every rendered page
    pub fn meta(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.meta.push((name.into(), content.into()));
        self
    }

    /// Renders the document at `path` into a standalone HTML page
    pub fn render_file(&self, path: &Path) -> Result<String, RenderError> {
        let text = read(path)?;
        let mut attributes = self.attributes.clone();
        let lines = expand(&text, path, &mut attributes, 0)?;
        Ok(self.to_html(&lines))
    }

    fn to_html(&self, lines: &[String]) -> String {
        let mut body = String::new();
        let mut title: Option<String> = None;
        let mut paragraph: Vec<&str> = Vec::new();
        let mut block: Option<&str> = None;
        let mut block_title: Option<&str> = None;

        for line in lines {
            if let Some(delimiter) = block {
                if line.trim_end() == delimiter {
                    body.push_str("</pre>\n");
                    block = None;
                } else {
                    body.push_str(&escape(line));
                    body.push('\n');
                }
                continue;
            }

            let trimmed = line.trim_end();

            if trimmed.is_empty() {
                flush_paragraph(&mut body, &mut paragraph);
                continue;
            }

            if trimmed == "----" || trimmed == "|===" {
                flush_paragraph(&mut body, &mut paragraph);
                let class = if trimmed == "----" { "listing" } else { "table" };
                open_block(&mut body, class, block_title.take());
                block = Some(if trimmed == "----" { "----" } else { "|===" });
                continue;
            }

            if let Some(level) = heading_level(trimmed) {
                flush_paragraph(&mut body, &mut paragraph);
                block_title = None;
                let text = trimmed[level..].trim();
                if level == 1 && title.is_none() {
                    title = Some(text.to_string());
                }
                body.push_str(&format!("<h{0}>{1}</h{0}>\n", level, escape(text)));
                continue;
            }

            // Block attribute lines such as [source,http,options="nowrap"]
            if paragraph.is_empty() && trimmed.starts_with('[') && trimmed.ends_with(']') {
                continue;
            }

            if paragraph.is_empty() && trimmed.len() > 1 && trimmed.starts_with('.') && !trimmed.starts_with("..") {
                block_title = Some(&trimmed[1..]);
                continue;
            }

            if paragraph.is_empty() {
                push_title(&mut body, block_title.take());
            }
            paragraph.push(trimmed);
        }

        flush_paragraph(&mut body, &mut paragraph);
        if block.is_some() {
            // Unterminated block runs to the end of the document
            body.push_str("</pre>\n");
        }

        let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
        for (name, content) in &self.meta {
            html.push_str(&format!(
                "<meta name=\"{}\" content=\"{}\">\n",
                escape(name),
                escape(content)
            ));
        }
        html.push_str(&format!(
            "<title>{}</title>\n</head>\n<body>\n",
            escape(title.as_deref().unwrap_or(""))
        ));
        html.push_str(&body);
        html.push_str("</body>\n</html>\n");
        html
    }
}

/// A `.Title` line names the paragraph or block right after it
fn push_title(body: &mut String, title: Option<&str>) {
    if let Some(title) = title {
        body.push_str(&format!("<div class=\"title\">{}</div>\n", escape(title)));
    }
}

fn open_block(body: &mut String, class: &str, title: Option<&str>) {
    push_title(body, title);
    body.push_str(&format!("<pre class=\"{}\">", class));
}

fn flush_paragraph(body: &mut String, paragraph: &mut Vec<&str>) {
    if paragraph.is_empty() {
        return;
    }
    let text = paragraph
        .iter()
        .map(|l| escape(l))
        .collect::<Vec<_>>()
        .join("\n");
    body.push_str(&format!("<p>{}</p>\n", text));
    paragraph.clear();
}

/// `= Title` is level 1, `== Section` level 2, down to level 6
fn heading_level(line: &str) -> Option<usize> {
    let level = line.chars().take_while(|&c| c == '=').count();
    if (1..=6).contains(&level) && line[level..].starts_with(' ') && !line[level..].trim().is_empty() {
        Some(level)
    } else {
        None
    }
}

/// Resolves attributes and includes, returning the flattened lines
fn expand(
    text: &str,
    path: &Path,
    attributes: &mut BTreeMap<String, String>,
    depth: usize,
) -> Result<Vec<String>, RenderError> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(RenderError::IncludeTooDeep(path.to_path_buf()));
    }

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut lines = Vec::new();
    let mut in_listing = false;

    for raw in text.lines() {
        if raw.trim_end() == "----" {
            in_listing = !in_listing;
        }

        if !in_listing {
            if raw.starts_with("//") && !raw.starts_with("///") {
                continue;
            }

            if let Some((name, value)) = parse_attribute_entry(raw) {
                let value = substitute(value, attributes);
                attributes.insert(name.to_string(), value);
                continue;
            }
        }

        if let Some(target) = parse_include(raw) {
            let target = substitute(target, attributes);
            let target_path = base.join(&target);
            if !target_path.is_file() {
                return Err(RenderError::IncludeNotFound {
                    target,
                    from: path.to_path_buf(),
                });
            }
            let included = read(&target_path)?;
            lines.extend(expand(&included, &target_path, attributes, depth + 1)?);
            continue;
        }

        lines.push(if in_listing {
            raw.to_string()
        } else {
            substitute(raw, attributes)
        });
    }

    Ok(lines)
}

/// `:name: value` (value may be empty)
fn parse_attribute_entry(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(':')?;
    let end = rest.find(':')?;
    let name = &rest[..end];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return None;
    }
    Some((name, rest[end + 1..].trim()))
}

/// `include::target[attributes]`
fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim_end().strip_prefix("include::")?;
    let open = rest.find('[')?;
    if !rest.ends_with(']') || open == 0 {
        return None;
    }
    Some(&rest[..open])
}

/// Replaces `{name}` for defined attributes; unknown references stay as-is
fn substitute(text: &str, attributes: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match attributes.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn read(path: &Path) -> Result<String, RenderError> {
    fs::read_to_string(path).map_err(|e| RenderError::Read(path.to_path_buf(), e.to_string()))
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn renders_title_sections_and_paragraphs() {
        let dir = TempDir::new().unwrap();
        let doc = write(
            dir.path(),
            "index.adoc",
            "= FastPick API\n:toc: left\n\n== Coupons\n\nIssue a coupon.\nOne per user.\n",
        );

        let html = Renderer::new().render_file(&doc).unwrap();

        assert!(html.contains("<title>FastPick API</title>"));
        assert!(html.contains("<h1>FastPick API</h1>"));
        assert!(html.contains("<h2>Coupons</h2>"));
        assert!(html.contains("<p>Issue a coupon.\nOne per user.</p>"));
        assert!(!html.contains(":toc:"));
    }

    #[test]
    fn include_resolves_snippets_attribute() {
        let dir = TempDir::new().unwrap();
        let snippets = dir.path().join("snippets");
        write(
            &snippets,
            "coupon-issue/http-request.adoc",
            "[source,http]\n----\nPOST /api/v1/coupons/1/issue HTTP/1.1\n----\n",
        );
        let doc = write(
            dir.path(),
            "docs/index.adoc",
            "= API\n\n.Request\ninclude::{snippets}/coupon-issue/http-request.adoc[]\n",
        );

        let html = Renderer::new()
            .attribute("snippets", snippets.display().to_string())
            .render_file(&doc)
            .unwrap();

        assert!(html.contains("<pre class=\"listing\">POST /api/v1/coupons/1/issue HTTP/1.1\n</pre>"));
        assert!(!html.contains("[source,http]"));
    }

    #[test]
    fn relative_include_from_document_dir() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docs/parts/auth.adoc", "== Auth\n");
        let doc = write(dir.path(), "docs/index.adoc", "= API\ninclude::parts/auth.adoc[]\n");

        let html = Renderer::new().render_file(&doc).unwrap();
        assert!(html.contains("<h2>Auth</h2>"));
    }

    #[test]
    fn missing_include_fails() {
        let dir = TempDir::new().unwrap();
        let doc = write(dir.path(), "index.adoc", "include::{snippets}/nope.adoc[]\n");

        let err = Renderer::new()
            .attribute("snippets", "/definitely/missing")
            .render_file(&doc)
            .unwrap_err();

        assert!(matches!(err, RenderError::IncludeNotFound { .. }));
        assert!(err.to_string().contains("/definitely/missing/nope.adoc"));
    }

    #[test]
    fn self_include_is_bounded() {
        let dir = TempDir::new().unwrap();
        let doc = write(dir.path(), "loop.adoc", "include::loop.adoc[]\n");

        assert!(matches!(
            Renderer::new().render_file(&doc),
            Err(RenderError::IncludeTooDeep(_))
        ));
    }

    #[test]
    fn listing_content_is_escaped_verbatim() {
        let dir = TempDir::new().unwrap();
        let doc = write(
            dir.path(),
            "index.adoc",
            "----\n{\"code\": \"<C001>\"}\n// not a comment here\n----\n",
        );

        let html = Renderer::new().render_file(&doc).unwrap();
        assert!(html.contains("{&quot;code&quot;: &quot;&lt;C001&gt;&quot;}"));
        assert!(html.contains("// not a comment here"));
    }

    #[test]
    fn block_title_and_table() {
        let dir = TempDir::new().unwrap();
        let doc = write(
            dir.path(),
            "index.adoc",
            ".Response fields\n|===\n|Path|Type\n|`data.id`|`Number`\n|===\n",
        );

        let html = Renderer::new().render_file(&doc).unwrap();
        assert!(html.contains("<div class=\"title\">Response fields</div>"));
        assert!(html.contains("<pre class=\"table\">|Path|Type\n"));
    }

    #[test]
    fn block_title_belongs_to_the_following_paragraph() {
        let dir = TempDir::new().unwrap();
        let doc = write(
            dir.path(),
            "index.adoc",
            ".Request\nSome paragraph.\n\n----\ncode\n----\n",
        );

        let html = Renderer::new().render_file(&doc).unwrap();
        assert!(html.contains("<div class=\"title\">Request</div>\n<p>Some paragraph.</p>"));
        assert!(html.contains("<p>Some paragraph.</p>\n<pre class=\"listing\">code\n</pre>"));
        assert_eq!(html.matches("class=\"title\"").count(), 1);
    }

    #[test]
    fn meta_tags_are_emitted() {
        let dir = TempDir::new().unwrap();
        let doc = write(dir.path(), "index.adoc", "= Docs\n");

        let html = Renderer::new()
            .meta("generator-extensions", "org.springframework.restdocs:spring-restdocs-asciidoctor")
            .render_file(&doc)
            .unwrap();

        assert!(html.contains(
            "<meta name=\"generator-extensions\" content=\"org.springframework.restdocs:spring-restdocs-asciidoctor\">"
        ));
    }

    #[test]
    fn unknown_attribute_reference_is_kept() {
        let attrs = BTreeMap::new();
        assert_eq!(substitute("{missing} ok", &attrs), "{missing} ok");
    }

    #[test]
    fn heading_needs_space() {
        assert_eq!(heading_level("== Title"), Some(2));
        assert_eq!(heading_level("==Title"), None);
        assert_eq!(heading_level("======= deep"), None);
    }
}
