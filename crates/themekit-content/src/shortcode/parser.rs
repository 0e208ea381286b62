//! Shortcode tag scanner.

use std::ops::Range;

use fancy_regex::Regex;

use themekit_core::result::AppResult;

use super::handler::ShortcodeAttrs;

/// Opening `[name attrs]` or self-closing `[name attrs/]` tag. The closing
/// `[/name]` is located with a plain substring search so unclosed brackets
/// in prose cost a linear scan instead of a backtracking search.
const OPEN_PATTERN: &str = r"\[([\w-]+)([^\]]*?)(/?)\]";

/// Only double-quoted values count; bare or valueless attributes are ignored.
const ATTR_PATTERN: &str = r#"([\w-]+)="([^"]*)""#;

/// One shortcode occurrence in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcodeMatch {
    /// Byte span of the whole tag in the scanned text.
    pub span: Range<usize>,
    /// Tag name.
    pub name: String,
    /// Raw attribute text between the name and the closing bracket.
    pub raw_attrs: String,
    /// Inner content; `None` for self-closing tags.
    pub inner: Option<String>,
}

/// Compiled tag and attribute patterns.
#[derive(Debug)]
pub struct ShortcodeScanner {
    open: Regex,
    attr: Regex,
}

impl ShortcodeScanner {
    /// Compiles the patterns.
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            open: Regex::new(OPEN_PATTERN)?,
            attr: Regex::new(ATTR_PATTERN)?,
        })
    }

    /// Finds every non-overlapping shortcode in `content`, left to right.
    ///
    /// A paired tag closes at the nearest `[/name]` after it. An opening tag
    /// with no closer is skipped and scanning resumes just past its `[`.
    pub fn scan(&self, content: &str) -> AppResult<Vec<ShortcodeMatch>> {
        let mut matches = Vec::new();
        let mut pos = 0;
        while pos < content.len() {
            let Some(caps) = self.open.captures_from_pos(content, pos)? else {
                break;
            };
            let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let raw_attrs = caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();

            if caps.get(3).is_some_and(|m| !m.as_str().is_empty()) {
                matches.push(ShortcodeMatch {
                    span: open.start()..open.end(),
                    name: name.as_str().to_string(),
                    raw_attrs,
                    inner: None,
                });
                pos = open.end();
                continue;
            }

            let close = format!("[/{}]", name.as_str());
            match content[open.end()..].find(&close) {
                Some(offset) => {
                    let inner_end = open.end() + offset;
                    let end = inner_end + close.len();
                    matches.push(ShortcodeMatch {
                        span: open.start()..end,
                        name: name.as_str().to_string(),
                        raw_attrs,
                        inner: Some(content[open.end()..inner_end].to_string()),
                    });
                    pos = end;
                }
                // `[` is one byte, so this stays on a char boundary.
                None => pos = open.start() + 1,
            }
        }
        Ok(matches)
    }

    /// Parses `key="value"` pairs. Later duplicates win.
    pub fn parse_attrs(&self, raw: &str) -> AppResult<ShortcodeAttrs> {
        let mut attrs = ShortcodeAttrs::new();
        for caps in self.attr.captures_iter(raw) {
            let caps = caps?;
            if let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) {
                attrs.insert(key.as_str().to_string(), value.as_str().to_string());
            }
        }
        Ok(attrs)
    }
}
