//! Simple CSS selector parsing and matching.
//!
//! Supported: type (`article`, `*`), id (`#main`), class (`.post-content`),
//! attribute presence and equality (`[data-slot]`, `[data-slot="aside"]`),
//! compounds of those, the descendant combinator, and comma-separated
//! lists. That covers the selectors themes use for content areas and slot
//! hosts.

use themekit_core::error::AppError;
use themekit_core::result::AppResult;

/// Read access to an element, as needed for matching.
pub trait ElementView: Sized {
    /// Lower-case tag name.
    fn tag(&self) -> &str;
    /// Attribute value, if present.
    fn attr(&self, name: &str) -> Option<&str>;
    /// Parent element, if any.
    fn parent_element(&self) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrTest {
    Present(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches<E: ElementView>(&self, el: &E) -> bool {
        if let Some(tag) = &self.tag {
            if tag != el.tag() {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = el.attr("class").unwrap_or_default();
            let has_all = self
                .classes
                .iter()
                .all(|c| class_attr.split_whitespace().any(|have| have == c));
            if !has_all {
                return false;
            }
        }
        self.attrs.iter().all(|test| match test {
            AttrTest::Present(name) => el.attr(name).is_some(),
            AttrTest::Equals(name, value) => el.attr(name) == Some(value.as_str()),
        })
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Each alternative is a chain of compounds joined by descendant combinators.
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    /// Parses a selector list.
    pub fn parse(input: &str) -> AppResult<Self> {
        let mut alternatives = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(AppError::dom(format!("Empty selector in '{input}'")));
            }
            let chain = part
                .split_whitespace()
                .map(parse_compound)
                .collect::<AppResult<Vec<_>>>()?;
            alternatives.push(chain);
        }
        Ok(Self { alternatives })
    }

    /// Whether `el` matches any alternative.
    pub fn matches<E: ElementView>(&self, el: &E) -> bool {
        self.alternatives.iter().any(|chain| matches_chain(chain, el))
    }
}

fn matches_chain<E: ElementView>(chain: &[Compound], el: &E) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    if !last.matches(el) {
        return false;
    }
    let mut cursor = el.parent_element();
    for compound in ancestors.iter().rev() {
        loop {
            match cursor {
                Some(candidate) => {
                    let hit = compound.matches(&candidate);
                    cursor = candidate.parent_element();
                    if hit {
                        break;
                    }
                }
                None => return false,
            }
        }
    }
    true
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(text: &str) -> AppResult<Compound> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();
    let invalid = || AppError::dom(format!("Unsupported selector '{text}'"));

    if chars.first() == Some(&'*') {
        pos = 1;
    } else if chars.first().is_some_and(|c| is_ident_char(*c)) {
        compound.tag = Some(take_ident(&chars, &mut pos).to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                let id = take_ident(&chars, &mut pos);
                if id.is_empty() {
                    return Err(invalid());
                }
                compound.id = Some(id);
            }
            '.' => {
                pos += 1;
                let class = take_ident(&chars, &mut pos);
                if class.is_empty() {
                    return Err(invalid());
                }
                compound.classes.push(class);
            }
            '[' => {
                pos += 1;
                let name = take_ident(&chars, &mut pos);
                if name.is_empty() {
                    return Err(invalid());
                }
                match chars.get(pos) {
                    Some(']') => {
                        pos += 1;
                        compound.attrs.push(AttrTest::Present(name));
                    }
                    Some('=') => {
                        pos += 1;
                        let value = match chars.get(pos) {
                            Some(&quote) if quote == '"' || quote == '\'' => {
                                pos += 1;
                                let start = pos;
                                while pos < chars.len() && chars[pos] != quote {
                                    pos += 1;
                                }
                                if pos >= chars.len() {
                                    return Err(invalid());
                                }
                                let value: String = chars[start..pos].iter().collect();
                                pos += 1;
                                value
                            }
                            _ => take_ident(&chars, &mut pos),
                        };
                        if chars.get(pos) != Some(&']') {
                            return Err(invalid());
                        }
                        pos += 1;
                        compound.attrs.push(AttrTest::Equals(name, value));
                    }
                    _ => return Err(invalid()),
                }
            }
            _ => return Err(invalid()),
        }
    }

    Ok(compound)
}
