//! CSS selector subset used by experiment modifications
//!
//! Supported: type (`h1`), universal (`*`), `#id`, `.class`, attribute
//! selectors (`[a]`, `[a=v]`, `^=`, `$=`, `*=`, `~=`, `|=`) and comma-separated
//! selector lists. Combinators and pseudo-classes are rejected with
//! `Error::UnsupportedSelector`.

use crate::{Error, Result};

/// Attribute test inside `[...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrCondition {
    /// `[key]`
    Exists {
        /// Attribute name
        key: String,
    },
    /// `[key="value"]`
    Eq {
        /// Attribute name
        key: String,
        /// Expected value
        value: String,
    },
    /// `[key^="value"]`
    StartsWith {
        /// Attribute name
        key: String,
        /// Required prefix
        value: String,
    },
    /// `[key$="value"]`
    EndsWith {
        /// Attribute name
        key: String,
        /// Required suffix
        value: String,
    },
    /// `[key*="value"]`
    Contains {
        /// Attribute name
        key: String,
        /// Required substring
        value: String,
    },
    /// `[key~="value"]` (whitespace-separated word)
    Includes {
        /// Attribute name
        key: String,
        /// Required word
        value: String,
    },
    /// `[key|="value"]` (exact or `value-` prefix)
    DashMatch {
        /// Attribute name
        key: String,
        /// Required value or prefix
        value: String,
    },
}

impl AttrCondition {
    /// Test against an attribute value (`None` when absent).
    #[must_use]
    pub fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            Self::Exists { .. } => true,
            Self::Eq { value, .. } => actual == value,
            Self::StartsWith { value, .. } => !value.is_empty() && actual.starts_with(value.as_str()),
            Self::EndsWith { value, .. } => !value.is_empty() && actual.ends_with(value.as_str()),
            Self::Contains { value, .. } => !value.is_empty() && actual.contains(value.as_str()),
            Self::Includes { value, .. } => actual.split_whitespace().any(|w| w == value),
            Self::DashMatch { value, .. } => {
                actual == value
                    || actual
                        .strip_prefix(value.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }

    /// Attribute name this condition reads.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Exists { key }
            | Self::Eq { key, .. }
            | Self::StartsWith { key, .. }
            | Self::EndsWith { key, .. }
            | Self::Contains { key, .. }
            | Self::Includes { key, .. }
            | Self::DashMatch { key, .. } => key,
        }
    }
}

/// One compound selector (no combinators).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// Lower-cased tag name, if constrained
    pub tag: Option<String>,
    /// `*` present
    pub universal: bool,
    /// `#id`
    pub id: Option<String>,
    /// `.class` tokens
    pub classes: Vec<String>,
    /// Attribute conditions
    pub attrs: Vec<AttrCondition>,
}

/// How a selector can name an element id, for click attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdHint {
    /// `#id` or `[id="id"]`
    Exact(String),
    /// `[id^="prefix"]`
    Prefix(String),
}

impl IdHint {
    /// Whether an element id satisfies the hint.
    #[must_use]
    pub fn matches(&self, element_id: &str) -> bool {
        match self {
            Self::Exact(id) => element_id == id,
            Self::Prefix(prefix) => !prefix.is_empty() && element_id.starts_with(prefix.as_str()),
        }
    }
}

/// Comma-separated list of compound selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    groups: Vec<CompoundSelector>,
}

impl SelectorList {
    /// Parse a selector list.
    ///
    /// # Errors
    /// Returns `Error::UnsupportedSelector` for empty groups, unbalanced
    /// brackets, combinators, pseudo-classes, or malformed syntax.
    pub fn parse(selector: &str) -> Result<Self> {
        let groups = split_groups(selector)?
            .iter()
            .map(|group| parse_compound(group))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }

    /// Compound selectors in the list.
    #[must_use]
    pub fn groups(&self) -> &[CompoundSelector] {
        &self.groups
    }

    /// Id hints across all groups.
    #[must_use]
    pub fn id_hints(&self) -> Vec<IdHint> {
        let mut hints = Vec::new();
        for group in &self.groups {
            if let Some(id) = &group.id {
                hints.push(IdHint::Exact(id.clone()));
            }
            for attr in &group.attrs {
                match attr {
                    AttrCondition::Eq { key, value } if key == "id" => {
                        hints.push(IdHint::Exact(value.clone()));
                    }
                    AttrCondition::StartsWith { key, value } if key == "id" => {
                        hints.push(IdHint::Prefix(value.clone()));
                    }
                    _ => {}
                }
            }
        }
        hints
    }
}

fn split_groups(selector: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut bracket_depth = 0usize;

    for ch in selector.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(ch);
            }
            (Some(_), _) => current.push(ch),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                bracket_depth += 1;
                current.push(ch);
            }
            (None, ']') => {
                if bracket_depth == 0 {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                bracket_depth -= 1;
                current.push(ch);
            }
            (None, ',') if bracket_depth == 0 => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err(Error::UnsupportedSelector(selector.into()));
                }
                groups.push(trimmed.to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if bracket_depth != 0 || quote.is_some() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(Error::UnsupportedSelector(selector.into()));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

fn parse_compound(part: &str) -> Result<CompoundSelector> {
    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = CompoundSelector::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || step.tag.is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_ident(part, i + 1)
                    .ok_or_else(|| Error::UnsupportedSelector(part.into()))?;
                if step.id.replace(id).is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                i = next;
            }
            b'.' => {
                let (class, next) = parse_ident(part, i + 1)
                    .ok_or_else(|| Error::UnsupportedSelector(part.into()))?;
                step.classes.push(class);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_attr_condition(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            // Whitespace, combinators and pseudo-classes
            _ if i > 0 || !is_ident_char(bytes[i]) => {
                return Err(Error::UnsupportedSelector(part.into()));
            }
            _ => {
                let (tag, next) = parse_ident(part, i)
                    .ok_or_else(|| Error::UnsupportedSelector(part.into()))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    Ok(step)
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    if start >= bytes.len() || !is_ident_char(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    Some((src.get(start..end)?.to_string(), end))
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn parse_attr_condition(src: &str, open_bracket: usize) -> Result<(AttrCondition, usize)> {
    let unsupported = || Error::UnsupportedSelector(src.into());
    let bytes = src.as_bytes();

    let i = skip_whitespace(bytes, open_bracket + 1);
    let (key, i) = parse_ident(src, i).ok_or_else(unsupported)?;
    let key = key.to_ascii_lowercase();
    let i = skip_whitespace(bytes, i);

    if bytes.get(i) == Some(&b']') {
        return Ok((AttrCondition::Exists { key }, i + 1));
    }

    let (op, i) = match (bytes.get(i).copied(), bytes.get(i + 1).copied()) {
        (Some(b'='), _) => (b'=', i + 1),
        (Some(op), Some(b'=')) if matches!(op, b'^' | b'$' | b'*' | b'~' | b'|') => (op, i + 2),
        _ => return Err(unsupported()),
    };

    let i = skip_whitespace(bytes, i);
    let (value, i) = parse_attr_value(src, i).ok_or_else(unsupported)?;
    let i = skip_whitespace(bytes, i);
    if bytes.get(i) != Some(&b']') {
        return Err(unsupported());
    }

    let cond = match op {
        b'=' => AttrCondition::Eq { key, value },
        b'^' => AttrCondition::StartsWith { key, value },
        b'$' => AttrCondition::EndsWith { key, value },
        b'*' => AttrCondition::Contains { key, value },
        b'~' => AttrCondition::Includes { key, value },
        _ => AttrCondition::DashMatch { key, value },
    };
    Ok((cond, i + 1))
}

fn parse_attr_value(src: &str, start: usize) -> Option<(String, usize)> {
    let quote = *src.as_bytes().get(start)?;
    if quote == b'"' || quote == b'\'' {
        let close = src.get(start + 1..)?.find(char::from(quote))? + start + 1;
        Some((src.get(start + 1..close)?.to_string(), close + 1))
    } else {
        parse_ident(src, start)
    }
}
