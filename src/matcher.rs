//! Name matchers used to select slots and properties.
//!
//! Selectors have the form `slot.property` where either side is a glob pattern; a missing
//! property side means `*`. Property names may be written in snake_case and are compared in
//! their single-token form (`anchor_x` selects `anchorX`).

use globset::{Glob, GlobMatcher};

use crate::foundation::error::{StageError, StageResult};

/// Predicate over names.
pub trait Matcher {
    fn matches(&self, input: &str) -> bool;
}

/// Matches every name.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyMatcher;

impl Matcher for AnyMatcher {
    fn matches(&self, _input: &str) -> bool {
        true
    }
}

/// Glob pattern over a single name.
#[derive(Clone, Debug)]
pub struct GlobPattern {
    matcher: GlobMatcher,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> StageResult<Self> {
        let glob = Glob::new(pattern)
            .map_err(|e| StageError::matcher(format!("invalid glob pattern \"{pattern}\": {e}")))?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    pub fn as_str(&self) -> &str {
        self.matcher.glob().glob()
    }
}

impl Matcher for GlobPattern {
    fn matches(&self, input: &str) -> bool {
        self.matcher.is_match(input)
    }
}

/// Exact name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameMatcher(pub String);

impl Matcher for NameMatcher {
    fn matches(&self, input: &str) -> bool {
        self.0 == input
    }
}

/// Union of property patterns selected for one slot; `None` accepts any name.
#[derive(Clone, Debug, Default)]
pub struct PropertyMatcher {
    patterns: Vec<Option<GlobPattern>>,
}

impl PropertyMatcher {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Matcher for PropertyMatcher {
    fn matches(&self, input: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.as_ref().is_none_or(|p| p.matches(input)))
    }
}

/// Set of `(slot pattern, property pattern)` pairs; `None` accepts any name.
#[derive(Clone, Debug)]
pub struct ElementPropertyMatcher {
    pairs: Vec<(Option<GlobPattern>, Option<GlobPattern>)>,
}

impl ElementPropertyMatcher {
    /// Selector matching every property of every slot.
    pub fn any() -> Self {
        Self {
            pairs: vec![(None, None)],
        }
    }

    /// Parse one `slot.property` selector.
    pub fn parse(input: &str) -> StageResult<Self> {
        Self::parse_all(std::iter::once(input))
    }

    /// Parse several selectors into one matcher.
    pub fn parse_all<'a>(inputs: impl IntoIterator<Item = &'a str>) -> StageResult<Self> {
        let mut pairs = Vec::new();
        for input in inputs {
            let parts: Vec<&str> = input.split('.').map(str::trim).collect();
            if parts.len() > 2 {
                return Err(StageError::matcher(format!(
                    "invalid element property \"{input}\""
                )));
            }
            let slot = Some(GlobPattern::new(parts[0])?);
            let property = match parts.get(1) {
                Some(name) => Some(GlobPattern::new(&to_property_case(name))?),
                None => None,
            };
            pairs.push((slot, property));
        }
        Ok(Self { pairs })
    }

    /// Property patterns of every pair whose slot pattern accepts `element_name`, either
    /// literally or with a trailing singular index `1` removed.
    pub fn property_matcher(&self, element_name: &str) -> PropertyMatcher {
        let stripped = strip_singular_index(element_name);
        let patterns = self
            .pairs
            .iter()
            .filter(|(slot, _)| {
                slot.as_ref()
                    .is_none_or(|slot| slot.matches(element_name) || slot.matches(stripped))
            })
            .map(|(_, property)| property.clone())
            .collect();
        PropertyMatcher { patterns }
    }
}

/// `figure1` -> `figure`, while `figure11` and `figure2` are kept.
fn strip_singular_index(name: &str) -> &str {
    match name.strip_suffix('1') {
        Some(rest) if !rest.ends_with(|c: char| c.is_ascii_digit()) => rest,
        _ => name,
    }
}

/// Convert `snake_case` to the single-token property form; a leading underscore is kept.
pub fn to_property_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().enumerate();
    while let Some((i, c)) = chars.next() {
        if c == '_'
            && i > 0
            && let Some((_, next)) = chars.next()
        {
            out.extend(next.to_uppercase());
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[path = "../tests/unit/matcher.rs"]
mod tests;
