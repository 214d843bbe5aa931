//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse endpoint paths with `{param}` segments
//! - Match request paths segment by segment, capturing parameters
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A trailing slash is ignored on both sides
//! - No regex to guarantee O(n) matching

use std::collections::BTreeMap;

use crate::schema::path::is_identifier;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Compiled endpoint path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err(format!("'{raw}' must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut names = Vec::new();

        for part in split(raw) {
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) if is_identifier(name) => {
                    if names.contains(&name) {
                        return Err(format!("parameter '{name}' appears twice in '{raw}'"));
                    }
                    names.push(name);
                    Segment::Param(name.to_string())
                }
                Some(name) => return Err(format!("invalid parameter name '{name}' in '{raw}'")),
                None if part.contains(|c: char| c == '{' || c == '}') => {
                    return Err(format!("parameters must span a whole segment in '{raw}'"))
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of literal segments; more specific patterns win.
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Literal(_)))
            .count()
    }

    /// Captured parameters if `path` matches.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = split(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }

        Some(params)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/').filter(|part| !part.is_empty())
}
