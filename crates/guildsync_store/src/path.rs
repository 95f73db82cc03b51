//! Paths into stored JSON documents.

use std::fmt;

/// A path into a JSON document, as a list of object member names.
///
/// Rendered in the legacy RedisJSON syntax: the root is `.`, the first
/// identifier-like member is written bare and every later member is
/// bracketed, e.g. `channels["81384788765712384"]["threads"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPath {
    segments: Vec<String>,
}

impl JsonPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// A single top-level member.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Extend the path by one member.
    pub fn child(mut self, name: impl ToString) -> Self {
        self.segments.push(name.to_string());
        self
    }

    /// Member names from the root down.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this is the document root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Split into the parent path and the final member name.
    pub fn split_last(&self) -> Option<(JsonPath, &str)> {
        let (last, rest) = self.segments.split_last()?;
        Some((
            JsonPath {
                segments: rest.to_vec(),
            },
            last.as_str(),
        ))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(".");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i == 0 && is_identifier(segment) {
                f.write_str(segment)?;
            } else {
                write!(f, "[\"{}\"]", segment.replace('"', "\\\""))?;
            }
        }
        Ok(())
    }
}
