//! Terms, groups and tagged items

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a taxonomy group (e.g. `murals_category`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GroupName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a content item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned reference to a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermRef(i64);

impl TermRef {
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TermRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A term as held by a store
///
/// `name` is unique within its group and is the identity used when
/// matching legacy terms against the canonical group (exact,
/// case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermRef,
    pub group: GroupName,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

/// Fields needed to create a term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTerm {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

impl NewTerm {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            slug: slugify(&name),
            name,
            description: String::new(),
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Copy of a term's descriptive metadata, for creation in another group
    pub fn copy_of(term: &Term) -> Self {
        Self {
            name: term.name.clone(),
            slug: term.slug.clone(),
            description: term.description.clone(),
        }
    }
}

/// Lowercase, ASCII-alphanumeric slug with `-` separators.
///
/// Only used when a term is declared without a slug; migration always
/// copies the legacy slug verbatim.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Street Art & Murals"), "street-art-murals");
        assert_eq!(slugify("  Logo  "), "logo");
        assert_eq!(slugify("3D"), "3d");
    }

    #[test]
    fn new_term_derives_slug() {
        let term = NewTerm::new("Sunset Wall");
        assert_eq!(term.slug, "sunset-wall");
        assert!(term.description.is_empty());
    }

    #[test]
    fn copy_of_keeps_metadata() {
        let legacy = Term {
            id: TermRef::from_raw(7),
            group: GroupName::from("murals_category"),
            name: "Sunset".to_string(),
            slug: "sunset-murals".to_string(),
            description: "Warm palettes".to_string(),
        };
        let copy = NewTerm::copy_of(&legacy);
        assert_eq!(copy.name, "Sunset");
        assert_eq!(copy.slug, "sunset-murals");
        assert_eq!(copy.description, "Warm palettes");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&GroupName::from("design_category")).unwrap();
        assert_eq!(json, "\"design_category\"");
        let json = serde_json::to_string(&TermRef::from_raw(3)).unwrap();
        assert_eq!(json, "3");
    }
}
