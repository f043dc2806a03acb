//! Textual addresses into the config tree.
//!
//! A path like `Weapon::Ammo::[2]::Damage` names a chain of nested
//! structures ending in a structure, an array element, or a leaf key.
//! Components are compared as text; array indices keep their literal
//! bracket form (`[2]`) because the locator matches against raw lines.

use crate::cfg::errors::PatchError;
use std::fmt;

/// One segment of a config path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathComponent {
    /// A structure or leaf-key name.
    Name(String),
    /// An array element, stored with its brackets (`[2]`).
    Index(String),
}

impl PathComponent {
    fn from_text(text: &str) -> Self {
        if text.starts_with('[') {
            PathComponent::Index(text.to_string())
        } else {
            PathComponent::Name(text.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PathComponent::Name(s) | PathComponent::Index(s) => s,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PathComponent::Index(_))
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered, non-empty sequence of path components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath {
    components: Vec<PathComponent>,
}

impl ConfigPath {
    /// Parse a `::`-separated path. The separator is never split inside
    /// bracket index notation, so `Items::[10]::Name` has three
    /// components. Fails only when the text is empty after trimming.
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PatchError::MalformedPath {
                path: text.to_string(),
            });
        }

        let mut components = Vec::new();
        let mut current = String::new();
        let mut in_bracket = false;

        for c in trimmed.chars() {
            match c {
                '[' => in_bracket = true,
                ']' => in_bracket = false,
                _ => {}
            }

            if !in_bracket && c == ':' && current.ends_with(':') {
                current.pop();
                components.push(PathComponent::from_text(&current));
                current.clear();
                continue;
            }

            current.push(c);
        }

        if !current.is_empty() {
            components.push(PathComponent::from_text(&current));
        }

        if components.is_empty() {
            return Err(PatchError::MalformedPath {
                path: text.to_string(),
            });
        }

        Ok(Self { components })
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// Everything but the last component. Empty for single-component
    /// paths; the locator never matches an empty target, so callers
    /// surface that as a structure-not-found error.
    pub fn parent(&self) -> &[PathComponent] {
        &self.components[..self.components.len() - 1]
    }

    pub fn last(&self) -> &PathComponent {
        self.components
            .last()
            .expect("ConfigPath is never empty after parse")
    }

    pub fn child(&self, component: PathComponent) -> ConfigPath {
        let mut components = self.components.clone();
        components.push(component);
        ConfigPath { components }
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_components(&self.components))
    }
}

pub fn join_components(components: &[PathComponent]) -> String {
    components
        .iter()
        .map(PathComponent::as_str)
        .collect::<Vec<_>>()
        .join("::")
}
