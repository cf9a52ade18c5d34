use thiserror::Error;
use tracing::debug;

use crate::callout::{CalloutTag, TAG_NAME};
use crate::tag::{factory, TagFactory};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("block tag '{0}' is already registered")]
    Duplicate(String),

    #[error("invalid block tag name '{0}'")]
    InvalidName(String),
}

/// Block tags known to one engine instance, in registration order.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    entries: Vec<(String, TagFactory)>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: TagFactory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if !is_valid_tag_name(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.get(&name).is_some() {
            return Err(RegistryError::Duplicate(name));
        }

        debug!(tag = %name, "registered block tag");
        self.entries.push((name, factory));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<TagFactory> {
        self.entries
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, factory)| *factory)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TagFactory)> {
        self.entries
            .iter()
            .map(|(name, factory)| (name.as_str(), *factory))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registers every block tag this crate provides. Call once while the
/// engine loads its plugins.
pub fn register_tags(registry: &mut TagRegistry) -> Result<(), RegistryError> {
    registry.register(TAG_NAME, factory::<CalloutTag>)
}

/// Liquid identifiers: a leading letter or underscore, then letters, digits, `_` or `-`.
fn is_valid_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}
