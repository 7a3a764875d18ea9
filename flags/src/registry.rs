//! Static flag table.

use std::collections::HashMap;

use crate::error::{FlagError, Result};
use crate::overrides::ForceOverrides;
use crate::types::FlagDefinition;

/// Read-only table of flag definitions, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FlagRegistry {
    flags: Vec<FlagDefinition>,
    index: HashMap<String, usize>,
}

impl FlagRegistry {
    pub fn from_definitions<I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = FlagDefinition>,
    {
        let mut flags = Vec::new();
        let mut index = HashMap::new();
        for definition in definitions {
            if index.contains_key(&definition.id) {
                return Err(FlagError::DuplicateFlag(definition.id));
            }
            index.insert(definition.id.clone(), flags.len());
            flags.push(definition);
        }
        Ok(Self { flags, index })
    }

    /// Apply env-level force overrides on top of the declared definitions.
    /// Overrides for ids that are not registered are ignored with a warning.
    pub fn with_overrides(mut self, overrides: &ForceOverrides) -> Self {
        for id in overrides.unknown_ids(self.ids()) {
            tracing::warn!(flag = %id, "Force override names an unregistered feature flag");
        }
        for flag in &mut self.flags {
            if overrides.enables(&flag.id) {
                flag.force_enabled = true;
            }
            if overrides.disables(&flag.id) {
                flag.force_disabled = true;
            }
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&FlagDefinition> {
        self.index.get(id).map(|&i| &self.flags[i])
    }

    pub fn config(&self, id: &str) -> Result<&FlagDefinition> {
        self.get(id)
            .ok_or_else(|| FlagError::UnknownFlag(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(|f| f.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagDefinition> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
