//! Resource inventory queried during Sense.

use anyhow::Result;

use crate::core::evaluate::AvailableResources;

pub trait ResourceInventory {
    fn snapshot(&self) -> Result<AvailableResources>;
}

/// Serves fixed figures (from `[resources]` in config).
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticInventory {
    resources: AvailableResources,
}

impl StaticInventory {
    pub fn new(resources: AvailableResources) -> Self {
        Self { resources }
    }
}

impl ResourceInventory for StaticInventory {
    fn snapshot(&self) -> Result<AvailableResources> {
        Ok(self.resources)
    }
}
