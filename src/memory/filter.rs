// Thu Jan 16 2026 - Alex

use crate::memory::{Protection, RegionDescriptor, RegionKind};
use serde::{Deserialize, Serialize};

/// Region inclusion rule that can live in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFilter {
    pub require: Protection,
    pub exclude: Protection,
    pub kinds: Option<Vec<RegionKind>>,
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self::readable()
    }
}

impl RegionFilter {
    pub fn any() -> Self {
        Self {
            require: Protection::empty(),
            exclude: Protection::empty(),
            kinds: None,
        }
    }

    pub fn readable() -> Self {
        Self {
            require: Protection::READ,
            ..Self::any()
        }
    }

    /// Readable, writable and not executable: heap, stack and data segments.
    pub fn writable_data() -> Self {
        Self {
            require: Protection::READ | Protection::WRITE,
            exclude: Protection::EXECUTE,
            kinds: None,
        }
    }

    pub fn with_kinds(mut self, kinds: Vec<RegionKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn matches(&self, region: &RegionDescriptor) -> bool {
        let prot = region.protection();
        if !prot.contains(self.require) || prot.intersects(self.exclude) {
            return false;
        }
        match &self.kinds {
            Some(kinds) => kinds.contains(&region.kind()),
            None => true,
        }
    }
}
