use std::collections::HashMap;
use std::sync::RwLock;

use vendorledger_merchant::{FeeConfig, Registry, ValueRegistry};

/// Mutable platform settings and a fixed area-name table.
#[derive(Debug, Default)]
pub struct StaticValueRegistry {
    registry: RwLock<Registry>,
    fees: RwLock<FeeConfig>,
    areas: RwLock<HashMap<i32, String>>,
}

impl StaticValueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_registry(&self, registry: Registry) {
        *self.registry.write().unwrap_or_else(|e| e.into_inner()) = registry;
    }

    pub fn set_fee_config(&self, fees: FeeConfig) {
        *self.fees.write().unwrap_or_else(|e| e.into_inner()) = fees;
    }

    pub fn add_area(&self, code: i32, name: impl Into<String>) {
        self.areas
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(code, name.into());
    }
}

impl ValueRegistry for StaticValueRegistry {
    fn registry(&self) -> Registry {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn fee_config(&self) -> FeeConfig {
        self.fees.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn area_names(&self, codes: &[i32]) -> Vec<String> {
        let areas = self.areas.read().unwrap_or_else(|e| e.into_inner());
        codes
            .iter()
            .filter_map(|code| areas.get(code).cloned())
            .collect()
    }
}
