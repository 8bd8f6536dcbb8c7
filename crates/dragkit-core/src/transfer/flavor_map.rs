//! Mapping between platform-native format names and flavors.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::DataFlavor;

/// Translates between native clipboard/drag format names and flavors.
pub trait FlavorMap: Send + Sync {
    /// Native name for each flavor that has one.
    fn natives_for_flavors(&self, flavors: &[DataFlavor]) -> HashMap<DataFlavor, String>;

    /// Flavor for each native name that has one.
    fn flavors_for_natives(&self, natives: &[String]) -> HashMap<String, DataFlavor>;
}

/// Table-backed flavor map; a shared instance serves as the system default.
#[derive(Debug, Default)]
pub struct SystemFlavorMap {
    natives: RwLock<Vec<(String, DataFlavor)>>,
}

impl SystemFlavorMap {
    /// Map pre-populated with the common text formats.
    pub fn with_defaults() -> Self {
        let map = Self::default();
        map.add_mapping("UTF8_STRING", DataFlavor::plain_text());
        map.add_mapping("text/plain;charset=utf-8", DataFlavor::plain_text());
        map.add_mapping("text/html", DataFlavor::parse("text/html"));
        map.add_mapping("text/uri-list", DataFlavor::parse("text/uri-list"));
        map
    }

    /// The process-wide default map.
    pub fn shared() -> Arc<SystemFlavorMap> {
        static SHARED: OnceLock<Arc<SystemFlavorMap>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Self::with_defaults())).clone()
    }

    /// Register `native` as a name for `flavor`. Earlier mappings keep priority.
    pub fn add_mapping(&self, native: &str, flavor: DataFlavor) {
        let mut natives = self.natives.write();
        if !natives.iter().any(|(n, f)| n == native && *f == flavor) {
            natives.push((native.to_string(), flavor));
        }
    }
}

impl FlavorMap for SystemFlavorMap {
    fn natives_for_flavors(&self, flavors: &[DataFlavor]) -> HashMap<DataFlavor, String> {
        let natives = self.natives.read();
        flavors
            .iter()
            .filter_map(|flavor| {
                natives
                    .iter()
                    .find(|(_, f)| f == flavor)
                    .map(|(native, _)| (flavor.clone(), native.clone()))
            })
            .collect()
    }

    fn flavors_for_natives(&self, wanted: &[String]) -> HashMap<String, DataFlavor> {
        let natives = self.natives.read();
        wanted
            .iter()
            .filter_map(|name| {
                natives
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, flavor)| (name.clone(), flavor.clone()))
            })
            .collect()
    }
}
