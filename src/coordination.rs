//! Best-effort "snowfall already running" flag shared through page storage

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SnowConfig;
use crate::constants::STORAGE_KEY;
use crate::error::{SnowError, SnowResult};

/// Page-scoped string key/value storage (`sessionStorage` in the browser).
pub trait FlagStore {
    fn get(&self, key: &str) -> SnowResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> SnowResult<()>;
    fn remove(&self, key: &str) -> SnowResult<()>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationRecord {
    pub is_active: bool,
    /// Wall-clock ms when the record was written.
    pub timestamp: f64,
    pub properties: SnowConfig,
}

/// Typed access to the record under [`STORAGE_KEY`]. Failures are logged
/// and swallowed; the flag is advisory only.
pub struct CoordinationFlag<F> {
    store: F,
}

impl<F: FlagStore> CoordinationFlag<F> {
    pub fn new(store: F) -> Self {
        Self { store }
    }

    pub fn publish(&self, config: &SnowConfig, timestamp: f64) {
        let record = CoordinationRecord {
            is_active: true,
            timestamp,
            properties: *config,
        };
        let written = serde_json::to_string(&record)
            .map_err(SnowError::from)
            .and_then(|json| self.store.set(STORAGE_KEY, &json));
        if let Err(err) = written {
            warn!(%err, "failed to publish snowfall state");
        }
    }

    /// A record is present. Its contents are not validated, matching the
    /// "any saved state means running" check other instances rely on.
    pub fn is_present(&self) -> bool {
        match self.store.get(STORAGE_KEY) {
            Ok(value) => value.is_some(),
            Err(err) => {
                warn!(%err, "failed to read snowfall state");
                false
            }
        }
    }

    pub fn read(&self) -> Option<CoordinationRecord> {
        let raw = self.store.get(STORAGE_KEY).ok().flatten()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(%err, "ignoring malformed snowfall state");
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(STORAGE_KEY) {
            warn!(%err, "failed to clear snowfall state");
        }
    }
}

/// In-process storage for hosts without `sessionStorage`. Clones share the
/// same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryFlagStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> SnowResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SnowResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SnowResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl FlagStore for BrokenStore {
        fn get(&self, _: &str) -> SnowResult<Option<String>> {
            Err(SnowError::Storage("denied".into()))
        }
        fn set(&self, _: &str, _: &str) -> SnowResult<()> {
            Err(SnowError::Storage("quota".into()))
        }
        fn remove(&self, _: &str) -> SnowResult<()> {
            Err(SnowError::Storage("denied".into()))
        }
    }

    #[test]
    fn publish_then_read_back() {
        let store = MemoryFlagStore::default();
        let flag = CoordinationFlag::new(store.clone());
        assert!(!flag.is_present());

        let config = SnowConfig {
            timer: 12,
            ..SnowConfig::default()
        };
        flag.publish(&config, 1_700_000_000_000.0);

        let record = flag.read().unwrap();
        assert!(record.is_active);
        assert_eq!(record.properties, config);
        assert_eq!(record.timestamp, 1_700_000_000_000.0);

        let raw = store.get(STORAGE_KEY).unwrap().unwrap();
        assert!(raw.contains("\"isActive\":true"));
        assert!(raw.contains("\"snowAmount\":100"));
    }

    #[test]
    fn clear_removes_record() {
        let flag = CoordinationFlag::new(MemoryFlagStore::default());
        flag.publish(&SnowConfig::default(), 1.0);
        flag.clear();
        assert!(!flag.is_present());
        assert_eq!(flag.read(), None);
    }

    #[test]
    fn malformed_record_still_counts_as_present() {
        let store = MemoryFlagStore::default();
        store.set(STORAGE_KEY, "not json").unwrap();
        let flag = CoordinationFlag::new(store);
        assert!(flag.is_present());
        assert_eq!(flag.read(), None);
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let flag = CoordinationFlag::new(BrokenStore);
        flag.publish(&SnowConfig::default(), 1.0);
        flag.clear();
        assert!(!flag.is_present());
        assert_eq!(flag.read(), None);
    }
}
