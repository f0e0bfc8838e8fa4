//! Flat key-value persistence for the player profile.
//!
//! Everything is stored as strings and parsed on read; a missing or
//! malformed value always degrades to the caller's default, never to an
//! error. The map is flushed to a JSON file once per tick when something
//! actually changed.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use log::{debug, error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod keys {
    pub const INTERVALS: &str = "intervals";
    pub const CURRENT_INTERVAL: &str = "currentInterval";
    pub const LAST_MINING_TIME: &str = "lastMiningTime";
    pub const MINING_START: &str = "miningStart";
    pub const MINING_DURATION: &str = "miningDuration";
    pub const USER_ID: &str = "userId";
    pub const ENERGY: &str = "energy";
    pub const MAX_ENERGY: &str = "maxEnergy";
    pub const LAST_CHECKIN: &str = "lastCheckin";
    pub const BALANCE: &str = "balance";
    pub const HASH_RATE: &str = "hashRate";
    pub const DURATION_BONUS: &str = "durationBonus";
}

#[derive(Debug)]
pub struct Store {
    path: Option<PathBuf>,
    values: HashMap<String, String>,
    dirty: bool,
}

impl Store {
    /// Opens the save file at `path`, starting empty if it is absent or
    /// unreadable.
    pub fn open(path: PathBuf) -> Self {
        let values = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(values) => values,
                Err(err) => {
                    warn!("save file {:?} is corrupt, starting fresh: {}", path, err);
                    HashMap::new()
                }
            },
            Err(err) => {
                debug!("no save file at {:?}: {}", path, err);
                HashMap::new()
            }
        };
        Self {
            path: Some(path),
            values,
            dirty: false,
        }
    }

    /// A store that never touches disk. Used in tests and as a fallback
    /// when no data directory exists.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: HashMap::new(),
            dirty: false,
        }
    }

    pub fn at_default_location() -> Self {
        match dirs::data_dir() {
            Some(base) => Self::open(base.join("basehash").join("save.json")),
            None => {
                warn!("no platform data directory, progress will not survive restarts");
                Self::in_memory()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.parse().ok()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key)?.parse().ok()
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("ignoring malformed value under {:?}: {}", key, err);
                None
            }
        }
    }

    pub fn set<V: ToString>(&mut self, key: &str, value: V) {
        let value = value.to_string();
        if self.get(key) == Some(value.as_str()) {
            return;
        }
        self.values.insert(key.to_string(), value);
        self.dirty = true;
    }

    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.set(key, json),
            Err(err) => error!("failed to serialize value under {:?}: {}", key, err),
        }
    }

    pub fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    pub fn clear(&mut self) {
        if !self.values.is_empty() {
            self.values.clear();
            self.dirty = true;
        }
    }

    /// Writes the map to disk if anything changed. Write failures are
    /// logged and retried on the next flush; the game keeps running.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        let Some(path) = &self.path else {
            self.dirty = false;
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                error!("cannot create save directory {:?}: {}", parent, err);
                return;
            }
        }
        match serde_json::to_string_pretty(&self.values) {
            Ok(json) => match fs::write(path, json) {
                Ok(()) => self.dirty = false,
                Err(err) => error!("cannot write save file {:?}: {}", path, err),
            },
            Err(err) => error!("cannot serialize save state: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempdir::TempDir;

    #[test]
    fn absent_and_malformed_values_become_none() {
        let mut store = Store::in_memory();
        assert_eq!(store.get_i64(keys::BALANCE), None);

        store.set(keys::BALANCE, "not-a-number");
        assert_eq!(store.get_i64(keys::BALANCE), None);
        assert_eq!(store.get(keys::BALANCE), Some("not-a-number"));
    }

    #[test]
    fn typed_round_trip() {
        let mut store = Store::in_memory();
        store.set(keys::HASH_RATE, 7u64);
        store.set(keys::LAST_MINING_TIME, -42i64);
        assert_eq!(store.get_u64(keys::HASH_RATE), Some(7));
        assert_eq!(store.get_i64(keys::LAST_MINING_TIME), Some(-42));
        assert_eq!(store.get_u64(keys::LAST_MINING_TIME), None);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tier {
        id: u32,
        purchased: bool,
    }

    #[test]
    fn json_values_round_trip_and_degrade() {
        let mut store = Store::in_memory();
        let tiers = vec![
            Tier {
                id: 1,
                purchased: true,
            },
            Tier {
                id: 2,
                purchased: false,
            },
        ];
        store.set_json(keys::INTERVALS, &tiers);
        assert_eq!(store.get_json::<Vec<Tier>>(keys::INTERVALS), Some(tiers));

        store.set(keys::INTERVALS, "{broken");
        assert_eq!(store.get_json::<Vec<Tier>>(keys::INTERVALS), None);
    }

    #[test]
    fn remove_and_clear() {
        let mut store = Store::in_memory();
        store.set(keys::MINING_START, 100i64);
        store.set(keys::MINING_DURATION, 7200i64);
        store.remove(keys::MINING_START);
        assert_eq!(store.get(keys::MINING_START), None);
        assert_eq!(store.get_i64(keys::MINING_DURATION), Some(7200));
        store.clear();
        assert_eq!(store.get(keys::MINING_DURATION), None);
    }

    #[test]
    fn survives_a_reload_on_disk() {
        let dir = TempDir::new("basehash-store").unwrap();
        let path = dir.path().join("save.json");

        let mut store = Store::open(path.clone());
        store.set(keys::BALANCE, 4321u64);
        store.set(keys::USER_ID, "0xabc");
        store.flush();

        let reloaded = Store::open(path);
        assert_eq!(reloaded.get_u64(keys::BALANCE), Some(4321));
        assert_eq!(reloaded.get(keys::USER_ID), Some("0xabc"));
    }

    #[test]
    fn corrupt_save_file_starts_fresh() {
        let dir = TempDir::new("basehash-store").unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, "{{{{ definitely not json").unwrap();

        let store = Store::open(path);
        assert_eq!(store.get(keys::BALANCE), None);
    }

    #[test]
    fn unchanged_writes_do_not_mark_dirty() {
        let mut store = Store::in_memory();
        store.set(keys::ENERGY, 2000u32);
        store.flush();
        assert!(!store.dirty);
        store.set(keys::ENERGY, 2000u32);
        assert!(!store.dirty);
        store.set(keys::ENERGY, 1999u32);
        assert!(store.dirty);
    }
}
