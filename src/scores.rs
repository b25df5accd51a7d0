//! Persisted best results per level.
//!
//! Two tables are kept: the lowest move count and the highest star rating
//! ever achieved on each level. Both only ever improve. They are stored as
//! JSON integer-keyed maps through a narrow [`ScoreStore`] interface; any
//! storage failure is logged and treated as "no prior record".
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::rating::Stars;

/// Storage key of the best move counts.
pub const BEST_SCORES_KEY: &str = "colorSortGame_bestScores";
/// Storage key of the best star ratings.
pub const BEST_STARS_KEY: &str = "colorSortGame_bestStars";

/// A key-value blob store supplied by the host.
pub trait ScoreStore {
    /// Returns the blob under `key`, or `None` if nothing was stored.
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, blob: &str) -> Result<()>;
}

/// In-process store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.borrow().get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        self.blobs
            .borrow_mut()
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(Error::Store(format!("invalid key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl ScoreStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, blob)?;
        Ok(())
    }
}

/// Best move counts and star ratings per level id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BestScores {
    moves: BTreeMap<u32, usize>,
    stars: BTreeMap<u32, Stars>,
}

/// Encodes an integer-keyed table as a JSON object.
pub fn encode_table<V: Serialize>(table: &BTreeMap<u32, V>) -> Result<String> {
    Ok(serde_json::to_string(table)?)
}

/// Decodes a table written by `encode_table`.
pub fn decode_table<V: DeserializeOwned>(blob: &str) -> Result<BTreeMap<u32, V>> {
    Ok(serde_json::from_str(blob)?)
}

fn load_table<V: DeserializeOwned>(store: &dyn ScoreStore, key: &str) -> BTreeMap<u32, V> {
    match store.load(key).and_then(|blob| blob.map(|b| decode_table(&b)).transpose()) {
        Ok(table) => table.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring unreadable score table");
            BTreeMap::new()
        }
    }
}

impl BestScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both tables; a missing or unreadable table starts out empty.
    pub fn load_from(store: &dyn ScoreStore) -> Self {
        BestScores {
            moves: load_table(store, BEST_SCORES_KEY),
            stars: load_table(store, BEST_STARS_KEY),
        }
    }

    /// Writes both tables. Failures are logged and reported as `false`.
    pub fn save_to(&self, store: &dyn ScoreStore) -> bool {
        let result = encode_table(&self.moves)
            .and_then(|blob| store.save(BEST_SCORES_KEY, &blob))
            .and_then(|_| encode_table(&self.stars))
            .and_then(|blob| store.save(BEST_STARS_KEY, &blob));
        if let Err(e) = &result {
            tracing::warn!(error = %e, "failed to save best scores");
        }
        result.is_ok()
    }

    /// Records a move count; returns `true` if it beat (or set) the record.
    pub fn record_moves(&mut self, level_id: u32, moves: usize) -> bool {
        match self.moves.get(&level_id) {
            Some(&best) if best <= moves => false,
            _ => {
                self.moves.insert(level_id, moves);
                true
            }
        }
    }

    /// Records a star rating; returns `true` if it beat (or set) the record.
    pub fn record_stars(&mut self, level_id: u32, stars: Stars) -> bool {
        match self.stars.get(&level_id) {
            Some(&best) if best >= stars => false,
            _ => {
                self.stars.insert(level_id, stars);
                true
            }
        }
    }

    /// Records both results of a completed level.
    pub fn record_completion(&mut self, level_id: u32, moves: usize, stars: Stars) -> bool {
        let new_moves = self.record_moves(level_id, moves);
        let new_stars = self.record_stars(level_id, stars);
        new_moves || new_stars
    }

    pub fn best_moves(&self, level_id: u32) -> Option<usize> {
        self.moves.get(&level_id).copied()
    }

    pub fn best_stars(&self, level_id: u32) -> Option<Stars> {
        self.stars.get(&level_id).copied()
    }

    pub fn reset(&mut self) {
        self.moves.clear();
        self.stars.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.stars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct BrokenStore;

    impl ScoreStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Store("offline".to_string()))
        }

        fn save(&self, _key: &str, _blob: &str) -> Result<()> {
            Err(Error::Store("offline".to_string()))
        }
    }

    #[test]
    fn test_records_only_improve() {
        let mut scores = BestScores::new();
        assert!(scores.record_moves(1, 20));
        assert!(!scores.record_moves(1, 25));
        assert!(!scores.record_moves(1, 20));
        assert!(scores.record_moves(1, 18));
        assert_eq!(scores.best_moves(1), Some(18));

        assert!(scores.record_stars(1, 2));
        assert!(!scores.record_stars(1, 1));
        assert!(scores.record_stars(1, 3));
        assert_eq!(scores.best_stars(1), Some(3));
        assert_eq!(scores.best_stars(2), None);
    }

    #[test]
    fn test_round_trip_through_store() {
        let store = MemoryStore::new();
        let mut scores = BestScores::new();
        scores.record_completion(1, 12, 3);
        scores.record_completion(7, 40, 2);
        assert!(scores.save_to(&store));

        let blob = store.load(BEST_SCORES_KEY).unwrap().unwrap();
        assert_eq!(blob, r#"{"1":12,"7":40}"#);
        assert_eq!(BestScores::load_from(&store), scores);
    }

    #[test]
    fn test_decode_table() {
        let table: BTreeMap<u32, usize> = decode_table(r#"{"3":9,"10":4}"#).unwrap();
        assert_eq!(table.get(&3), Some(&9));
        assert_eq!(table.get(&10), Some(&4));
        assert_eq!(encode_table(&table).unwrap(), r#"{"3":9,"10":4}"#);
        assert!(decode_table::<usize>("not json").is_err());
    }

    #[test]
    fn test_corrupt_or_missing_store_is_empty() {
        assert!(BestScores::load_from(&MemoryStore::new()).is_empty());
        assert!(BestScores::load_from(&BrokenStore).is_empty());

        let store = MemoryStore::new();
        store.save(BEST_SCORES_KEY, "{broken").unwrap();
        store.save(BEST_STARS_KEY, r#"{"2":3}"#).unwrap();
        let scores = BestScores::load_from(&store);
        assert_eq!(scores.best_moves(2), None);
        assert_eq!(scores.best_stars(2), Some(3));
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let mut scores = BestScores::new();
        scores.record_moves(1, 5);
        assert!(!scores.save_to(&BrokenStore));
    }

    #[test]
    fn test_file_store() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path().join("scores"));
        assert_eq!(store.load(BEST_SCORES_KEY).unwrap(), None);

        let mut scores = BestScores::new();
        scores.record_completion(4, 30, 1);
        assert!(scores.save_to(&store));
        assert_eq!(BestScores::load_from(&store), scores);
        assert!(store.save("../escape", "{}").is_err());
        assert!(dir.path().join("scores").join("colorSortGame_bestScores.json").exists());
    }

    #[test]
    fn test_reset() {
        let mut scores = BestScores::new();
        scores.record_completion(1, 3, 3);
        scores.reset();
        assert!(scores.is_empty());
    }
}
