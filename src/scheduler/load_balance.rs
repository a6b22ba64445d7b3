// src/scheduler/load_balance.rs

use crate::error::OmsResult;
use crate::io;
use crate::scheduler::collection::StructureEntry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const FILE_NAME: &str = "load_balance_info.json";

/// Workload estimate (atom count) per structure name. Only used to order and
/// partition work.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadBalanceIndex {
    loads: BTreeMap<String, u64>,
}

impl LoadBalanceIndex {
    pub fn path(output: &Path) -> PathBuf {
        output.join(FILE_NAME)
    }

    /// Reads the index stored under `output`. Starts empty when `redo` is set,
    /// or when no readable index exists.
    pub fn load(output: &Path, redo: bool) -> Self {
        let path = Self::path(output);
        if redo {
            log::info!("Recomputing load balancing info");
            return Self::default();
        }
        if !path.is_file() {
            log::info!("Load balancing info not found, it will be computed once");
            return Self::default();
        }

        let parsed: Result<Self, String> = File::open(&path)
            .map_err(|e| e.to_string())
            .and_then(|f| serde_json::from_reader(BufReader::new(f)).map_err(|e| e.to_string()));
        match parsed {
            Ok(index) => index,
            Err(e) => {
                log::warn!("Ignoring unreadable {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, output: &Path) -> OmsResult<()> {
        fs::create_dir_all(output)?;
        let writer = BufWriter::new(File::create(Self::path(output))?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.loads.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, load: u64) {
        self.loads.insert(name.into(), load);
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    /// Computes the entries missing for `entries`, in parallel. Structures
    /// that fail to load get no entry. Returns the number of entries added.
    pub fn validate(&mut self, entries: &[StructureEntry]) -> usize {
        let missing: Vec<&StructureEntry> = entries
            .iter()
            .filter(|e| !self.loads.contains_key(&e.name))
            .collect();
        if missing.is_empty() {
            return 0;
        }
        log::info!("Computing load balancing info for {} structures", missing.len());

        let computed: Vec<(String, u64)> = missing
            .par_iter()
            .filter_map(|e| match structure_load(&e.path) {
                Ok(load) => Some((e.name.clone(), load)),
                Err(err) => {
                    log::warn!("{}: no load balancing info ({})", e.name, err);
                    None
                }
            })
            .collect();

        let added = computed.len();
        self.loads.extend(computed);
        added
    }
}

/// Workload of one structure file: its atom count after symmetry expansion
pub fn structure_load(path: &Path) -> OmsResult<u64> {
    Ok(io::load_structure(path)?.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::{AtomSite, Structure};

    fn write_structure(dir: &Path, name: &str, n_atoms: usize) -> StructureEntry {
        let atoms = (0..n_atoms)
            .map(|i| AtomSite::new("C", [0.1 * i as f64, 0.0, 0.0], 0))
            .collect();
        let s = Structure::new(name, [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]], atoms);
        let path = dir.join(format!("{}.cif", name));
        io::cif::write(&path, &s).unwrap();
        StructureEntry::from_path(path)
    }

    #[test]
    fn test_validate_fills_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![write_structure(dir.path(), "small", 2), write_structure(dir.path(), "big", 7)];

        let mut index = LoadBalanceIndex::default();
        index.insert("small", 99);
        assert_eq!(index.validate(&entries), 1);
        // existing entries are kept as they are
        assert_eq!(index.get("small"), Some(99));
        assert_eq!(index.get("big"), Some(7));
        assert_eq!(index.validate(&entries), 0);
    }

    #[test]
    fn test_unloadable_structure_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.cif");
        fs::write(&bad, "not a cif").unwrap();

        let mut index = LoadBalanceIndex::default();
        assert_eq!(index.validate(&[StructureEntry::from_path(bad)]), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_persistence_and_redo() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = LoadBalanceIndex::default();
        index.insert("a", 3);
        index.insert("b", 5);
        index.save(dir.path()).unwrap();

        let text = fs::read_to_string(dir.path().join(FILE_NAME)).unwrap();
        let raw: BTreeMap<String, u64> = serde_json::from_str(&text).unwrap();
        assert_eq!(raw.get("b"), Some(&5));

        assert_eq!(LoadBalanceIndex::load(dir.path(), false), index);
        assert!(LoadBalanceIndex::load(dir.path(), true).is_empty());
    }

    #[test]
    fn test_corrupt_index_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE_NAME), "{ broken").unwrap();
        assert!(LoadBalanceIndex::load(dir.path(), false).is_empty());
    }
}
