// src/scheduler/collection.rs

use crate::error::{OmsError, OmsResult};
use crate::pipeline::results_exist;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One structure file of a collection. `name` (the file stem) also names the
/// result folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEntry {
    pub name: String,
    pub path: PathBuf,
}

impl StructureEntry {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

#[derive(Debug)]
pub struct Collection {
    pub folder: PathBuf,
    pub entries: Vec<StructureEntry>,
}

#[derive(Debug, Default, PartialEq)]
pub struct CollectionStatus {
    pub total: usize,
    pub done: usize,
    /// Result folders without complete results
    pub missing: Vec<PathBuf>,
}

impl Collection {
    /// Every `*.cif` file of `folder` (by file name), or only the files named
    /// in `structure_list`, one per line, relative to `folder`.
    pub fn load(folder: &Path, structure_list: Option<&Path>) -> OmsResult<Self> {
        if !folder.is_dir() {
            return Err(OmsError::InvalidArgument(format!(
                "collection folder {} does not exist",
                folder.display()
            )));
        }

        let paths: Vec<PathBuf> = match structure_list {
            Some(list) => {
                log::info!("Using only the structures listed in {}", list.display());
                fs::read_to_string(list)?
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(|l| folder.join(l))
                    .collect()
            }
            None => {
                log::info!("Using all the structures in {}", folder.display());
                let mut found = Vec::new();
                for entry in fs::read_dir(folder)? {
                    let path = entry?.path();
                    let is_cif = path
                        .extension()
                        .is_some_and(|e| e.eq_ignore_ascii_case("cif"));
                    if is_cif && path.is_file() {
                        found.push(path);
                    }
                }
                found.sort();
                found
            }
        };
        // one entry per name, so no two workers share a result folder
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(paths.len());
        for entry in paths.into_iter().map(StructureEntry::from_path) {
            if seen.insert(entry.name.clone()) {
                entries.push(entry);
            } else {
                log::warn!("Ignoring duplicate structure {} ({})", entry.name, entry.path.display());
            }
        }
        log::info!("Collection holds {} structures", entries.len());

        Ok(Self {
            folder: folder.to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self, output: &Path) -> CollectionStatus {
        let mut status = CollectionStatus {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            let folder = output.join(&entry.name);
            if results_exist(&folder, &entry.name) {
                status.done += 1;
            } else {
                status.missing.push(folder);
            }
        }
        status
    }
}
