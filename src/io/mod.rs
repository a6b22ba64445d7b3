// src/io/mod.rs
pub mod cif;
pub mod xyz;

use crate::error::{OmsError, OmsResult};
use crate::model::Structure;
use std::path::Path;

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

pub fn load_structure(path: &Path) -> OmsResult<Structure> {
    match extension(path).as_str() {
        "cif" => cif::parse(path),
        "xyz" => xyz::parse(path),
        other => Err(OmsError::parse(
            path,
            format!("unsupported structure format '{}'", other),
        )),
    }
}

pub fn save_structure(path: &Path, structure: &Structure) -> OmsResult<()> {
    match extension(path).as_str() {
        "xyz" => xyz::write(path, structure),
        // Default fallback
        _ => cif::write(path, structure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_extension_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("POSCAR");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(load_structure(&path), Err(OmsError::Parse { .. })));
    }
}
