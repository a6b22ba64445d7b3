// src/config.rs

use crate::error::{OmsError, OmsResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLevel {
  /// Summary without the dihedral statistics
  Normal,
  Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureFormat {
  Cif,
  Xyz,
}

impl StructureFormat {
  pub fn extension(&self) -> &'static str {
    match self {
      StructureFormat::Cif => "cif",
      StructureFormat::Xyz => "xyz",
    }
  }
}

// --- Tolerances ---

/// Angular tolerances (degrees) of the planarity tests. Empirical values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
  pub plane: f64,
  pub plane_5l: f64,
  // 12.5 so that ferrocene-like spheres are not taken as open
  pub plane_on_metal: f64,
}

impl Default for Tolerances {
  fn default() -> Self {
    Self {
      plane: 25.0,
      plane_5l: 25.0,
      plane_on_metal: 12.5,
    }
  }
}

// --- Main Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
  #[serde(default)]
  pub tolerances: Tolerances,

  #[serde(default = "default_output_level")]
  pub output_level: OutputLevel,

  #[serde(default = "default_structure_format")]
  pub structure_format: StructureFormat,
}

fn default_output_level() -> OutputLevel {
  OutputLevel::Debug
}

fn default_structure_format() -> StructureFormat {
  StructureFormat::Cif
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      tolerances: Tolerances::default(),
      output_level: default_output_level(),
      structure_format: default_structure_format(),
    }
  }
}

impl AnalysisConfig {
  /// Loads the configuration.
  ///
  /// An explicit path must exist and parse. Without one, the per-user file
  /// (e.g. ~/.config/omsdetect/settings.json) is used when present, else the defaults.
  pub fn load(path: Option<&Path>) -> OmsResult<Self> {
    match path {
      Some(p) => Self::read(p),
      None => {
        let default_path = Self::default_path();
        if default_path.exists() {
          Self::read(&default_path)
        } else {
          log::debug!("No config found. Using defaults.");
          Ok(Self::default())
        }
      }
    }
  }

  fn read(path: &Path) -> OmsResult<Self> {
    let file = File::open(path).map_err(|e| OmsError::Config {
      path: path.to_path_buf(),
      detail: e.to_string(),
    })?;
    let cfg = serde_json::from_reader(BufReader::new(file)).map_err(|e| OmsError::Config {
      path: path.to_path_buf(),
      detail: e.to_string(),
    })?;
    log::debug!("Config loaded from {:?}", path);
    Ok(cfg)
  }

  /// Saves to `path`, or to the per-user location when `None`. Returns the path written.
  pub fn save(&self, path: Option<&Path>) -> OmsResult<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, self)?;
    Ok(path)
  }

  pub fn default_path() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("org", "omsdetect", "omsdetect") {
      proj.config_dir().join("settings.json")
    } else {
      PathBuf::from("settings.json")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let cfg = AnalysisConfig::default();
    assert_eq!(cfg.tolerances.plane, 25.0);
    assert_eq!(cfg.tolerances.plane_5l, 25.0);
    assert_eq!(cfg.tolerances.plane_on_metal, 12.5);
    assert_eq!(cfg.output_level, OutputLevel::Debug);
    assert_eq!(cfg.structure_format.extension(), "cif");
  }

  #[test]
  fn test_partial_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{ "output_level": "normal" }"#).unwrap();

    let cfg = AnalysisConfig::load(Some(&path)).unwrap();
    assert_eq!(cfg.output_level, OutputLevel::Normal);
    assert_eq!(cfg.tolerances, Tolerances::default());
  }

  #[test]
  fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");
    let mut cfg = AnalysisConfig::default();
    cfg.structure_format = StructureFormat::Xyz;
    cfg.tolerances.plane = 30.0;

    let written = cfg.save(Some(&path)).unwrap();
    assert_eq!(written, path);
    assert_eq!(AnalysisConfig::load(Some(&path)).unwrap(), cfg);
  }

  #[test]
  fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    assert!(matches!(
      AnalysisConfig::load(Some(&missing)),
      Err(OmsError::Config { .. })
    ));
  }
}
