// src/model/summary.rs

use serde::{Deserialize, Serialize};

/// Type tag of a site that no test opened
pub const CLOSED: &str = "closed";
/// Type tag of a site with three or fewer neighbours
pub const THREE_OR_LESS: &str = "3_or_less";

/// Classification record of one metal site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub metal: String,
    #[serde(rename = "type")]
    pub site_type: String,
    pub is_open: bool,
    pub unique: bool,
    pub problematic: bool,
    pub number_of_linkers: usize,
    pub t_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_dihedral: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_dihedrals: Option<Vec<f64>>,
}

impl SiteSummary {
    pub fn with_unique(self, unique: bool) -> Self {
        Self { unique, ..self }
    }

    pub fn without_dihedrals(self) -> Self {
        Self {
            min_dihedral: None,
            all_dihedrals: None,
            ..self
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureSummary {
    pub material_name: String,
    pub problematic: bool,
    pub uc_volume: f64,
    pub open_metal_density: f64,
    pub metal_sites_found: bool,
    pub metal_sites: Vec<SiteSummary>,
}

impl StructureSummary {
    /// Number of sites flagged both open and unique
    pub fn unique_open_sites(&self) -> usize {
        self.metal_sites
            .iter()
            .filter(|s| s.is_open && s.unique)
            .count()
    }

    /// Copy suitable for the "normal" output level
    pub fn without_dihedrals(&self) -> Self {
        Self {
            metal_sites: self
                .metal_sites
                .iter()
                .cloned()
                .map(SiteSummary::without_dihedrals)
                .collect(),
            ..self.clone()
        }
    }
}

/// Folds per-site records into a [`StructureSummary`].
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    material_name: String,
    uc_volume: f64,
    sites: Vec<SiteSummary>,
}

impl SummaryBuilder {
    pub fn new(material_name: impl Into<String>, uc_volume: f64) -> Self {
        Self {
            material_name: material_name.into(),
            uc_volume,
            sites: Vec::new(),
        }
    }

    pub fn push(mut self, site: SiteSummary) -> Self {
        self.sites.push(site);
        self
    }

    pub fn build(self) -> StructureSummary {
        let problematic = self.sites.iter().any(|s| s.problematic);
        let metal_sites_found = self.sites.iter().any(|s| s.is_open);
        let unique_open = self.sites.iter().filter(|s| s.is_open && s.unique).count();
        let open_metal_density = if self.uc_volume > 0.0 {
            unique_open as f64 / self.uc_volume
        } else {
            0.0
        };

        StructureSummary {
            material_name: self.material_name,
            problematic,
            uc_volume: self.uc_volume,
            open_metal_density,
            metal_sites_found,
            metal_sites: self.sites,
        }
    }
}
